// HDF5 persistence for material records. Layout matches the statepoint
// convention: one group per material named "material <id>".

use hdf5::types::VarLenUnicode;
use hdf5::Group;

use crate::material::Material;
use crate::nuclide::DataLibrary;

/// A material record as persisted: everything needed to reproduce the
/// composition without the in-memory registry indices.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialRecord {
    pub id: i32,
    pub name: String,
    pub depletable: bool,
    pub volume: Option<f64>,
    /// Total atom density in atom/b-cm.
    pub atom_density: f64,
    pub nuclides: Vec<String>,
    pub nuclide_densities: Vec<f64>,
    pub sab_names: Vec<String>,
}

fn varlen(s: &str) -> Result<VarLenUnicode, hdf5::Error> {
    s.parse::<VarLenUnicode>()
        .map_err(|e| hdf5::Error::Internal(format!("invalid HDF5 string: {}", e)))
}

/// Write one finalized material under `parent` as "material <id>".
pub fn material_to_hdf5(
    material: &Material,
    library: &DataLibrary,
    parent: &Group,
) -> Result<(), hdf5::Error> {
    let group = parent.create_group(&format!("material {}", material.id))?;

    group
        .new_attr::<i32>()
        .create("depletable")?
        .write_scalar(&(material.depletable as i32))?;
    if let Some(volume) = material.volume {
        if volume > 0.0 {
            group.new_attr::<f64>().create("volume")?.write_scalar(&volume)?;
        }
    }

    group
        .new_dataset_builder()
        .with_data(&[varlen(&material.name)?])
        .create("name")?;
    group
        .new_dataset_builder()
        .with_data(&[material.density])
        .create("atom_density")?;

    let nuc_names: Vec<VarLenUnicode> = material
        .nuclide
        .iter()
        .map(|&i| varlen(library.nuclides[i].name()))
        .collect::<Result<_, _>>()?;
    if !nuc_names.is_empty() {
        group
            .new_dataset_builder()
            .with_data(&nuc_names)
            .create("nuclides")?;
        group
            .new_dataset_builder()
            .with_data(&material.atom_density)
            .create("nuclide_densities")?;
    }

    if !material.thermal_tables.is_empty() {
        let sab_names: Vec<VarLenUnicode> = material
            .thermal_tables
            .iter()
            .map(|t| varlen(&library.thermal_tables[t.index_table].name))
            .collect::<Result<_, _>>()?;
        group
            .new_dataset_builder()
            .with_data(&sab_names)
            .create("sab_names")?;
    }

    Ok(())
}

/// Read one "material <id>" group back into a flat record.
pub fn material_from_hdf5(parent: &Group, id: i32) -> Result<MaterialRecord, hdf5::Error> {
    let group = parent.group(&format!("material {}", id))?;

    let depletable: i32 = group.attr("depletable")?.read_scalar()?;
    let volume = match group.attr("volume") {
        Ok(attr) => Some(attr.read_scalar()?),
        Err(_) => None,
    };

    let name = group
        .dataset("name")?
        .read_raw::<VarLenUnicode>()?
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default();
    let atom_density: f64 = group
        .dataset("atom_density")?
        .read_raw::<f64>()?
        .first()
        .copied()
        .unwrap_or(0.0);

    let (nuclides, nuclide_densities) = match group.dataset("nuclides") {
        Ok(ds) => {
            let names = ds
                .read_raw::<VarLenUnicode>()?
                .iter()
                .map(|s| s.to_string())
                .collect();
            let densities = group.dataset("nuclide_densities")?.read_raw::<f64>()?;
            (names, densities)
        }
        Err(_) => (Vec::new(), Vec::new()),
    };

    let sab_names = match group.dataset("sab_names") {
        Ok(ds) => ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        Err(_) => Vec::new(),
    };

    Ok(MaterialRecord {
        id,
        name,
        depletable: depletable != 0,
        volume,
        atom_density,
        nuclides,
        nuclide_densities,
        sab_names,
    })
}
