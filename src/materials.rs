use std::collections::HashMap;

use crate::constants::{MASS_NEUTRON, N_AVOGADRO};
use crate::error::{set_errmsg, ApiError, ConfigError};
use crate::material::Material;
use crate::nuclide::DataLibrary;

/// Container for every [`Material`] in the model plus the id -> index map,
/// exposing the recoverable driver-facing API. Following the driver
/// contract, all `index` arguments here are 1-based; errors are returned as
/// [`ApiError`] values and also recorded in the thread-local message store.
#[derive(Clone, Debug, Default)]
pub struct Materials {
    materials: Vec<Material>,
    material_map: HashMap<i32, usize>,
}

impl Materials {
    pub fn new() -> Self {
        Materials {
            materials: Vec::new(),
            material_map: HashMap::new(),
        }
    }

    /// Register a material, enforcing unique ids.
    pub fn push(&mut self, material: Material) -> Result<usize, ConfigError> {
        if self.material_map.contains_key(&material.id) {
            return Err(ConfigError::DuplicateMaterialId(material.id));
        }
        let index = self.materials.len();
        self.material_map.insert(material.id, index);
        self.materials.push(material);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Material> {
        self.materials.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Material> {
        self.materials.iter_mut()
    }

    /// 0-based access used by the transport loop.
    pub fn get(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    fn checked(&self, index: usize) -> Result<&Material, ApiError> {
        if index >= 1 && index <= self.materials.len() {
            Ok(&self.materials[index - 1])
        } else {
            let err = ApiError::OutOfBounds(index);
            set_errmsg(&err);
            Err(err)
        }
    }

    fn checked_mut(&mut self, index: usize) -> Result<&mut Material, ApiError> {
        if index >= 1 && index <= self.materials.len() {
            Ok(&mut self.materials[index - 1])
        } else {
            let err = ApiError::OutOfBounds(index);
            set_errmsg(&err);
            Err(err)
        }
    }

    /// 1-based index of the material with the given unique id.
    pub fn get_index(&self, id: i32) -> Result<usize, ApiError> {
        match self.material_map.get(&id) {
            Some(&i) => Ok(i + 1),
            None => {
                let err = ApiError::InvalidId(id);
                set_errmsg(&err);
                Err(err)
            }
        }
    }

    pub fn get_id(&self, index: usize) -> Result<i32, ApiError> {
        Ok(self.checked(index)?.id)
    }

    pub fn set_id(&mut self, index: usize, id: i32) -> Result<(), ApiError> {
        self.checked_mut(index)?.id = id;
        self.material_map.insert(id, index - 1);
        Ok(())
    }

    pub fn get_fissionable(&self, index: usize) -> Result<bool, ApiError> {
        Ok(self.checked(index)?.fissionable)
    }

    pub fn get_volume(&self, index: usize) -> Result<f64, ApiError> {
        let m = self.checked(index)?;
        match m.volume {
            Some(v) => Ok(v),
            None => {
                let err =
                    ApiError::Unassigned(format!("Volume for material with ID={} not set.", m.id));
                set_errmsg(&err);
                Err(err)
            }
        }
    }

    pub fn set_volume(&mut self, index: usize, volume: f64) -> Result<(), ApiError> {
        let m = self.checked_mut(index)?;
        if volume >= 0.0 {
            m.volume = Some(volume);
            Ok(())
        } else {
            let err = ApiError::InvalidArgument("Volume must be non-negative".to_string());
            set_errmsg(&err);
            Err(err)
        }
    }

    /// Constituent nuclide indices and atom densities.
    pub fn get_densities(&self, index: usize) -> Result<(&[usize], &[f64]), ApiError> {
        let m = self.checked(index)?;
        if m.nuclide.is_empty() {
            let err = ApiError::Allocate(
                "Material atom density array has not been allocated.".to_string(),
            );
            set_errmsg(&err);
            return Err(err);
        }
        Ok((&m.nuclide, &m.atom_density))
    }

    /// Re-set the total density of a finalized material.
    pub fn set_density(
        &mut self,
        index: usize,
        value: f64,
        units: &str,
        library: &DataLibrary,
    ) -> Result<(), ApiError> {
        let m = self.checked_mut(index)?;
        m.update_density(value, units, library).map_err(|err| {
            set_errmsg(&err);
            err
        })
    }

    /// Set or update the density of a single nuclide, appending it to the
    /// composition when absent. Totals are kept consistent.
    pub fn add_nuclide(
        &mut self,
        index: usize,
        name: &str,
        density: f64,
        library: &DataLibrary,
    ) -> Result<(), ApiError> {
        let m = self.checked_mut(index)?;

        // Update in place if the nuclide is already a constituent.
        for (slot, &i_nuc) in m.nuclide.iter().enumerate() {
            if library.nuclides[i_nuc].name() == name {
                let awr = library.nuclides[i_nuc].awr();
                let delta = density - m.atom_density[slot];
                m.density += delta;
                m.density_gpcc += delta * awr * MASS_NEUTRON / N_AVOGADRO;
                m.atom_density[slot] = density;
                return Ok(());
            }
        }

        let i_nuc = match library.nuclide_map.get(name) {
            Some(&i) => i,
            None => {
                let err = ApiError::InvalidArgument(format!(
                    "Nuclide {} is not present in the data library.",
                    name
                ));
                set_errmsg(&err);
                return Err(err);
            }
        };

        m.nuclide.push(i_nuc);
        m.atom_density.push(density);
        m.density += density;
        m.density_gpcc += density * library.nuclides[i_nuc].awr() * MASS_NEUTRON / N_AVOGADRO;
        m.init_nuclide_index(library);
        Ok(())
    }

    /// Replace the whole composition with (names, densities) in atom/b-cm,
    /// re-deriving totals and thermal table bindings.
    pub fn set_densities(
        &mut self,
        index: usize,
        names: &[&str],
        densities: &[f64],
        library: &DataLibrary,
    ) -> Result<(), ApiError> {
        if names.is_empty() || names.len() != densities.len() {
            let err = ApiError::InvalidArgument(
                "Nuclide and density arrays must be non-empty and the same length.".to_string(),
            );
            set_errmsg(&err);
            return Err(err);
        }
        let m = self.checked_mut(index)?;

        let mut nuclide = Vec::with_capacity(names.len());
        for name in names {
            match library.nuclide_map.get(*name) {
                Some(&i) => nuclide.push(i),
                None => {
                    let err = ApiError::InvalidArgument(format!(
                        "Nuclide {} is not present in the data library.",
                        name
                    ));
                    set_errmsg(&err);
                    return Err(err);
                }
            }
        }
        m.nuclide = nuclide;
        m.atom_density = densities.to_vec();
        let sum_density: f64 = densities.iter().sum();
        m.update_density(sum_density, "atom/b-cm", library)
            .map_err(|err| {
                set_errmsg(&err);
                err
            })?;
        m.init_nuclide_index(library);

        // Thermal tables bind to slots; a new composition means new slots.
        if let Err(err) = m.init_thermal(library) {
            let err = ApiError::InvalidArgument(err.to_string());
            set_errmsg(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Append `n` default-constructed materials, returning the 1-based
    /// index range they occupy. Fresh ids continue past the current
    /// maximum.
    pub fn extend(&mut self, n: usize) -> (usize, usize) {
        let start = self.materials.len() + 1;
        let mut next_id = self.material_map.keys().copied().max().unwrap_or(0) + 1;
        for _ in 0..n {
            while self.material_map.contains_key(&next_id) {
                next_id += 1;
            }
            let index = self.materials.len();
            self.material_map.insert(next_id, index);
            self.materials.push(Material::new(next_id));
            next_id += 1;
        }
        (start, self.materials.len())
    }
}
