//! Seam to the nuclear data library. The tabulated data (energy grids,
//! reaction cross sections, probability tables, S(a,b) secondaries) lives
//! behind these traits; the material engine only ever asks for a cache
//! refresh at a given state point.

use std::collections::HashMap;
use std::sync::Arc;

use crate::simulation::{MicroXS, PhotonMicroXS};

/// Continuous-energy neutron data for one nuclide.
///
/// `calculate_xs` must fill `micro` with the microscopic cross sections at
/// the requested state and stamp the cache key fields (`last_e`,
/// `last_sqrt_kt`, `index_sab`, `sab_frac`) so the caller can skip the next
/// refresh at an identical state point.
pub trait NuclideData: Send + Sync {
    fn name(&self) -> &str;

    /// Atomic weight ratio to the neutron mass.
    fn awr(&self) -> f64;

    fn fissionable(&self) -> bool;

    fn calculate_xs(
        &self,
        i_sab: Option<usize>,
        e: f64,
        i_log_grid: usize,
        sqrt_kt: f64,
        sab_frac: f64,
        micro: &mut MicroXS,
    );
}

/// Photon interaction data for one element, plus the charged-particle
/// tables consumed by the bremsstrahlung build.
pub trait ElementData: Send + Sync {
    fn symbol(&self) -> &str;

    /// Atomic number.
    fn z(&self) -> i32;

    /// Fill `micro` with photon cross sections at energy `e` and stamp
    /// `last_e`.
    fn calculate_xs(&self, e: f64, micro: &mut PhotonMicroXS);

    /// Scaled bremsstrahlung DCS on the (incident energy, reduced photon
    /// energy) grid, row-per-incident-energy.
    fn dcs(&self) -> &[Vec<f64>];

    /// Collision stopping power on the incident energy grid.
    fn stopping_power_collision(&self) -> &[f64];

    /// Radiative stopping power on the incident energy grid.
    fn stopping_power_radiative(&self) -> &[f64];
}

/// Identity and applicability of one thermal scattering S(a,b) table. The
/// secondary distributions stay in the data library; the material engine
/// needs only the name matching and the cutoff energy.
#[derive(Clone, Debug)]
pub struct ThermalTable {
    pub name: String,
    /// Names of the nuclides this table can be applied to.
    pub nuclides: Vec<String>,
    /// Highest energy (eV) at which the table applies.
    pub threshold: f64,
}

impl ThermalTable {
    pub fn new(name: impl Into<String>, nuclides: Vec<String>, threshold: f64) -> Self {
        ThermalTable {
            name: name.into(),
            nuclides,
            threshold,
        }
    }

    pub fn applies_to(&self, nuclide_name: &str) -> bool {
        self.nuclides.iter().any(|n| n == nuclide_name)
    }
}

/// Flat registries of the external nuclear data consumed during transport:
/// nuclides, photon elements, thermal scattering tables and the shared
/// bremsstrahlung energy grids. Populated by the driver before any material
/// is finalized; read-only afterwards.
#[derive(Default)]
pub struct DataLibrary {
    pub nuclides: Vec<Arc<dyn NuclideData>>,
    pub nuclide_map: HashMap<String, usize>,
    pub elements: Vec<Arc<dyn ElementData>>,
    pub element_map: HashMap<String, usize>,
    pub thermal_tables: Vec<ThermalTable>,
    pub thermal_map: HashMap<String, usize>,
    /// Incident-energy grid shared by all bremsstrahlung tables, in eV.
    pub ttb_e_grid: Vec<f64>,
    /// Reduced photon energy grid of the DCS tables.
    pub ttb_k_grid: Vec<f64>,
}

impl std::fmt::Debug for DataLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLibrary")
            .field("n_nuclides", &self.nuclides.len())
            .field("n_elements", &self.elements.len())
            .field("n_thermal_tables", &self.thermal_tables.len())
            .finish()
    }
}

impl DataLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a nuclide, returning its global index. Re-registering a
    /// name returns the existing index.
    pub fn add_nuclide(&mut self, nuclide: Arc<dyn NuclideData>) -> usize {
        if let Some(&i) = self.nuclide_map.get(nuclide.name()) {
            return i;
        }
        let i = self.nuclides.len();
        self.nuclide_map.insert(nuclide.name().to_string(), i);
        self.nuclides.push(nuclide);
        i
    }

    pub fn add_element(&mut self, element: Arc<dyn ElementData>) -> usize {
        if let Some(&i) = self.element_map.get(element.symbol()) {
            return i;
        }
        let i = self.elements.len();
        self.element_map.insert(element.symbol().to_string(), i);
        self.elements.push(element);
        i
    }

    pub fn add_thermal_table(&mut self, table: ThermalTable) -> usize {
        if let Some(&i) = self.thermal_map.get(&table.name) {
            return i;
        }
        let i = self.thermal_tables.len();
        self.thermal_map.insert(table.name.clone(), i);
        self.thermal_tables.push(table);
        i
    }
}

/// Element symbol part of a nuclide name, e.g. "H1" -> "H", "U235" -> "U".
pub fn element_symbol(nuclide_name: &str) -> &str {
    let end = nuclide_name
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(nuclide_name.len());
    &nuclide_name[..end]
}
