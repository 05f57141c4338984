//! Shared stand-ins for the external nuclear data library.

use std::sync::Arc;

use transport_for_mc::nuclide::{DataLibrary, ElementData, NuclideData, ThermalTable};
use transport_for_mc::simulation::{MicroXS, PhotonMicroXS};

pub struct TestNuclide {
    pub name: &'static str,
    pub awr: f64,
    pub fissionable: bool,
}

impl NuclideData for TestNuclide {
    fn name(&self) -> &str {
        self.name
    }

    fn awr(&self) -> f64 {
        self.awr
    }

    fn fissionable(&self) -> bool {
        self.fissionable
    }

    fn calculate_xs(
        &self,
        i_sab: Option<usize>,
        e: f64,
        i_log_grid: usize,
        sqrt_kt: f64,
        sab_frac: f64,
        micro: &mut MicroXS,
    ) {
        // Deterministic pseudo-data: enough structure for the engine's
        // bookkeeping to be observable.
        micro.total = if i_sab.is_some() { 20.0 } else { 10.0 };
        micro.absorption = 1.0;
        micro.fission = if self.fissionable { 2.0 } else { 0.0 };
        micro.nu_fission = 2.5 * micro.fission;
        micro.photon_prod = 0.5;
        micro.index_grid = i_log_grid;
        micro.index_sab = i_sab;
        micro.sab_frac = sab_frac;
        micro.last_e = e;
        micro.last_sqrt_kt = sqrt_kt;
    }
}

pub struct TestElement {
    pub symbol: &'static str,
    pub z: i32,
}

impl ElementData for TestElement {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn z(&self) -> i32 {
        self.z
    }

    fn calculate_xs(&self, e: f64, micro: &mut PhotonMicroXS) {
        let z = self.z as f64;
        micro.coherent = 0.1 * z;
        micro.incoherent = 0.2 * z;
        micro.photoelectric = 0.3 * z;
        micro.pair_production = 0.4 * z;
        micro.total =
            micro.coherent + micro.incoherent + micro.photoelectric + micro.pair_production;
        micro.last_e = e;
    }

    fn dcs(&self) -> &[Vec<f64>] {
        &[]
    }

    fn stopping_power_collision(&self) -> &[f64] {
        &[]
    }

    fn stopping_power_radiative(&self) -> &[f64] {
        &[]
    }
}

/// H1 / O16 / U235 plus the water thermal table, with photon elements.
pub fn standard_library() -> DataLibrary {
    let mut library = DataLibrary::new();
    library.add_nuclide(Arc::new(TestNuclide {
        name: "H1",
        awr: 0.99916747,
        fissionable: false,
    }));
    library.add_nuclide(Arc::new(TestNuclide {
        name: "O16",
        awr: 15.85751,
        fissionable: false,
    }));
    library.add_nuclide(Arc::new(TestNuclide {
        name: "U235",
        awr: 233.0248,
        fissionable: true,
    }));
    library.add_element(Arc::new(TestElement { symbol: "H", z: 1 }));
    library.add_element(Arc::new(TestElement { symbol: "O", z: 8 }));
    library.add_element(Arc::new(TestElement { symbol: "U", z: 92 }));
    library.add_thermal_table(ThermalTable::new(
        "c_H_in_H2O",
        vec!["H1".to_string()],
        4.0,
    ));
    library
}
