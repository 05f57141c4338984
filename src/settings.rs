use crate::constants::N_PARTICLE_TYPES;

/// How charged-particle energy deposition produces photons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectronTreatment {
    /// Local energy deposition, no secondary photons.
    Led,
    /// Thick-target bremsstrahlung tables, built at material finalization.
    Ttb,
}

/// Run-level switches consumed by the geometry and cross-section engines.
/// Indexed-by-particle-type arrays follow the order of `ParticleType`.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Continuous-energy (true) or multigroup (false) transport.
    pub run_ce: bool,
    pub photon_transport: bool,
    pub electron_treatment: ElectronTreatment,
    /// Transport energy cutoffs in eV, per particle type.
    pub energy_min: [f64; N_PARTICLE_TYPES],
    pub energy_max: [f64; N_PARTICLE_TYPES],
    /// Width of a logarithmic union-energy-grid bin.
    pub log_spacing: f64,
    pub verbosity: i32,
    pub trace: bool,
    /// Check every located point against all cells of its universe and
    /// abort on overlapping regions.
    pub check_overlaps: bool,
}

impl Settings {
    /// Derive the logarithmic grid spacing from the neutron energy range
    /// and a bin count.
    pub fn set_log_grid_bins(&mut self, n_bins: usize) {
        self.log_spacing = (self.energy_max[0] / self.energy_min[0]).ln() / n_bins as f64;
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            run_ce: true,
            photon_transport: false,
            electron_treatment: ElectronTreatment::Led,
            energy_min: [1e-5, 1e3],
            energy_max: [2e7, 1e9],
            log_spacing: (2e7f64 / 1e-5).ln() / 8000.0,
            verbosity: 7,
            trace: false,
            check_overlaps: false,
        }
    }
}
