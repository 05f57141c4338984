//! Per-thread transport scratch state. Each worker thread owns one
//! [`Scratch`] and passes it through the call tree; nothing here is shared
//! or locked.

use crate::constants::DEPLETION_RX;
use crate::fast_rng::FastRng;

/// Cached microscopic neutron cross sections for one nuclide at the last
/// evaluated state point. Valid for a particle when
/// `(e, sqrt_kt, index_sab, sab_frac)` all match.
#[derive(Clone, Copy, Debug)]
pub struct MicroXS {
    // Microscopic cross sections in barns
    pub total: f64,
    pub absorption: f64,
    pub fission: f64,
    pub nu_fission: f64,
    /// If sab_frac is neither 0 nor 1, averaged over bound and free nuclei.
    pub elastic: f64,
    /// Bound thermal elastic & inelastic scattering
    pub thermal: f64,
    /// Bound thermal elastic scattering
    pub thermal_elastic: f64,
    pub photon_prod: f64,

    /// Cross sections for the individually tracked depletion reactions.
    pub reaction: [f64; DEPLETION_RX.len()],

    // Indices and factors needed to reconstruct the table lookup
    pub index_grid: usize,
    pub index_temp: usize,
    pub interp_factor: f64,
    pub index_sab: Option<usize>,
    pub index_temp_sab: usize,
    /// Fraction of atoms treated with the bound thermal table.
    pub sab_frac: f64,
    /// In the unresolved resonance range with probability tables?
    pub use_ptable: bool,

    // State at which these values were computed; a mismatch forces a
    // refresh.
    pub last_e: f64,
    pub last_sqrt_kt: f64,
}

impl Default for MicroXS {
    fn default() -> Self {
        MicroXS {
            total: 0.0,
            absorption: 0.0,
            fission: 0.0,
            nu_fission: 0.0,
            elastic: 0.0,
            thermal: 0.0,
            thermal_elastic: 0.0,
            photon_prod: 0.0,
            reaction: [0.0; DEPLETION_RX.len()],
            index_grid: 0,
            index_temp: 0,
            interp_factor: 0.0,
            index_sab: None,
            index_temp_sab: 0,
            sab_frac: 0.0,
            use_ptable: false,
            last_e: 0.0,
            last_sqrt_kt: 0.0,
        }
    }
}

/// Cached microscopic photon cross sections for one element.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhotonMicroXS {
    pub total: f64,
    pub coherent: f64,
    pub incoherent: f64,
    pub photoelectric: f64,
    pub pair_production: f64,
    pub last_e: f64,
}

/// Macroscopic cross sections of the material the particle is currently
/// traveling through, in 1/cm. Zeroed at the start of every material
/// evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialMacroXS {
    pub total: f64,
    pub absorption: f64,
    pub fission: f64,
    pub nu_fission: f64,
    pub photon_prod: f64,

    // Photon partials
    pub coherent: f64,
    pub incoherent: f64,
    pub photoelectric: f64,
    pub pair_production: f64,
}

/// All mutable per-thread state of the transport inner loop: the dense
/// per-nuclide and per-element caches, the macroscopic accumulator and the
/// thread's random stream.
#[derive(Clone, Debug)]
pub struct Scratch {
    pub micro_xs: Vec<MicroXS>,
    pub micro_photon_xs: Vec<PhotonMicroXS>,
    pub material_xs: MaterialMacroXS,
    pub rng: FastRng,
}

impl Scratch {
    pub fn new(n_nuclides: usize, n_elements: usize, seed: u64) -> Self {
        Scratch {
            micro_xs: vec![MicroXS::default(); n_nuclides],
            micro_photon_xs: vec![PhotonMicroXS::default(); n_elements],
            material_xs: MaterialMacroXS::default(),
            rng: FastRng::new(seed),
        }
    }
}
