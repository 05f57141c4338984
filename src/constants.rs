//! Physical and numerical constants shared across the transport core.

/// Avogadro's number in units of 10^24 / mol, so that atom densities in
/// atom/b-cm come out directly from g/cm^3 inputs.
pub const N_AVOGADRO: f64 = 0.6022140857;

/// Neutron mass in amu.
pub const MASS_NEUTRON: f64 = 1.00866491588;

/// Electron rest mass energy in eV.
pub const MASS_ELECTRON_EV: f64 = 0.5109989461e6;

/// Maximum number of nested coordinate levels a particle can hold.
pub const MAX_COORD: usize = 6;

/// Nudge applied along the flight direction to disambiguate positions that
/// sit exactly on a lattice tile face.
pub const TINY_BIT: f64 = 1e-8;

/// Relative precision used when reconciling coincident boundaries across
/// coordinate levels: a deeper-level candidate replaces the incumbent
/// distance only if it is smaller by at least this relative margin.
pub const FP_REL_PRECISION: f64 = 1e-5;

/// Relative precision for same-level distance comparisons.
pub const FP_PRECISION: f64 = 1e-14;

/// Absolute tolerance within which a point is considered to lie on a
/// surface, triggering direction-based sense resolution.
pub const FP_COINCIDENT: f64 = 1e-12;

/// ENDF MT numbers of the reactions tracked individually for depletion:
/// (n,2n), (n,3n), (n,4n), (n,gamma), (n,p), (n,alpha).
pub const DEPLETION_RX: [i32; 6] = [16, 17, 37, 102, 103, 107];

/// Number of transportable particle types (neutron, photon).
pub const N_PARTICLE_TYPES: usize = 2;
