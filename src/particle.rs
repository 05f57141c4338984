use log::warn;

use crate::constants::MAX_COORD;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleType {
    Neutron = 0,
    Photon = 1,
}

/// One level of a particle's coordinate stack: local position and direction
/// inside a universe, plus the lattice tile holding that universe when the
/// level was reached through a lattice fill.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalCoord {
    pub r: [f64; 3],
    pub u: [f64; 3],
    /// Index of the containing universe, unset before location.
    pub universe: Option<usize>,
    /// Index of the containing cell within that universe.
    pub cell: Option<usize>,
    /// Lattice this level sits inside, with its tile indices.
    pub lattice: Option<usize>,
    pub lattice_i: [i32; 3],
    /// Whether a fill rotation was applied entering this level.
    pub rotated: bool,
}

impl LocalCoord {
    /// Clear everything the locator establishes, keeping nothing stale for
    /// the next descent.
    pub fn reset(&mut self) {
        self.universe = None;
        self.cell = None;
        self.lattice = None;
        self.lattice_i = [0; 3];
        self.rotated = false;
    }
}

/// The locator's view of a particle: a stack of per-universe coordinate
/// frames plus the transport state the cross-section engine reads.
#[derive(Clone, Debug)]
pub struct Particle {
    pub id: usize,
    pub type_: ParticleType,
    pub coord: [LocalCoord; MAX_COORD],
    /// Number of live coordinate levels; coord[n_coord-1] is the deepest.
    pub n_coord: usize,
    /// Energy in eV.
    pub e: f64,
    /// sqrt(kT) of the occupied cell, in sqrt(eV).
    pub sqrt_kt: f64,
    /// Signed token of the surface last crossed, 0 for none. The sign names
    /// the half-space the particle entered.
    pub surface: i32,
    /// Material of the occupied cell; None is void.
    pub material: Option<usize>,
    pub last_material: Option<usize>,
    pub last_sqrt_kt: f64,
    /// Which replicated instance of the occupied cell the particle is in.
    pub cell_instance: i32,
    pub alive: bool,
    /// Emit per-step trace messages for this particle.
    pub trace: bool,
}

impl Particle {
    pub fn new(r: [f64; 3], u: [f64; 3], e: f64, type_: ParticleType) -> Self {
        let mut coord = [LocalCoord::default(); MAX_COORD];
        coord[0].r = r;
        coord[0].u = u;
        Particle {
            id: 0,
            type_,
            coord,
            n_coord: 1,
            e,
            sqrt_kt: 0.0,
            surface: 0,
            material: None,
            last_material: None,
            last_sqrt_kt: 0.0,
            cell_instance: 0,
            alive: true,
            trace: false,
        }
    }

    /// Global position (level-0 frame).
    pub fn r(&self) -> [f64; 3] {
        self.coord[0].r
    }

    /// Global direction.
    pub fn u(&self) -> [f64; 3] {
        self.coord[0].u
    }

    /// Position in the deepest coordinate frame.
    pub fn r_local(&self) -> [f64; 3] {
        self.coord[self.n_coord - 1].r
    }

    pub fn u_local(&self) -> [f64; 3] {
        self.coord[self.n_coord - 1].u
    }

    /// Advance the particle along its flight path, moving every live
    /// coordinate frame by the same distance in its own basis.
    pub fn advance(&mut self, distance: f64) {
        for level in 0..self.n_coord {
            let c = &mut self.coord[level];
            for k in 0..3 {
                c.r[k] += distance * c.u[k];
            }
        }
    }

    /// Drop back to the top-level frame, clearing everything deeper.
    pub fn clear_lower_coords(&mut self) {
        for level in 1..self.n_coord {
            self.coord[level].reset();
        }
        self.n_coord = 1;
    }

    /// Give up on transporting this particle and record why.
    pub fn mark_as_lost(&mut self, msg: &str) {
        warn!("Particle {} lost: {}", self.id, msg);
        self.alive = false;
    }
}
