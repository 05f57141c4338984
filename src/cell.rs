use std::sync::Mutex;

use crate::constants::FP_PRECISION;
use crate::region::Region;
use crate::surface::Surface;

/// What a cell is filled with.
///
/// Material fills terminate the coordinate hierarchy; the vectors are
/// either length 1 or one entry per distributed-cell instance. A `None`
/// material entry is a void. Universe fills carry the affine transform into
/// the child frame; lattice fills name a lattice in the model registry.
#[derive(Clone, Debug)]
pub enum Fill {
    Material {
        materials: Vec<Option<usize>>,
        sqrt_kt: Vec<f64>,
    },
    Universe {
        universe: usize,
        translation: [f64; 3],
        rotation: Option<[[f64; 3]; 3]>,
    },
    Lattice {
        lattice: usize,
    },
}

/// Cells that particles leaving this cell were found in, appended as they
/// are discovered. Scanning this list first avoids the full universe sweep
/// on most crossings. Growth is append-only under a lock; a duplicate entry
/// costs a redundant containment test and nothing else.
#[derive(Debug, Default)]
pub struct NeighborList {
    items: Mutex<Vec<usize>>,
}

impl NeighborList {
    pub fn new() -> Self {
        NeighborList {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Append a cell index if it is not already present.
    pub fn push(&self, i_cell: usize) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if !items.contains(&i_cell) {
            items.push(i_cell);
        }
    }

    /// Snapshot of the current contents, oldest first.
    pub fn to_vec(&self) -> Vec<usize> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for NeighborList {
    fn clone(&self) -> Self {
        NeighborList {
            items: Mutex::new(self.to_vec()),
        }
    }
}

/// A CSG region within a universe together with its fill.
#[derive(Clone, Debug)]
pub struct Cell {
    pub id: i32,
    pub name: Option<String>,
    /// Index of the universe this cell belongs to.
    pub universe: usize,
    pub region: Region,
    pub fill: Fill,
    /// Which distributed-cell map this cell is the target of, if any.
    pub distribcell_index: Option<usize>,
    /// For universe-filled cells: per-map instance counts accumulated from
    /// preceding sibling cells, filled in during model finalization.
    pub offset: Vec<i32>,
    pub neighbors: NeighborList,
}

impl Cell {
    pub fn new(id: i32, universe: usize, region: Region, fill: Fill) -> Self {
        Cell {
            id,
            name: None,
            universe,
            region,
            fill,
            distribcell_index: None,
            offset: Vec::new(),
            neighbors: NeighborList::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// True iff the region is a plain conjunction of half-spaces, which
    /// permits reading the crossed half-space straight off the region token.
    pub fn is_simple(&self) -> bool {
        self.region.is_simple()
    }

    /// Number of material instances this cell resolves to.
    pub fn n_instances(&self) -> usize {
        match &self.fill {
            Fill::Material { materials, sqrt_kt } => materials.len().max(sqrt_kt.len()).max(1),
            _ => 1,
        }
    }

    /// Whether the point is inside this cell. `on_surface` carries the
    /// signed token of the last crossed surface (0 for none).
    pub fn contains(&self, r: [f64; 3], u: [f64; 3], on_surface: i32, surfaces: &[Surface]) -> bool {
        self.region.contains(r, u, on_surface, surfaces)
    }

    /// Distance to the nearest oncoming boundary surface of this cell and
    /// the signed id of the half-space the particle would enter by crossing
    /// it. Near-ties are kept with the incumbent (relative `FP_PRECISION`);
    /// iteration order breaks exact ties in favor of the earlier token.
    pub fn distance(&self, r: [f64; 3], u: [f64; 3], on_surface: i32, surfaces: &[Surface]) -> (f64, i32) {
        let tree_tokens;
        let tokens: &[i32] = match &self.region {
            Region::Simple(tokens) => tokens,
            Region::Tree(_) => {
                tree_tokens = self.region.surface_tokens();
                &tree_tokens
            }
        };

        let mut min_dist = f64::INFINITY;
        let mut i_surf = 0i32;
        for &token in tokens {
            // Same surface, same sense as the one just crossed: do not
            // re-detect it.
            let coincident = token == on_surface;
            let surf = &surfaces[token.unsigned_abs() as usize - 1];
            let d = surf.distance(r, u, coincident);
            if d < min_dist {
                if min_dist.is_infinite() || (min_dist - d) / min_dist >= FP_PRECISION {
                    min_dist = d;
                    // Crossing moves the particle out of this half-space and
                    // into the opposite one.
                    i_surf = -token;
                }
            }
        }
        (min_dist, i_surf)
    }
}
