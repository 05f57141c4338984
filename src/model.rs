use std::collections::HashMap;
use std::sync::atomic::AtomicU64;

use crate::cell::{Cell, Fill};
use crate::error::ConfigError;
use crate::lattice::Lattice;
use crate::materials::Materials;
use crate::nuclide::DataLibrary;
use crate::settings::Settings;
use crate::surface::{BoundaryType, Surface, SurfaceKind};
use crate::universe::Universe;

/// The complete, immutable-after-finalization description of a transport
/// problem: flat registries of surfaces, cells, universes, lattices and
/// materials plus the external data library and the run settings. All
/// cross-references between registries are plain indices.
///
/// During transport the model is shared read-only between worker threads;
/// the two exceptions are the per-cell neighbor lists (internally locked)
/// and the overlap counters (atomic).
#[derive(Debug)]
pub struct Model {
    pub settings: Settings,
    pub library: DataLibrary,
    pub surfaces: Vec<Surface>,
    pub cells: Vec<Cell>,
    pub universes: Vec<Universe>,
    pub lattices: Vec<Lattice>,
    pub materials: Materials,
    pub root_universe: Option<usize>,
    pub cell_map: HashMap<i32, usize>,
    pub universe_map: HashMap<i32, usize>,
    pub lattice_map: HashMap<i32, usize>,
    /// Number of distributed-cell maps assigned at finalization.
    pub n_distribcell_maps: usize,
    /// Per-cell hit counters for the overlap check.
    pub overlap_check_count: Vec<AtomicU64>,
}

impl Model {
    pub fn new(settings: Settings) -> Self {
        Model {
            settings,
            library: DataLibrary::new(),
            surfaces: Vec::new(),
            cells: Vec::new(),
            universes: Vec::new(),
            lattices: Vec::new(),
            materials: Materials::new(),
            root_universe: None,
            cell_map: HashMap::new(),
            universe_map: HashMap::new(),
            lattice_map: HashMap::new(),
            n_distribcell_maps: 0,
            overlap_check_count: Vec::new(),
        }
    }

    /// Register a surface; its id is its 1-based registry position, which
    /// is what signed region tokens refer to.
    pub fn add_surface(&mut self, kind: SurfaceKind, boundary_type: Option<BoundaryType>) -> usize {
        let id = self.surfaces.len() + 1;
        self.surfaces.push(Surface::new(id, kind, boundary_type));
        id
    }

    pub fn add_universe(&mut self, id: i32) -> Result<usize, ConfigError> {
        if self.universe_map.contains_key(&id) {
            // A universe may be referenced before it is filled; reuse it.
            return Ok(self.universe_map[&id]);
        }
        let index = self.universes.len();
        self.universe_map.insert(id, index);
        self.universes.push(Universe::new(id));
        Ok(index)
    }

    /// Register a cell and link it into its universe's search list.
    pub fn add_cell(&mut self, cell: Cell) -> Result<usize, ConfigError> {
        if self.cell_map.contains_key(&cell.id) {
            return Err(ConfigError::DuplicateCellId(cell.id));
        }
        let index = self.cells.len();
        self.cell_map.insert(cell.id, index);
        self.universes[cell.universe].cells.push(index);
        self.cells.push(cell);
        Ok(index)
    }

    pub fn add_lattice(&mut self, lattice: Lattice) -> usize {
        let index = self.lattices.len();
        self.lattice_map.insert(lattice.id, index);
        self.lattices.push(lattice);
        index
    }

    pub fn set_root_universe(&mut self, index: usize) {
        self.root_universe = Some(index);
    }

    /// Finalize the model for transport: finalize every material, build the
    /// distributed-cell offset tables and size the overlap counters.
    pub fn finalize(&mut self) -> Result<(), ConfigError> {
        {
            let Model {
                materials,
                library,
                settings,
                ..
            } = self;
            for material in materials.iter_mut() {
                material.finalize(library, settings)?;
            }
        }

        self.prepare_distribcell();

        self.overlap_check_count = (0..self.cells.len()).map(|_| AtomicU64::new(0)).collect();
        Ok(())
    }

    /// Instances of the target cell reachable from a universe.
    fn count_instances(&self, i_univ: usize, target: usize, memo: &mut HashMap<usize, i64>) -> i64 {
        if let Some(&n) = memo.get(&i_univ) {
            return n;
        }
        let mut count = 0;
        for &i_cell in &self.universes[i_univ].cells {
            count += self.count_under_cell(i_cell, target, memo);
        }
        memo.insert(i_univ, count);
        count
    }

    fn count_under_cell(&self, i_cell: usize, target: usize, memo: &mut HashMap<usize, i64>) -> i64 {
        match &self.cells[i_cell].fill {
            Fill::Material { .. } => (i_cell == target) as i64,
            Fill::Universe { universe, .. } => self.count_instances(*universe, target, memo),
            Fill::Lattice { lattice } => {
                let lat = &self.lattices[*lattice];
                let mut count = 0;
                for tile in 0..lat.n_tiles() {
                    if let Some(u) = self.tile_universe(*lattice, tile) {
                        count += self.count_instances(u, target, memo);
                    }
                }
                count
            }
        }
    }

    fn tile_universe(&self, i_lat: usize, tile: usize) -> Option<usize> {
        use crate::lattice::LatticeKind;
        match &self.lattices[i_lat].kind {
            LatticeKind::Rect(r) => r.universes.get(tile).copied().flatten(),
            LatticeKind::Hex(h) => h.universes.get(tile).copied().flatten(),
        }
    }

    /// Assign a distributed-cell map to every material cell replicated more
    /// than once and fill the offset tables read during locator descent.
    ///
    /// The instance number of a path is the sum over its levels of the
    /// instances skipped by each branch taken: for a universe-fill cell the
    /// target instances under its preceding sibling cells, for a lattice
    /// tile the instances under preceding tiles (plus the lattice cell's
    /// own preceding siblings, folded into the tile table).
    fn prepare_distribcell(&mut self) {
        // Identify target cells: per-instance materials or temperatures.
        let mut targets = Vec::new();
        for (i_cell, cell) in self.cells.iter_mut().enumerate() {
            if let Fill::Material { materials, sqrt_kt } = &cell.fill {
                if materials.len() > 1 || sqrt_kt.len() > 1 {
                    cell.distribcell_index = Some(targets.len());
                    targets.push(i_cell);
                }
            }
        }
        self.n_distribcell_maps = targets.len();
        if targets.is_empty() {
            return;
        }

        // Allocate offset storage.
        let n_maps = targets.len();
        for cell in &mut self.cells {
            if matches!(cell.fill, Fill::Universe { .. }) {
                cell.offset = vec![0; n_maps];
            }
        }
        for lattice in &mut self.lattices {
            let n = lattice.n_tiles();
            lattice.offsets = vec![0; n_maps * n];
        }

        for (map, &target) in targets.iter().enumerate() {
            let mut memo: HashMap<usize, i64> = HashMap::new();

            // Cumulative counts over each universe's cell list, recorded
            // for universe-fill cells and carried into lattice tile tables.
            let mut cell_offsets: Vec<(usize, i64)> = Vec::new();
            let mut lattice_offsets: Vec<(usize, Vec<i64>)> = Vec::new();
            for universe in &self.universes {
                let mut cumulative = 0i64;
                for &i_cell in &universe.cells {
                    match &self.cells[i_cell].fill {
                        Fill::Universe { .. } => {
                            cell_offsets.push((i_cell, cumulative));
                        }
                        Fill::Lattice { lattice } => {
                            let lat = &self.lattices[*lattice];
                            let mut tile_offsets = Vec::with_capacity(lat.n_tiles());
                            let mut tile_cumulative = cumulative;
                            for tile in 0..lat.n_tiles() {
                                tile_offsets.push(tile_cumulative);
                                if let Some(u) = self.tile_universe(*lattice, tile) {
                                    tile_cumulative +=
                                        self.count_instances(u, target, &mut memo);
                                }
                            }
                            lattice_offsets.push((*lattice, tile_offsets));
                        }
                        Fill::Material { .. } => {}
                    }
                    cumulative += self.count_under_cell(i_cell, target, &mut memo);
                }
            }

            for (i_cell, offset) in cell_offsets {
                self.cells[i_cell].offset[map] = offset as i32;
            }
            for (i_lat, tile_offsets) in lattice_offsets {
                let n = self.lattices[i_lat].n_tiles();
                for (tile, offset) in tile_offsets.into_iter().enumerate() {
                    self.lattices[i_lat].offsets[map * n + tile] = offset as i32;
                }
            }
        }
    }
}
