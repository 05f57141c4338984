//! Recursive locator over the universe/lattice hierarchy: establishes a
//! particle's per-level coordinates, finds the distance to the next
//! boundary across all levels and handles lattice tile crossings.

use std::sync::atomic::Ordering;

use log::{debug, warn};

use crate::cell::Fill;
use crate::constants::{FP_REL_PRECISION, MAX_COORD, TINY_BIT};
use crate::error::ConfigError;
use crate::math::{dot, rotate};
use crate::model::Model;
use crate::particle::Particle;

/// Result of [`distance_to_boundary`]: the winning crossing over all live
/// coordinate levels.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryDistance {
    pub distance: f64,
    /// Signed token of the surface to be crossed, 0 when the crossing is a
    /// lattice translation instead.
    pub surface_crossed: i32,
    /// Tile index shift when the crossing is a lattice face.
    pub lattice_translation: [i32; 3],
    /// 1-based coordinate level owning the crossing.
    pub next_level: usize,
}

/// Locate the particle in the geometry, writing one coordinate frame per
/// hierarchy level and resolving the terminal material. Returns false when
/// the particle cannot be placed in any cell.
///
/// With `use_neighbor_lists`, the previous cell's neighbor list is scanned
/// before the full universe sweep, and a successful sweep appends the found
/// cell to that list.
pub fn find_cell(model: &Model, p: &mut Particle, use_neighbor_lists: bool) -> bool {
    // Fall back to the root universe when no frame is established yet.
    if p.coord[p.n_coord - 1].universe.is_none() {
        p.coord[0].universe = model.root_universe;
        p.n_coord = 1;
        if model.root_universe.is_none() {
            return false;
        }
    }

    // Reset all the deeper coordinate levels.
    for i in p.n_coord..MAX_COORD {
        p.coord[i].reset();
    }

    if use_neighbor_lists {
        let coord_lvl = p.n_coord - 1;
        if let Some(i_cell) = p.coord[coord_lvl].cell {
            // Search the previous cell's neighbors first.
            let neighbors = model.cells[i_cell].neighbors.to_vec();
            if find_cell_inner(model, p, Some(&neighbors)) {
                return true;
            }

            // Miss: sweep the whole universe and remember a new neighbor.
            let found = find_cell_inner(model, p, None);
            if found {
                if let Some(new_cell) = p.coord[coord_lvl].cell {
                    if new_cell != i_cell {
                        model.cells[i_cell].neighbors.push(new_cell);
                    }
                }
            }
            return found;
        }
    }

    find_cell_inner(model, p, None)
}

/// Bind the deepest coordinate frame to the cell containing it, then
/// recurse through the cell's fill until a material cell terminates the
/// descent. `neighbor_list` restricts the candidate cells when given.
pub fn find_cell_inner(model: &Model, p: &mut Particle, neighbor_list: Option<&[usize]>) -> bool {
    let level = p.n_coord - 1;
    let i_universe = match p.coord[level].universe {
        Some(u) => u,
        None => return false,
    };

    let candidates: &[usize] = match neighbor_list {
        Some(list) => list,
        None => &model.universes[i_universe].cells,
    };

    let mut found = None;
    for &i_cell in candidates {
        // The search cell must live in this universe.
        if model.cells[i_cell].universe != i_universe {
            continue;
        }
        let r = p.coord[level].r;
        let u = p.coord[level].u;
        if model.cells[i_cell].contains(r, u, p.surface, &model.surfaces) {
            p.coord[level].cell = Some(i_cell);
            found = Some(i_cell);
            break;
        }
    }

    let Some(i_cell) = found else {
        return false;
    };

    if model.settings.verbosity >= 10 || model.settings.trace || p.trace {
        debug!("    Entering cell {}", model.cells[i_cell].id);
    }

    let c = &model.cells[i_cell];
    match &c.fill {
        Fill::Material { materials, sqrt_kt } => {
            // A material cell terminates the descent. Work out which
            // replicated instance this path corresponds to.
            if materials.len() > 1 || sqrt_kt.len() > 1 {
                let map = c.distribcell_index.expect("distribcell map not assigned");
                let mut offset = 0i32;
                for i in 0..p.n_coord {
                    let c_i = &model.cells[p.coord[i].cell.unwrap()];
                    match &c_i.fill {
                        Fill::Universe { .. } => offset += c_i.offset[map],
                        Fill::Lattice { lattice } => {
                            let lat = &model.lattices[*lattice];
                            let i_xyz = p.coord[i + 1].lattice_i;
                            if lat.are_valid_indices(i_xyz) {
                                offset += lat.offset(map, i_xyz);
                            }
                        }
                        Fill::Material { .. } => {}
                    }
                }
                p.cell_instance = offset;
            } else {
                p.cell_instance = 0;
            }

            p.last_material = p.material;
            p.material = if materials.len() > 1 {
                materials[p.cell_instance as usize]
            } else {
                materials[0]
            };
            p.last_sqrt_kt = p.sqrt_kt;
            p.sqrt_kt = if sqrt_kt.len() > 1 {
                sqrt_kt[p.cell_instance as usize]
            } else {
                sqrt_kt.first().copied().unwrap_or(0.0)
            };
            true
        }

        Fill::Universe {
            universe,
            translation,
            rotation,
        } => {
            // Shift into the child frame, then keep searching a level down.
            let next = p.n_coord;
            let r = p.coord[level].r;
            let u = p.coord[level].u;
            let mut r_new = [
                r[0] - translation[0],
                r[1] - translation[1],
                r[2] - translation[2],
            ];
            let mut u_new = u;
            if let Some(m) = rotation {
                r_new = rotate(m, r_new);
                u_new = rotate(m, u_new);
                p.coord[next].rotated = true;
            }
            p.coord[next].r = r_new;
            p.coord[next].u = u_new;
            p.coord[next].universe = Some(*universe);
            p.n_coord += 1;
            find_cell_inner(model, p, None)
        }

        Fill::Lattice { lattice } => {
            let lat = &model.lattices[*lattice];
            let next = p.n_coord;
            let r = p.coord[level].r;
            let u = p.coord[level].u;

            // Nudge off a tile face before asking which tile we are in.
            let r_nudged = [
                r[0] + TINY_BIT * u[0],
                r[1] + TINY_BIT * u[1],
                r[2] + TINY_BIT * u[2],
            ];
            let i_xyz = lat.get_indices(r_nudged);

            p.coord[next].r = lat.get_local_position(r, i_xyz);
            p.coord[next].u = u;
            p.coord[next].lattice = Some(*lattice);
            p.coord[next].lattice_i = i_xyz;

            let tile_universe = if lat.are_valid_indices(i_xyz) {
                lat.universe_at(i_xyz)
            } else {
                None
            };
            match tile_universe.or(lat.outer) {
                Some(u_next) => p.coord[next].universe = Some(u_next),
                None => {
                    warn!(
                        "Particle {} is outside lattice {} but the lattice has no defined \
                         outer universe.",
                        p.id, lat.id
                    );
                    return false;
                }
            }

            p.n_coord += 1;
            find_cell_inner(model, p, None)
        }
    }
}

/// Move the particle into an adjacent lattice tile and re-locate it. Two
/// consecutive failures to place the particle mark it lost.
pub fn cross_lattice(model: &Model, p: &mut Particle, lattice_translation: [i32; 3]) {
    let level = p.n_coord - 1;
    let i_lat = p.coord[level].lattice.expect("not inside a lattice");
    let lat = &model.lattices[i_lat];

    if model.settings.verbosity >= 10 || model.settings.trace || p.trace {
        debug!(
            "    Crossing lattice {}. Current position ({},{},{})",
            lat.id, p.coord[level].lattice_i[0], p.coord[level].lattice_i[1],
            p.coord[level].lattice_i[2]
        );
    }

    for k in 0..3 {
        p.coord[level].lattice_i[k] += lattice_translation[k];
    }
    let i_xyz = p.coord[level].lattice_i;

    // Re-derive the tile-local position from the level above.
    p.coord[level].r = lat.get_local_position(p.coord[level - 1].r, i_xyz);

    if !lat.are_valid_indices(i_xyz) {
        // The particle left the lattice; search from the base coordinates.
        p.clear_lower_coords();
        let found = find_cell(model, p, false);
        if !found && p.alive {
            p.mark_as_lost("could not be located after crossing a lattice boundary");
        }
    } else {
        p.coord[level].universe = lat.universe_at(i_xyz);
        let found = find_cell(model, p, false);

        if !found {
            // A corner crossing may land in no sibling tile; retry from the
            // base coordinates before giving up.
            p.clear_lower_coords();
            let found = find_cell(model, p, false);
            if !found && p.alive {
                p.mark_as_lost("could not be located after crossing a lattice boundary");
            }
        }
    }
}

/// Distance to the closest boundary over every live coordinate level,
/// reconciling numerically coincident boundaries across levels: a deeper
/// candidate replaces the incumbent only if it is meaningfully smaller, so
/// the outermost of coincident boundaries wins and lattice transport stays
/// monotone.
pub fn distance_to_boundary(model: &Model, p: &mut Particle) -> BoundaryDistance {
    let mut result = BoundaryDistance {
        distance: f64::INFINITY,
        surface_crossed: 0,
        lattice_translation: [0; 3],
        next_level: 0,
    };

    for i in 0..p.n_coord {
        let r = p.coord[i].r;
        let u = p.coord[i].u;
        let c = &model.cells[p.coord[i].cell.expect("coordinate level has no cell")];

        // Oncoming surface of the cell on this level.
        let (d_surf, level_surf_cross) = c.distance(r, u, p.surface, &model.surfaces);

        // Oncoming tile face when this level sits inside a lattice.
        let mut d_lat = f64::INFINITY;
        let mut level_lat_trans = [0i32; 3];
        if let Some(i_lat) = p.coord[i].lattice {
            let lat = &model.lattices[i_lat];
            let i_xyz = p.coord[i].lattice_i;
            let (d, trans) = if lat.is_rect() {
                lat.distance(r, u, i_xyz)
            } else {
                // Hex projections are computed against the parent frame.
                let r_hex = [p.coord[i - 1].r[0], p.coord[i - 1].r[1], p.coord[i].r[2]];
                lat.distance(r_hex, u, i_xyz)
            };
            d_lat = d;
            level_lat_trans = trans;

            if d_lat < 0.0 {
                p.mark_as_lost("negative distance to a lattice boundary");
            }
        }

        if d_surf < d_lat {
            if result.distance.is_infinite()
                || (result.distance - d_surf) / result.distance >= FP_REL_PRECISION
            {
                result.distance = d_surf;

                // In a non-simple region both half-spaces of a surface may
                // appear, so the sign of the crossing has to come from the
                // direction against the surface normal at the hit point.
                if c.is_simple() {
                    result.surface_crossed = level_surf_cross;
                } else {
                    let r_hit = [r[0] + d_surf * u[0], r[1] + d_surf * u[1], r[2] + d_surf * u[2]];
                    let surf = &model.surfaces[level_surf_cross.unsigned_abs() as usize - 1];
                    let n = surf.normal(r_hit);
                    result.surface_crossed = if dot(u, n) > 0.0 {
                        level_surf_cross.abs()
                    } else {
                        -level_surf_cross.abs()
                    };
                }

                result.lattice_translation = [0; 3];
                result.next_level = i + 1;
            }
        } else if result.distance.is_infinite()
            || (result.distance - d_lat) / result.distance >= FP_REL_PRECISION
        {
            result.distance = d_lat;
            result.surface_crossed = 0;
            result.lattice_translation = level_lat_trans;
            result.next_level = i + 1;
        }
    }

    result
}

/// Verify that no other cell of any level's universe also contains the
/// particle, bumping the per-cell check counters. An overlap is a geometry
/// definition error.
pub fn check_cell_overlap(model: &Model, p: &Particle) -> Result<(), ConfigError> {
    for j in 0..p.n_coord {
        let i_universe = p.coord[j].universe.expect("coordinate level has no universe");
        let univ = &model.universes[i_universe];

        for &index_cell in &univ.cells {
            let c = &model.cells[index_cell];
            if c.contains(p.coord[j].r, p.coord[j].u, p.surface, &model.surfaces) {
                if Some(index_cell) != p.coord[j].cell {
                    let current = p.coord[j].cell.unwrap();
                    return Err(ConfigError::OverlappingCells(
                        c.id,
                        model.cells[current].id,
                        univ.id,
                    ));
                }
                model.overlap_check_count[index_cell].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    Ok(())
}
