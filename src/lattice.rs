use crate::constants::FP_PRECISION;

const SQRT3_2: f64 = 0.866025403784438647;

/// A regular tiling of child universes filling a cell.
///
/// The wrapper owns what both tilings share: identity, the optional outer
/// universe used for positions that fall off the tiled range, and the
/// distributed-cell offset table filled during model finalization.
#[derive(Clone, Debug)]
pub struct Lattice {
    pub id: i32,
    pub kind: LatticeKind,
    /// Universe seen outside the tiled range, if any.
    pub outer: Option<usize>,
    /// Per-map cumulative instance counts, `n_maps * n_tiles`, in tile
    /// storage order.
    pub offsets: Vec<i32>,
}

#[derive(Clone, Debug)]
pub enum LatticeKind {
    Rect(RectLattice),
    Hex(HexLattice),
}

/// Rectangular tiling indexed (ix, iy, iz) from the lower-left corner.
#[derive(Clone, Debug)]
pub struct RectLattice {
    pub shape: [usize; 3],
    pub pitch: [f64; 3],
    pub lower_left: [f64; 3],
    pub is_3d: bool,
    /// Child universe per tile, storage order x fastest then y then z.
    pub universes: Vec<Option<usize>>,
}

/// Hexagonal (y-oriented) tiling addressed in the skewed (x, alpha) basis,
/// stored on a (2r-1) x (2r-1) grid per axial level with the unreachable
/// corners left empty.
#[derive(Clone, Debug)]
pub struct HexLattice {
    pub n_rings: usize,
    pub n_axial: usize,
    pub center: [f64; 3],
    /// [in-plane pitch, axial pitch]
    pub pitch: [f64; 2],
    pub is_3d: bool,
    /// Child universe per tile, storage order ix fastest, then alpha, then z.
    pub universes: Vec<Option<usize>>,
}

impl Lattice {
    pub fn rect(id: i32, rect: RectLattice) -> Self {
        Lattice {
            id,
            kind: LatticeKind::Rect(rect),
            outer: None,
            offsets: Vec::new(),
        }
    }

    pub fn hex(id: i32, hex: HexLattice) -> Self {
        Lattice {
            id,
            kind: LatticeKind::Hex(hex),
            outer: None,
            offsets: Vec::new(),
        }
    }

    pub fn with_outer(mut self, outer: usize) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn is_rect(&self) -> bool {
        matches!(self.kind, LatticeKind::Rect(_))
    }

    pub fn n_tiles(&self) -> usize {
        match &self.kind {
            LatticeKind::Rect(r) => r.shape[0] * r.shape[1] * r.shape[2],
            LatticeKind::Hex(h) => {
                let side = 2 * h.n_rings - 1;
                side * side * h.n_axial
            }
        }
    }

    /// Flat storage index of a tile. Caller must pass valid indices.
    pub fn tile_index(&self, i_xyz: [i32; 3]) -> usize {
        match &self.kind {
            LatticeKind::Rect(r) => {
                let [nx, ny, _] = r.shape;
                nx * ny * i_xyz[2] as usize + nx * i_xyz[1] as usize + i_xyz[0] as usize
            }
            LatticeKind::Hex(h) => {
                let side = 2 * h.n_rings - 1;
                side * side * i_xyz[2] as usize + side * i_xyz[1] as usize + i_xyz[0] as usize
            }
        }
    }

    pub fn are_valid_indices(&self, i_xyz: [i32; 3]) -> bool {
        match &self.kind {
            LatticeKind::Rect(r) => {
                (0..3).all(|k| i_xyz[k] >= 0 && (i_xyz[k] as usize) < r.shape[k])
            }
            LatticeKind::Hex(h) => {
                let side = 2 * h.n_rings as i32 - 1;
                i_xyz[0] >= 0
                    && i_xyz[1] >= 0
                    && i_xyz[2] >= 0
                    && i_xyz[0] < side
                    && i_xyz[1] < side
                    && i_xyz[0] + i_xyz[1] > h.n_rings as i32 - 2
                    && i_xyz[0] + i_xyz[1] < 3 * h.n_rings as i32 - 2
                    && (i_xyz[2] as usize) < h.n_axial
            }
        }
    }

    /// Universe filling the tile at valid indices, or None for a hex corner
    /// slot that holds no tile.
    pub fn universe_at(&self, i_xyz: [i32; 3]) -> Option<usize> {
        let idx = self.tile_index(i_xyz);
        match &self.kind {
            LatticeKind::Rect(r) => r.universes.get(idx).copied().flatten(),
            LatticeKind::Hex(h) => h.universes.get(idx).copied().flatten(),
        }
    }

    /// Tile indices containing the given position (in the lattice frame).
    /// The result may be outside the tiled range; callers check with
    /// [`Lattice::are_valid_indices`].
    pub fn get_indices(&self, r: [f64; 3]) -> [i32; 3] {
        match &self.kind {
            LatticeKind::Rect(rect) => {
                let mut out = [0i32; 3];
                for k in 0..3 {
                    out[k] = ((r[k] - rect.lower_left[k]) / rect.pitch[k]).floor() as i32;
                }
                if !rect.is_3d {
                    out[2] = 0;
                }
                out
            }
            LatticeKind::Hex(hex) => {
                let x = r[0] - hex.center[0];
                let y = r[1] - hex.center[1];
                let iz = if hex.is_3d {
                    ((r[2] - hex.center[2]) / hex.pitch[1] + 0.5 * hex.n_axial as f64).floor()
                        as i32
                } else {
                    0
                };

                // First guess in the skewed (x, alpha) basis, off by at most
                // one in each coordinate.
                let alpha = y + x / (3.0f64).sqrt();
                let shift = hex.n_rings as i32 - 1;
                let ix0 = (x / (SQRT3_2 * hex.pitch[0])).floor() as i32 + shift;
                let ia0 = (alpha / hex.pitch[0]).floor() as i32 + shift;

                // Hexagonal tiles form a Voronoi tessellation, so pick the
                // candidate whose center is nearest in the plane.
                let mut best = [ix0, ia0, iz];
                let mut d_min = f64::INFINITY;
                for di in 0..2 {
                    for dj in 0..2 {
                        let cand = [ix0 + dj, ia0 + di, iz];
                        let rt = self.get_local_position(r, cand);
                        let d = rt[0] * rt[0] + rt[1] * rt[1];
                        if d < d_min {
                            d_min = d;
                            best = cand;
                        }
                    }
                }
                best
            }
        }
    }

    /// Position relative to the center of the tile at the given indices.
    pub fn get_local_position(&self, r: [f64; 3], i_xyz: [i32; 3]) -> [f64; 3] {
        match &self.kind {
            LatticeKind::Rect(rect) => {
                let mut out = [0.0; 3];
                for k in 0..3 {
                    out[k] = r[k]
                        - (rect.lower_left[k] + (i_xyz[k] as f64 + 0.5) * rect.pitch[k]);
                }
                if !rect.is_3d {
                    out[2] = r[2];
                }
                out
            }
            LatticeKind::Hex(hex) => {
                let shift = hex.n_rings as f64 - 1.0;
                let ix = i_xyz[0] as f64 - shift;
                let ia = i_xyz[1] as f64 - shift;
                let p = hex.pitch[0];
                let x = r[0] - hex.center[0] - SQRT3_2 * p * ix;
                let y = r[1] - hex.center[1] + 0.5 * p * ix - p * ia;
                let z = if hex.is_3d {
                    r[2] - hex.center[2]
                        - (i_xyz[2] as f64 - 0.5 * hex.n_axial as f64 + 0.5) * hex.pitch[1]
                } else {
                    r[2]
                };
                [x, y, z]
            }
        }
    }

    /// Distance to the nearest tile-face crossing and the index translation
    /// it implies. For rectangular lattices `r` is the tile-local position;
    /// for hexagonal lattices `r` is the parent-level position (the skewed
    /// projection lives one level up) and is localized here.
    pub fn distance(&self, r: [f64; 3], u: [f64; 3], i_xyz: [i32; 3]) -> (f64, [i32; 3]) {
        let mut d = f64::INFINITY;
        let mut trans = [0i32; 3];
        match &self.kind {
            LatticeKind::Rect(rect) => {
                let n_axes = if rect.is_3d { 3 } else { 2 };
                for k in 0..n_axes {
                    let p0 = (0.5 * rect.pitch[k]).copysign(u[k]);
                    if (r[k] - p0).abs() > FP_PRECISION && u[k] != 0.0 {
                        let this_d = (p0 - r[k]) / u[k];
                        if this_d < d {
                            d = this_d;
                            trans = [0, 0, 0];
                            trans[k] = if u[k] > 0.0 { 1 } else { -1 };
                        }
                    }
                }
            }
            LatticeKind::Hex(hex) => {
                let rt = self.get_local_position(r, i_xyz);
                let p = hex.pitch[0];

                // Projections onto the three in-plane face normals.
                let beta = rt[0] * SQRT3_2 + rt[1] * 0.5;
                let gamma = rt[0] * SQRT3_2 - rt[1] * 0.5;
                let beta_dir = u[0] * SQRT3_2 + u[1] * 0.5;
                let gamma_dir = u[0] * SQRT3_2 - u[1] * 0.5;

                // Upper-right / lower-left faces
                let edge = (0.5 * p).copysign(beta_dir);
                if (beta - edge).abs() > FP_PRECISION && beta_dir != 0.0 {
                    let this_d = (edge - beta) / beta_dir;
                    if this_d < d {
                        d = this_d;
                        trans = if beta_dir > 0.0 { [1, 1, 0] } else { [-1, -1, 0] };
                    }
                }

                // Lower-right / upper-left faces
                let edge = (0.5 * p).copysign(gamma_dir);
                if (gamma - edge).abs() > FP_PRECISION && gamma_dir != 0.0 {
                    let this_d = (edge - gamma) / gamma_dir;
                    if this_d < d {
                        d = this_d;
                        trans = if gamma_dir > 0.0 { [1, 0, 0] } else { [-1, 0, 0] };
                    }
                }

                // Upper / lower faces
                let edge = (0.5 * p).copysign(u[1]);
                if (rt[1] - edge).abs() > FP_PRECISION && u[1] != 0.0 {
                    let this_d = (edge - rt[1]) / u[1];
                    if this_d < d {
                        d = this_d;
                        trans = if u[1] > 0.0 { [0, 1, 0] } else { [0, -1, 0] };
                    }
                }

                // Axial faces
                if hex.is_3d {
                    let edge = (0.5 * hex.pitch[1]).copysign(u[2]);
                    if (rt[2] - edge).abs() > FP_PRECISION && u[2] != 0.0 {
                        let this_d = (edge - rt[2]) / u[2];
                        if this_d < d {
                            d = this_d;
                            trans = if u[2] > 0.0 { [0, 0, 1] } else { [0, 0, -1] };
                        }
                    }
                }
            }
        }
        (d, trans)
    }

    /// Cumulative instance count for a distributed-cell map at a tile.
    pub fn offset(&self, map: usize, i_xyz: [i32; 3]) -> i32 {
        self.offsets[map * self.n_tiles() + self.tile_index(i_xyz)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect_2x2() -> Lattice {
        Lattice::rect(
            1,
            RectLattice {
                shape: [2, 2, 1],
                pitch: [1.0, 1.0, 1.0],
                lower_left: [0.0, 0.0, 0.0],
                is_3d: false,
                universes: vec![Some(1), Some(2), Some(3), Some(4)],
            },
        )
    }

    fn hex_2rings() -> Lattice {
        // Two rings: 7 tiles on a 3x3 (x, alpha) grid; corners empty.
        let mut universes = vec![None; 9];
        for ia in 0..3i32 {
            for ix in 0..3i32 {
                if ix + ia > 0 && ix + ia < 4 {
                    universes[(3 * ia + ix) as usize] = Some(1usize);
                }
            }
        }
        Lattice::hex(
            2,
            HexLattice {
                n_rings: 2,
                n_axial: 1,
                center: [0.0, 0.0, 0.0],
                pitch: [1.0, 1.0],
                is_3d: false,
                universes,
            },
        )
    }

    #[test]
    fn test_rect_indices_and_local_position() {
        let lat = rect_2x2();
        assert_eq!(lat.get_indices([0.5, 0.5, 0.0]), [0, 0, 0]);
        assert_eq!(lat.get_indices([1.5, 0.5, 0.0]), [1, 0, 0]);
        assert_eq!(lat.get_indices([0.5, 1.5, 0.0]), [0, 1, 0]);
        assert_eq!(lat.get_indices([2.5, 0.5, 0.0]), [2, 0, 0]);
        assert!(!lat.are_valid_indices([2, 0, 0]));

        let local = lat.get_local_position([0.75, 0.5, 0.3], [0, 0, 0]);
        assert_relative_eq!(local[0], 0.25);
        assert_relative_eq!(local[1], 0.0);
        // 2D lattice leaves z untouched
        assert_relative_eq!(local[2], 0.3);
    }

    #[test]
    fn test_rect_distance_and_translation() {
        let lat = rect_2x2();
        // Local position 0.25 right of tile center, moving +x
        let (d, t) = lat.distance([0.25, 0.0, 0.0], [1.0, 0.0, 0.0], [0, 0, 0]);
        assert_relative_eq!(d, 0.25);
        assert_eq!(t, [1, 0, 0]);

        let (d2, t2) = lat.distance([0.25, 0.0, 0.0], [-1.0, 0.0, 0.0], [0, 0, 0]);
        assert_relative_eq!(d2, 0.75);
        assert_eq!(t2, [-1, 0, 0]);

        // Diagonal: y face is closer
        let nrm = 1.0 / 5.0_f64.sqrt();
        let (d3, t3) = lat.distance([0.0, 0.3, 0.0], [nrm, 2.0 * nrm, 0.0], [0, 0, 0]);
        assert_relative_eq!(d3, 0.2 / (2.0 * nrm), epsilon = 1e-12);
        assert_eq!(t3, [0, 1, 0]);
    }

    #[test]
    fn test_rect_distance_never_negative() {
        let lat = rect_2x2();
        // Sitting exactly on the oncoming face: that face is skipped rather
        // than reported at distance zero (or negative).
        let (d, _) = lat.distance([0.5, 0.0, 0.0], [1.0, 0.0, 0.0], [0, 0, 0]);
        assert!(d.is_infinite());
        // Slightly inside, the face fires normally.
        let (d2, t2) = lat.distance([0.499, 0.0, 0.0], [1.0, 0.0, 0.0], [0, 0, 0]);
        assert!(d2 >= 0.0);
        assert_relative_eq!(d2, 0.001, epsilon = 1e-12);
        assert_eq!(t2, [1, 0, 0]);
    }

    #[test]
    fn test_hex_valid_indices() {
        let lat = hex_2rings();
        // Center tile
        assert!(lat.are_valid_indices([1, 1, 0]));
        // The two empty corners of the storage grid
        assert!(!lat.are_valid_indices([0, 0, 0]));
        assert!(!lat.are_valid_indices([2, 2, 0]));
        // All six ring-1 neighbors
        for idx in [[2, 1, 0], [0, 1, 0], [1, 2, 0], [1, 0, 0], [2, 0, 0], [0, 2, 0]] {
            assert!(lat.are_valid_indices(idx), "expected {:?} valid", idx);
        }
    }

    #[test]
    fn test_hex_indices_round_trip_centers() {
        let lat = hex_2rings();
        // The center of every valid tile must map back to its own indices.
        for ia in 0..3i32 {
            for ix in 0..3i32 {
                let idx = [ix, ia, 0];
                if !lat.are_valid_indices(idx) {
                    continue;
                }
                // Reconstruct the tile center from the local-position formula.
                let local = lat.get_local_position([0.0, 0.0, 0.0], idx);
                let center = [-local[0], -local[1], 0.0];
                assert_eq!(lat.get_indices(center), idx, "tile {:?}", idx);
                let back = lat.get_local_position(center, idx);
                assert_relative_eq!(back[0], 0.0, epsilon = 1e-12);
                assert_relative_eq!(back[1], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_hex_distance_faces() {
        let lat = hex_2rings();
        // From the center of the middle tile moving +y: the flat upper face
        // is pitch/2 away and the crossing increments alpha.
        let (d, t) = lat.distance([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1, 1, 0]);
        assert_relative_eq!(d, 0.5, epsilon = 1e-12);
        assert_eq!(t, [0, 1, 0]);

        // Moving along +x crosses the gamma/beta corner region; the face
        // distance for a flat-to-flat pitch of 1 is 1/sqrt(3).
        let (d2, t2) = lat.distance([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1, 1, 0]);
        assert_relative_eq!(d2, 0.5 / SQRT3_2, epsilon = 1e-12);
        // Both oncoming faces are equidistant; the beta face is checked
        // first and wins the tie.
        assert_eq!(t2, [1, 1, 0]);

        // Moving up-right along the beta normal
        let (d3, t3) = lat.distance([0.0, 0.0, 0.0], [SQRT3_2, 0.5, 0.0], [1, 1, 0]);
        assert_relative_eq!(d3, 0.5, epsilon = 1e-12);
        assert_eq!(t3, [1, 1, 0]);
    }

    #[test]
    fn test_hex_neighbor_centers_agree_with_translations() {
        let lat = hex_2rings();
        // Walk from the central tile along +y; the neighbor's local frame
        // must see the shifted point at its own center.
        let r = [0.0, 1.0, 0.0];
        assert_eq!(lat.get_indices(r), [1, 2, 0]);
        let local = lat.get_local_position(r, [1, 2, 0]);
        assert_relative_eq!(local[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(local[1], 0.0, epsilon = 1e-12);
    }
}
