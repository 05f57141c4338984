use crate::surface::Surface;

/// A CSG region over surface half-spaces. Surfaces are referenced by signed
/// tokens: `+id` selects the positive half-space of the surface with that
/// 1-based id, `-id` the negative one.
///
/// Most cells are plain intersections of half-spaces; those use the
/// `Simple` variant so containment and surface-crossing polarity reduce to
/// a linear scan over tokens. Anything with unions or complements carries a
/// full expression tree.
#[derive(Clone, Debug)]
pub enum Region {
    Simple(Vec<i32>),
    Tree(RegionExpr),
}

#[derive(Clone, Debug)]
pub enum RegionExpr {
    Halfspace(i32),
    Intersection(Box<RegionExpr>, Box<RegionExpr>),
    Union(Box<RegionExpr>, Box<RegionExpr>),
    Complement(Box<RegionExpr>),
}

impl Region {
    /// Intersection of half-spaces from signed tokens.
    pub fn intersection(tokens: Vec<i32>) -> Self {
        Region::Simple(tokens)
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Region::Simple(_))
    }

    /// All signed surface tokens appearing in the region, in declaration
    /// order. These are the candidate boundary crossings of a cell.
    pub fn surface_tokens(&self) -> Vec<i32> {
        match self {
            Region::Simple(tokens) => tokens.clone(),
            Region::Tree(expr) => {
                let mut tokens = Vec::new();
                expr.collect_tokens(&mut tokens);
                tokens
            }
        }
    }

    /// Whether the point r, traveling along u, is inside the region.
    ///
    /// `on_surface` is the signed token of the surface the particle just
    /// crossed (0 for none): a half-space term equal to it is accepted
    /// outright and one equal to its negation rejected, so that a particle
    /// sitting bit-exactly on a boundary lands on the correct side.
    pub fn contains(&self, r: [f64; 3], u: [f64; 3], on_surface: i32, surfaces: &[Surface]) -> bool {
        match self {
            Region::Simple(tokens) => {
                for &token in tokens {
                    if token == on_surface {
                        continue;
                    }
                    if -token == on_surface {
                        return false;
                    }
                    if !halfspace_sense(token, r, u, surfaces) {
                        return false;
                    }
                }
                true
            }
            Region::Tree(expr) => expr.contains(r, u, on_surface, surfaces),
        }
    }
}

impl RegionExpr {
    fn collect_tokens(&self, out: &mut Vec<i32>) {
        match self {
            RegionExpr::Halfspace(token) => out.push(*token),
            RegionExpr::Intersection(a, b) | RegionExpr::Union(a, b) => {
                a.collect_tokens(out);
                b.collect_tokens(out);
            }
            RegionExpr::Complement(inner) => inner.collect_tokens(out),
        }
    }

    fn contains(&self, r: [f64; 3], u: [f64; 3], on_surface: i32, surfaces: &[Surface]) -> bool {
        match self {
            RegionExpr::Halfspace(token) => {
                if *token == on_surface {
                    true
                } else if -*token == on_surface {
                    false
                } else {
                    halfspace_sense(*token, r, u, surfaces)
                }
            }
            RegionExpr::Intersection(a, b) => {
                a.contains(r, u, on_surface, surfaces) && b.contains(r, u, on_surface, surfaces)
            }
            RegionExpr::Union(a, b) => {
                a.contains(r, u, on_surface, surfaces) || b.contains(r, u, on_surface, surfaces)
            }
            RegionExpr::Complement(inner) => !inner.contains(r, u, on_surface, surfaces),
        }
    }
}

/// True when the point lies in the half-space named by a signed token.
fn halfspace_sense(token: i32, r: [f64; 3], u: [f64; 3], surfaces: &[Surface]) -> bool {
    let surf = &surfaces[token.unsigned_abs() as usize - 1];
    surf.sense(r, u) == (token > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab_surfaces() -> Vec<Surface> {
        vec![
            Surface::x_plane(-1.0, 1, None),
            Surface::x_plane(1.0, 2, None),
            Surface::sphere(0.0, 0.0, 0.0, 2.0, 3, None),
        ]
    }

    #[test]
    fn test_simple_region_contains() {
        let surfaces = slab_surfaces();
        // -1 < x < 1
        let region = Region::intersection(vec![1, -2]);
        assert!(region.contains([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0, &surfaces));
        assert!(!region.contains([2.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0, &surfaces));
        assert!(!region.contains([-2.0, 0.0, 0.0], [1.0, 0.0, 0.0], 0, &surfaces));
    }

    #[test]
    fn test_on_surface_token_decides() {
        let surfaces = slab_surfaces();
        let region = Region::intersection(vec![1, -2]);
        // Exactly on x = 1 having just crossed into the negative half-space
        assert!(region.contains([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], -2, &surfaces));
        // Same point but the particle crossed into the positive half-space
        assert!(!region.contains([1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 2, &surfaces));
    }

    #[test]
    fn test_tree_union_and_complement() {
        let surfaces = vec![
            Surface::sphere(0.0, 0.0, 0.0, 2.0, 1, None),
            Surface::sphere(3.0, 0.0, 0.0, 2.0, 2, None),
        ];
        // Inside either sphere
        let union = Region::Tree(RegionExpr::Union(
            Box::new(RegionExpr::Halfspace(-1)),
            Box::new(RegionExpr::Halfspace(-2)),
        ));
        let u = [1.0, 0.0, 0.0];
        assert!(union.contains([0.0, 0.0, 0.0], u, 0, &surfaces));
        assert!(union.contains([3.0, 0.0, 0.0], u, 0, &surfaces));
        assert!(!union.contains([9.0, 0.0, 0.0], u, 0, &surfaces));

        // Complement flips it
        let outside = Region::Tree(RegionExpr::Complement(Box::new(RegionExpr::Union(
            Box::new(RegionExpr::Halfspace(-1)),
            Box::new(RegionExpr::Halfspace(-2)),
        ))));
        assert!(!outside.contains([0.0, 0.0, 0.0], u, 0, &surfaces));
        assert!(outside.contains([9.0, 0.0, 0.0], u, 0, &surfaces));
    }

    #[test]
    fn test_surface_tokens_order() {
        let region = Region::Tree(RegionExpr::Intersection(
            Box::new(RegionExpr::Halfspace(3)),
            Box::new(RegionExpr::Complement(Box::new(RegionExpr::Halfspace(-1)))),
        ));
        assert_eq!(region.surface_tokens(), vec![3, -1]);
    }
}
