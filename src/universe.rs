/// An ordered collection of cells defining one level of the geometry
/// hierarchy. The declaration order is the search order for brute-force
/// containment, so a well-formed geometry has at most one cell containing
/// any given point.
#[derive(Clone, Debug)]
pub struct Universe {
    pub id: i32,
    /// Indices into the model cell registry.
    pub cells: Vec<usize>,
}

impl Universe {
    pub fn new(id: i32) -> Self {
        Universe { id, cells: Vec::new() }
    }
}
