use crate::{bounds::Bounds3, geom};

// Build-time summary of one triangle. Partitioning only ever moves these
// around, the triangles themselves are copied once when a leaf is emitted.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct PrimitiveDigest {
    pub index: usize,
    pub bounds: Bounds3,
    pub centroid: [f32; 3],
}

impl PrimitiveDigest {
    pub fn new(index: usize, bounds: Bounds3) -> Self {
        Self { index, bounds, centroid: bounds.centroid() }
    }

    pub fn from_triangles(triangles: &[geom::Triangle]) -> Vec<Self> {
        triangles
            .iter()
            .enumerate()
            .map(|(index, tri)| Self::new(index, tri.bounds()))
            .collect()
    }
}
