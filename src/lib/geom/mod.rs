pub mod v3;

pub use v3::{V3, V3Ops};

use std::mem;

use crate::bounds::Bounds3;

// Device-side float3 occupies 16 bytes, so every vector is followed by
// an explicit pad word. The padding is never serialized.
#[repr(C)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    #[serde(skip)]
    _p0: u32,
    pub uv: [f32; 2],
    #[serde(skip)]
    _p1: [u32; 2],
    pub normal: [f32; 3],
    #[serde(skip)]
    _p2: u32,
}

impl Vertex {
    pub const fn new(pos: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            pos,
            _p0: 0,
            uv,
            _p1: [0; 2],
            normal,
            _p2: 0,
        }
    }
}

// The material index is signed so that -1 can stand for 'no material'
#[repr(C)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub material: i32,
    #[serde(skip)]
    _p0: [u32; 3],
}

impl Triangle {
    pub const NO_MATERIAL: i32 = -1;

    pub const fn new(vertices: [Vertex; 3], material: i32) -> Self {
        Self { vertices, material, _p0: [0; 3] }
    }

    // Convenience for synthetic geometry where only positions matter
    pub fn from_positions(positions: [[f32; 3]; 3], material: i32) -> Self {
        use v3::V3Ops as _;

        let [a, b, c] = positions;

        let normal = b.sub(a).cross(c.sub(a));
        let normal = if normal.mag() > 0. { normal.normalize() } else { normal };

        Self::new([
            Vertex::new(a, [0.; 2], normal),
            Vertex::new(b, [0.; 2], normal),
            Vertex::new(c, [0.; 2], normal),
        ], material)
    }

    pub fn positions(&self) -> [[f32; 3]; 3] {
        let [a, b, c] = self.vertices;

        [a.pos, b.pos, c.pos]
    }

    pub fn bounds(&self) -> Bounds3 {
        self.positions()
            .into_iter()
            .fold(Bounds3::empty(), |bounds, pos| bounds.union_point(pos))
    }
}

#[repr(C)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq)]
#[serde(default)]
pub struct Material {
    pub diffuse: [f32; 3],
    #[serde(skip)]
    _p0: u32,
    pub specular: [f32; 3],
    #[serde(skip)]
    _p1: u32,
    pub emission: [f32; 3],
    #[serde(skip)]
    _p2: u32,
    #[serde(rename = "type")]
    pub ty: i32,
    pub roughness: f32,
    pub ior: f32,
    #[serde(skip)]
    _p3: u32,
}

impl Material {
    pub const fn new(
        ty: i32,
        diffuse: [f32; 3],
        specular: [f32; 3],
        emission: [f32; 3],
        roughness: f32,
        ior: f32,
    ) -> Self {
        Self {
            diffuse,
            _p0: 0,
            specular,
            _p1: 0,
            emission,
            _p2: 0,
            ty,
            roughness,
            ior,
            _p3: 0,
        }
    }
}

// The tracing kernel reads these records by raw offset
const _: () = assert!(mem::size_of::<Vertex>() == 48);
const _: () = assert!(mem::size_of::<Triangle>() == 160);
const _: () = assert!(mem::size_of::<Material>() == 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_bounds_are_tight() {
        let tri = Triangle::from_positions([
            [0., 1., 2.],
            [-1., 4., 0.5],
            [3., -2., 1.],
        ], Triangle::NO_MATERIAL);

        let bounds = tri.bounds();

        assert_eq!(bounds.min, [-1., -2., 0.5]);
        assert_eq!(bounds.max, [3., 4., 2.]);
    }

    #[test]
    fn padding_is_not_serialized() {
        let tri = Triangle::from_positions([[0.; 3], [1., 0., 0.], [0., 1., 0.]], 2);

        let json = serde_json::to_string(&tri).unwrap();
        assert!(!json.contains("_p"));

        let back: Triangle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tri);
    }

    #[test]
    fn material_type_uses_device_name() {
        let material: Material = serde_json::from_str(r#"{
            "type": 3,
            "diffuse": [0.5, 0.5, 0.5],
            "ior": 1.5
        }"#).unwrap();

        assert_eq!(material.ty, 3);
        assert_eq!(material.ior, 1.5);
        assert_eq!(material.emission, [0.; 3]);
    }
}
