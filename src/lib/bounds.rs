use std::mem;

use crate::geom::{self, V3Ops as _};

/// Axis-aligned bounding box in the layout the tracing kernel expects
/// (two float3 values, each padded to 16 bytes).
///
/// The default box is empty: `min` sits at `f32::MAX` and `max` at
/// `-f32::MAX`, which makes it the identity element for [`Bounds3::union`].
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Debug, PartialEq)]
pub struct Bounds3 {
    pub min: [f32; 3],
    #[serde(skip)]
    _p0: u32,
    pub max: [f32; 3],
    #[serde(skip)]
    _p1: u32,
}

const _: () = assert!(mem::size_of::<Bounds3>() == 32);

impl Default for Bounds3 {
    fn default() -> Self { Self::empty() }
}

impl Bounds3 {
    pub const fn empty() -> Self {
        Self {
            min: [f32::MAX; 3],
            _p0: 0,
            max: [-f32::MAX; 3],
            _p1: 0,
        }
    }

    // Corners are sorted, so callers may pass them in any order
    pub fn new(a: [f32; 3], b: [f32; 3]) -> Self {
        Self {
            min: a.min(b),
            _p0: 0,
            max: a.max(b),
            _p1: 0,
        }
    }

    pub fn point(p: [f32; 3]) -> Self { Self::new(p, p) }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] ||
        self.min[1] > self.max[1] ||
        self.min[2] > self.max[2]
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            _p0: 0,
            max: self.max.max(other.max),
            _p1: 0,
        }
    }

    pub fn union_point(&self, p: [f32; 3]) -> Self {
        Self {
            min: self.min.min(p),
            _p0: 0,
            max: self.max.max(p),
            _p1: 0,
        }
    }

    pub fn diagonal(&self) -> [f32; 3] {
        self.max.sub(self.min)
    }

    pub fn centroid(&self) -> [f32; 3] {
        self.min.scale(0.5).add(self.max.scale(0.5))
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() { return 0.; }

        let [x, y, z] = self.diagonal();

        2. * (x * y + x * z + y * z)
    }

    /// Index of the longest axis. Ties resolve toward x, then y.
    pub fn maximum_extent(&self) -> usize {
        let [x, y, z] = self.diagonal();

        if x > y && x > z {
            0
        } else if y > z {
            1
        } else {
            2
        }
    }

    /// Position of `p` relative to the box corners: 0 at `min`, 1 at `max`.
    /// Flat axes leave the raw offset from `min` in place.
    pub fn offset(&self, p: [f32; 3]) -> [f32; 3] {
        let mut o = p.sub(self.min);

        for axis in 0..3 {
            if self.max[axis] > self.min[axis] {
                o[axis] /= self.max[axis] - self.min[axis];
            }
        }

        o
    }

    pub fn contains(&self, other: &Self) -> bool {
        (0..3).all(|axis| {
            self.min[axis] <= other.min[axis] &&
            self.max[axis] >= other.max[axis]
        })
    }

    /// Separating-axis test between the (closed) box and a triangle.
    /// Touching counts as intersecting, so a triangle lying on a face
    /// shared by two cells is reported for both.
    ///
    /// The test is conservative: rounding may only ever report an overlap,
    /// never hide one. It is also monotone under nesting, so a triangle
    /// accepted by a box is accepted by every box containing it.
    pub fn intersects_triangle(&self, tri: &geom::Triangle) -> bool {
        if self.is_empty() { return false; }

        let v = tri.positions();

        // Box face normals, compared exactly against the corners
        for axis in 0..3 {
            let lo = v[0][axis].min(v[1][axis]).min(v[2][axis]);
            let hi = v[0][axis].max(v[1][axis]).max(v[2][axis]);

            if lo > self.max[axis] || hi < self.min[axis] { return false; }
        }

        // Largest magnitude per component. Bounds the rounding error of
        // every projection below and never grows for a nested box
        let magnitude = self.min.abs()
            .max(self.max.abs())
            .max(v[0].abs())
            .max(v[1].abs())
            .max(v[2].abs());

        // Projects both shapes onto `axis` in absolute coordinates
        let separated = |axis: [f32; 3]| -> bool {
            let p = [v[0].dot(axis), v[1].dot(axis), v[2].dot(axis)];

            let lo = p[0].min(p[1]).min(p[2]);
            let hi = p[0].max(p[1]).max(p[2]);

            let (mut box_lo, mut box_hi) = (0f32, 0f32);
            for i in 0..3 {
                let (a, b) = (axis[i] * self.min[i], axis[i] * self.max[i]);

                box_lo += a.min(b);
                box_hi += a.max(b);
            }

            let slack = 8. * f32::EPSILON * magnitude.dot(axis.abs());

            hi < box_lo - slack || lo > box_hi + slack
        };

        // Triangle normal
        let edges = [v[1].sub(v[0]), v[2].sub(v[1]), v[0].sub(v[2])];

        if separated(edges[0].cross(edges[1])) { return false; }

        // Cross products of box axes and triangle edges
        const UNIT: [[f32; 3]; 3] = [[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]];

        for edge in edges {
            for unit in UNIT {
                if separated(unit.cross(edge)) { return false; }
            }
        }

        true
    }

    pub fn enclosing(triangles: &[geom::Triangle]) -> Self {
        triangles
            .iter()
            .fold(Self::empty(), |bounds, tri| bounds.union(&tri.bounds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::geom::Triangle;

    fn unit() -> Bounds3 { Bounds3::new([0.; 3], [1.; 3]) }

    #[test]
    fn empty_is_union_identity() {
        let b = Bounds3::new([-1., 2., 0.], [3., 4., 5.]);

        assert!(Bounds3::default().is_empty());
        assert_eq!(Bounds3::empty().union(&b), b);
        assert_eq!(b.union(&Bounds3::empty()), b);
        assert_eq!(Bounds3::empty().surface_area(), 0.);
    }

    #[test]
    fn union_and_area() {
        let a = Bounds3::new([0.; 3], [1., 1., 1.]);
        let b = Bounds3::new([1., 0., 0.], [2., 1., 1.]);

        let u = a.union(&b);

        assert_eq!(u.min, [0.; 3]);
        assert_eq!(u.max, [2., 1., 1.]);
        assert_eq!(u.surface_area(), 10.);
        assert_eq!(u.maximum_extent(), 0);
        assert!(u.contains(&a) && u.contains(&b));
    }

    #[test]
    fn maximum_extent_picks_longest_axis() {
        assert_eq!(Bounds3::new([0.; 3], [1., 5., 2.]).maximum_extent(), 1);
        assert_eq!(Bounds3::new([0.; 3], [1., 2., 5.]).maximum_extent(), 2);

        // A single point has no extent at all; the last axis is reported
        assert_eq!(Bounds3::point([1.; 3]).maximum_extent(), 2);
    }

    #[test]
    fn offset_is_relative_to_corners() {
        let b = Bounds3::new([0., 0., 2.], [4., 2., 2.]);

        assert_eq!(b.offset([0., 0., 2.]), [0., 0., 0.]);
        assert_eq!(b.offset([4., 2., 2.]), [1., 1., 0.]);
        assert_eq!(b.offset([1., 1., 2.]), [0.25, 0.5, 0.]);
    }

    #[test]
    fn triangle_inside_box() {
        let tri = Triangle::from_positions([
            [0.2, 0.2, 0.5],
            [0.8, 0.2, 0.5],
            [0.5, 0.8, 0.5],
        ], 0);

        assert!(unit().intersects_triangle(&tri));
    }

    #[test]
    fn triangle_spanning_box_without_vertices_inside() {
        // Large triangle slicing through the middle of the box
        let tri = Triangle::from_positions([
            [-10., -10., 0.5],
            [10., -10., 0.5],
            [0., 10., 0.5],
        ], 0);

        assert!(unit().intersects_triangle(&tri));
    }

    #[test]
    fn triangle_separated_by_its_plane() {
        let tri = Triangle::from_positions([
            [-10., -10., 1.5],
            [10., -10., 1.5],
            [0., 10., 1.5],
        ], 0);

        assert!(!unit().intersects_triangle(&tri));
    }

    #[test]
    fn triangle_separated_by_edge_axis() {
        // Overlaps the box on every face axis but misses the corner
        let tri = Triangle::from_positions([
            [1.5, 0., 0.5],
            [0., 1.5, 0.5],
            [1.5, 1.5, 0.5],
        ], 0);

        assert!(unit().intersects_triangle(&tri));

        let tri = Triangle::from_positions([
            [2.5, 0., 0.5],
            [0., 2.5, 0.5],
            [2.5, 2.5, 0.5],
        ], 0);

        assert!(!unit().intersects_triangle(&tri));
    }

    #[test]
    fn triangle_touching_face_counts() {
        let tri = Triangle::from_positions([
            [1., 0., 0.],
            [1., 1., 0.],
            [1., 0., 1.],
        ], 0);

        let neighbour = Bounds3::new([1., 0., 0.], [2., 1., 1.]);

        assert!(unit().intersects_triangle(&tri));
        assert!(neighbour.intersects_triangle(&tri));
    }

    #[test]
    fn touching_holds_for_inexact_coordinates() {
        let (lo, hi) = (-0.0274f32, 0.1582f32);
        let room = Bounds3::new([lo; 3], [hi; 3]);

        let walls = [
            Triangle::from_positions([[lo, lo, lo], [hi, lo, lo], [lo, lo, hi]], 0),
            Triangle::from_positions([[lo, hi, lo], [lo, hi, hi], [hi, hi, lo]], 0),
            Triangle::from_positions([[hi, lo, lo], [hi, hi, lo], [hi, lo, hi]], 0),
        ];

        for wall in &walls {
            assert!(room.intersects_triangle(wall));
        }

        // Just past the ceiling is still a miss
        let above = hi + 1e-3;
        let tri = Triangle::from_positions([
            [lo, above, lo],
            [lo, above, hi],
            [hi, above, lo],
        ], 0);

        assert!(!room.intersects_triangle(&tri));
    }

    #[test]
    fn accepted_by_a_box_means_accepted_by_its_parent() {
        use crate::geom::V3Ops as _;

        let mut state = 17u64;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);

            (state >> 40) as f32 / (1u64 << 24) as f32
        };

        let parent = Bounds3::new([-0.0137, 0.31, 1.7], [0.1291, 0.93, 2.3]);

        for _ in 0..2000 {
            let [t0, t1, t2] = [next(), next(), next()];
            let corner = parent.min
                .add(parent.diagonal().mul([t0, t1, t2]))
                .min(parent.max);

            let child = Bounds3::new(parent.min, corner);

            let mut vertex = || parent.min.add(parent.diagonal().mul([
                next() * 1.5 - 0.25,
                next() * 1.5 - 0.25,
                next() * 1.5 - 0.25,
            ]));

            let tri = Triangle::from_positions([vertex(), vertex(), vertex()], 0);

            if child.intersects_triangle(&tri) {
                assert!(parent.intersects_triangle(&tri), "{:?} {:?}", child, tri);
            }
        }
    }
}
