use std::collections;

use svg::node::element;

use crate::{bounds::Bounds3, bvh, grid};

// The pair of world axes that end up on the drawing's horizontal and
// vertical axes
#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Plane {
    #[default]
    Xy,
    Xz,
    Zy,
}

impl Plane {
    fn axes(self) -> [usize; 2] {
        match self {
            Plane::Xy => [0, 1],
            Plane::Xz => [0, 2],
            Plane::Zy => [2, 1],
        }
    }

    // Projected rectangle as (x, y, width, height) with y pointing down
    fn project(self, bounds: &Bounds3) -> (f32, f32, f32, f32) {
        let [u, v] = self.axes();

        (
            bounds.min[u],
            -bounds.max[v],
            bounds.max[u] - bounds.min[u],
            bounds.max[v] - bounds.min[v],
        )
    }
}

fn document(bounds: &Bounds3, plane: Plane) -> (svg::Document, f32) {
    let (x, y, w, h) = plane.project(bounds);

    // Keep a margin so strokes on the outer box stay visible
    let margin = 0.02 * w.max(h).max(f32::EPSILON);

    let document = svg::Document::new()
        .set("viewBox", (x - margin, y - margin, w + 2. * margin, h + 2. * margin));

    (document, margin * 0.25)
}

fn rectangle(bounds: &Bounds3, plane: Plane, stroke: f32) -> element::Rectangle {
    let (x, y, w, h) = plane.project(bounds);

    element::Rectangle::new()
        .set("x", x)
        .set("y", y)
        .set("width", w)
        .set("height", h)
        .set("stroke-width", stroke)
}

/// Outlines of every node's bounds. Interior nodes are drawn in red,
/// leaves in green.
pub fn bvh_svg(bvh: &bvh::Bvh, plane: Plane) -> svg::Document {
    let Some(root) = bvh.root() else {
        return svg::Document::new();
    };

    let (mut document, stroke) = document(&root.bounds, plane);

    for node in &bvh.nodes {
        let colour = if node.is_leaf() { "#00C000" } else { "#FF0000" };

        document = document.add({
            rectangle(&node.bounds, plane, stroke)
                .set("fill", "none")
                .set("stroke", colour)
        });
    }

    document
}

/// Grid bounds plus every occupied cell, shaded by how many cells along
/// the hidden axis project onto it.
pub fn grid_svg(grid: &grid::Grid, plane: Plane) -> svg::Document {
    let (mut document, stroke) = document(&grid.bounds, plane);

    let [u, v] = plane.axes();
    let res = grid.resolution;

    let mut occupied = collections::BTreeMap::<[u32; 2], u32>::new();
    for z in 0..res {
        for y in 0..res {
            for x in 0..res {
                let cell = [x, y, z];

                if grid.cells[grid.cell_index(cell)].count > 0 {
                    *occupied.entry([cell[u], cell[v]]).or_default() += 1;
                }
            }
        }
    }

    for ([cu, cv], depth) in occupied {
        let mut cell = [0; 3];
        cell[u] = cu;
        cell[v] = cv;

        document = document.add({
            rectangle(&grid.cell_bounds(cell), plane, stroke)
                .set("fill", "#0000FF")
                .set("fill-opacity", depth as f32 / res as f32)
                .set("stroke", "none")
        });
    }

    document.add({
        rectangle(&grid.bounds, plane, stroke)
            .set("fill", "none")
            .set("stroke", "#000000")
    })
}
