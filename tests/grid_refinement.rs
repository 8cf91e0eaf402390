use pretty_assertions::assert_eq;

use accel::{geom::Triangle, grid};

// Fixed bounds over [0, 8] on every axis
fn config(resolution: u32) -> grid::GridConfig {
    grid::GridConfig {
        resolution,
        bounds: grid::GridBounds::Fixed {
            min: [0.; 3],
            max: [8.; 3],
        },
    }
}

fn triangles() -> Vec<Triangle> {
    vec![
        Triangle::from_positions([[0.3, 0.3, 0.3], [1.7, 0.4, 0.2], [0.5, 1.6, 0.9]], 0),
        Triangle::from_positions([[2.5, 2.5, 2.5], [5.5, 2.5, 2.5], [2.5, 5.5, 5.5]], 0),
        // Lies on a cell face at every resolution
        Triangle::from_positions([[4., 1., 1.], [4., 7., 1.], [4., 1., 7.]], 0),
        // Sliver spanning the whole diagonal
        Triangle::from_positions([[0.1, 0.3, 0.2], [7.9, 7.7, 7.6], [7.8, 7.9, 7.4]], 0),
        Triangle::from_positions([[6.2, 0.7, 6.8], [7.4, 1.3, 5.9], [6.6, 1.9, 7.3]], 0),
    ]
}

fn brute_force(grid: &grid::Grid, triangles: &[Triangle], cell: [u32; 3]) -> Vec<u32> {
    let bounds = grid.cell_bounds(cell);

    triangles
        .iter()
        .enumerate()
        .filter(|(_, tri)| bounds.intersects_triangle(tri))
        .map(|(idx, _)| idx as u32)
        .collect()
}

fn cells(resolution: u32) -> impl Iterator<Item = [u32; 3]> {
    (0..resolution).flat_map(move |z| {
        (0..resolution).flat_map(move |y| (0..resolution).map(move |x| [x, y, z]))
    })
}

#[test]
fn refinement_matches_exhaustive_testing() {
    let triangles = triangles();

    for resolution in [2, 4, 8, 16] {
        let grid = grid::Grid::build(&triangles, &config(resolution)).unwrap();

        for cell in cells(resolution) {
            assert_eq!(grid.cell(cell), brute_force(&grid, &triangles, cell).as_slice());
        }
    }
}

#[test]
fn fine_cells_refine_their_parents() {
    let triangles = triangles();

    let coarse = grid::Grid::build(&triangles, &config(8)).unwrap();
    let fine = grid::Grid::build(&triangles, &config(16)).unwrap();

    for [x, y, z] in cells(16) {
        let parent = coarse.cell([x / 2, y / 2, z / 2]);

        for idx in fine.cell([x, y, z]) {
            assert!(
                parent.contains(idx),
                "cell {:?} holds {} missing from its parent",
                [x, y, z], idx
            );
        }
    }
}

#[test]
fn levels_and_cell_counts() {
    let triangles = triangles();

    let grid = grid::Grid::build(&triangles, &config(16)).unwrap();

    assert_eq!(grid.stats.levels, 4);
    assert_eq!(grid.stats.cells, 16 * 16 * 16);
    assert_eq!(grid.stats.indices, grid.indices.len());
    assert_eq!(grid.stats.outside, 0);

    // Coarsest level tests every triangle against every cell
    assert!(grid.stats.tests >= 8 * triangles.len());

    assert!(grid.validate(triangles.len()).is_ok());
}

#[test]
fn every_triangle_is_indexed() {
    let triangles = triangles();

    let grid = grid::Grid::build(&triangles, &config(8)).unwrap();

    for idx in 0..triangles.len() as u32 {
        assert!(grid.indices.contains(&idx), "triangle {} was not indexed", idx);
    }
}

// Walls on three of the outer planes plus geometry inside, over an
// extent that no power of two divides
fn room(lo: f32, hi: f32) -> Vec<Triangle> {
    let mid = lo + (hi - lo) * 0.37;

    vec![
        Triangle::from_positions([[lo, lo, lo], [lo, hi, lo], [lo, lo, hi]], 0),
        Triangle::from_positions([[lo, hi, lo], [lo, hi, hi], [hi, hi, lo]], 0),
        Triangle::from_positions([[lo, lo, hi], [hi, lo, hi], [lo, hi, hi]], 0),
        Triangle::from_positions([[mid, lo, lo], [mid, hi, lo], [mid, lo, hi]], 0),
        Triangle::from_positions([[lo, lo, mid], [hi, mid, lo], [mid, hi, hi]], 0),
    ]
}

fn rooms() -> impl Iterator<Item = (f32, f32)> {
    (0..50).map(|k| {
        let k = k as f32;

        (-0.0137 - k * 0.0173, 0.1291 + k * 0.0311)
    })
}

fn scene_fit(resolution: u32) -> grid::GridConfig {
    grid::GridConfig { resolution, bounds: grid::GridBounds::Scene }
}

#[test]
fn scene_fit_indexes_every_triangle() {
    for (lo, hi) in rooms() {
        let triangles = room(lo, hi);

        let grid = grid::Grid::build(&triangles, &scene_fit(4)).unwrap();

        assert_eq!(grid.bounds.min, [lo; 3]);
        assert_eq!(grid.bounds.max, [hi; 3]);
        assert_eq!(grid.stats.outside, 0);

        for idx in 0..triangles.len() as u32 {
            assert!(
                grid.indices.contains(&idx),
                "triangle {} was not indexed for room {} to {}",
                idx, lo, hi
            );
        }
    }
}

#[test]
fn scene_fit_refinement_matches_exhaustive_testing() {
    for (lo, hi) in rooms() {
        let triangles = room(lo, hi);

        let grid = grid::Grid::build(&triangles, &scene_fit(8)).unwrap();

        for cell in cells(8) {
            assert_eq!(
                grid.cell(cell),
                brute_force(&grid, &triangles, cell).as_slice(),
                "cell {:?} of room {} to {}",
                cell, lo, hi
            );
        }
    }
}

#[test]
fn outer_walls_reach_the_outermost_cells() {
    let (lo, hi) = (-0.0274, 0.1582);
    let triangles = room(lo, hi);

    let grid = grid::Grid::build(&triangles, &scene_fit(4)).unwrap();

    // The ceiling (y = hi) lies on the top face of the top row of cells,
    // up to its hypotenuse
    for z in 0..4 {
        for x in 0..4 - z {
            assert!(grid.cell([x, 3, z]).contains(&1), "cell {:?}", [x, 3, z]);
        }
    }

    assert!(grid.cell([0, 0, 0]).contains(&0));
    assert!(grid.cell([0, 0, 3]).contains(&2));
    assert!(grid.cell([3, 0, 3]).contains(&2));
}
