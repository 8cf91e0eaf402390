use std::mem;

use crate::{bounds::Bounds3, geom};

// Region of space the grid subdivides
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridBounds {
    // Fit the grid to the triangles it indexes
    Scene,
    // Caller-supplied region. Geometry outside of it is not indexed
    Fixed { min: [f32; 3], max: [f32; 3] },
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct GridConfig {
    // Target cells per axis, a power of two
    pub resolution: u32,
    pub bounds: GridBounds,
}

impl GridConfig {
    // Cell count grows with the cube of the resolution
    pub const MAX_RESOLUTION: u32 = 1024;

    pub const fn new() -> Self {
        Self {
            resolution: 64,
            bounds: GridBounds::Scene,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resolution < 2
            || self.resolution > Self::MAX_RESOLUTION
            || !self.resolution.is_power_of_two() {

            anyhow::bail!(
                "GridConfig::resolution must be a power of two between 2 and {}, got {}",
                Self::MAX_RESOLUTION, self.resolution
            );
        }

        if let GridBounds::Fixed { min, max } = self.bounds {
            if (0..3).any(|axis| !(min[axis] < max[axis])) {
                anyhow::bail!(
                    "Fixed grid bounds must have positive extent on every axis, \
                    got {:?} to {:?}",
                    min, max
                );
            }
        }

        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self { Self::new() }
}

/// Slice of the index buffer belonging to one cell.
#[repr(C)]
#[derive(Clone, Copy, Default)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Debug, PartialEq, Eq)]
pub struct CellData {
    pub start: u32,
    pub count: u32,
}

const _: () = assert!(mem::size_of::<CellData>() == 8);

impl CellData {
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start as usize;

        start..(start + self.count as usize)
    }
}

#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct GridStats {
    // Resolutions visited on the way to the target
    pub levels: usize,
    pub cells: usize,
    pub indices: usize,
    // Triangle/cell overlap tests performed across all levels
    pub tests: usize,
    // Triangles that miss a fixed bound entirely
    pub outside: usize,
}

// Uniform grid at the target resolution. Indices refer to the triangles
// in their original order
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Grid {
    pub resolution: u32,
    pub bounds: Bounds3,
    pub cells: Vec<CellData>,
    pub indices: Vec<u32>,
    pub stats: GridStats,
}

impl Grid {
    pub fn build(
        triangles: &[geom::Triangle],
        config: &GridConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let start = chrono::Local::now();

        let bounds = match config.bounds {
            GridBounds::Scene => {
                if triangles.is_empty() {
                    anyhow::bail!("Unable to fit a grid to a scene without triangles");
                }

                Bounds3::enclosing(triangles)
            },
            GridBounds::Fixed { min, max } => Bounds3::new(min, max),
        };

        let mut stats = GridStats::default();

        if let GridBounds::Fixed { .. } = config.bounds {
            stats.outside = triangles
                .iter()
                .filter(|tri| !bounds.intersects_triangle(tri))
                .count();

            if stats.outside > 0 {
                log::warn!(
                    "{} of {} triangles lie outside of the fixed grid bounds \
                    {:?} to {:?} and will not be indexed",
                    stats.outside, triangles.len(), bounds.min, bounds.max
                );
            }
        }

        log::info!(
            "Creating uniform grid over {:?} to {:?}",
            bounds.min, bounds.max
        );

        let mut cells = Vec::new();
        let mut indices = Vec::new();

        let mut resolution = 2;
        while resolution <= config.resolution {
            let (next_cells, next_indices) = refine(
                triangles,
                &bounds,
                resolution,
                (resolution > 2).then(|| (cells.as_slice(), indices.as_slice())),
                &mut stats.tests,
            );

            log::debug!(
                "Grid resolution {}: {} indices",
                resolution, next_indices.len()
            );

            // Only the finest completed level is kept
            cells = next_cells;
            indices = next_indices;

            stats.levels += 1;
            resolution *= 2;
        }

        stats.cells = cells.len();
        stats.indices = indices.len();

        let elapsed = chrono::Local::now() - start;

        log::info!(
            "Grid created at resolution {} with {} indices over {} levels \
            ({} overlap tests, {}ms elapsed)",
            config.resolution,
            stats.indices,
            stats.levels,
            stats.tests,
            elapsed.num_milliseconds(),
        );

        Ok(Self {
            resolution: config.resolution,
            bounds,
            cells,
            indices,
            stats,
        })
    }

    // Checks a grid that did not come straight out of the builder
    pub fn validate(&self, triangles: usize) -> anyhow::Result<()> {
        if self.resolution < 2
            || self.resolution > GridConfig::MAX_RESOLUTION
            || !self.resolution.is_power_of_two() {

            anyhow::bail!("Grid resolution {} is not supported", self.resolution);
        }

        let expected = (self.resolution as usize).pow(3);
        if self.cells.len() != expected {
            anyhow::bail!(
                "Grid of resolution {} should hold {} cells, found {}",
                self.resolution, expected, self.cells.len()
            );
        }

        if let Some((idx, cell)) = self.cells
            .iter()
            .enumerate()
            .find(|(_, cell)| cell.range().end > self.indices.len()) {

            anyhow::bail!(
                "Cell {} covers indices {:?}, but only {} are present",
                idx, cell.range(), self.indices.len()
            );
        }

        if let Some(idx) = self.indices.iter().find(|&&idx| idx as usize >= triangles) {
            anyhow::bail!(
                "Grid refers to triangle {}, but only {} are present",
                idx, triangles
            );
        }

        Ok(())
    }

    // Row-major with x varying fastest
    pub fn cell_index(&self, [x, y, z]: [u32; 3]) -> usize {
        cell_index(self.resolution, [x, y, z])
    }

    pub fn cell_bounds(&self, cell: [u32; 3]) -> Bounds3 {
        cell_bounds(&self.bounds, self.resolution, cell)
    }

    // Triangle indices recorded for one cell
    pub fn cell(&self, cell: [u32; 3]) -> &[u32] {
        let data = self.cells[self.cell_index(cell)];

        &self.indices[data.range()]
    }
}

fn cell_index(resolution: u32, [x, y, z]: [u32; 3]) -> usize {
    let resolution = resolution as usize;

    x as usize + y as usize * resolution + z as usize * resolution * resolution
}

fn cell_bounds(bounds: &Bounds3, resolution: u32, [x, y, z]: [u32; 3]) -> Bounds3 {
    use geom::V3Ops as _;

    let dv = bounds.diagonal().scale(1. / resolution as f32);

    let lo = [x as f32, y as f32, z as f32];
    let hi = [(x + 1) as f32, (y + 1) as f32, (z + 1) as f32];

    let mut max = bounds.min.add(hi.mul(dv));

    // The outermost cells end exactly on the grid bounds. Inner faces are
    // shared bit for bit with the enclosing cell of the coarser level
    for (axis, cell) in [x, y, z].into_iter().enumerate() {
        if cell + 1 == resolution {
            max[axis] = bounds.max[axis];
        }
    }

    Bounds3::new(bounds.min.add(lo.mul(dv)), max)
}

// Builds one level. Without a parent level every triangle is tested,
// otherwise only the triangles recorded in the enclosing parent cell
fn refine(
    triangles: &[geom::Triangle],
    bounds: &Bounds3,
    resolution: u32,
    parent: Option<(&[CellData], &[u32])>,
    tests: &mut usize,
) -> (Vec<CellData>, Vec<u32>) {
    let mut cells = Vec::with_capacity((resolution as usize).pow(3));
    let mut indices = Vec::new();

    for z in 0..resolution {
        for y in 0..resolution {
            for x in 0..resolution {
                let cell = cell_bounds(bounds, resolution, [x, y, z]);

                let start = indices.len();

                match parent {
                    None => {
                        for (idx, tri) in triangles.iter().enumerate() {
                            *tests += 1;

                            if cell.intersects_triangle(tri) {
                                indices.push(idx as u32);
                            }
                        }
                    },
                    Some((parent_cells, parent_indices)) => {
                        let parent_cell = parent_cells[{
                            cell_index(resolution / 2, [x / 2, y / 2, z / 2])
                        }];

                        for &idx in &parent_indices[parent_cell.range()] {
                            *tests += 1;

                            if cell.intersects_triangle(&triangles[idx as usize]) {
                                indices.push(idx);
                            }
                        }
                    },
                }

                cells.push(CellData {
                    start: start as u32,
                    count: (indices.len() - start) as u32,
                });
            }
        }
    }

    (cells, indices)
}
