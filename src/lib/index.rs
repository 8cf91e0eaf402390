use crate::{bvh, geom, grid, scene};

#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[default]
    Bvh,
    Grid,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Structure {
    Bvh(bvh::Bvh),
    Grid(grid::Grid),
}

// A named byte view of one of the index's arrays
#[derive(Clone, Copy)]
pub struct DeviceBuffer<'a> {
    pub name: &'static str,
    pub contents: &'a [u8],
}

/// Scene-level spatial index: owns the triangles in the order the chosen
/// structure expects (leaf-contiguous for a BVH, original for a grid),
/// the materials, and the structure itself.
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct SceneIndex {
    pub triangles: Vec<geom::Triangle>,
    pub materials: Vec<geom::Material>,
    pub structure: Structure,
}

impl SceneIndex {
    pub fn build(scene: scene::Scene, config: &crate::Config) -> anyhow::Result<Self> {
        scene.validate()?;

        let scene::Scene { triangles, materials } = scene;

        if triangles.is_empty() {
            anyhow::bail!("Unable to build a spatial index for a scene without triangles");
        }

        Ok(match config.index {
            IndexKind::Bvh => {
                let (bvh, ordered) = bvh::Bvh::build(&triangles, &config.bvh)?;

                Self {
                    triangles: ordered,
                    materials,
                    structure: Structure::Bvh(bvh),
                }
            },
            IndexKind::Grid => {
                let grid = grid::Grid::build(&triangles, &config.grid)?;

                Self {
                    triangles,
                    materials,
                    structure: Structure::Grid(grid),
                }
            },
        })
    }

    pub fn kind(&self) -> IndexKind {
        match self.structure {
            Structure::Bvh(_) => IndexKind::Bvh,
            Structure::Grid(_) => IndexKind::Grid,
        }
    }

    // Buffers in the order the tracing kernel binds them
    pub fn buffers(&self) -> Vec<DeviceBuffer<'_>> {
        let mut buffers = vec![
            DeviceBuffer {
                name: "triangles",
                contents: bytemuck::cast_slice(&self.triangles),
            },
            DeviceBuffer {
                name: "materials",
                contents: bytemuck::cast_slice(&self.materials),
            },
        ];

        match &self.structure {
            Structure::Bvh(bvh) => buffers.push(DeviceBuffer {
                name: "nodes",
                contents: bytemuck::cast_slice(&bvh.nodes),
            }),
            Structure::Grid(grid) => buffers.extend([
                DeviceBuffer {
                    name: "cells",
                    contents: bytemuck::cast_slice(&grid.cells),
                },
                DeviceBuffer {
                    name: "indices",
                    contents: bytemuck::cast_slice(&grid.indices),
                },
            ]),
        }

        buffers
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    // Loads a precomputed index, rejecting one whose arrays disagree
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let index = serde_json::from_slice::<Self>(bytes)?;

        index.validate()?;

        Ok(index)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let triangles = self.triangles.len();

        for (idx, tri) in self.triangles.iter().enumerate() {
            if tri.material != geom::Triangle::NO_MATERIAL
                && (tri.material < 0 || tri.material as usize >= self.materials.len()) {

                anyhow::bail!(
                    "Triangle {} refers to material {}, but the index has {} materials",
                    idx, tri.material, self.materials.len()
                );
            }
        }

        match &self.structure {
            Structure::Bvh(bvh) => bvh.validate(triangles),
            Structure::Grid(grid) => grid.validate(triangles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use geom::Triangle;

    fn scene() -> scene::Scene {
        let triangles = (0..10).map(|i| {
            let o = i as f32;

            Triangle::from_positions([[o, 0., 0.], [o + 1., 0., 0.], [o, 1., 1.]], i % 2)
        }).collect();

        scene::Scene {
            triangles,
            materials: vec![geom::Material::default(); 2],
        }
    }

    #[test]
    fn bvh_buffers() {
        let index = SceneIndex::build(scene(), &crate::Config::default()).unwrap();

        assert_eq!(index.kind(), IndexKind::Bvh);

        let Structure::Bvh(bvh) = &index.structure else {
            panic!("expected a BVH");
        };

        let buffers = index.buffers();
        let names = buffers.iter().map(|b| b.name).collect::<Vec<_>>();

        assert_eq!(names, ["triangles", "materials", "nodes"]);
        assert_eq!(buffers[0].contents.len(), 10 * 160);
        assert_eq!(buffers[1].contents.len(), 2 * 64);
        assert_eq!(buffers[2].contents.len(), bvh.nodes.len() * 48);
    }

    #[test]
    fn grid_keeps_triangle_order() {
        let config = crate::Config {
            index: IndexKind::Grid,
            grid: grid::GridConfig { resolution: 4, ..Default::default() },
            ..Default::default()
        };

        let original = scene();
        let index = SceneIndex::build(original.clone(), &config).unwrap();

        assert_eq!(index.triangles, original.triangles);

        let names = index.buffers().iter().map(|b| b.name).collect::<Vec<_>>();
        assert_eq!(names, ["triangles", "materials", "cells", "indices"]);
    }

    #[test]
    fn json_round_trip_is_validated() {
        let index = SceneIndex::build(scene(), &crate::Config::default()).unwrap();
        let json = index.to_json().unwrap();

        let loaded = SceneIndex::from_slice(json.as_bytes()).unwrap();
        assert_eq!(loaded.triangles, index.triangles);

        // Drop a triangle so that some leaf points past the end
        let mut broken = index;
        broken.triangles.pop();

        let json = broken.to_json().unwrap();
        assert!(SceneIndex::from_slice(json.as_bytes()).is_err());
    }

    #[test]
    fn bad_material_is_rejected() {
        let mut scene = scene();
        scene.triangles[3].material = 2;

        assert!(SceneIndex::build(scene, &crate::Config::default()).is_err());
    }
}
