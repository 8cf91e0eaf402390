use crate::geom;

// Flat triangle soup plus the materials its triangles refer to by index
#[derive(Clone, Default)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Scene {
    pub triangles: Vec<geom::Triangle>,
    pub materials: Vec<geom::Material>,
}

impl Scene {
    // Every material index must be -1 or refer to an existing material
    pub fn validate(&self) -> anyhow::Result<()> {
        let materials = self.materials.len();

        for (idx, tri) in self.triangles.iter().enumerate() {
            let material = tri.material;

            if material == geom::Triangle::NO_MATERIAL {
                continue;
            }

            if material < 0 || material as usize >= materials {
                anyhow::bail!(
                    "Triangle {} refers to material {}, but the scene has {} materials",
                    idx, material, materials
                );
            }
        }

        Ok(())
    }

    pub fn add_mesh(
        &mut self,
        obj: wavefront::Obj,
        material: i32,
    ) -> anyhow::Result<()> {
        use crate::geom::V3Ops as _;

        if material != geom::Triangle::NO_MATERIAL
            && (material < 0 || material as usize >= self.materials.len()) {

            anyhow::bail!(
                "Unable to add mesh with material {}, the scene has {} materials",
                material, self.materials.len()
            );
        }

        // Missing normals are smoothed over every face sharing a position,
        // weighted by the angle each face makes at that corner
        let mut smoothed = vec![[0f32; 3]; obj.positions().len()];

        for [a, b, c] in obj.triangles() {
            let [pa, pb, pc] = [a.position(), b.position(), c.position()];

            let face = pb.sub(pa).cross(pc.sub(pa));
            if face.mag() == 0. {
                continue;
            }

            let face = face.normalize();

            for (idx, weight) in [
                (a.position_index(), pa.angle(pb, pc)),
                (b.position_index(), pb.angle(pc, pa)),
                (c.position_index(), pc.angle(pa, pb)),
            ] {
                smoothed[idx] = smoothed[idx].add(face.scale(weight));
            }
        }

        let before = self.triangles.len();

        for [a, b, c] in obj.triangles() {
            let vertex = |v: wavefront::Vertex<'_>| {
                let normal = match v.normal() {
                    Some(normal) => normal,
                    None => {
                        let normal = smoothed[v.position_index()];

                        if normal.mag() > 0. { normal.normalize() } else { normal }
                    },
                };

                // Texture rows run top to bottom on the device
                let uv = v.uv().map(|uv| [uv[0], 1. - uv[1]]).unwrap_or([0.; 2]);

                geom::Vertex::new(v.position(), uv, normal)
            };

            self.triangles.push(geom::Triangle::new([
                vertex(a),
                vertex(b),
                vertex(c),
            ], material));
        }

        log::info!(
            "Added mesh with {} triangles ({} total)",
            self.triangles.len() - before,
            self.triangles.len()
        );

        Ok(())
    }
}
