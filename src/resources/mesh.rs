use std::path::Path;

use cgmath::Matrix4;

use crate::{
    context::GpuResources,
    data_structures::{
        import::{ImportMaterial, ImportMesh, ImportScene, TextureKind},
        model::{DrawableMesh, ModelVertex},
        texture::{Color, TextureDescriptor},
    },
    error::{MalformedData, Result},
    resources::{
        ImportOptions,
        texture::{TextureResolver, classify},
    },
};

/// Channels below this are treated as zero when deciding whether a material
/// colour was left unset.
const BLACK_EPSILON: f32 = 10e-3;

/**
 * Turns import meshes into GPU meshes. One builder is used for a whole scene
 * so textures can be shared between meshes.
 */
pub struct MeshBuilder<'a, 'g, G: GpuResources> {
    gpu: &'g G,
    scene: &'a ImportScene,
    source_dir: &'a Path,
    label: &'a str,
    unloaded_color: Color,
    textures: TextureResolver<'g, G>,
}

impl<'a, 'g, G: GpuResources> MeshBuilder<'a, 'g, G> {
    pub fn new(
        gpu: &'g G,
        scene: &'a ImportScene,
        source_dir: &'a Path,
        label: &'a str,
        options: &ImportOptions,
    ) -> Self {
        Self {
            gpu,
            scene,
            source_dir,
            label,
            unloaded_color: options.unloaded_color,
            textures: TextureResolver::new(gpu, label, options),
        }
    }

    pub fn scene(&self) -> &'a ImportScene {
        self.scene
    }

    /// GPU textures created so far.
    pub fn texture_count(&self) -> usize {
        self.textures.created()
    }

    /// Builds mesh `index` of the scene with `transform` as its fixed
    /// local-to-model transform.
    pub fn build(&mut self, index: usize, transform: Matrix4<f32>) -> Result<DrawableMesh<G>> {
        let scene = self.scene;
        let mesh = scene
            .meshes
            .get(index)
            .ok_or_else(|| MalformedData::DanglingMeshReference {
                node: String::new(),
                mesh: index,
                mesh_count: scene.meshes.len(),
            })?;
        let material = scene.materials.get(mesh.material).ok_or(
            MalformedData::MaterialOutOfRange {
                mesh: index,
                material: mesh.material,
                material_count: scene.materials.len(),
            },
        )?;

        let vertices = vertices(index, mesh)?;
        let indices = indices(index, mesh)?;
        let textures = self.material_textures(material, TextureKind::Diffuse)?;

        let name = if mesh.name.is_empty() {
            format!("mesh {index}")
        } else {
            mesh.name.clone()
        };
        log::debug!(
            "{}: built {:?} with {} vertices, {} triangles, {} textures",
            self.label,
            name,
            vertices.len(),
            indices.len() / 3,
            textures.len()
        );

        let vertex_buffer = self
            .gpu
            .create_vertex_buffer(&format!("{:?} Vertex Buffer", name), &vertices)?;
        let index_buffer = self
            .gpu
            .create_index_buffer(&format!("{:?} Index Buffer", name), &indices)?;

        Ok(DrawableMesh {
            name,
            vertex_buffer,
            index_buffer,
            num_vertices: vertices.len() as u32,
            num_elements: indices.len() as u32,
            textures,
            transform,
        })
    }

    fn material_textures(
        &mut self,
        material: &ImportMaterial,
        kind: TextureKind,
    ) -> Result<Vec<G::Texture>> {
        let count = material.texture_count(kind);
        if count == 0 {
            let color = if is_black(material.diffuse_color) {
                self.unloaded_color
            } else {
                Color::from_f32(material.diffuse_color)
            };
            return Ok(vec![
                self.textures.resolve(&TextureDescriptor::SolidColor(color))?,
            ]);
        }

        (0..count)
            .map(|slot| {
                let descriptor = classify(material, slot, kind, self.scene, self.source_dir)?;
                self.textures.resolve(&descriptor)
            })
            .collect()
    }
}

fn is_black(rgb: [f32; 3]) -> bool {
    rgb.iter().all(|c| c.abs() < BLACK_EPSILON)
}

fn vertices(index: usize, mesh: &ImportMesh) -> Result<Vec<ModelVertex>> {
    let count = mesh.vertex_count();
    if !mesh.normals.is_empty() && mesh.normals.len() != count {
        return Err(MalformedData::AttributeLengthMismatch {
            mesh: index,
            attribute: "normal",
            expected: count,
            actual: mesh.normals.len(),
        }
        .into());
    }
    if let Some(tex_coords) = mesh.tex_coords.as_ref().filter(|uv| uv.len() != count) {
        return Err(MalformedData::AttributeLengthMismatch {
            mesh: index,
            attribute: "texture coordinate",
            expected: count,
            actual: tex_coords.len(),
        }
        .into());
    }

    Ok((0..count)
        .map(|i| ModelVertex {
            position: mesh.positions[i],
            tex_coords: mesh
                .tex_coords
                .as_ref()
                .map_or([0.0, 0.0], |uv| uv[i]),
            normal: mesh.normals.get(i).copied().unwrap_or_default(),
        })
        .collect())
}

fn indices(index: usize, mesh: &ImportMesh) -> Result<Vec<u32>> {
    let vertex_count = mesh.vertex_count();
    let mut indices = Vec::with_capacity(mesh.face_count() * 3);
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if face.len() != 3 {
            return Err(MalformedData::NonTriangularFace {
                mesh: index,
                face: face_index,
                indices: face.len(),
            }
            .into());
        }
        if let Some(&bad) = face.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MalformedData::VertexIndexOutOfRange {
                mesh: index,
                index: bad,
                vertex_count,
            }
            .into());
        }
        indices.extend_from_slice(face);
    }
    Ok(indices)
}
