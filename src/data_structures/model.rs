//! Render-ready meshes and the scene model that owns them.

use std::path::Path;

use cgmath::Matrix4;

use crate::{
    context::GpuResources,
    data_structures::scene_graph::{MeshId, NodeId, SceneGraph},
    error::Result,
    render::MeshRenderer,
    resources::{self, ImportOptions},
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// One drawable unit: GPU buffers, its textures and a fixed transform from
/// mesh space to model space.
pub struct DrawableMesh<G: GpuResources> {
    pub name: String,
    pub vertex_buffer: G::Buffer,
    pub index_buffer: G::Buffer,
    pub num_vertices: u32,
    pub num_elements: u32,
    /// Never empty: a mesh without usable textures gets a 1x1 colour texture.
    pub textures: Vec<G::Texture>,
    pub transform: Matrix4<f32>,
}

/// A loaded scene file: the flat list of meshes plus the node hierarchy that
/// references them. Immutable once loaded; dropping it releases every GPU
/// resource it holds.
pub struct Model<G: GpuResources> {
    pub name: String,
    meshes: Vec<DrawableMesh<G>>,
    graph: SceneGraph,
    texture_count: usize,
}

impl<G: GpuResources> Model<G> {
    /// Parses `path` with the parser matching its extension and uploads the
    /// whole scene. Nothing is kept if any step fails.
    pub fn load(path: impl AsRef<Path>, gpu: &G, options: &ImportOptions) -> Result<Self> {
        resources::load_model(path.as_ref(), gpu, options)
    }

    pub(crate) fn from_parts(
        name: String,
        meshes: Vec<DrawableMesh<G>>,
        graph: SceneGraph,
        texture_count: usize,
    ) -> Self {
        Self {
            name,
            meshes,
            graph,
            texture_count,
        }
    }

    pub fn meshes(&self) -> &[DrawableMesh<G>] {
        &self.meshes
    }

    pub fn mesh(&self, id: MeshId) -> Option<&DrawableMesh<G>> {
        self.meshes.get(id.0)
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn root(&self) -> Option<NodeId> {
        self.graph.root()
    }

    /// Number of distinct GPU textures created for this model.
    pub fn texture_count(&self) -> usize {
        self.texture_count
    }

    /// Walks the hierarchy depth-first and draws every mesh with
    /// `world * mesh.transform`. The order matches the one established at load.
    /// Meshes without faces are skipped.
    pub fn draw<R>(
        &self,
        world: &Matrix4<f32>,
        view: &Matrix4<f32>,
        proj: &Matrix4<f32>,
        renderer: &mut R,
    ) where
        R: MeshRenderer<G> + ?Sized,
    {
        for (_, node) in self.graph.depth_first() {
            for id in &node.meshes {
                // slots are only ever created by the node resolver, so this can't miss
                let Some(mesh) = self.meshes.get(id.0) else {
                    log::error!("node {:?} points at missing mesh slot {}", node.name, id.0);
                    continue;
                };
                // a face-less mesh has an empty index buffer, which can't be bound
                if mesh.num_elements == 0 {
                    log::debug!("skipping {:?}: it has no faces", mesh.name);
                    continue;
                }
                renderer.set_transforms(&(world * mesh.transform), view, proj);
                renderer.draw_mesh(mesh);
            }
        }
    }
}
