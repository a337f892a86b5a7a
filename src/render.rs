//! Drawing loaded models.
//!
//! [`Model::draw`](crate::data_structures::model::Model::draw) only knows the
//! [`MeshRenderer`] seam: it hands over a transform triple and then the mesh
//! to draw with it. [`WgpuMeshRenderer`] is the wgpu implementation that
//! records into an existing render pass; pipelines and shaders belong to the
//! caller.

use std::num::NonZeroU64;

use cgmath::Matrix4;

use crate::{
    context::{GpuResources, WgpuContext},
    data_structures::model::DrawableMesh,
};

/// The renderer collaborator of [`Model::draw`](crate::data_structures::model::Model::draw).
///
/// Calls always come in pairs: one `set_transforms`, then one `draw_mesh`.
pub trait MeshRenderer<G: GpuResources> {
    /// Sets the transforms the next [`draw_mesh`](Self::draw_mesh) uses.
    ///
    /// # Arguments
    ///
    /// * `world` - model-to-world transform, already composed with the mesh's own transform
    /// * `view` - the camera's view matrix
    /// * `proj` - the projection matrix
    fn set_transforms(&mut self, world: &Matrix4<f32>, view: &Matrix4<f32>, proj: &Matrix4<f32>);

    /// Draws `mesh` with its first texture and the transforms set last.
    /// Only called for meshes with at least one face.
    fn draw_mesh(&mut self, mesh: &DrawableMesh<G>);
}

/**
 * The raw transform triple as stored in the uniform buffer.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformsRaw {
    world: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
}

impl TransformsRaw {
    pub fn new(world: &Matrix4<f32>, view: &Matrix4<f32>, proj: &Matrix4<f32>) -> Self {
        Self {
            world: (*world).into(),
            view: (*view).into(),
            proj: (*proj).into(),
        }
    }
}

/// A uniform buffer with one dynamic-offset slot per draw of a frame.
pub struct TransformUniforms {
    pub buffer: wgpu::Buffer,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    stride: u32,
    capacity: u32,
}

impl TransformUniforms {
    pub fn new(device: &wgpu::Device, capacity: u32) -> Self {
        let capacity = capacity.max(1);
        let size = std::mem::size_of::<TransformsRaw>() as u32;
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let stride = size.div_ceil(alignment) * alignment;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh transform buffer"),
            size: stride as u64 * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(size as u64),
                },
                count: None,
            }],
            label: Some("Mesh transform bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(size as u64),
                }),
            }],
            label: Some("Mesh transform bind_group"),
        });

        Self {
            buffer,
            layout,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Number of draws a single frame can hold.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Records mesh draws into a render pass. Texture bind groups go to group 0,
/// transforms to group 1.
pub struct WgpuMeshRenderer<'p, 'e> {
    pass: &'p mut wgpu::RenderPass<'e>,
    queue: &'p wgpu::Queue,
    uniforms: &'p TransformUniforms,
    next_slot: u32,
    current_offset: Option<u32>,
}

impl<'p, 'e> WgpuMeshRenderer<'p, 'e> {
    pub fn new(
        pass: &'p mut wgpu::RenderPass<'e>,
        queue: &'p wgpu::Queue,
        uniforms: &'p TransformUniforms,
    ) -> Self {
        Self {
            pass,
            queue,
            uniforms,
            next_slot: 0,
            current_offset: None,
        }
    }
}

impl MeshRenderer<WgpuContext> for WgpuMeshRenderer<'_, '_> {
    fn set_transforms(&mut self, world: &Matrix4<f32>, view: &Matrix4<f32>, proj: &Matrix4<f32>) {
        if self.next_slot >= self.uniforms.capacity() {
            log::warn!(
                "transform buffer holds {} draws per frame, skipping the rest",
                self.uniforms.capacity()
            );
            self.current_offset = None;
            return;
        }
        let offset = self.next_slot * self.uniforms.stride;
        let raw = TransformsRaw::new(world, view, proj);
        self.queue
            .write_buffer(&self.uniforms.buffer, offset as u64, bytemuck::bytes_of(&raw));
        self.next_slot += 1;
        self.current_offset = Some(offset);
    }

    fn draw_mesh(&mut self, mesh: &DrawableMesh<WgpuContext>) {
        let Some(offset) = self.current_offset.take() else {
            return;
        };
        // wgpu refuses empty buffer slices
        if mesh.num_elements == 0 || mesh.num_vertices == 0 {
            return;
        }
        if let Some(texture) = mesh.textures.first() {
            self.pass.set_bind_group(0, &texture.bind_group, &[]);
        }
        self.pass.set_bind_group(1, &self.uniforms.bind_group, &[offset]);
        self.pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.pass
            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }
}
