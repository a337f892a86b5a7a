//! GPU resource creation.
//!
//! The importer never talks to wgpu directly. It goes through [`GpuResources`],
//! which hands out owned handles that release their GPU memory when dropped.
//! A load that fails halfway simply drops everything it created so far.

use anyhow::anyhow;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::ModelVertex,
        texture::{self, TexturePixels},
    },
    error::{LoadError, Result},
};

/// Synchronous creation of vertex buffers, index buffers and 2D textures.
///
/// Every method either returns a live handle or a
/// [`LoadError::ResourceCreation`] naming `label`; a failed call leaves
/// nothing allocated behind.
pub trait GpuResources {
    type Buffer;
    /// Cloning a texture handle shares the underlying GPU texture.
    type Texture: Clone;

    fn create_vertex_buffer(&self, label: &str, vertices: &[ModelVertex]) -> Result<Self::Buffer>;

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> Result<Self::Buffer>;

    fn create_texture_2d(&self, label: &str, pixels: &TexturePixels) -> Result<Self::Texture>;
}

/// Bind group layout for a diffuse texture: view at binding 0, sampler at 1.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Model diffuse_bind_group_layout"),
    })
}

/// wgpu-backed [`GpuResources`].
#[derive(Debug)]
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub texture_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl WgpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_layout = diffuse_layout(&device);
        let sampler = texture::create_default_sampler(&device);
        Self {
            device,
            queue,
            texture_layout,
            sampler,
        }
    }

    /// Requests an adapter and device without any surface. Blocks the calling
    /// thread until both are available.
    pub fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = futures::executor::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .map_err(|e| anyhow!("no suitable GPU adapter: {e}"))?;
        log::info!("headless adapter: {:?}", adapter.get_info().name);
        let (device, queue) = futures::executor::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("flow-scene headless device"),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            },
        ))?;
        Ok(Self::new(device, queue))
    }

    fn check_buffer_size(&self, label: &str, size: usize) -> Result<()> {
        let max = self.device.limits().max_buffer_size;
        if size as u64 > max {
            return Err(LoadError::resource(
                label,
                format!("{size} bytes exceed the device limit of {max}"),
            ));
        }
        Ok(())
    }

    /// Runs `create` inside validation and out-of-memory error scopes so a
    /// device failure turns into a [`LoadError::ResourceCreation`] instead of
    /// reaching the uncaptured-error handler.
    fn capture<T>(&self, label: &str, create: impl FnOnce() -> T) -> Result<T> {
        let out_of_memory = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let created = create();
        // scopes pop in reverse order of pushing
        let validation = futures::executor::block_on(validation.pop());
        let out_of_memory = futures::executor::block_on(out_of_memory.pop());
        match validation.or(out_of_memory) {
            Some(e) => {
                log::error!("creating {label:?} failed: {e}");
                Err(LoadError::resource(label, e))
            }
            None => Ok(created),
        }
    }
}

impl GpuResources for WgpuContext {
    type Buffer = wgpu::Buffer;
    type Texture = texture::Texture;

    fn create_vertex_buffer(&self, label: &str, vertices: &[ModelVertex]) -> Result<wgpu::Buffer> {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        self.check_buffer_size(label, contents.len())?;
        self.capture(label, || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::VERTEX,
                })
        })
    }

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> Result<wgpu::Buffer> {
        let contents: &[u8] = bytemuck::cast_slice(indices);
        self.check_buffer_size(label, contents.len())?;
        self.capture(label, || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::INDEX,
                })
        })
    }

    fn create_texture_2d(&self, label: &str, pixels: &TexturePixels) -> Result<texture::Texture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if pixels.width == 0 || pixels.height == 0 || pixels.width > max || pixels.height > max {
            return Err(LoadError::resource(
                label,
                format!(
                    "{}x{} is outside the supported range 1..={max}",
                    pixels.width, pixels.height
                ),
            ));
        }
        self.capture(label, || {
            texture::Texture::from_pixels(
                &self.device,
                &self.queue,
                &self.texture_layout,
                &self.sampler,
                pixels,
                label,
            )
        })
    }
}
