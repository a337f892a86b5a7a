//! Texture data: colours, CPU-side pixel grids, the storage classification
//! of a material texture and the GPU texture wrapper.

use std::path::PathBuf;

/// An opaque 8-bit RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Grey used when a material has neither textures nor a diffuse colour.
    pub const UNLOADED: Color = Color::new(100, 100, 100);
    /// Red used when a texture reference could not be turned into pixels.
    pub const UNHANDLED: Color = Color::new(250, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts a float colour in `[0, 1]`, truncating each channel.
    pub fn from_f32(rgb: [f32; 3]) -> Self {
        let f_to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        Self::new(f_to_u8(rgb[0]), f_to_u8(rgb[1]), f_to_u8(rgb[2]))
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Bytes per texel of every pixel grid handed to the GPU.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded RGBA8 pixel grid, ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TexturePixels {
    pub fn solid(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: color.to_rgba().to_vec(),
        }
    }

    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            rgba: rgba.into_raw(),
        }
    }

    /// The colour of the first texel. Handy for 1x1 colour textures.
    pub fn first_color(&self) -> Option<Color> {
        match self.rgba.as_slice() {
            [r, g, b, _, ..] => Some(Color::new(*r, *g, *b)),
            _ => None,
        }
    }
}

/// Where the bytes of a material texture live.
///
/// `None` is only ever an intermediate result of classification; resolution
/// always replaces it with a solid colour.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureDescriptor<'a> {
    OnDisk(PathBuf),
    EmbeddedCompressed {
        index: usize,
        bytes: &'a [u8],
        format_hint: Option<&'a str>,
    },
    EmbeddedRaw {
        index: usize,
        bytes: &'a [u8],
        width: u32,
        height: u32,
    },
    SolidColor(Color),
    None,
}

/// A GPU texture together with the bind group that makes it visible to the
/// fragment shader.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Uploads an RGBA8 pixel grid and binds it together with `sampler`.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        pixels: &TexturePixels,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: pixels.width,
            height: pixels.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &pixels.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_PIXEL as u32 * pixels.width),
                rows_per_image: Some(pixels.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(label),
        });

        Self {
            texture,
            view,
            bind_group,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        // single mip level, so the mipmap filter is left at its default
        ..Default::default()
    })
}
