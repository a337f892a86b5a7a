//! Texture classification and resolution.
//!
//! A material texture reference is first classified into a
//! [`TextureDescriptor`] saying where its bytes live, then resolved into a GPU
//! texture. Only structural problems are errors; anything that merely fails
//! to produce pixels turns into a solid fallback colour.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use image::{ImageFormat, load_from_memory_with_format};

use crate::{
    context::GpuResources,
    data_structures::{
        import::{EmbeddedTexture, ImportMaterial, ImportScene, TextureKind},
        texture::{BYTES_PER_PIXEL, Color, TextureDescriptor, TexturePixels},
    },
    error::{MalformedData, Result},
    resources::ImportOptions,
};

/// Marks a texture reference as an index into the embedded-texture table.
pub const EMBEDDED_INDEX_MARKER: char = '*';

/// Decides where the bytes of texture `slot` of the given kind live.
///
/// Pure in the reference string and the embedded-texture table: a reference
/// starting with `*` is an index into the table, an exact name match is an
/// embedded texture too, anything with a `.` is a file next to the scene,
/// and everything else is [`TextureDescriptor::None`].
pub fn classify<'a>(
    material: &ImportMaterial,
    slot: usize,
    kind: TextureKind,
    scene: &'a ImportScene,
    source_dir: &Path,
) -> Result<TextureDescriptor<'a>> {
    let Some(reference) = material.texture(kind, slot) else {
        return Ok(TextureDescriptor::None);
    };

    if let Some(digits) = reference.strip_prefix(EMBEDDED_INDEX_MARKER) {
        let index = parse_embedded_index(reference, digits)?;
        let texture = scene.embedded_textures.get(index).ok_or_else(|| {
            MalformedData::EmbeddedIndexOutOfRange {
                reference: reference.to_string(),
                count: scene.embedded_textures.len(),
            }
        })?;
        return Ok(embedded(index, texture));
    }

    if let Some((index, texture)) = scene.embedded_texture_by_name(reference) {
        return Ok(embedded(index, texture));
    }

    if reference.contains('.') {
        return Ok(TextureDescriptor::OnDisk(source_dir.join(reference)));
    }

    Ok(TextureDescriptor::None)
}

fn parse_embedded_index(reference: &str, digits: &str) -> Result<usize> {
    let malformed = || MalformedData::MalformedTextureReference {
        reference: reference.to_string(),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed().into());
    }
    digits.parse().map_err(|_| malformed().into())
}

fn embedded(index: usize, texture: &EmbeddedTexture) -> TextureDescriptor<'_> {
    if texture.is_compressed() {
        TextureDescriptor::EmbeddedCompressed {
            index,
            bytes: &texture.data,
            format_hint: texture.format_hint.as_deref(),
        }
    } else {
        TextureDescriptor::EmbeddedRaw {
            index,
            bytes: &texture.data,
            width: texture.width,
            height: texture.height,
        }
    }
}

/// Decodes a complete compressed image (PNG, JPEG, ...) into RGBA8 pixels.
/// `hint` is a file extension; without a usable one the format is guessed.
pub fn decode(bytes: &[u8], hint: Option<&str>) -> image::ImageResult<TexturePixels> {
    let img = match hint.and_then(ImageFormat::from_extension) {
        Some(format) => load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(TexturePixels::from_image(&img))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TextureKey {
    OnDisk(PathBuf),
    Embedded(usize),
    Solid(Color),
}

impl TextureKey {
    fn of(descriptor: &TextureDescriptor<'_>, unhandled: Color) -> Self {
        match descriptor {
            TextureDescriptor::OnDisk(path) => TextureKey::OnDisk(path.clone()),
            TextureDescriptor::EmbeddedCompressed { index, .. }
            | TextureDescriptor::EmbeddedRaw { index, .. } => TextureKey::Embedded(*index),
            TextureDescriptor::SolidColor(color) => TextureKey::Solid(*color),
            TextureDescriptor::None => TextureKey::Solid(unhandled),
        }
    }
}

/// Turns descriptors into GPU textures, optionally sharing one texture between
/// every mesh that references the same source.
pub struct TextureResolver<'g, G: GpuResources> {
    gpu: &'g G,
    label: String,
    unhandled: Color,
    deduplicate: bool,
    cache: HashMap<TextureKey, G::Texture>,
    created: usize,
}

impl<'g, G: GpuResources> TextureResolver<'g, G> {
    pub fn new(gpu: &'g G, label: impl Into<String>, options: &ImportOptions) -> Self {
        Self {
            gpu,
            label: label.into(),
            unhandled: options.unhandled_color,
            deduplicate: options.deduplicate_textures,
            cache: HashMap::new(),
            created: 0,
        }
    }

    /// Number of GPU textures created so far.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn resolve(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<G::Texture> {
        let key = TextureKey::of(descriptor, self.unhandled);
        if let Some(texture) = self.cached(&key) {
            return Ok(texture);
        }

        let texture = match self.pixels(descriptor)? {
            Some(pixels) => self.upload(&key, &pixels)?,
            None => {
                let fallback = TextureDescriptor::SolidColor(self.unhandled);
                self.resolve(&fallback)?
            }
        };
        if self.deduplicate {
            self.cache.insert(key, texture.clone());
        }
        Ok(texture)
    }

    fn cached(&self, key: &TextureKey) -> Option<G::Texture> {
        if !self.deduplicate {
            return None;
        }
        self.cache.get(key).cloned()
    }

    fn upload(&mut self, key: &TextureKey, pixels: &TexturePixels) -> Result<G::Texture> {
        let label = match key {
            TextureKey::OnDisk(path) => format!("{} texture {}", self.label, path.display()),
            TextureKey::Embedded(index) => format!("{} texture *{}", self.label, index),
            TextureKey::Solid(c) => {
                format!("{} colour texture ({}, {}, {})", self.label, c.r, c.g, c.b)
            }
        };
        let texture = self.gpu.create_texture_2d(&label, pixels)?;
        self.created += 1;
        Ok(texture)
    }

    /// `Ok(None)` means the texture couldn't be read or decoded and the
    /// fallback colour should be used instead.
    fn pixels(&self, descriptor: &TextureDescriptor<'_>) -> Result<Option<TexturePixels>> {
        match descriptor {
            TextureDescriptor::OnDisk(path) => {
                let bytes = match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("texture {} could not be read: {}", path.display(), e);
                        return Ok(None);
                    }
                };
                let hint = path.extension().and_then(|ext| ext.to_str());
                Ok(self.decode_or_warn(&bytes, hint, &path.display().to_string()))
            }
            TextureDescriptor::EmbeddedCompressed {
                index,
                bytes,
                format_hint,
            } => Ok(self.decode_or_warn(bytes, *format_hint, &format!("*{index}"))),
            TextureDescriptor::EmbeddedRaw {
                index,
                bytes,
                width,
                height,
            } => {
                let expected = *width as usize * *height as usize * BYTES_PER_PIXEL;
                if bytes.len() != expected {
                    return Err(MalformedData::RawTextureSize {
                        reference: format!("*{index}"),
                        expected,
                        actual: bytes.len(),
                    }
                    .into());
                }
                Ok(Some(TexturePixels {
                    width: *width,
                    height: *height,
                    rgba: bytes.to_vec(),
                }))
            }
            TextureDescriptor::SolidColor(color) => Ok(Some(TexturePixels::solid(*color))),
            TextureDescriptor::None => {
                log::warn!(
                    "{}: texture reference has no usable source, using the unhandled colour",
                    self.label
                );
                Ok(None)
            }
        }
    }

    fn decode_or_warn(&self, bytes: &[u8], hint: Option<&str>, what: &str) -> Option<TexturePixels> {
        match decode(bytes, hint) {
            Ok(pixels) => Some(pixels),
            Err(e) => {
                log::warn!("texture {} could not be decoded: {}", what, e);
                None
            }
        }
    }
}
