//! The import tree: scene data as handed over by a parser, before any GPU
//! resources exist.
//!
//! Parsers (see [`crate::resources::SceneParser`]) produce an [`ImportScene`];
//! the node resolver reads it once and never mutates it.

use std::collections::HashMap;

/// Row-major 4x4 identity, in the layout [`ImportNode::transform`] uses.
pub const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// The kinds of texture slot a material can carry. Only diffuse (base colour)
/// is consumed by the renderer at the moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
}

/// Everything a parser extracted from one scene file.
///
/// Nodes refer to `meshes` by index and meshes refer to `materials` by index.
/// Material texture references starting with `*` index into
/// `embedded_textures`.
#[derive(Clone, Debug, Default)]
pub struct ImportScene {
    pub root: ImportNode,
    pub meshes: Vec<ImportMesh>,
    pub materials: Vec<ImportMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
}

impl ImportScene {
    /// Looks up an embedded texture by its exact name, returning its slot in
    /// the embedded-texture table.
    pub fn embedded_texture_by_name(&self, name: &str) -> Option<(usize, &EmbeddedTexture)> {
        self.embedded_textures
            .iter()
            .enumerate()
            .find(|(_, tex)| tex.name.as_deref() == Some(name))
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        fn count(node: &ImportNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

/// A node of the source scene graph.
///
/// `transform` is stored row-major with the translation in the last column
/// (`transform[0][3]`, `transform[1][3]`, `transform[2][3]`).
#[derive(Clone, Debug)]
pub struct ImportNode {
    pub name: String,
    pub transform: [[f32; 4]; 4],
    pub meshes: Vec<usize>,
    pub children: Vec<ImportNode>,
}

impl ImportNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: [[f32; 4]; 4]) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_translation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform[0][3] = x;
        self.transform[1][3] = y;
        self.transform[2][3] = z;
        self
    }

    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_child(mut self, child: ImportNode) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for ImportNode {
    fn default() -> Self {
        Self::new("root")
    }
}

/// Raw per-vertex data plus faces. Every face should hold exactly three
/// indices by the time the mesh builder sees it.
#[derive(Clone, Debug, Default)]
pub struct ImportMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the source has no normals.
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Vec<u32>>,
    pub material: usize,
}

impl ImportMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Material data as far as texturing is concerned: texture references per
/// slot kind and a constant diffuse colour used when there are none.
#[derive(Clone, Debug)]
pub struct ImportMaterial {
    pub name: String,
    pub diffuse_color: [f32; 3],
    pub textures: HashMap<TextureKind, Vec<String>>,
}

impl ImportMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse_color: [0.0; 3],
            textures: HashMap::new(),
        }
    }

    pub fn with_diffuse_color(mut self, color: [f32; 3]) -> Self {
        self.diffuse_color = color;
        self
    }

    pub fn with_texture(mut self, kind: TextureKind, reference: impl Into<String>) -> Self {
        self.textures.entry(kind).or_default().push(reference.into());
        self
    }

    pub fn texture_count(&self, kind: TextureKind) -> usize {
        self.textures.get(&kind).map_or(0, Vec::len)
    }

    pub fn texture(&self, kind: TextureKind, slot: usize) -> Option<&str> {
        self.textures
            .get(&kind)
            .and_then(|refs| refs.get(slot))
            .map(String::as_str)
    }
}

impl Default for ImportMaterial {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Image bytes stored inside the scene file.
///
/// With `height == 0` the data is a complete compressed image (PNG, JPEG, ...)
/// of `width` bytes. Otherwise it is `width * height` uncompressed RGBA8 texels.
#[derive(Clone, Debug, Default)]
pub struct EmbeddedTexture {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// File extension style hint for the decoder, e.g. "png".
    pub format_hint: Option<String>,
}

impl EmbeddedTexture {
    pub fn compressed(data: Vec<u8>, format_hint: Option<&str>) -> Self {
        Self {
            name: None,
            width: data.len() as u32,
            height: 0,
            data,
            format_hint: format_hint.map(str::to_string),
        }
    }

    pub fn raw(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            name: None,
            width,
            height,
            data: rgba,
            format_hint: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }
}
