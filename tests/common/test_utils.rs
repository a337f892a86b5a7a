#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use flow_scene::{
    DrawableMesh, GpuResources, LoadError,
    cgmath::Matrix4,
    data_structures::{
        import::{
            EmbeddedTexture, ImportMaterial, ImportMesh, ImportNode, ImportScene, TextureKind,
        },
        model::ModelVertex,
        texture::{Color, TexturePixels},
    },
    render::MeshRenderer,
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A GPU resource that counts itself as live until dropped.
pub(crate) struct Tracked<T> {
    pub label: String,
    pub data: T,
    live: Rc<Cell<usize>>,
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

pub(crate) enum BufferData {
    Vertices(Vec<ModelVertex>),
    Indices(Vec<u32>),
}

/**
 * Records every allocation instead of talking to a device. `fail_at` makes the
 * n-th allocation (0-based) fail with a resource creation error.
 */
#[derive(Default)]
pub(crate) struct MockGpu {
    live: Rc<Cell<usize>>,
    allocations: Cell<usize>,
    fail_at: Option<usize>,
    texture_labels: RefCell<Vec<String>>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(allocation: usize) -> Self {
        Self {
            fail_at: Some(allocation),
            ..Default::default()
        }
    }

    /// Resources created and not yet dropped.
    pub fn live(&self) -> usize {
        self.live.get()
    }

    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn texture_labels(&self) -> Vec<String> {
        self.texture_labels.borrow().clone()
    }

    fn track<T>(&self, label: &str, data: T) -> Result<Tracked<T>, LoadError> {
        let n = self.allocations.get();
        if self.fail_at == Some(n) {
            return Err(LoadError::resource(label, "mock device refused the allocation"));
        }
        self.allocations.set(n + 1);
        self.live.set(self.live.get() + 1);
        Ok(Tracked {
            label: label.to_string(),
            data,
            live: self.live.clone(),
        })
    }
}

impl GpuResources for MockGpu {
    type Buffer = Tracked<BufferData>;
    type Texture = Rc<Tracked<TexturePixels>>;

    fn create_vertex_buffer(
        &self,
        label: &str,
        vertices: &[ModelVertex],
    ) -> Result<Self::Buffer, LoadError> {
        self.track(label, BufferData::Vertices(vertices.to_vec()))
    }

    fn create_index_buffer(&self, label: &str, indices: &[u32]) -> Result<Self::Buffer, LoadError> {
        self.track(label, BufferData::Indices(indices.to_vec()))
    }

    fn create_texture_2d(
        &self,
        label: &str,
        pixels: &TexturePixels,
    ) -> Result<Self::Texture, LoadError> {
        let texture = self.track(label, pixels.clone())?;
        self.texture_labels.borrow_mut().push(label.to_string());
        Ok(Rc::new(texture))
    }
}

pub(crate) fn vertices_of(mesh: &DrawableMesh<MockGpu>) -> &[ModelVertex] {
    match &mesh.vertex_buffer.data {
        BufferData::Vertices(vertices) => vertices,
        BufferData::Indices(_) => panic!("vertex buffer holds indices"),
    }
}

pub(crate) fn indices_of(mesh: &DrawableMesh<MockGpu>) -> &[u32] {
    match &mesh.index_buffer.data {
        BufferData::Indices(indices) => indices,
        BufferData::Vertices(_) => panic!("index buffer holds vertices"),
    }
}

/// Colour of the first texel of the mesh's first texture.
pub(crate) fn texture_color(mesh: &DrawableMesh<MockGpu>) -> Option<Color> {
    mesh.textures.first().and_then(|t| t.data.first_color())
}

/// Remembers every draw as (world transform, mesh name).
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pending: Option<Matrix4<f32>>,
    pub draws: Vec<(Matrix4<f32>, String)>,
}

impl MeshRenderer<MockGpu> for RecordingRenderer {
    fn set_transforms(&mut self, world: &Matrix4<f32>, _: &Matrix4<f32>, _: &Matrix4<f32>) {
        self.pending = Some(*world);
    }

    fn draw_mesh(&mut self, mesh: &DrawableMesh<MockGpu>) {
        let world = self.pending.take().expect("draw without transforms");
        self.draws.push((world, mesh.name.clone()));
    }
}

/// A single triangle using `material`.
pub(crate) fn triangle(name: &str, material: usize) -> ImportMesh {
    ImportMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        faces: vec![vec![0, 1, 2]],
        material,
    }
}

pub(crate) fn black_material() -> ImportMaterial {
    ImportMaterial::new("black")
}

pub(crate) fn textured_material(reference: &str) -> ImportMaterial {
    ImportMaterial::new("textured").with_texture(TextureKind::Diffuse, reference)
}

/// One node carrying one triangle that uses `material`.
pub(crate) fn single_mesh_scene(
    material: ImportMaterial,
    embedded_textures: Vec<EmbeddedTexture>,
) -> ImportScene {
    ImportScene {
        root: ImportNode::new("root").with_child(ImportNode::new("child").with_mesh(0)),
        meshes: vec![triangle("tri", 0)],
        materials: vec![material],
        embedded_textures,
    }
}

pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}
