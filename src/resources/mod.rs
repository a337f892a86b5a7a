//! All logic for loading scenes (meshes, materials and textures) from
//! external files and turning them into GPU resources.

use std::path::Path;

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    context::GpuResources,
    data_structures::{import::ImportScene, model::Model, texture::Color},
    error::{LoadError, Result},
    resources::{mesh::MeshBuilder, node::NodeResolver},
};

pub mod gltf_parser;
pub mod mesh;
pub mod node;
pub mod obj_parser;
pub mod postprocess;
pub mod texture;

/// Knobs for a single import, in the spirit of `tobj::LoadOptions`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportOptions {
    /// Split polygons into triangles when the parser doesn't already.
    pub triangulate: bool,
    /// Merge bit-identical vertices after parsing.
    pub join_identical_vertices: bool,
    /// Share one GPU texture between all meshes referencing the same source.
    pub deduplicate_textures: bool,
    /// Flip the V texture coordinate of OBJ files (`v' = 1 - v`).
    pub flip_v: bool,
    /// Colour for materials that have neither textures nor a diffuse colour.
    pub unloaded_color: Color,
    /// Colour for textures that are referenced but cannot be loaded.
    pub unhandled_color: Color,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            join_identical_vertices: true,
            deduplicate_textures: true,
            flip_v: false,
            unloaded_color: Color::UNLOADED,
            unhandled_color: Color::UNHANDLED,
        }
    }
}

/// Reads a scene file into an import tree. Implementations must hand out
/// triangulated meshes with shared vertices joined, or leave that to
/// [`postprocess`] via [`ImportOptions`].
pub trait SceneParser {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<ImportScene>;
}

/// Picks a parser by file extension.
pub fn parser_for(path: &Path) -> Result<Box<dyn SceneParser>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gltf") | Some("glb") => Ok(Box::new(gltf_parser::GltfParser)),
        Some("obj") => Ok(Box::new(obj_parser::ObjParser)),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Loads a scene file with the parser matching its extension.
///
/// # Arguments
///
/// * `path` - the scene file; texture files are looked up next to it
/// * `gpu` - where buffers and textures are created
/// * `options` - post-processing, deduplication and fallback colours
///
/// Fails with [`LoadError::UnsupportedFormat`] for unknown extensions and
/// otherwise behaves like [`load_model_with`].
pub fn load_model<G: GpuResources>(
    path: &Path,
    gpu: &G,
    options: &ImportOptions,
) -> Result<Model<G>> {
    let parser = parser_for(path)?;
    load_model_with(parser.as_ref(), path, gpu, options)
}

/// Loads a scene file with an explicit parser. Errors raised after parsing
/// carry `path`.
pub fn load_model_with<G: GpuResources>(
    parser: &dyn SceneParser,
    path: &Path,
    gpu: &G,
    options: &ImportOptions,
) -> Result<Model<G>> {
    log::info!("loading scene {}", path.display());
    let scene = parser
        .parse(path, options)
        .map_err(|e| e.with_path(path))?;
    let source_dir = path.parent().unwrap_or(Path::new(""));
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    model_from_import(&scene, source_dir, &name, gpu, options).map_err(|e| e.with_path(path))
}

/// Builds a model from an already parsed import tree. Texture files are
/// looked up relative to `source_dir`.
pub fn model_from_import<G: GpuResources>(
    scene: &ImportScene,
    source_dir: &Path,
    name: &str,
    gpu: &G,
    options: &ImportOptions,
) -> Result<Model<G>> {
    log::debug!(
        "{}: import tree holds {} nodes, {} meshes, {} materials, {} embedded textures",
        name,
        scene.node_count(),
        scene.meshes.len(),
        scene.materials.len(),
        scene.embedded_textures.len()
    );
    let builder = MeshBuilder::new(gpu, scene, source_dir, name, options);
    let mut resolver = NodeResolver::new(builder);
    resolver.resolve(&scene.root, Matrix4::identity())?;
    let (meshes, graph, texture_count) = resolver.finish();
    log::info!(
        "loaded {}: {} meshes, {} nodes, {} textures",
        name,
        meshes.len(),
        graph.len(),
        texture_count
    );
    Ok(Model::from_parts(name.to_string(), meshes, graph, texture_count))
}

/// Runs the clean-up passes selected in `options` over every mesh.
pub(crate) fn postprocess_scene(scene: &mut ImportScene, options: &ImportOptions) {
    for mesh in &mut scene.meshes {
        if options.triangulate {
            postprocess::triangulate(mesh);
        }
        if options.join_identical_vertices {
            let removed = postprocess::join_identical_vertices(mesh);
            if removed > 0 {
                log::debug!("{:?}: joined {} identical vertices", mesh.name, removed);
            }
        }
    }
}
