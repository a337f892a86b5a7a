//! glTF 2.0 (`.gltf` / `.glb`) parser.
//!
//! Every primitive becomes one import mesh, images stored in buffer views
//! become compressed embedded textures referenced as `*N`, and URI images
//! become file references relative to the scene. The default scene's root
//! nodes hang below a synthetic identity root.

use std::path::Path;

use crate::{
    data_structures::import::{
        EmbeddedTexture, ImportMaterial, ImportMesh, ImportNode, ImportScene, TextureKind,
    },
    error::{LoadError, Result},
    resources::{ImportOptions, SceneParser, postprocess_scene, texture::EMBEDDED_INDEX_MARKER},
};

pub struct GltfParser;

impl SceneParser for GltfParser {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<ImportScene> {
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| LoadError::parse(path, e))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| LoadError::parse(path, e))?;

        let mut scene = ImportScene::default();
        let image_refs = load_images(path, &document, &buffers, &mut scene)?;
        load_materials(&document, &image_refs, &mut scene);
        let primitives = load_meshes(&document, &buffers, &mut scene);

        let gltf_scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| LoadError::parse(path, "file contains no scene"))?;
        scene.root.children = gltf_scene
            .nodes()
            .map(|node| to_import_node(node, &primitives))
            .collect();

        postprocess_scene(&mut scene, options);
        Ok(scene)
    }
}

/// Loads every image and returns, per glTF image, the texture reference
/// materials should use for it.
fn load_images(
    path: &Path,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    scene: &mut ImportScene,
) -> Result<Vec<String>> {
    let mut refs = Vec::new();
    for image in document.images() {
        let reference = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|data| data.0.get(start..end))
                    .ok_or_else(|| {
                        LoadError::parse(
                            path,
                            format!("image {} points outside its buffer", image.index()),
                        )
                    })?;
                let mut texture =
                    EmbeddedTexture::compressed(bytes.to_vec(), mime_type.split('/').last());
                texture.name = image.name().map(str::to_string);
                scene.embedded_textures.push(texture);
                format!("{}{}", EMBEDDED_INDEX_MARKER, scene.embedded_textures.len() - 1)
            }
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!(
                    "image {} of {} is a data URI, which isn't supported",
                    image.index(),
                    path.display()
                );
                String::new()
            }
            gltf::image::Source::Uri { uri, .. } => uri.to_string(),
        };
        refs.push(reference);
    }
    Ok(refs)
}

fn load_materials(document: &gltf::Document, image_refs: &[String], scene: &mut ImportScene) {
    for material in document.materials() {
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let name = material
            .name()
            .map_or_else(|| format!("material {}", scene.materials.len()), str::to_string);
        let mut import_material = ImportMaterial::new(name).with_diffuse_color([r, g, b]);
        if let Some(info) = pbr.base_color_texture() {
            let image = info.texture().source().index();
            if let Some(reference) = image_refs.get(image) {
                import_material = import_material.with_texture(TextureKind::Diffuse, reference);
            }
        }
        scene.materials.push(import_material);
    }
    // glTF's default material is plain white
    scene
        .materials
        .push(ImportMaterial::new("default").with_diffuse_color([1.0, 1.0, 1.0]));
}

/// Returns, per glTF mesh, the import meshes its primitives became.
fn load_meshes(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    scene: &mut ImportScene,
) -> Vec<Vec<usize>> {
    let default_material = scene.materials.len() - 1;
    let mut primitives_of_mesh = Vec::new();
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
            let mesh_name = mesh
                .name()
                .map_or_else(|| format!("mesh {}", mesh.index()), str::to_string);

            let Some(positions) = reader.read_positions() else {
                log::warn!("{mesh_name}: primitive {} has no positions", primitive.index());
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            let Some(faces) = faces(primitive.mode(), &indices) else {
                log::warn!(
                    "{mesh_name}: dropping primitive {} with non-triangle mode {:?}",
                    primitive.index(),
                    primitive.mode()
                );
                continue;
            };

            scene.meshes.push(ImportMesh {
                name: mesh_name,
                normals: reader
                    .read_normals()
                    .map(|normals| normals.collect())
                    .unwrap_or_default(),
                tex_coords: reader.read_tex_coords(0).map(|uv| uv.into_f32().collect()),
                positions,
                faces,
                material: primitive.material().index().unwrap_or(default_material),
            });
            primitives.push(scene.meshes.len() - 1);
        }
        primitives_of_mesh.push(primitives);
    }
    primitives_of_mesh
}

fn faces(mode: gltf::mesh::Mode, indices: &[u32]) -> Option<Vec<Vec<u32>>> {
    use gltf::mesh::Mode;
    let faces = match mode {
        Mode::Triangles => indices.chunks(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                // every other triangle is flipped to keep the winding
                if i % 2 == 0 {
                    vec![w[0], w[1], w[2]]
                } else {
                    vec![w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => indices
            .windows(2)
            .skip(1)
            .map(|w| vec![indices[0], w[0], w[1]])
            .collect(),
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return None,
    };
    Some(faces)
}

fn to_import_node(node: gltf::Node<'_>, primitives: &[Vec<usize>]) -> ImportNode {
    let columns = node.transform().matrix();
    let mut rows = [[0.0; 4]; 4];
    for (c, column) in columns.iter().enumerate() {
        for (r, value) in column.iter().enumerate() {
            rows[r][c] = *value;
        }
    }

    ImportNode {
        name: node
            .name()
            .map_or_else(|| format!("node {}", node.index()), str::to_string),
        transform: rows,
        meshes: node
            .mesh()
            .and_then(|mesh| primitives.get(mesh.index()))
            .cloned()
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| to_import_node(child, primitives))
            .collect(),
    }
}
