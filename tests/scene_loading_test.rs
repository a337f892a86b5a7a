use std::{fs, path::Path};

use flow_scene::{
    ImportOptions, LoadError, Model,
    cgmath::{Matrix4, SquareMatrix, Vector3},
    data_structures::texture::Color,
    resources::{SceneParser, gltf_parser::GltfParser, obj_parser::ObjParser},
};

mod common;
use common::test_utils::*;

const OBJ: &str = "\
mtllib scene.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl textured
f 1/1 2/2 3/3 4/4
o tri
v 0 0 1
v 1 0 1
v 0 1 1
usemtl plain
f 5 6 7
";

const MTL: &str = "\
newmtl textured
Kd 1 1 1
map_Kd checker.png

newmtl plain
Kd 0 0 0
";

fn write_obj_scene(dir: &Path) -> std::path::PathBuf {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([12, 34, 56, 255]));
    img.save(dir.join("checker.png")).unwrap();
    fs::write(dir.join("scene.mtl"), MTL).unwrap();
    let path = dir.join("scene.obj");
    fs::write(&path, OBJ).unwrap();
    path
}

#[test]
fn obj_scene_with_material_file_loads() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = write_obj_scene(dir.path());

    let gpu = MockGpu::new();
    let model = Model::load(&path, &gpu, &ImportOptions::default()).unwrap();

    assert_eq!(model.name, "scene.obj");
    assert_eq!(model.meshes().len(), 2);
    // root plus one node per object
    assert_eq!(model.graph().len(), 3);

    let quad = &model.meshes()[0];
    assert_eq!(quad.name, "quad");
    assert_eq!(quad.num_vertices, 4);
    assert_eq!(quad.num_elements, 6);
    assert_eq!(indices_of(quad).len(), 6);
    assert!(indices_of(quad).iter().all(|&i| i < 4));
    assert_eq!(quad.transform, Matrix4::identity());
    assert_eq!(texture_color(quad), Some(Color::new(12, 34, 56)));

    let tri = &model.meshes()[1];
    assert_eq!(tri.name, "tri");
    assert_eq!(tri.num_elements, 3);
    assert!(vertices_of(tri).iter().all(|v| v.tex_coords == [0.0, 0.0]));
    assert_eq!(texture_color(tri), Some(Color::UNLOADED));

    assert_eq!(model.texture_count(), 2);
}

#[test]
fn obj_parser_keeps_polygons_when_not_triangulating() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_obj_scene(dir.path());
    let options = ImportOptions {
        triangulate: false,
        ..Default::default()
    };

    let scene = ObjParser.parse(&path, &options).unwrap();
    assert_eq!(scene.meshes[0].faces, vec![vec![0, 1, 2, 3]]);

    // the builder only accepts triangles
    let err = flow_scene::resources::model_from_import(
        &scene,
        dir.path(),
        "quads",
        &MockGpu::new(),
        &options,
    )
    .err()
    .unwrap();
    assert!(err.is_malformed());
}

#[test]
fn obj_without_material_file_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lonely.obj");
    fs::write(&path, "mtllib missing.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let gpu = MockGpu::new();
    let model = Model::load(&path, &gpu, &ImportOptions::default()).unwrap();
    assert_eq!(model.meshes().len(), 1);
    assert_eq!(texture_color(&model.meshes()[0]), Some(Color::UNLOADED));
}

#[test]
fn gltf_hierarchy_fixture_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/hierarchy.gltf");
    let gpu = MockGpu::new();
    let model = Model::load(&path, &gpu, &ImportOptions::default()).unwrap();

    let names: Vec<_> = model.meshes().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["blue triangle", "plain triangle"]);
    let node_names: Vec<_> = model
        .graph()
        .depth_first()
        .map(|(_, node)| node.name.as_str())
        .collect();
    assert_eq!(node_names, vec!["root", "parent", "child", "sibling"]);

    let blue = &model.meshes()[0];
    assert_eq!(
        blue.transform,
        Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0))
    );
    assert_eq!(blue.num_elements, 3);
    assert_eq!(texture_color(blue), Some(Color::new(0, 0, 255)));
    assert_eq!(vertices_of(blue)[1].tex_coords, [1.0, 0.0]);

    let plain = &model.meshes()[1];
    assert_eq!(plain.transform, Matrix4::identity());
    assert_eq!(texture_color(plain), Some(Color::new(255, 255, 255)));
}

/// A glTF whose only image lives in a buffer view next to the geometry.
fn write_gltf_with_embedded_png(dir: &Path, png: &[u8]) -> std::path::PathBuf {
    let mut bin = Vec::new();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    let image_offset = bin.len();
    bin.extend_from_slice(png);
    fs::write(dir.join("embedded.bin"), &bin).unwrap();

    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "textured", "mesh": 0 }}],
  "meshes": [{{ "name": "tri", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}],
  "textures": [{{ "source": 0 }}],
  "images": [{{ "bufferView": 2, "mimeType": "image/png" }}],
  "buffers": [{{ "byteLength": {total}, "uri": "embedded.bin" }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }},
    {{ "buffer": 0, "byteOffset": {image_offset}, "byteLength": {image_length} }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ]
}}"#,
        total = bin.len(),
        image_offset = image_offset,
        image_length = png.len(),
    );
    let path = dir.join("embedded.gltf");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn gltf_buffer_view_images_become_indexed_references() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_gltf_with_embedded_png(dir.path(), &png_bytes(2, 1, [200, 100, 50, 255]));

    let scene = GltfParser.parse(&path, &ImportOptions::default()).unwrap();
    assert_eq!(scene.embedded_textures.len(), 1);
    assert!(scene.embedded_textures[0].is_compressed());
    assert_eq!(scene.embedded_textures[0].format_hint.as_deref(), Some("png"));
    assert_eq!(
        scene.materials[0].texture(flow_scene::data_structures::import::TextureKind::Diffuse, 0),
        Some("*0")
    );

    let gpu = MockGpu::new();
    let model = Model::load(&path, &gpu, &ImportOptions::default()).unwrap();
    let texture = &model.meshes()[0].textures[0];
    assert_eq!((texture.data.width, texture.data.height), (2, 1));
    assert_eq!(texture.data.first_color(), Some(Color::new(200, 100, 50)));
}

#[test]
fn unknown_extensions_are_rejected() {
    let gpu = MockGpu::new();
    let err = Model::load("scene.fbx", &gpu, &ImportOptions::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        LoadError::UnsupportedFormat {
            path: "scene.fbx".into()
        }
    );
    assert_eq!(gpu.allocations(), 0);
}

#[test]
fn missing_files_are_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let gpu = MockGpu::new();
    for name in ["gone.obj", "gone.gltf"] {
        let path = dir.path().join(name);
        match Model::load(&path, &gpu, &ImportOptions::default()) {
            Err(LoadError::Parse { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("{name}: unexpected error {other}"),
            Ok(_) => panic!("{name}: loaded a file that doesn't exist"),
        }
    }
    assert_eq!(gpu.live(), 0);
}

#[test]
fn garbage_gltf_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.gltf");
    fs::write(&path, "{ this is not json").unwrap();
    let err = Model::load(&path, &MockGpu::new(), &ImportOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, LoadError::Parse { .. }), "{err:?}");
}
