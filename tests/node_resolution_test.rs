use std::path::Path;

use flow_scene::{
    ImportOptions, LoadError, MalformedData,
    cgmath::{Matrix, Matrix4, SquareMatrix, Vector3, vec4},
    data_structures::{
        import::{ImportMaterial, ImportNode, ImportScene},
        texture::Color,
    },
    resources::{model_from_import, node::import_transform},
};

mod common;
use common::test_utils::*;

fn load(scene: &ImportScene) -> Result<flow_scene::Model<MockGpu>, LoadError> {
    load_on(&MockGpu::new(), scene)
}

fn load_on(gpu: &MockGpu, scene: &ImportScene) -> Result<flow_scene::Model<MockGpu>, LoadError> {
    model_from_import(scene, Path::new(""), "test scene", gpu, &ImportOptions::default())
}

/// Row-major rotation by 90 degrees around Z; every entry is exact.
fn rot_z_90() -> [[f32; 4]; 4] {
    [
        [0.0, -1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[test]
fn child_translation_ends_up_in_the_mesh_transform() {
    init_logger();
    let mut scene = single_mesh_scene(black_material(), Vec::new());
    scene.root.children[0] = ImportNode::new("child")
        .with_translation(5.0, 0.0, 0.0)
        .with_mesh(0);

    let model = load(&scene).unwrap();

    assert_eq!(model.meshes().len(), 1);
    let mesh = &model.meshes()[0];
    assert_eq!(
        mesh.transform,
        Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0))
    );
    assert_eq!(mesh.transform * vec4(0.0, 0.0, 0.0, 1.0), vec4(5.0, 0.0, 0.0, 1.0));
    assert_eq!(texture_color(mesh), Some(Color::UNLOADED));
}

#[test]
fn mesh_transform_composes_parent_with_transposed_local() {
    let parent = ImportNode::new("parent").with_transform(rot_z_90());
    let child = ImportNode::new("child")
        .with_translation(1.0, 2.0, 3.0)
        .with_mesh(0);
    let mut scene = single_mesh_scene(black_material(), Vec::new());
    scene.root = ImportNode::new("root").with_child(parent.with_child(child));

    let model = load(&scene).unwrap();

    let p = import_transform(&rot_z_90());
    let mut translation = flow_scene::data_structures::import::IDENTITY;
    translation[0][3] = 1.0;
    translation[1][3] = 2.0;
    translation[2][3] = 3.0;
    // row-major storage read as columns is the transpose, hence the extra transpose
    let l = Matrix4::from(translation).transpose();
    assert_eq!(model.meshes()[0].transform, p * l);
    // the child's origin is rotated into place by the parent
    assert_eq!(
        model.meshes()[0].transform * vec4(0.0, 0.0, 0.0, 1.0),
        vec4(-2.0, 1.0, 3.0, 1.0)
    );
}

#[test]
fn identity_tree_keeps_identity_transforms() {
    let scene = single_mesh_scene(black_material(), Vec::new());
    let model = load(&scene).unwrap();
    assert_eq!(model.meshes()[0].transform, Matrix4::identity());
}

#[test]
fn meshes_are_built_per_reference_in_depth_first_order() {
    let scene = ImportScene {
        root: ImportNode::new("root")
            .with_mesh(2)
            .with_child(
                ImportNode::new("a")
                    .with_mesh(0)
                    .with_child(ImportNode::new("a1").with_mesh(1)),
            )
            .with_child(ImportNode::new("b").with_mesh(0).with_mesh(1)),
        meshes: vec![triangle("zero", 0), triangle("one", 0), triangle("two", 0)],
        materials: vec![ImportMaterial::new("m").with_diffuse_color([0.0, 1.0, 0.0])],
        embedded_textures: Vec::new(),
    };

    let model = load(&scene).unwrap();

    let names: Vec<_> = model.meshes().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["two", "zero", "one", "zero", "one"]);
    assert_eq!(model.graph().len(), 4);
    let node_names: Vec<_> = model
        .graph()
        .depth_first()
        .map(|(_, node)| node.name.as_str())
        .collect();
    assert_eq!(node_names, vec!["root", "a", "a1", "b"]);

    // every slot referenced by the graph exists
    for (_, node) in model.graph().depth_first() {
        for id in &node.meshes {
            assert!(model.mesh(*id).is_some());
        }
    }

    // same input, same result
    let again = load(&scene).unwrap();
    let again_names: Vec<_> = again.meshes().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, again_names);
}

#[test]
fn dangling_mesh_reference_fails_the_load() {
    let mut scene = single_mesh_scene(black_material(), Vec::new());
    scene.root.children[0].meshes = vec![0, 3];

    let gpu = MockGpu::new();
    let err = load_on(&gpu, &scene).err().unwrap();

    assert_eq!(
        err,
        LoadError::from(MalformedData::DanglingMeshReference {
            node: "child".into(),
            mesh: 3,
            mesh_count: 1,
        })
    );
    // the first mesh was already uploaded and must have been released again
    assert!(gpu.allocations() > 0);
    assert_eq!(gpu.live(), 0);
}

#[test]
fn draw_composes_world_with_mesh_transform_in_load_order() {
    let scene = ImportScene {
        root: ImportNode::new("root")
            .with_child(ImportNode::new("left").with_translation(-1.0, 0.0, 0.0).with_mesh(0))
            .with_child(ImportNode::new("right").with_translation(1.0, 0.0, 0.0).with_mesh(1)),
        meshes: vec![triangle("left mesh", 0), triangle("right mesh", 0)],
        materials: vec![black_material()],
        embedded_textures: Vec::new(),
    };
    let model = load(&scene).unwrap();

    let world = Matrix4::from_translation(Vector3::new(0.0, 10.0, 0.0));
    let mut renderer = RecordingRenderer::default();
    model.draw(&world, &Matrix4::identity(), &Matrix4::identity(), &mut renderer);

    assert_eq!(renderer.draws.len(), 2);
    assert_eq!(renderer.draws[0].1, "left mesh");
    assert_eq!(
        renderer.draws[0].0,
        Matrix4::from_translation(Vector3::new(-1.0, 10.0, 0.0))
    );
    assert_eq!(renderer.draws[1].1, "right mesh");
    assert_eq!(
        renderer.draws[1].0,
        Matrix4::from_translation(Vector3::new(1.0, 10.0, 0.0))
    );
}
