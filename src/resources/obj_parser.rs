//! Wavefront OBJ/MTL parser.
//!
//! OBJ has no hierarchy: every object becomes one child of an identity root
//! with a single mesh. `map_Kd` becomes the diffuse texture reference and
//! `Kd` the diffuse colour.

use std::path::Path;

use crate::{
    data_structures::import::{ImportMaterial, ImportMesh, ImportNode, ImportScene, TextureKind},
    error::{LoadError, Result},
    resources::{ImportOptions, SceneParser, postprocess_scene},
};

pub struct ObjParser;

impl SceneParser for ObjParser {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<ImportScene> {
        let (models, obj_materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: options.triangulate,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| LoadError::parse(path, e))?;

        let mut scene = ImportScene::default();
        match obj_materials {
            Ok(materials) => {
                scene.materials = materials.into_iter().map(to_import_material).collect();
            }
            Err(e) => {
                log::warn!("materials of {} could not be loaded: {}", path.display(), e);
            }
        }
        // meshes without `usemtl` end up here
        let default_material = scene.materials.len();
        scene.materials.push(ImportMaterial::new("default"));

        for (index, model) in models.into_iter().enumerate() {
            let name = if model.name.is_empty() {
                format!("object {index}")
            } else {
                model.name.clone()
            };
            let mut mesh = to_import_mesh(name.clone(), &model.mesh, options.flip_v);
            mesh.material = model
                .mesh
                .material_id
                .filter(|&id| id < default_material)
                .unwrap_or(default_material);
            scene.meshes.push(mesh);
            scene.root.children.push(ImportNode::new(name).with_mesh(index));
        }

        postprocess_scene(&mut scene, options);
        Ok(scene)
    }
}

fn to_import_material(material: tobj::Material) -> ImportMaterial {
    let mut import_material =
        ImportMaterial::new(material.name).with_diffuse_color(material.diffuse.unwrap_or([0.0; 3]));
    if let Some(texture) = material.diffuse_texture.filter(|t| !t.is_empty()) {
        import_material = import_material.with_texture(TextureKind::Diffuse, texture);
    }
    import_material
}

fn to_import_mesh(name: String, mesh: &tobj::Mesh, flip_v: bool) -> ImportMesh {
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|n| [n[0], n[1], n[2]])
        .collect();
    let tex_coords = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|uv| if flip_v { [uv[0], 1.0 - uv[1]] } else { [uv[0], uv[1]] })
            .collect()
    });

    // face_arities is empty when tobj already triangulated
    let faces = if mesh.face_arities.is_empty() {
        mesh.indices.chunks(3).map(<[u32]>::to_vec).collect()
    } else {
        let mut start = 0;
        mesh.face_arities
            .iter()
            .map(|&arity| {
                let end = start + arity as usize;
                let face = mesh.indices[start..end.min(mesh.indices.len())].to_vec();
                start = end;
                face
            })
            .collect()
    };

    ImportMesh {
        name,
        positions,
        normals,
        tex_coords,
        faces,
        material: 0,
    }
}
