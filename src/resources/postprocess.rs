//! Mesh clean-up applied by parsers before handing meshes to the builder:
//! polygon triangulation and merging of bit-identical vertices.

use std::collections::HashMap;

use crate::data_structures::import::ImportMesh;

/// Splits every polygon with more than three corners into a triangle fan.
/// Faces with fewer than three indices are left alone for the mesh builder
/// to reject.
pub fn triangulate(mesh: &mut ImportMesh) {
    if mesh.faces.iter().all(|face| face.len() <= 3) {
        return;
    }
    let faces = std::mem::take(&mut mesh.faces);
    for face in faces {
        if face.len() <= 3 {
            mesh.faces.push(face);
            continue;
        }
        for i in 1..face.len() - 1 {
            mesh.faces.push(vec![face[0], face[i], face[i + 1]]);
        }
    }
}

/// Merges vertices whose position, normal and texture coordinate are
/// bit-identical, keeping the first occurrence. Returns how many vertices
/// were removed.
pub fn join_identical_vertices(mesh: &mut ImportMesh) -> usize {
    let count = mesh.vertex_count();
    if mesh.normals.len() != count && !mesh.normals.is_empty() {
        return 0;
    }
    if mesh.tex_coords.as_ref().is_some_and(|uv| uv.len() != count) {
        return 0;
    }

    let mut seen: HashMap<[u32; 8], u32> = HashMap::with_capacity(count);
    let mut remap = Vec::with_capacity(count);
    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(mesh.normals.len());
    let mut tex_coords = mesh.tex_coords.as_ref().map(|_| Vec::with_capacity(count));

    for i in 0..count {
        let position = mesh.positions[i];
        let normal = mesh.normals.get(i).copied().unwrap_or_default();
        let uv = mesh.tex_coords.as_ref().map_or([0.0; 2], |uv| uv[i]);
        let key = [
            position[0].to_bits(),
            position[1].to_bits(),
            position[2].to_bits(),
            normal[0].to_bits(),
            normal[1].to_bits(),
            normal[2].to_bits(),
            uv[0].to_bits(),
            uv[1].to_bits(),
        ];
        let new_index = *seen.entry(key).or_insert_with(|| {
            positions.push(position);
            if !mesh.normals.is_empty() {
                normals.push(normal);
            }
            if let Some(tex_coords) = tex_coords.as_mut() {
                tex_coords.push(uv);
            }
            (positions.len() - 1) as u32
        });
        remap.push(new_index);
    }

    let removed = count - positions.len();
    if removed == 0 {
        return 0;
    }
    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            if let Some(&new_index) = remap.get(*index as usize) {
                *index = new_index;
            }
        }
    }
    mesh.positions = positions;
    mesh.normals = normals;
    mesh.tex_coords = tex_coords;
    removed
}
