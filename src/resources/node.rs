use cgmath::{Matrix, Matrix4};

use crate::{
    context::GpuResources,
    data_structures::{
        import::ImportNode,
        model::DrawableMesh,
        scene_graph::{MeshId, NodeId, SceneGraph},
    },
    error::{MalformedData, Result},
    resources::mesh::MeshBuilder,
};

/// Converts an import transform (row-major, translation in the last column)
/// into a cgmath matrix.
///
/// cgmath reads each inner array as a column, so the conversion alone yields
/// the transpose of the stored matrix; transposing once more restores it.
pub fn import_transform(rows: &[[f32; 4]; 4]) -> Matrix4<f32> {
    Matrix4::from(*rows).transpose()
}

/**
 * Walks the import tree and builds the flat mesh list and the scene graph
 * side by side. Meshes are appended in pre-order (a node's meshes before
 * its children's), which is also the order they are drawn in.
 */
pub struct NodeResolver<'a, 'g, G: GpuResources> {
    builder: MeshBuilder<'a, 'g, G>,
    meshes: Vec<DrawableMesh<G>>,
    graph: SceneGraph,
}

impl<'a, 'g, G: GpuResources> NodeResolver<'a, 'g, G> {
    pub fn new(builder: MeshBuilder<'a, 'g, G>) -> Self {
        Self {
            builder,
            meshes: Vec::new(),
            graph: SceneGraph::new(),
        }
    }

    /// Resolves `node` and its whole subtree. `parent` is the already composed
    /// transform of every ancestor.
    pub fn resolve(&mut self, node: &ImportNode, parent: Matrix4<f32>) -> Result<NodeId> {
        let transform = parent * import_transform(&node.transform);
        let id = self.graph.push(node.name.clone(), transform);
        log::debug!(
            "node {:?}: {} meshes, {} children",
            node.name,
            node.meshes.len(),
            node.children.len()
        );

        let mesh_count = self.builder.scene().meshes.len();
        for &mesh in &node.meshes {
            if mesh >= mesh_count {
                return Err(MalformedData::DanglingMeshReference {
                    node: node.name.clone(),
                    mesh,
                    mesh_count,
                }
                .into());
            }
            let drawable = self.builder.build(mesh, transform)?;
            self.meshes.push(drawable);
            self.graph.add_mesh(id, MeshId(self.meshes.len() - 1));
        }

        for child in &node.children {
            let child_id = self.resolve(child, transform)?;
            self.graph.add_child(id, child_id);
        }
        Ok(id)
    }

    /// Hands over the built meshes, the graph and the number of textures created.
    pub fn finish(self) -> (Vec<DrawableMesh<G>>, SceneGraph, usize) {
        let texture_count = self.builder.texture_count();
        (self.meshes, self.graph, texture_count)
    }
}
