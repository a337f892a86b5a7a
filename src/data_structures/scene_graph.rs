//! Scene graph arena.
//!
//! Nodes live in one `Vec` owned by the [`SceneGraph`] and refer to their
//! children and to the model's meshes by index only. The root is always
//! the first node.

use cgmath::Matrix4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Slot in the model's flat mesh list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Local-to-model transform, already composed with every ancestor.
    pub transform: Matrix4<f32>,
    pub meshes: Vec<MeshId>,
    pub children: Vec<NodeId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without linking it to a parent.
    pub fn push(&mut self, name: impl Into<String>, transform: Matrix4<f32>) -> NodeId {
        self.nodes.push(SceneNode {
            name: name.into(),
            transform,
            meshes: Vec::new(),
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Appends `child` to the children of `parent`. Draw order follows
    /// insertion order.
    ///
    /// # Panics
    ///
    /// If `parent` was not returned by [`push`](Self::push) on this graph.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Records that `node` draws the mesh in slot `mesh`.
    ///
    /// # Panics
    ///
    /// If `node` was not returned by [`push`](Self::push) on this graph.
    pub fn add_mesh(&mut self, node: NodeId, mesh: MeshId) {
        self.nodes[node.0].meshes.push(mesh);
    }

    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk from the root: a node comes before its children and
    /// children come in insertion order.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            graph: self,
            stack: self.root().into_iter().collect(),
        }
    }

    /// Every mesh slot in traversal order.
    pub fn mesh_order(&self) -> Vec<MeshId> {
        self.depth_first()
            .flat_map(|(_, node)| node.meshes.iter().copied())
            .collect()
    }
}

pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (NodeId, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.graph.get(id)?;
        self.stack.extend(node.children.iter().rev());
        Some((id, node))
    }
}
