//! Engine data structures for imported scenes.
//!
//! - `import` is the parser-facing import tree (nodes, meshes, materials, embedded textures)
//! - `texture` holds colours, pixel grids, texture classification and the GPU texture wrapper
//! - `model` contains the render-ready meshes and the scene model owning them
//! - `scene_graph` is the index-based node hierarchy of a loaded model

pub mod import;
pub mod model;
pub mod scene_graph;
pub mod texture;
