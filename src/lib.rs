//! flow-scene
//!
//! Scene-asset import for the flow engine. A scene file (glTF, GLB or OBJ)
//! is parsed into an import tree, its node hierarchy is walked with
//! parent transforms composed into every child, each referenced mesh is
//! uploaded together with its textures, and the result is a [`Model`]: a flat
//! list of drawable meshes plus an index-based scene graph over them.
//!
//! High-level modules
//! - `context`: the GPU resource seam and its wgpu implementation
//! - `data_structures`: import tree, textures, meshes, model and scene graph
//! - `error`: load-time error taxonomy
//! - `resources`: parsers, texture classification/resolution, mesh and node resolution
//! - `render`: the renderer seam used by [`Model::draw`] and its wgpu implementation
//!

pub mod context;
pub mod data_structures;
pub mod error;
pub mod render;
pub mod resources;

pub use cgmath;
pub use context::{GpuResources, WgpuContext};
pub use data_structures::model::{DrawableMesh, Model};
pub use error::{LoadError, MalformedData};
pub use resources::ImportOptions;
