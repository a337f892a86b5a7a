//! Load-time error taxonomy.
//!
//! Every structural problem with a scene file surfaces as one [`LoadError`].
//! Texture-level problems (undecodable bytes, unreadable texture files) never
//! show up here: they degrade to a fallback colour inside the resolver.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why the import tree could not be turned into a scene model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedData {
    #[error("mesh {mesh} face {face} has {indices} indices, expected 3")]
    NonTriangularFace {
        mesh: usize,
        face: usize,
        indices: usize,
    },
    #[error("mesh {mesh} references vertex {index} but only has {vertex_count} vertices")]
    VertexIndexOutOfRange {
        mesh: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("mesh {mesh} has {actual} {attribute} entries, expected {expected}")]
    AttributeLengthMismatch {
        mesh: usize,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("mesh {mesh} uses material {material} but the scene only has {material_count}")]
    MaterialOutOfRange {
        mesh: usize,
        material: usize,
        material_count: usize,
    },
    #[error("texture reference {reference:?} is not a valid embedded index")]
    MalformedTextureReference { reference: String },
    #[error("texture reference {reference:?} is out of range for {count} embedded textures")]
    EmbeddedIndexOutOfRange { reference: String, count: usize },
    #[error("raw texture {reference:?} holds {actual} bytes, expected {expected}")]
    RawTextureSize {
        reference: String,
        expected: usize,
        actual: usize,
    },
    #[error("node {node:?} references mesh {mesh} but the scene only has {mesh_count}")]
    DanglingMeshReference {
        node: String,
        mesh: usize,
        mesh_count: usize,
    },
}

/// The single error a failed load surfaces to the caller.
///
/// Every variant carries enough context to find the culprit: the scene file
/// path, the GPU resource label or the offending mesh, node or reference.
/// Nothing created before the failure outlives it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported scene format: {path:?}")]
    UnsupportedFormat { path: PathBuf },
    #[error("failed to create GPU resource {label:?}: {message}")]
    ResourceCreation { label: String, message: String },
    #[error("malformed data in {path:?}: {detail}")]
    MalformedData { path: PathBuf, detail: MalformedData },
}

impl LoadError {
    pub fn parse(path: impl AsRef<Path>, message: impl ToString) -> Self {
        LoadError::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn resource(label: impl Into<String>, message: impl ToString) -> Self {
        LoadError::ResourceCreation {
            label: label.into(),
            message: message.to_string(),
        }
    }

    /// Attaches the scene file path to errors raised below the entry point,
    /// which don't know which file they're working on.
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            LoadError::MalformedData { path: p, detail } if p.as_os_str().is_empty() => {
                LoadError::MalformedData {
                    path: path.to_path_buf(),
                    detail,
                }
            }
            LoadError::Parse { path: p, message } if p.as_os_str().is_empty() => {
                LoadError::Parse {
                    path: path.to_path_buf(),
                    message,
                }
            }
            other => other,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, LoadError::MalformedData { .. })
    }
}

impl From<MalformedData> for LoadError {
    fn from(detail: MalformedData) -> Self {
        LoadError::MalformedData {
            path: PathBuf::new(),
            detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
