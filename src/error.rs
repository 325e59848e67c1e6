//! Error types for mesh_bridge

use thiserror::Error;

/// Main error type for model loading operations
///
/// Every variant terminates the current `load`. Texture decode problems are
/// not errors; they surface as [`crate::diagnostics::Diagnostic`]s instead.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Mesh {mesh} has no geometry ({vertices} vertices, {faces} faces)")]
    EmptyGeometry {
        mesh: String,
        vertices: usize,
        faces: usize,
    },

    #[error("Mesh {0} resolved no diffuse texture")]
    MissingTextures(String),

    #[error("Mesh {mesh} references material {index}, scene has {count}")]
    InvalidMaterial {
        mesh: String,
        index: usize,
        count: usize,
    },

    #[error("Node {node} references mesh {index}, scene has {count}")]
    InvalidMeshIndex {
        node: String,
        index: usize,
        count: usize,
    },

    #[error("Texture {0} is already cached")]
    DuplicateTexture(String),

    #[error("GPU error: {0}")]
    Gpu(#[from] crate::gpu::GpuError),
}

/// Result type alias for loading operations
pub type Result<T> = std::result::Result<T, LoaderError>;
