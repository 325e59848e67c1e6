//! mesh_bridge - Scene-graph to GPU resource bridge
//!
//! # Features
//! - Backend-agnostic GPU device and draw context traits
//! - Depth-first conversion of an imported node tree into GPU meshes
//! - Per-model texture cache keyed by source identifier
//! - Embedded (compressed or raw BGRA8) and external texture decoding
//! - Non-fatal texture diagnostics through a notifier
//!
//! # Quick Start
//!
//! ```ignore
//! use mesh_bridge::{LogNotifier, MockContext, MockGpu, ModelLoader};
//!
//! let mut model = ModelLoader::gltf();
//! if model.load(&LogNotifier, MockGpu::new(), "assets/box.gltf")? {
//!     model.draw(&mut MockContext::new());
//! }
//! model.close();
//! ```
//!
//! # Feature Flags
//!
//! - `gltf-import` (default): bundled glTF/GLB importer

// Core modules
pub mod cache;
pub mod gpu;
pub mod loader;
pub mod scene;

// Pipeline
pub mod converter;
pub mod diagnostics;
pub mod model;
pub mod renderer;
pub mod resolver;
pub mod texture;

// Error types
mod error;
pub use error::{LoaderError, Result};

// Re-export cache types
pub use cache::metrics::CacheMetrics;
pub use cache::{TextureCache, TextureId, TextureRecord};

// Re-export GPU types
pub use gpu::mock::{MockContext, MockGpu};
pub use gpu::{
    BufferUsage, GpuContext, GpuDevice, GpuError, GpuResult, GpuTextureFormat, IndexFormat,
    TextureDescriptor,
};

// Re-export scene types
pub use scene::{
    EmbeddedTexture, Face, ImportError, ImportedMaterial, ImportedMesh, ImportedScene,
    PostProcess, SceneImporter, SceneNode, TextureRole,
};

#[cfg(feature = "gltf-import")]
pub use loader::GltfImporter;

// Re-export pipeline types
pub use converter::{ConversionTarget, SceneConverter};
pub use diagnostics::{CollectingNotifier, Diagnostic, DiagnosticKind, LogNotifier, Notifier};
pub use model::{LoaderConfig, ModelLoader};
pub use renderer::{GpuMesh, Vertex};
pub use resolver::TextureResolver;
pub use texture::{Texture, TextureError, TextureLoader};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
