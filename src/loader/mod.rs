//! Loader module for scene format handling
//!
//! Contains format-specific [`crate::scene::SceneImporter`] implementations.

#[cfg(feature = "gltf-import")]
pub mod gltf;

#[cfg(feature = "gltf-import")]
pub use self::gltf::GltfImporter;
