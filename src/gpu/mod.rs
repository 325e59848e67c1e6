//! GPU abstraction layer for backend-agnostic resource creation and drawing
//!
//! The loader never talks to a graphics API directly. Resource creation goes
//! through [`GpuDevice`], draw submission through [`GpuContext`], so any
//! backend (D3D11, wgpu, Vulkan, the in-memory mock) can sit underneath.

pub mod mock;

use std::fmt::Debug;
use std::path::Path;
use thiserror::Error;

use crate::texture::TextureError;

/// Error type for GPU operations
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Buffer creation failed: {0}")]
    BufferCreationFailed(String),

    #[error("Texture creation failed: {0}")]
    TextureCreationFailed(String),

    #[error("Shader resource view creation failed: {0}")]
    ViewCreationFailed(String),

    #[error("Texture decode failed: {0}")]
    Decode(#[from] TextureError),

    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),
}

/// Result type for GPU operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
}

/// Element type of a bound index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    R16Uint,
    R32Uint,
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuTextureFormat {
    /// RGBA 8-bit unorm, produced by the image decode helpers
    Rgba8Unorm,
    /// BGRA 8-bit unorm, the layout of raw embedded textures
    Bgra8Unorm,
}

impl GpuTextureFormat {
    /// Bytes per texel
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
        }
    }
}

/// Texture descriptor for creation
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texture format
    pub format: GpuTextureFormat,
    /// Number of mip levels (1 = no mipmaps)
    pub mip_levels: u32,
    /// Bytes between the starts of two consecutive rows of the initial data
    pub row_pitch: u32,
}

impl TextureDescriptor {
    /// Descriptor for a tightly packed, single-mip 2D texture
    ///
    /// `None` when a row of `width` texels does not fit a `u32` pitch.
    pub fn packed(width: u32, height: u32, format: GpuTextureFormat) -> Option<Self> {
        let row_pitch = width.checked_mul(format.bytes_per_pixel())?;
        Some(Self {
            width,
            height,
            format,
            mip_levels: 1,
            row_pitch,
        })
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: GpuTextureFormat::Rgba8Unorm,
            mip_levels: 1,
            row_pitch: 4,
        }
    }
}

/// Core GPU device trait for resource creation
///
/// Buffers are immutable: their contents are fixed at creation. Textures are
/// only ever sampled through a shader-resource view; creating a view takes
/// ownership of the texture, so releasing the view releases both.
///
/// # Example
/// ```ignore
/// let gpu = MockGpu::new();
/// let buffer = gpu.create_immutable_buffer(BufferUsage::Vertex, &bytes)?;
/// gpu.destroy_buffer(buffer);
/// ```
pub trait GpuDevice: Send + Sync + Clone + Debug {
    /// Buffer type for this GPU backend
    type Buffer: Clone + Send + Sync + Debug;

    /// Texture type for this GPU backend
    type Texture: Send + Sync + Debug;

    /// Shader-readable view type for this GPU backend
    type TextureView: Clone + Send + Sync + Debug;

    /// Create an immutable buffer initialised with `data`
    fn create_immutable_buffer(&self, usage: BufferUsage, data: &[u8])
        -> GpuResult<Self::Buffer>;

    /// Create a 2D texture from raw pixel data laid out with `desc.row_pitch`
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture>;

    /// Wrap a texture in a shader-readable view
    fn create_shader_resource_view(&self, texture: Self::Texture)
        -> GpuResult<Self::TextureView>;

    /// Decode a compressed image file and upload it
    fn create_texture_from_file(&self, path: &Path) -> GpuResult<Self::TextureView> {
        crate::texture::upload_image_file(self, path)
    }

    /// Decode a compressed image held in memory and upload it
    fn create_texture_from_memory(&self, bytes: &[u8]) -> GpuResult<Self::TextureView> {
        crate::texture::upload_encoded_image(self, bytes)
    }

    /// Release a buffer
    fn destroy_buffer(&self, _buffer: Self::Buffer) {
        // Default: let Drop handle it
    }

    /// Release a shader-resource view and the texture behind it
    fn destroy_view(&self, _view: Self::TextureView) {}

    /// Get the name of this GPU backend (for debugging)
    fn backend_name(&self) -> &'static str;
}

/// Draw submission against a device's resources
pub trait GpuContext<G: GpuDevice> {
    /// Bind a vertex buffer to an input slot
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &G::Buffer, stride: u32, offset: u32);

    /// Bind the index buffer
    fn set_index_buffer(&mut self, buffer: &G::Buffer, format: IndexFormat, offset: u32);

    /// Bind a shader-resource view to a pixel shader slot, `None` unbinds it
    fn set_shader_resource(&mut self, slot: u32, view: Option<&G::TextureView>);

    /// Submit an indexed draw
    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);
}

pub use mock::{MockContext, MockGpu};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_debug() {
        let usage = BufferUsage::Vertex;
        assert_eq!(format!("{:?}", usage), "Vertex");
    }

    #[test]
    fn test_texture_descriptor_default() {
        let desc = TextureDescriptor::default();
        assert_eq!(desc.width, 1);
        assert_eq!(desc.height, 1);
        assert_eq!(desc.mip_levels, 1);
        assert_eq!(desc.row_pitch, 4);
    }

    #[test]
    fn test_packed_descriptor_pitch() {
        let desc = TextureDescriptor::packed(16, 8, GpuTextureFormat::Bgra8Unorm).unwrap();
        assert_eq!(desc.row_pitch, 64);
        assert_eq!(desc.mip_levels, 1);
    }

    #[test]
    fn test_packed_descriptor_rejects_pitch_overflow() {
        assert!(TextureDescriptor::packed(0x4000_0001, 1, GpuTextureFormat::Bgra8Unorm).is_none());
        assert!(TextureDescriptor::packed(u32::MAX / 4, 1, GpuTextureFormat::Bgra8Unorm).is_some());
    }
}
