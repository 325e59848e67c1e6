//! Texture decoding and the default upload helpers of [`GpuDevice`]

use image::io::Reader as ImageReader;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

use crate::gpu::{GpuDevice, GpuError, GpuResult, GpuTextureFormat, TextureDescriptor};

/// Error type for texture decoding operations
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Image decoding error: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded, tightly packed RGBA8 image
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Texture {
    /// Descriptor matching this image's layout
    pub fn descriptor(&self) -> Option<TextureDescriptor> {
        TextureDescriptor::packed(self.width, self.height, GpuTextureFormat::Rgba8Unorm)
    }
}

/// Decodes compressed image files (PNG, JPEG, BMP, TGA)
#[derive(Default, Clone)]
pub struct TextureLoader;

impl TextureLoader {
    /// Create a new texture loader
    pub fn new() -> Self {
        Self
    }

    /// Decode an image from binary data, sniffing the format
    pub fn load(&self, data: &[u8]) -> Result<Texture, TextureError> {
        self.load_with_hint(data, None)
    }

    /// Decode an image, falling back to `hint` when the header is not
    /// recognised (TGA carries no magic bytes)
    pub fn load_with_hint(
        &self,
        data: &[u8],
        hint: Option<ImageFormat>,
    ) -> Result<Texture, TextureError> {
        let format = match image::guess_format(data) {
            Ok(format) => format,
            Err(e) => hint.ok_or_else(|| TextureError::DecodeError(e.to_string()))?,
        };

        match format {
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tga => {}
            _ => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "Only PNG, JPEG, BMP and TGA are supported, got {:?}",
                    format.extensions_str()
                )))
            }
        }

        let img = ImageReader::with_format(std::io::Cursor::new(data), format)
            .decode()
            .map_err(|e| TextureError::DecodeError(e.to_string()))?;

        let rgba_img = img.into_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Texture {
            width,
            height,
            data: rgba_img.into_raw(),
        })
    }

    /// Decode an image file synchronously
    pub fn load_file_sync<P: AsRef<Path>>(&self, path: P) -> Result<Texture, TextureError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.load_with_hint(&data, ImageFormat::from_path(path).ok())
    }
}

/// Decode `bytes` and upload them as a single-mip RGBA8 texture view
pub fn upload_encoded_image<G: GpuDevice>(device: &G, bytes: &[u8]) -> GpuResult<G::TextureView> {
    let texture = TextureLoader::new().load(bytes)?;
    upload(device, &texture)
}

/// Decode the image at `path` and upload it as a single-mip RGBA8 texture view
pub fn upload_image_file<G: GpuDevice>(device: &G, path: &Path) -> GpuResult<G::TextureView> {
    log::debug!("Decoding texture file {}", path.display());
    let texture = TextureLoader::new().load_file_sync(path)?;
    upload(device, &texture)
}

fn upload<G: GpuDevice>(device: &G, texture: &Texture) -> GpuResult<G::TextureView> {
    let desc = texture
        .descriptor()
        .ok_or(GpuError::InvalidSize(texture.data.len()))?;
    let gpu_texture = device.create_texture(&desc, &texture.data)?;
    device.create_shader_resource_view(gpu_texture)
}
