//! Material texture resolution
//!
//! For every texture slot of a material the resolver reuses a cached view,
//! decodes an embedded blob, or decodes a file next to the model, in that
//! order of preference.

use std::path::Path;

use crate::cache::{TextureCache, TextureId, TextureRecord};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::gpu::{GpuDevice, GpuTextureFormat, TextureDescriptor};
use crate::scene::{EmbeddedTexture, ImportedMaterial, ImportedScene, TextureRole};

/// Resolves material texture slots into cache entries
#[derive(Debug)]
pub struct TextureResolver<'a, G: GpuDevice> {
    device: &'a G,
    base_directory: &'a Path,
}

impl<'a, G: GpuDevice> TextureResolver<'a, G> {
    /// `base_directory` is where external texture identifiers are resolved
    pub fn new(device: &'a G, base_directory: &'a Path) -> Self {
        Self {
            device,
            base_directory,
        }
    }

    /// Resolve every `role` slot of `material`, in slot order
    ///
    /// A slot that fails to decode still yields a record, with no view, and
    /// pushes a diagnostic. New records are added to `cache`.
    pub fn resolve(
        &self,
        scene: &ImportedScene,
        material: &ImportedMaterial,
        role: TextureRole,
        cache: &mut TextureCache<G::TextureView>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<TextureId>> {
        let count = material.texture_count(role);
        let mut resolved = Vec::with_capacity(count);

        for slot in 0..count {
            let Some(identifier) = material.texture(role, slot) else {
                continue;
            };

            if let Some(id) = cache.lookup(identifier) {
                log::trace!("Texture {identifier} already loaded");
                resolved.push(id);
                continue;
            }

            let outcome = match scene.embedded_texture(identifier) {
                Some(embedded) => self.load_embedded(identifier, embedded),
                None => self.load_file(identifier),
            };

            let view = match outcome {
                Ok(view) => {
                    cache.metrics().record_upload();
                    Some(view)
                }
                Err(diagnostic) => {
                    log::warn!("{diagnostic}");
                    cache.metrics().record_decode_failure();
                    diagnostics.push(diagnostic);
                    None
                }
            };

            let id = cache.insert(TextureRecord::new(role, identifier, view))?;
            resolved.push(id);
        }

        Ok(resolved)
    }

    fn load_file(&self, identifier: &str) -> std::result::Result<G::TextureView, Diagnostic> {
        let path = self.base_directory.join(identifier);
        log::debug!("Loading texture file {}", path.display());

        self.device.create_texture_from_file(&path).map_err(|e| {
            Diagnostic::new(
                DiagnosticKind::TextureFile,
                identifier,
                format!("{}: {e}", path.display()),
            )
        })
    }

    /// Decode an embedded texture
    ///
    /// `height == 0` means a compressed image of `width` bytes; anything else
    /// is raw BGRA8 uploaded with a row pitch of `width * 4`.
    pub fn load_embedded(
        &self,
        identifier: &str,
        embedded: &EmbeddedTexture,
    ) -> std::result::Result<G::TextureView, Diagnostic> {
        if embedded.is_compressed() {
            let len = embedded.width as usize;
            let payload = embedded.data.get(..len).ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::MalformedEmbedded,
                    identifier,
                    format!("declares {len} bytes, holds {}", embedded.data.len()),
                )
            })?;

            log::debug!("Decoding embedded {} texture {identifier} ({len} bytes)", embedded.format_hint);
            return self.device.create_texture_from_memory(payload).map_err(|e| {
                Diagnostic::new(DiagnosticKind::EmbeddedMemory, identifier, e.to_string())
            });
        }

        let desc = TextureDescriptor::packed(
            embedded.width,
            embedded.height,
            GpuTextureFormat::Bgra8Unorm,
        );
        let len = desc
            .as_ref()
            .and_then(|desc| (desc.row_pitch as usize).checked_mul(embedded.height as usize));
        let (Some(desc), Some(payload)) = (desc, len.and_then(|len| embedded.data.get(..len)))
        else {
            return Err(Diagnostic::new(
                DiagnosticKind::MalformedEmbedded,
                identifier,
                format!(
                    "{}x{} texels do not fit in {} bytes",
                    embedded.width,
                    embedded.height,
                    embedded.data.len()
                ),
            ));
        };

        log::debug!(
            "Uploading raw embedded texture {identifier} ({}x{})",
            embedded.width,
            embedded.height
        );
        let texture = self.device.create_texture(&desc, payload).map_err(|e| {
            Diagnostic::new(DiagnosticKind::EmbeddedTexture, identifier, e.to_string())
        })?;
        self.device
            .create_shader_resource_view(texture)
            .map_err(|e| Diagnostic::new(DiagnosticKind::EmbeddedView, identifier, e.to_string()))
    }
}
