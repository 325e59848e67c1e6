//! Model lifetime: import, convert, draw, close

use std::path::{Path, PathBuf};

use crate::cache::metrics::CacheMetrics;
use crate::cache::TextureCache;
use crate::converter::{ConversionTarget, SceneConverter};
use crate::diagnostics::Notifier;
use crate::error::Result;
use crate::gpu::{GpuContext, GpuDevice};
use crate::renderer::GpuMesh;
use crate::resolver::TextureResolver;
use crate::scene::{PostProcess, SceneImporter};

/// Loader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Post-processing requested from the importer
    pub post_process: PostProcess,
    /// Dump converted vertices and indices at trace level
    pub trace_geometry: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            post_process: PostProcess::default(),
            trace_geometry: false,
        }
    }
}

/// Owns every GPU resource of one loaded model
///
/// # Example
/// ```ignore
/// let mut model = ModelLoader::gltf();
/// if model.load(&LogNotifier, gpu, "assets/crate.gltf")? {
///     model.draw(&mut context);
/// }
/// model.close();
/// ```
pub struct ModelLoader<G: GpuDevice, I: SceneImporter> {
    importer: I,
    config: LoaderConfig,
    device: Option<G>,
    directory: PathBuf,
    meshes: Vec<GpuMesh<G>>,
    textures: TextureCache<G::TextureView>,
}

impl<G: GpuDevice, I: SceneImporter> ModelLoader<G, I> {
    pub fn new(importer: I) -> Self {
        Self::with_config(importer, LoaderConfig::default())
    }

    pub fn with_config(importer: I, config: LoaderConfig) -> Self {
        Self {
            importer,
            config,
            device: None,
            directory: PathBuf::new(),
            meshes: Vec::new(),
            textures: TextureCache::new(),
        }
    }

    /// Import `path` and upload every mesh it references
    ///
    /// Returns `Ok(false)` when the importer rejects the file; nothing is
    /// changed in that case. Texture problems are reported to `notifier` and
    /// never fail the load. On `Err` the meshes built so far stay owned by
    /// the loader until [`close`](Self::close).
    pub fn load(
        &mut self,
        notifier: &dyn Notifier,
        device: G,
        path: impl AsRef<Path>,
    ) -> Result<bool> {
        let path = path.as_ref();
        log::info!("Loading model {} on {}", path.display(), device.backend_name());

        let scene = match self.importer.read_file(path, self.config.post_process) {
            Ok(scene) => scene,
            Err(e) => {
                log::warn!("Failed to import {}: {e}", path.display());
                return Ok(false);
            }
        };

        self.close();
        self.meshes.clear();
        self.textures.clear();
        self.directory = base_directory(path);
        let device = self.device.insert(device);

        let resolver = TextureResolver::new(&*device, &self.directory);
        let converter =
            SceneConverter::new(&*device, resolver).with_geometry_trace(self.config.trace_geometry);

        let mut diagnostics = Vec::new();
        let mut target = ConversionTarget {
            meshes: &mut self.meshes,
            textures: &mut self.textures,
            diagnostics: &mut diagnostics,
        };
        let result = converter.convert_tree(&scene, &scene.root, &mut target);

        for diagnostic in &diagnostics {
            notifier.notify(diagnostic);
        }

        let converted = result?;
        log::info!(
            "Loaded {}: {converted} meshes, {} textures, {} diagnostics",
            path.display(),
            self.textures.len(),
            diagnostics.len()
        );
        Ok(true)
    }

    /// Draw every mesh in load order
    pub fn draw<C: GpuContext<G>>(&self, context: &mut C) {
        for mesh in &self.meshes {
            mesh.draw(context, &self.textures);
        }
    }

    /// Release all textures, then all mesh buffers
    ///
    /// Safe to call repeatedly; handles are emptied as they are released.
    pub fn close(&mut self) {
        let Some(device) = self.device.as_ref() else {
            return;
        };

        self.textures.release_all(device);
        for mesh in &mut self.meshes {
            mesh.release(device);
        }
        log::debug!("Closed model with {} meshes", self.meshes.len());
    }

    pub fn meshes(&self) -> &[GpuMesh<G>] {
        &self.meshes
    }

    pub fn textures(&self) -> &TextureCache<G::TextureView> {
        &self.textures
    }

    /// Directory texture file names are resolved against
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.textures.metrics()
    }

    /// Whether any mesh still holds GPU buffers
    pub fn is_loaded(&self) -> bool {
        self.meshes.iter().any(GpuMesh::is_resident)
    }
}

#[cfg(feature = "gltf-import")]
impl<G: GpuDevice> ModelLoader<G, crate::loader::GltfImporter> {
    /// Loader backed by the bundled glTF importer
    pub fn gltf() -> Self {
        Self::new(crate::loader::GltfImporter::new())
    }
}

/// Everything up to the last `/` or `\`, or an empty path without one
///
/// Paths that are not valid UTF-8 fall back to the platform's own parent.
fn base_directory(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) => PathBuf::from(text.rfind(['/', '\\']).map_or("", |i| &text[..i])),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    }
}

impl<G: GpuDevice, I: SceneImporter> Drop for ModelLoader<G, I> {
    fn drop(&mut self) {
        self.close();
    }
}
