//! Per-model texture cache
//!
//! Maps a texture's source identifier to the GPU view created for it, so a
//! texture shared by several meshes is uploaded once. Entries live exactly as
//! long as the owning model; there is no eviction.

pub mod metrics;

use std::collections::HashMap;

use crate::error::{LoaderError, Result};
use crate::gpu::GpuDevice;
use crate::scene::TextureRole;
use metrics::CacheMetrics;

/// Position of a record in its [`TextureCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(usize);

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A texture resolved for a material slot
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRecord<V> {
    pub role: TextureRole,
    /// Source identifier exactly as the importer reported it
    pub path: String,
    /// `None` when decoding failed or after release
    pub view: Option<V>,
}

impl<V> TextureRecord<V> {
    pub fn new(role: TextureRole, path: impl Into<String>, view: Option<V>) -> Self {
        Self {
            role,
            path: path.into(),
            view,
        }
    }
}

/// Registry of every texture a model uploaded, in first-encountered order
#[derive(Debug)]
pub struct TextureCache<V> {
    records: Vec<TextureRecord<V>>,
    by_path: HashMap<String, TextureId>,
    metrics: CacheMetrics,
}

impl<V> Default for TextureCache<V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            by_path: HashMap::new(),
            metrics: CacheMetrics::new(),
        }
    }
}

impl<V> TextureCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the record for `path`, compared byte for byte
    pub fn lookup(&self, path: &str) -> Option<TextureId> {
        let found = self.by_path.get(path).copied();
        match found {
            Some(_) => self.metrics.record_cache_hit(),
            None => self.metrics.record_cache_miss(),
        }
        found
    }

    /// Add a record; its path must not be cached yet
    pub fn insert(&mut self, record: TextureRecord<V>) -> Result<TextureId> {
        if self.by_path.contains_key(&record.path) {
            return Err(LoaderError::DuplicateTexture(record.path));
        }

        let id = TextureId(self.records.len());
        self.by_path.insert(record.path.clone(), id);
        self.records.push(record);
        Ok(id)
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureRecord<V>> {
        self.records.get(id.0)
    }

    /// The live view behind `id`, if any
    pub fn view(&self, id: TextureId) -> Option<&V> {
        self.get(id).and_then(|record| record.view.as_ref())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TextureRecord<V>> {
        self.records.iter()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Release every live view once and null its handle
    ///
    /// Records stay in place so outstanding [`TextureId`]s remain valid.
    pub fn release_all<G>(&mut self, device: &G)
    where
        G: GpuDevice<TextureView = V>,
    {
        for record in &mut self.records {
            if let Some(view) = record.view.take() {
                log::trace!("Releasing texture {}", record.path);
                device.destroy_view(view);
            }
        }
    }

    /// Drop every record without releasing anything
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_path.clear();
        self.metrics.reset();
    }
}
