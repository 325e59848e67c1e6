//! Imported scene data model
//!
//! This is the shape an importer hands to the converter: an owned node tree,
//! flat mesh and material tables, and the textures packed inside the file.
//! The converter only ever reads it.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Error type for scene import
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),

    #[error("Scene has no root node")]
    NoRootNode,

    #[cfg(feature = "gltf-import")]
    #[error("GLTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Post-processing requested from the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcess {
    /// Split every polygon into triangles
    pub triangulate: bool,
    /// Convert to a left-handed, clockwise-winding, top-left uv origin space
    pub convert_to_left_handed: bool,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            triangulate: true,
            convert_to_left_handed: true,
        }
    }
}

/// Reads a scene file into an [`ImportedScene`]
pub trait SceneImporter {
    fn read_file(&self, path: &Path, flags: PostProcess) -> Result<ImportedScene, ImportError>;
}

/// Semantic role of a material texture slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Normals,
    Emissive,
}

/// A node of the imported hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Indices into [`ImportedScene::meshes`]
    pub mesh_indices: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, mesh_indices: impl IntoIterator<Item = usize>) -> Self {
        self.mesh_indices.extend(mesh_indices);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// One polygon of a mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self {
            indices: vec![a, b, c],
        }
    }
}

/// An imported mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// First texture-coordinate channel, one entry per vertex
    pub tex_coords: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Face>,
    /// Index into [`ImportedScene::materials`]
    pub material_index: Option<usize>,
}

/// An imported material, reduced to its texture slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    textures: HashMap<TextureRole, Vec<String>>,
}

impl ImportedMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: HashMap::new(),
        }
    }

    /// Append a texture slot for `role`
    pub fn add_texture(&mut self, role: TextureRole, identifier: impl Into<String>) {
        self.textures.entry(role).or_default().push(identifier.into());
    }

    pub fn with_texture(mut self, role: TextureRole, identifier: impl Into<String>) -> Self {
        self.add_texture(role, identifier);
        self
    }

    /// Number of texture slots declared for `role`
    pub fn texture_count(&self, role: TextureRole) -> usize {
        self.textures.get(&role).map_or(0, Vec::len)
    }

    /// Source identifier of slot `slot` for `role`
    pub fn texture(&self, role: TextureRole, slot: usize) -> Option<&str> {
        self.textures
            .get(&role)
            .and_then(|slots| slots.get(slot))
            .map(String::as_str)
    }
}

/// A texture packed inside the scene file
///
/// With `height == 0` the payload is a compressed image of `width` bytes.
/// Otherwise it holds `width * height` raw BGRA8 texels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedTexture {
    /// Original file name, if the file recorded one
    pub filename: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Format hint for compressed payloads, e.g. `png`
    pub format_hint: String,
    pub data: Vec<u8>,
}

impl EmbeddedTexture {
    /// Compressed payload of `data.len()` bytes
    pub fn compressed(data: Vec<u8>, format_hint: impl Into<String>) -> Self {
        Self {
            filename: None,
            width: data.len() as u32,
            height: 0,
            format_hint: format_hint.into(),
            data,
        }
    }

    /// Raw BGRA8 payload
    pub fn raw(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            filename: None,
            width,
            height,
            format_hint: String::new(),
            data,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }
}

/// A fully imported scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    pub root: SceneNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
}

impl ImportedScene {
    /// Look up an embedded texture by identifier
    ///
    /// `*N` addresses embedded texture `N` directly. Any other identifier is
    /// matched by its last path component against the textures' file names.
    pub fn embedded_texture(&self, identifier: &str) -> Option<&EmbeddedTexture> {
        if let Some(index) = identifier.strip_prefix('*') {
            return index
                .parse::<usize>()
                .ok()
                .and_then(|i| self.embedded_textures.get(i));
        }

        let short = short_name(identifier);
        self.embedded_textures.iter().find(|texture| {
            texture
                .filename
                .as_deref()
                .is_some_and(|name| short_name(name) == short)
        })
    }

    /// Number of mesh references across the whole node tree
    pub fn referenced_mesh_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += node.mesh_indices.len();
            stack.extend(node.children.iter());
        }
        count
    }
}

fn short_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_embedded() -> ImportedScene {
        let mut named = EmbeddedTexture::compressed(vec![1, 2, 3], "png");
        named.filename = Some("textures/albedo.png".to_string());

        ImportedScene {
            embedded_textures: vec![EmbeddedTexture::raw(1, 1, vec![0; 4]), named],
            ..Default::default()
        }
    }

    #[test]
    fn test_embedded_lookup_by_index() {
        let scene = scene_with_embedded();
        let texture = scene.embedded_texture("*0").unwrap();
        assert!(!texture.is_compressed());
        assert!(scene.embedded_texture("*2").is_none());
        assert!(scene.embedded_texture("*x").is_none());
    }

    #[test]
    fn test_embedded_lookup_by_file_name() {
        let scene = scene_with_embedded();
        let texture = scene.embedded_texture("C:\\art\\albedo.png").unwrap();
        assert!(texture.is_compressed());
        assert_eq!(texture.width, 3);
        assert!(scene.embedded_texture("other.png").is_none());
    }

    #[test]
    fn test_material_slots() {
        let material = ImportedMaterial::new("brick")
            .with_texture(TextureRole::Diffuse, "a.png")
            .with_texture(TextureRole::Diffuse, "b.png");

        assert_eq!(material.texture_count(TextureRole::Diffuse), 2);
        assert_eq!(material.texture(TextureRole::Diffuse, 1), Some("b.png"));
        assert_eq!(material.texture_count(TextureRole::Normals), 0);
        assert_eq!(material.texture(TextureRole::Normals, 0), None);
    }

    #[test]
    fn test_referenced_mesh_count() {
        let scene = ImportedScene {
            root: SceneNode::new("root")
                .with_meshes([0])
                .with_child(SceneNode::new("a").with_meshes([1, 0]))
                .with_child(SceneNode::new("b").with_child(SceneNode::new("c").with_meshes([2]))),
            ..Default::default()
        };
        assert_eq!(scene.referenced_mesh_count(), 4);
        assert_eq!(scene.root.node_count(), 4);
    }
}
