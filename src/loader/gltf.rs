//! GLTF/GLB scene import
//!
//! Reads a `.gltf` or `.glb` file into an [`ImportedScene`]. Every primitive
//! becomes its own imported mesh. Images stored in buffer views or base64
//! data URIs become embedded textures addressed as `*N`; images referenced by
//! any other URI keep the URI as their identifier and are resolved next to
//! the model.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use gltf::image::Source;
use gltf::mesh::Mode;
use gltf::Gltf;

use crate::scene::{
    EmbeddedTexture, Face, ImportError, ImportedMaterial, ImportedMesh, ImportedScene,
    PostProcess, SceneImporter, SceneNode, TextureRole,
};

/// [`SceneImporter`] for glTF 2.0 files
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter;

impl GltfImporter {
    pub fn new() -> Self {
        Self
    }
}

impl SceneImporter for GltfImporter {
    fn read_file(&self, path: &Path, flags: PostProcess) -> Result<ImportedScene, ImportError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gltf") || ext.eq_ignore_ascii_case("glb") => {}
            other => {
                return Err(ImportError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        }
        std::fs::metadata(path)?;

        let Gltf { document, blob } = Gltf::open(path)?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)?;

        log::debug!(
            "Parsed {} with {} meshes, {} materials and {} images",
            path.display(),
            document.meshes().len(),
            document.materials().len(),
            document.images().len()
        );

        let (embedded_textures, image_identifiers) = load_images(&document, &buffers);
        let materials = document
            .materials()
            .enumerate()
            .map(|(i, material)| load_material(i, &material, &image_identifiers))
            .collect();

        let mut meshes = Vec::new();
        let mut primitive_meshes: HashMap<usize, Vec<usize>> = HashMap::new();
        for mesh in document.meshes() {
            let primitive_count = mesh.primitives().len();
            for primitive in mesh.primitives() {
                let name = match (mesh.name(), primitive_count) {
                    (Some(name), 1) => name.to_string(),
                    (Some(name), _) => format!("{name}#{}", primitive.index()),
                    (None, _) => format!("mesh{}#{}", mesh.index(), primitive.index()),
                };

                let Some(imported) = load_primitive(name, &primitive, &buffers, flags) else {
                    continue;
                };
                primitive_meshes
                    .entry(mesh.index())
                    .or_default()
                    .push(meshes.len());
                meshes.push(imported);
            }
        }

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(ImportError::NoRootNode)?;
        let mut roots: Vec<SceneNode> = scene
            .nodes()
            .map(|node| load_node(&node, &primitive_meshes))
            .collect();
        let root = match roots.len() {
            0 => return Err(ImportError::NoRootNode),
            1 => roots.remove(0),
            _ => SceneNode {
                name: "ROOT".to_string(),
                mesh_indices: Vec::new(),
                children: roots,
            },
        };

        Ok(ImportedScene {
            root,
            meshes,
            materials,
            embedded_textures,
        })
    }
}

/// Split images into embedded textures and identifiers per image index
fn load_images(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> (Vec<EmbeddedTexture>, Vec<String>) {
    let mut embedded = Vec::new();
    let mut identifiers = Vec::with_capacity(document.images().len());

    for image in document.images() {
        match image.source() {
            Source::Uri { uri, mime_type } => {
                let Some(header_and_payload) = uri.strip_prefix("data:") else {
                    identifiers.push(uri.to_string());
                    continue;
                };

                let (data, media_type) = decode_data_uri(header_and_payload).unwrap_or_else(|| {
                    log::error!("Image {} has a malformed base64 data URI", image.index());
                    (Vec::new(), "")
                });
                let media_type = mime_type.unwrap_or(media_type);
                let format_hint = media_type.rsplit('/').next().unwrap_or(media_type);
                let mut texture = EmbeddedTexture::compressed(data, format_hint);
                texture.filename = image.name().map(str::to_string);

                identifiers.push(format!("*{}", embedded.len()));
                embedded.push(texture);
            }
            Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let data = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.0.get(start..end))
                    .map(<[u8]>::to_vec)
                    .unwrap_or_else(|| {
                        log::error!("Image {} buffer view is out of bounds", image.index());
                        Vec::new()
                    });

                let format_hint = mime_type.rsplit('/').next().unwrap_or(mime_type);
                let mut texture = EmbeddedTexture::compressed(data, format_hint);
                texture.filename = image.name().map(str::to_string);

                identifiers.push(format!("*{}", embedded.len()));
                embedded.push(texture);
            }
        }
    }

    (embedded, identifiers)
}

/// Decode the part of a `data:` URI after the scheme
///
/// Returns the payload and its media type. Only base64 payloads are
/// accepted.
fn decode_data_uri(header_and_payload: &str) -> Option<(Vec<u8>, &str)> {
    let (header, payload) = header_and_payload.split_once(',')?;
    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default();
    if !params.any(|param| param == "base64") {
        return None;
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((data, media_type))
}

fn load_material(
    index: usize,
    material: &gltf::Material,
    image_identifiers: &[String],
) -> ImportedMaterial {
    let name = material
        .name()
        .map_or_else(|| format!("material{index}"), str::to_string);
    let mut imported = ImportedMaterial::new(name);

    let identifier = |texture: gltf::Texture| image_identifiers.get(texture.source().index()).cloned();

    if let Some(id) = material
        .pbr_metallic_roughness()
        .base_color_texture()
        .and_then(|info| identifier(info.texture()))
    {
        imported.add_texture(TextureRole::Diffuse, id);
    }
    if let Some(id) = material
        .normal_texture()
        .and_then(|normal| identifier(normal.texture()))
    {
        imported.add_texture(TextureRole::Normals, id);
    }
    if let Some(id) = material
        .emissive_texture()
        .and_then(|info| identifier(info.texture()))
    {
        imported.add_texture(TextureRole::Emissive, id);
    }

    log::debug!(
        "  - Material {}: {} diffuse texture(s)",
        imported.name,
        imported.texture_count(TextureRole::Diffuse)
    );
    imported
}

fn load_primitive(
    name: String,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    flags: PostProcess,
) -> Option<ImportedMesh> {
    let mode = primitive.mode();
    if matches!(
        mode,
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip
    ) {
        log::warn!("Skipping {name}: {mode:?} primitives cannot be drawn as triangles");
        return None;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping {name}: no positions");
        return None;
    };
    let mut positions: Vec<[f32; 3]> = positions.collect();
    let mut tex_coords: Option<Vec<[f32; 3]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().map(|[u, v]| [u, v, 0.0]).collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let mut faces = build_faces(mode, &indices, flags.triangulate);

    if flags.convert_to_left_handed {
        // glTF already puts the uv origin top-left, only z and winding flip
        for position in &mut positions {
            position[2] = -position[2];
        }
        for face in &mut faces {
            face.indices.reverse();
        }
    }
    if let Some(coords) = tex_coords.as_mut() {
        coords.truncate(positions.len());
    }

    log::debug!(
        "    - {name}: {} vertices, {} faces",
        positions.len(),
        faces.len()
    );
    Some(ImportedMesh {
        name,
        positions,
        tex_coords,
        faces,
        material_index: primitive.material().index(),
    })
}

/// Group primitive indices into faces
///
/// Strips and fans become triangles when `triangulate` is set and stay a
/// single polygon otherwise.
fn build_faces(mode: Mode, indices: &[u32], triangulate: bool) -> Vec<Face> {
    match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|tri| Face::triangle(tri[0], tri[1], tri[2]))
            .collect(),
        Mode::TriangleStrip if triangulate => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    Face::triangle(w[0], w[1], w[2])
                } else {
                    Face::triangle(w[1], w[0], w[2])
                }
            })
            .collect(),
        Mode::TriangleFan if triangulate => match indices.split_first() {
            Some((&center, rest)) => rest
                .windows(2)
                .map(|w| Face::triangle(center, w[0], w[1]))
                .collect(),
            None => Vec::new(),
        },
        _ if indices.is_empty() => Vec::new(),
        _ => vec![Face {
            indices: indices.to_vec(),
        }],
    }
}

fn load_node(node: &gltf::Node, primitive_meshes: &HashMap<usize, Vec<usize>>) -> SceneNode {
    let name = node
        .name()
        .map_or_else(|| format!("node{}", node.index()), str::to_string);
    let mesh_indices = node
        .mesh()
        .and_then(|mesh| primitive_meshes.get(&mesh.index()))
        .cloned()
        .unwrap_or_default();
    let children = node
        .children()
        .map(|child| load_node(&child, primitive_meshes))
        .collect();

    SceneNode {
        name,
        mesh_indices,
        children,
    }
}
