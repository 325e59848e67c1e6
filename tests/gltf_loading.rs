//! End-to-end loading of glTF files through the bundled importer

#![cfg(feature = "gltf-import")]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use mesh_bridge::gpu::mock::GpuCall;
use mesh_bridge::{CollectingNotifier, DiagnosticKind, MockContext, MockGpu, ModelLoader};

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mesh_bridge_it_{}_{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

/// Quad split into two triangles; two nodes share it, a third uses the
/// embedded texture
fn write_model(dir: &Path, external_texture: &str) -> PathBuf {
    let positions: [f32; 12] = [
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ];
    let uvs: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
    let embedded = png_bytes(4, 4);

    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&uvs));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    bin.extend_from_slice(&embedded);
    std::fs::write(dir.join("quad.bin"), &bin).unwrap();

    let json = format!(
        r#"{{
            "asset": {{ "version": "2.0" }},
            "scene": 0,
            "scenes": [{{ "nodes": [0, 2] }}],
            "nodes": [
                {{ "name": "left", "mesh": 0, "children": [1] }},
                {{ "name": "left_copy", "mesh": 0 }},
                {{ "name": "right", "mesh": 1 }}
            ],
            "meshes": [
                {{ "name": "wall", "primitives": [{{
                    "attributes": {{ "POSITION": 0, "TEXCOORD_0": 1 }},
                    "indices": 2, "material": 0 }}] }},
                {{ "name": "sign", "primitives": [{{
                    "attributes": {{ "POSITION": 0, "TEXCOORD_0": 1 }},
                    "indices": 2, "material": 1 }}] }}
            ],
            "materials": [
                {{ "name": "plaster", "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }},
                {{ "name": "decal", "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 1 }} }} }}
            ],
            "textures": [{{ "source": 0 }}, {{ "source": 1 }}],
            "images": [
                {{ "uri": "{external_texture}" }},
                {{ "bufferView": 3, "mimeType": "image/png" }}
            ],
            "accessors": [
                {{ "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
                   "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
                {{ "bufferView": 1, "componentType": 5126, "count": 4, "type": "VEC2" }},
                {{ "bufferView": 2, "componentType": 5125, "count": 6, "type": "SCALAR" }}
            ],
            "bufferViews": [
                {{ "buffer": 0, "byteOffset": 0, "byteLength": 48 }},
                {{ "buffer": 0, "byteOffset": 48, "byteLength": 32 }},
                {{ "buffer": 0, "byteOffset": 80, "byteLength": 24 }},
                {{ "buffer": 0, "byteOffset": 104, "byteLength": {embedded_len} }}
            ],
            "buffers": [{{ "uri": "quad.bin", "byteLength": {bin_len} }}]
        }}"#,
        embedded_len = embedded.len(),
        bin_len = bin.len(),
    );

    let path = dir.join("quad.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_load_gltf_with_external_and_embedded_textures() {
    let dir = fixture_dir("textures");
    image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]))
        .save(dir.join("plaster.png"))
        .unwrap();
    let path = write_model(&dir, "plaster.png");

    let gpu = MockGpu::decoding();
    let mut model = ModelLoader::gltf();
    let notifier = CollectingNotifier::new();

    assert!(model.load(&notifier, gpu.clone(), &path).unwrap());
    assert!(notifier.is_empty(), "{:?}", notifier.diagnostics());

    let names: Vec<_> = model.meshes().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["wall", "wall", "sign"]);
    assert_eq!(model.textures().len(), 2);
    assert_eq!(model.directory(), dir.as_path());

    let decoded: Vec<_> = gpu
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            GpuCall::CreateTexture { width, height, .. } => Some((width, height)),
            _ => None,
        })
        .collect();
    assert_eq!(decoded, vec![(2, 2), (4, 4)]);

    let mut context = MockContext::new();
    model.draw(&mut context);
    assert_eq!(context.draw_calls(), vec![6, 6, 6]);

    model.close();
    assert_eq!(gpu.live_buffers(), 0);
    assert_eq!(gpu.live_views(), 0);
}

#[test]
fn test_data_uri_texture_decoded_from_memory() {
    use base64::Engine;

    let dir = fixture_dir("data_uri");
    let uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 3))
    );
    let path = write_model(&dir, &uri);

    let gpu = MockGpu::decoding();
    let mut model = ModelLoader::gltf();
    let notifier = CollectingNotifier::new();

    assert!(model.load(&notifier, gpu.clone(), &path).unwrap());
    assert!(notifier.is_empty(), "{:?}", notifier.diagnostics());

    let paths: Vec<_> = model.textures().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["*0", "*1"]);
    let calls = gpu.calls();
    assert!(!calls.iter().any(|c| matches!(c, GpuCall::DecodeFile { .. })));
    let decoded: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::CreateTexture { width, height, .. } => Some((*width, *height)),
            _ => None,
        })
        .collect();
    assert_eq!(decoded, vec![(3, 3), (4, 4)]);
}

#[test]
fn test_index_buffer_holds_every_face() {
    let dir = fixture_dir("winding");
    let path = write_model(&dir, "plaster.png");

    let gpu = MockGpu::new();
    let mut model = ModelLoader::gltf();
    model.load(&CollectingNotifier::new(), gpu.clone(), &path).unwrap();

    let index_data = gpu
        .calls()
        .into_iter()
        .find_map(|c| match c {
            GpuCall::CreateBuffer {
                usage: mesh_bridge::BufferUsage::Index,
                size,
                ..
            } => Some(size),
            _ => None,
        })
        .unwrap();
    assert_eq!(index_data, 6 * std::mem::size_of::<u32>());
    assert_eq!(model.meshes()[0].vertex_count(), 4);
}

#[test]
fn test_missing_texture_file_is_reported() {
    let dir = fixture_dir("missing");
    let path = write_model(&dir, "absent.png");

    let gpu = MockGpu::decoding();
    let mut model = ModelLoader::gltf();
    let notifier = CollectingNotifier::new();

    assert!(model.load(&notifier, gpu, &path).unwrap());

    let received = notifier.diagnostics();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind, DiagnosticKind::TextureFile);
    assert_eq!(received[0].identifier, "absent.png");
    assert_eq!(model.meshes().len(), 3);
}

#[test]
fn test_missing_model_returns_false() {
    let gpu = MockGpu::new();
    let mut model = ModelLoader::gltf();

    let loaded = model
        .load(&CollectingNotifier::new(), gpu.clone(), "no/such/model.gltf")
        .unwrap();

    assert!(!loaded);
    assert!(model.meshes().is_empty());
    assert!(gpu.calls().is_empty());
}
