//! Load a glTF model onto the mock device and replay one frame
//!
//! ```text
//! RUST_LOG=debug cargo run --example load_model -- path/to/model.gltf
//! ```

use anyhow::Context;
use mesh_bridge::{LogNotifier, MockContext, MockGpu, ModelLoader};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: load_model <model.gltf|model.glb>")?;

    let gpu = MockGpu::decoding();
    let mut model = ModelLoader::gltf();

    println!("mesh_bridge v{}", mesh_bridge::VERSION);
    if !model.load(&LogNotifier, gpu.clone(), &path)? {
        anyhow::bail!("could not import {path}");
    }

    println!("Loaded {} meshes from '{}'", model.meshes().len(), model.directory().display());
    for mesh in model.meshes() {
        println!(
            "  {}: {} vertices, {} indices, {} textures",
            mesh.name(),
            mesh.vertex_count(),
            mesh.index_count(),
            mesh.textures().len()
        );
    }
    for record in model.textures().iter() {
        let state = if record.view.is_some() { "ok" } else { "missing" };
        println!("  texture {} [{state}]", record.path);
    }

    let mut context = MockContext::new();
    model.draw(&mut context);
    println!(
        "Frame: {} draw calls, {} bytes on device",
        context.draw_calls().len(),
        gpu.allocated_bytes()
    );

    model.close();
    Ok(())
}
