//! Vertex layout and the draw-ready GPU mesh

use bytemuck::{Pod, Zeroable};

use crate::cache::{TextureCache, TextureId};
use crate::error::{LoaderError, Result};
use crate::gpu::{BufferUsage, GpuContext, GpuDevice, IndexFormat};

/// A vertex with position and texture coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position
    pub position: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    /// Size of a vertex in bytes
    pub const fn size() -> usize {
        std::mem::size_of::<Self>()
    }
}

/// One draw-ready unit: an immutable vertex buffer, an immutable index buffer
/// and the cache entries of the textures it samples
///
/// The mesh does not own its textures. It holds [`TextureId`]s into the
/// model's [`TextureCache`], which is passed back in at draw time.
#[derive(Debug)]
pub struct GpuMesh<G: GpuDevice> {
    name: String,
    vertex_buffer: Option<G::Buffer>,
    index_buffer: Option<G::Buffer>,
    vertex_count: u32,
    index_count: u32,
    textures: Vec<TextureId>,
}

impl<G: GpuDevice> GpuMesh<G> {
    /// Upload `vertices` and `indices` into immutable buffers
    ///
    /// Fails before touching the device if either list or `textures` is
    /// empty. If the index buffer cannot be created the vertex buffer is
    /// released again.
    pub fn new(
        device: &G,
        name: impl Into<String>,
        vertices: &[Vertex],
        indices: &[u32],
        textures: Vec<TextureId>,
    ) -> Result<Self> {
        let name = name.into();
        if vertices.is_empty() || indices.is_empty() {
            return Err(LoaderError::EmptyGeometry {
                mesh: name,
                vertices: vertices.len(),
                faces: indices.len() / 3,
            });
        }
        if textures.is_empty() {
            return Err(LoaderError::MissingTextures(name));
        }

        let vertex_buffer =
            device.create_immutable_buffer(BufferUsage::Vertex, bytemuck::cast_slice(vertices))?;
        let index_buffer =
            match device.create_immutable_buffer(BufferUsage::Index, bytemuck::cast_slice(indices))
            {
                Ok(buffer) => buffer,
                Err(e) => {
                    log::error!("Index buffer creation failed for mesh {name}: {e}");
                    device.destroy_buffer(vertex_buffer);
                    return Err(e.into());
                }
            };

        Ok(Self {
            name,
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            textures,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Cache entries this mesh samples, in material slot order
    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    /// Whether the GPU buffers are still alive
    pub fn is_resident(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some()
    }

    /// Bind buffers and the first texture, then issue one indexed draw
    ///
    /// Does nothing once the mesh has been released.
    pub fn draw<C: GpuContext<G>>(&self, context: &mut C, textures: &TextureCache<G::TextureView>) {
        let (Some(vertex_buffer), Some(index_buffer)) = (&self.vertex_buffer, &self.index_buffer)
        else {
            return;
        };

        context.set_vertex_buffer(0, vertex_buffer, Vertex::size() as u32, 0);
        context.set_index_buffer(index_buffer, IndexFormat::R32Uint, 0);
        let view = self.textures.first().and_then(|&id| textures.view(id));
        context.set_shader_resource(0, view);
        context.draw_indexed(self.index_count, 0, 0);
    }

    /// Release both buffers; a second call is a no-op
    pub fn release(&mut self, device: &G) {
        if let Some(buffer) = self.vertex_buffer.take() {
            device.destroy_buffer(buffer);
        }
        if let Some(buffer) = self.index_buffer.take() {
            device.destroy_buffer(buffer);
        }
    }
}
