//! Mock GPU implementation for testing
//!
//! Records every device and context call in memory so tests can assert on
//! upload counts, release counts and draw order without GPU hardware.

use super::{
    BufferUsage, GpuContext, GpuDevice, GpuError, GpuResult, GpuTextureFormat, IndexFormat,
    TextureDescriptor,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique buffer/texture/view IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// One recorded device call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuCall {
    CreateBuffer {
        id: u64,
        usage: BufferUsage,
        size: usize,
    },
    CreateTexture {
        id: u64,
        width: u32,
        height: u32,
        format: GpuTextureFormat,
        mip_levels: u32,
        row_pitch: u32,
        len: usize,
    },
    CreateView {
        id: u64,
        texture: u64,
    },
    DecodeFile {
        path: PathBuf,
    },
    DecodeMemory {
        len: usize,
    },
    DestroyBuffer {
        id: u64,
    },
    DestroyView {
        id: u64,
    },
}

/// Operations the mock should fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockFailures {
    pub vertex_buffer: bool,
    pub index_buffer: bool,
    pub texture: bool,
    pub view: bool,
    pub file_decode: bool,
    pub memory_decode: bool,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<GpuCall>,
    live_buffers: HashMap<u64, usize>,
    live_views: HashMap<u64, usize>,
    double_releases: usize,
    failures: MockFailures,
    failing_paths: HashSet<PathBuf>,
}

impl MockState {
    fn live_bytes(&self) -> u64 {
        (self.live_buffers.values().sum::<usize>() + self.live_views.values().sum::<usize>()) as u64
    }
}

/// Mock GPU device for testing
///
/// Clones share the same recorded state.
#[derive(Clone, Debug, Default)]
pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
    decode_images: bool,
}

impl MockGpu {
    /// Create a mock whose decode helpers skip real image decoding and hand
    /// back a 1x1 view
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose decode helpers run the real image decoder
    pub fn decoding() -> Self {
        Self {
            decode_images: true,
            ..Self::default()
        }
    }

    /// Replace the set of operations that fail
    pub fn set_failures(&self, failures: MockFailures) {
        self.state.lock().failures = failures;
    }

    /// Make file decoding fail for one path
    pub fn fail_path(&self, path: impl Into<PathBuf>) {
        self.state.lock().failing_paths.insert(path.into());
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<GpuCall> {
        self.state.lock().calls.clone()
    }

    /// Number of buffers created so far, for one usage
    pub fn buffers_created(&self, usage: BufferUsage) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, GpuCall::CreateBuffer { usage: u, .. } if *u == usage))
            .count()
    }

    /// Number of texture uploads of any kind (raw, file or memory)
    pub fn texture_uploads(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    GpuCall::CreateTexture { .. }
                        | GpuCall::DecodeFile { .. }
                        | GpuCall::DecodeMemory { .. }
                )
            })
            .count()
    }

    /// Buffers created and not yet destroyed
    pub fn live_buffers(&self) -> usize {
        self.state.lock().live_buffers.len()
    }

    /// Views created and not yet destroyed
    pub fn live_views(&self) -> usize {
        self.state.lock().live_views.len()
    }

    /// Destroy calls on handles that were not live
    pub fn double_releases(&self) -> usize {
        self.state.lock().double_releases
    }

    /// Bytes held by live buffers and views
    pub fn allocated_bytes(&self) -> u64 {
        self.state.lock().live_bytes()
    }

    fn stub_view(&self) -> MockView {
        let view = MockView {
            id: next_id(),
            texture: next_id(),
            width: 1,
            height: 1,
        };
        self.state.lock().live_views.insert(view.id, 4);
        view
    }
}

/// Mock immutable buffer
#[derive(Clone, Debug)]
pub struct MockBuffer {
    /// Unique identifier
    pub id: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    data: Arc<Vec<u8>>,
}

impl MockBuffer {
    /// Get the size of the buffer
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Read buffer data
    pub fn read_data(&self) -> Vec<u8> {
        self.data.as_ref().clone()
    }
}

/// Mock texture that stores pixel data in memory
#[derive(Debug)]
pub struct MockTexture {
    /// Unique identifier
    pub id: u64,
    /// Texture width
    pub width: u32,
    /// Texture height
    pub height: u32,
    /// Texture format
    pub format: GpuTextureFormat,
    /// Pixel data
    pub data: Vec<u8>,
}

/// Mock shader-resource view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockView {
    /// Unique identifier
    pub id: u64,
    /// Identifier of the wrapped texture
    pub texture: u64,
    pub width: u32,
    pub height: u32,
}

impl GpuDevice for MockGpu {
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type TextureView = MockView;

    fn create_immutable_buffer(
        &self,
        usage: BufferUsage,
        data: &[u8],
    ) -> GpuResult<Self::Buffer> {
        let mut state = self.state.lock();
        let failing = match usage {
            BufferUsage::Vertex => state.failures.vertex_buffer,
            BufferUsage::Index => state.failures.index_buffer,
        };
        if failing {
            return Err(GpuError::BufferCreationFailed(format!(
                "injected {usage:?} buffer failure"
            )));
        }
        if data.is_empty() {
            return Err(GpuError::InvalidSize(0));
        }

        let buffer = MockBuffer {
            id: next_id(),
            usage,
            data: Arc::new(data.to_vec()),
        };
        state.calls.push(GpuCall::CreateBuffer {
            id: buffer.id,
            usage,
            size: data.len(),
        });
        state.live_buffers.insert(buffer.id, data.len());
        Ok(buffer)
    }

    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture> {
        let mut state = self.state.lock();
        if state.failures.texture {
            return Err(GpuError::TextureCreationFailed(
                "injected texture failure".to_string(),
            ));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::TextureCreationFailed(
                "Invalid texture dimensions".to_string(),
            ));
        }

        let texture = MockTexture {
            id: next_id(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            data: data.to_vec(),
        };
        state.calls.push(GpuCall::CreateTexture {
            id: texture.id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            mip_levels: desc.mip_levels,
            row_pitch: desc.row_pitch,
            len: data.len(),
        });
        Ok(texture)
    }

    fn create_shader_resource_view(
        &self,
        texture: Self::Texture,
    ) -> GpuResult<Self::TextureView> {
        let mut state = self.state.lock();
        if state.failures.view {
            return Err(GpuError::ViewCreationFailed(
                "injected view failure".to_string(),
            ));
        }

        let view = MockView {
            id: next_id(),
            texture: texture.id,
            width: texture.width,
            height: texture.height,
        };
        state.calls.push(GpuCall::CreateView {
            id: view.id,
            texture: texture.id,
        });
        state.live_views.insert(view.id, texture.data.len());
        Ok(view)
    }

    fn create_texture_from_file(&self, path: &Path) -> GpuResult<Self::TextureView> {
        {
            let mut state = self.state.lock();
            state.calls.push(GpuCall::DecodeFile {
                path: path.to_path_buf(),
            });
            if state.failures.file_decode || state.failing_paths.contains(path) {
                return Err(GpuError::TextureCreationFailed(format!(
                    "cannot decode {}",
                    path.display()
                )));
            }
        }

        if self.decode_images {
            crate::texture::upload_image_file(self, path)
        } else {
            Ok(self.stub_view())
        }
    }

    fn create_texture_from_memory(&self, bytes: &[u8]) -> GpuResult<Self::TextureView> {
        {
            let mut state = self.state.lock();
            state.calls.push(GpuCall::DecodeMemory { len: bytes.len() });
            if state.failures.memory_decode {
                return Err(GpuError::TextureCreationFailed(
                    "injected memory decode failure".to_string(),
                ));
            }
        }

        if self.decode_images {
            crate::texture::upload_encoded_image(self, bytes)
        } else {
            Ok(self.stub_view())
        }
    }

    fn destroy_buffer(&self, buffer: Self::Buffer) {
        let mut state = self.state.lock();
        state.calls.push(GpuCall::DestroyBuffer { id: buffer.id });
        if state.live_buffers.remove(&buffer.id).is_none() {
            state.double_releases += 1;
        }
    }

    fn destroy_view(&self, view: Self::TextureView) {
        let mut state = self.state.lock();
        state.calls.push(GpuCall::DestroyView { id: view.id });
        if state.live_views.remove(&view.id).is_none() {
            state.double_releases += 1;
        }
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}

/// One recorded context command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    SetVertexBuffer {
        slot: u32,
        buffer: u64,
        stride: u32,
        offset: u32,
    },
    SetIndexBuffer {
        buffer: u64,
        format: IndexFormat,
        offset: u32,
    },
    SetShaderResource {
        slot: u32,
        view: Option<u64>,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
}

/// Mock device context recording draw submission
#[derive(Debug, Default)]
pub struct MockContext {
    pub commands: Vec<DrawCommand>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index counts of the recorded draw calls, in submission order
    pub fn draw_calls(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::DrawIndexed { index_count, .. } => Some(*index_count),
                _ => None,
            })
            .collect()
    }
}

impl GpuContext<MockGpu> for MockContext {
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &MockBuffer, stride: u32, offset: u32) {
        self.commands.push(DrawCommand::SetVertexBuffer {
            slot,
            buffer: buffer.id,
            stride,
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: &MockBuffer, format: IndexFormat, offset: u32) {
        self.commands.push(DrawCommand::SetIndexBuffer {
            buffer: buffer.id,
            format,
            offset,
        });
    }

    fn set_shader_resource(&mut self, slot: u32, view: Option<&MockView>) {
        self.commands.push(DrawCommand::SetShaderResource {
            slot,
            view: view.map(|v| v.id),
        });
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.commands.push(DrawCommand::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
    }
}
