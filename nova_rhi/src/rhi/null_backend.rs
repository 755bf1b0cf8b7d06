/// Null backend - complete software rendition of the backend contract
///
/// Always available, needs no GPU or window system. Buffers are plain
/// host-memory vectors so update and readback semantics are fully
/// observable; draw work is accepted and discarded. The reported
/// conventions deliberately differ from the defaults so convention-handling
/// code is exercised.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Mat4;
use slotmap::{new_key_type, Key, SlotMap};

use crate::error::{Error, Result};
use crate::rhi::backend::{
    BackendBuffer, BackendDevice, BackendPipeline, BackendRenderPass, BackendRenderTarget,
    BackendTexture, DeviceStats,
};
use crate::rhi::buffer::{BufferRole, BufferUsage};
use crate::rhi::caps::{DeviceCaps, Features};
use crate::rhi::native_handles::{
    BufferNativeHandles, CommandBufferNativeHandles, DeviceNativeHandles, RenderPassNativeHandles,
    TextureNativeHandles,
};
use crate::rhi::pipeline::PipelineDesc;
use crate::rhi::render_pass::RenderPassDesc;
use crate::rhi::render_target::RenderTargetDesc;
use crate::rhi::texture::{TextureDesc, TextureFormat};

new_key_type! {
    struct NullBufferKey;
    struct NullTextureKey;
}

/// Bookkeeping shared between the backend device and its resources
struct NullState {
    buffers: RefCell<SlotMap<NullBufferKey, u64>>,
    textures: RefCell<SlotMap<NullTextureKey, u64>>,
    mem_used: Cell<u64>,
}

impl NullState {
    fn new() -> Self {
        Self {
            buffers: RefCell::new(SlotMap::with_key()),
            textures: RefCell::new(SlotMap::with_key()),
            mem_used: Cell::new(0),
        }
    }
}

/// The Null backend device
pub struct NullBackend {
    state: Rc<NullState>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            state: Rc::new(NullState::new()),
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct NullBuffer {
    state: Rc<NullState>,
    key: NullBufferKey,
    data: RefCell<Vec<u8>>,
}

impl BackendBuffer for NullBuffer {
    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut storage = self.data.borrow_mut();
        let end = offset as usize + data.len();
        if end > storage.len() {
            return Err(Error::InvalidOperation(format!(
                "write [{}..{}] exceeds buffer size {}",
                offset,
                end,
                storage.len()
            )));
        }
        storage[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let storage = self.data.borrow();
        let end = (offset + size) as usize;
        if end > storage.len() {
            return Err(Error::InvalidOperation(format!(
                "read [{}..{}] exceeds buffer size {}",
                offset,
                end,
                storage.len()
            )));
        }
        Ok(storage[offset as usize..end].to_vec())
    }

    fn native_handles(&self) -> Option<BufferNativeHandles> {
        Some(BufferNativeHandles::Null {
            id: self.key.data().as_ffi(),
        })
    }
}

impl Drop for NullBuffer {
    fn drop(&mut self) {
        if let Some(size) = self.state.buffers.borrow_mut().remove(self.key) {
            self.state.mem_used.set(self.state.mem_used.get() - size);
        }
    }
}

struct NullTexture {
    state: Rc<NullState>,
    key: NullTextureKey,
}

impl BackendTexture for NullTexture {
    fn native_handles(&self) -> Option<TextureNativeHandles> {
        Some(TextureNativeHandles::Null {
            id: self.key.data().as_ffi(),
        })
    }
}

impl Drop for NullTexture {
    fn drop(&mut self) {
        if let Some(size) = self.state.textures.borrow_mut().remove(self.key) {
            self.state.mem_used.set(self.state.mem_used.get() - size);
        }
    }
}

struct NullRenderTarget;

impl BackendRenderTarget for NullRenderTarget {}

struct NullRenderPass;

impl BackendRenderPass for NullRenderPass {
    fn native_handles(&self) -> Option<RenderPassNativeHandles> {
        Some(RenderPassNativeHandles::Null)
    }
}

struct NullPipeline;

impl BackendPipeline for NullPipeline {}

impl BackendDevice for NullBackend {
    fn caps(&self) -> DeviceCaps {
        // The clip depth differs from the default [-1, 1] convention, so
        // the correction matrix rescales z accordingly (z' = 0.5 z + 0.5)
        let mut corr = Mat4::IDENTITY;
        corr.z_axis.z = 0.5;
        corr.w_axis.z = 0.5;
        DeviceCaps {
            features: Features::all()
                - Features::MULTISAMPLE_TEXTURE
                - Features::MULTISAMPLE_RENDER_BUFFER
                - Features::TIMESTAMPS
                - Features::WIDE_LINES,
            texture_size_min: 1,
            texture_size_max: 16384,
            max_color_attachments: 8,
            frames_in_flight: 1,
            supported_sample_counts: vec![1],
            supported_formats: vec![
                TextureFormat::R8G8B8A8_UNORM,
                TextureFormat::R8G8B8A8_SRGB,
                TextureFormat::B8G8R8A8_UNORM,
                TextureFormat::B8G8R8A8_SRGB,
                TextureFormat::R8_UNORM,
                TextureFormat::A8_UNORM,
                TextureFormat::R16G16B16A16_SFLOAT,
                TextureFormat::R32G32B32A32_SFLOAT,
                TextureFormat::D16_UNORM,
                TextureFormat::D32_FLOAT,
            ],
            ubuf_alignment: 256,
            y_up_in_framebuffer: false,
            y_up_in_ndc: true,
            clip_depth_zero_to_one: true,
            clip_space_corr_matrix: corr,
        }
    }

    fn native_handles(&self) -> Option<DeviceNativeHandles> {
        Some(DeviceNativeHandles::Null)
    }

    fn create_buffer(
        &self,
        _usage: BufferUsage,
        _role: BufferRole,
        size: u64,
    ) -> Result<Box<dyn BackendBuffer>> {
        let key = self.state.buffers.borrow_mut().insert(size);
        self.state.mem_used.set(self.state.mem_used.get() + size);
        Ok(Box::new(NullBuffer {
            state: Rc::clone(&self.state),
            key,
            data: RefCell::new(vec![0; size as usize]),
        }))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Box<dyn BackendTexture>> {
        let size = u64::from(desc.pixel_size.x)
            * u64::from(desc.pixel_size.y)
            * u64::from(desc.format.bytes_per_pixel())
            * u64::from(desc.sample_count.max(1));
        let key = self.state.textures.borrow_mut().insert(size);
        self.state.mem_used.set(self.state.mem_used.get() + size);
        Ok(Box::new(NullTexture {
            state: Rc::clone(&self.state),
            key,
        }))
    }

    fn create_render_target(&self, _desc: &RenderTargetDesc) -> Result<Box<dyn BackendRenderTarget>> {
        Ok(Box::new(NullRenderTarget))
    }

    fn create_render_pass(&self, _desc: &RenderPassDesc) -> Result<Box<dyn BackendRenderPass>> {
        Ok(Box::new(NullRenderPass))
    }

    fn create_pipeline(&self, _desc: &PipelineDesc) -> Result<Box<dyn BackendPipeline>> {
        Ok(Box::new(NullPipeline))
    }

    fn begin_offscreen_frame(&self) -> Result<()> {
        Ok(())
    }

    fn end_offscreen_frame(&self) -> Result<()> {
        // Nothing in flight; writes and reads were applied synchronously
        Ok(())
    }

    fn begin_pass(
        &self,
        _render_target: &dyn BackendRenderTarget,
        _clear_color: [f32; 4],
        _clear_depth_stencil: (f32, u32),
    ) -> Result<()> {
        Ok(())
    }

    fn end_pass(&self) -> Result<()> {
        Ok(())
    }

    fn command_buffer_native_handles(&self) -> Option<CommandBufferNativeHandles> {
        Some(CommandBufferNativeHandles::Null)
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            buffers_alive: self.state.buffers.borrow().len() as u32,
            textures_alive: self.state.textures.borrow().len() as u32,
            gpu_memory_used: self.state.mem_used.get(),
        }
    }
}

#[cfg(test)]
#[path = "null_backend_tests.rs"]
mod tests;
