/// Mock backend for unit tests
///
/// Implements the backend contract with host-memory buffers, a recorded
/// call log, and injectable failures. Capabilities are fully configurable,
/// which makes feature gating and device-loss paths testable without a GPU.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::rhi::backend::{
    BackendBuffer, BackendDevice, BackendPipeline, BackendRenderPass, BackendRenderTarget,
    BackendTexture, DeviceStats,
};
use crate::rhi::buffer::{BufferRole, BufferUsage};
use crate::rhi::caps::DeviceCaps;
use crate::rhi::native_handles::{
    BufferNativeHandles, DeviceNativeHandles, RenderPassNativeHandles, TextureNativeHandles,
};
use crate::rhi::pipeline::PipelineDesc;
use crate::rhi::render_pass::RenderPassDesc;
use crate::rhi::render_target::RenderTargetDesc;
use crate::rhi::texture::TextureDesc;

/// Shared call log, readable from the test after the device takes ownership
/// of the backend
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub struct MockBackend {
    caps: DeviceCaps,
    calls: CallLog,
    fail_begin_frame: Cell<bool>,
    fail_end_frame: Cell<bool>,
    fail_write: Rc<Cell<bool>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            caps: DeviceCaps::default(),
            calls: Rc::new(RefCell::new(Vec::new())),
            fail_begin_frame: Cell::new(false),
            fail_end_frame: Cell::new(false),
            fail_write: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self {
            caps,
            ..Self::new()
        }
    }

    /// Handle to the call log; clones share the same storage
    pub fn call_log(&self) -> CallLog {
        Rc::clone(&self.calls)
    }

    /// Make the next begin_offscreen_frame report device loss
    pub fn fail_next_begin_frame(&self) {
        self.fail_begin_frame.set(true);
    }

    /// Make the next end_offscreen_frame report device loss
    pub fn fail_next_end_frame(&self) {
        self.fail_end_frame.set(true);
    }

    /// Make the next buffer write report device loss
    ///
    /// The flag is shared with every buffer this backend creates, so it can
    /// be armed before the device takes ownership of the backend.
    pub fn fail_next_write(&self) {
        self.fail_write.set(true);
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }
}

struct MockBuffer {
    data: RefCell<Vec<u8>>,
    fail_write: Rc<Cell<bool>>,
}

impl BackendBuffer for MockBuffer {
    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.fail_write.take() {
            return Err(Error::DeviceLost);
        }
        let mut storage = self.data.borrow_mut();
        let end = offset as usize + data.len();
        if end > storage.len() {
            return Err(Error::InvalidOperation("write out of range".to_string()));
        }
        storage[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let storage = self.data.borrow();
        let end = (offset + size) as usize;
        if end > storage.len() {
            return Err(Error::InvalidOperation("read out of range".to_string()));
        }
        Ok(storage[offset as usize..end].to_vec())
    }

    fn native_handles(&self) -> Option<BufferNativeHandles> {
        None
    }
}

struct MockTexture;

impl BackendTexture for MockTexture {
    fn native_handles(&self) -> Option<TextureNativeHandles> {
        None
    }
}

struct MockRenderTarget;

impl BackendRenderTarget for MockRenderTarget {}

struct MockRenderPass;

impl BackendRenderPass for MockRenderPass {
    fn native_handles(&self) -> Option<RenderPassNativeHandles> {
        None
    }
}

struct MockPipeline;

impl BackendPipeline for MockPipeline {}

impl BackendDevice for MockBackend {
    fn caps(&self) -> DeviceCaps {
        self.caps.clone()
    }

    fn native_handles(&self) -> Option<DeviceNativeHandles> {
        None
    }

    fn create_buffer(
        &self,
        _usage: BufferUsage,
        _role: BufferRole,
        size: u64,
    ) -> Result<Box<dyn BackendBuffer>> {
        self.record("create_buffer");
        Ok(Box::new(MockBuffer {
            data: RefCell::new(vec![0; size as usize]),
            fail_write: Rc::clone(&self.fail_write),
        }))
    }

    fn create_texture(&self, _desc: &TextureDesc) -> Result<Box<dyn BackendTexture>> {
        self.record("create_texture");
        Ok(Box::new(MockTexture))
    }

    fn create_render_target(&self, _desc: &RenderTargetDesc) -> Result<Box<dyn BackendRenderTarget>> {
        self.record("create_render_target");
        Ok(Box::new(MockRenderTarget))
    }

    fn create_render_pass(&self, _desc: &RenderPassDesc) -> Result<Box<dyn BackendRenderPass>> {
        self.record("create_render_pass");
        Ok(Box::new(MockRenderPass))
    }

    fn create_pipeline(&self, _desc: &PipelineDesc) -> Result<Box<dyn BackendPipeline>> {
        self.record("create_pipeline");
        Ok(Box::new(MockPipeline))
    }

    fn begin_offscreen_frame(&self) -> Result<()> {
        self.record("begin_offscreen_frame");
        if self.fail_begin_frame.take() {
            return Err(Error::DeviceLost);
        }
        Ok(())
    }

    fn end_offscreen_frame(&self) -> Result<()> {
        self.record("end_offscreen_frame");
        if self.fail_end_frame.take() {
            return Err(Error::DeviceLost);
        }
        Ok(())
    }

    fn begin_pass(
        &self,
        _render_target: &dyn BackendRenderTarget,
        _clear_color: [f32; 4],
        _clear_depth_stencil: (f32, u32),
    ) -> Result<()> {
        self.record("begin_pass");
        Ok(())
    }

    fn end_pass(&self) -> Result<()> {
        self.record("end_pass");
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats::default()
    }
}
