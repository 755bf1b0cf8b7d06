/// Command buffer - frame recording state machine

use std::rc::Weak;

use crate::error::{Error, Result};
use crate::rhi::batch::ResourceUpdateBatch;
use crate::rhi::device::DeviceInner;
use crate::rhi::native_handles::CommandBufferNativeHandles;
use crate::rhi::render_target::TextureRenderTarget;

/// Frame recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordingState {
    /// No frame is active
    Idle,
    /// Inside begin/end frame, outside any pass
    Recording,
    /// Inside begin/end pass
    InPass,
}

/// Per-frame command recording handle
///
/// Obtained from `Device::begin_offscreen_frame`; valid until the matching
/// `end_offscreen_frame`. Operations are legal only in specific recording
/// states; misuse is an error, never silently reordered.
pub struct CommandBuffer {
    pub(crate) device: Weak<DeviceInner>,
}

impl CommandBuffer {
    fn upgrade(&self) -> Result<std::rc::Rc<DeviceInner>> {
        self.device
            .upgrade()
            .ok_or_else(|| Error::InvalidOperation("the owning device is gone".to_string()))
    }

    /// Commit a resource-update batch outside of any render pass
    ///
    /// Applies the batch's operations in recording order and returns the
    /// batch's storage to the device pool. Legal only in the Recording
    /// state.
    pub fn resource_update(&mut self, mut batch: ResourceUpdateBatch) -> Result<()> {
        let device = self.upgrade()?;
        device.check_thread();
        match device.frame.get() {
            RecordingState::Recording => {}
            RecordingState::InPass => {
                return Err(Error::InvalidOperation(
                    "resource_update is not allowed inside a render pass".to_string(),
                ));
            }
            RecordingState::Idle => {
                return Err(Error::InvalidOperation(
                    "resource_update requires an active frame".to_string(),
                ));
            }
        }
        device.apply_batch(batch.take_ops())
    }

    /// Begin a render pass on a built render target
    ///
    /// An optional batch is committed before the pass begins. Legal only in
    /// the Recording state.
    pub fn begin_pass(
        &mut self,
        render_target: &TextureRenderTarget,
        clear_color: [f32; 4],
        clear_depth_stencil: (f32, u32),
        batch: Option<ResourceUpdateBatch>,
    ) -> Result<()> {
        let device = self.upgrade()?;
        device.check_thread();
        match device.frame.get() {
            RecordingState::Recording => {}
            RecordingState::InPass => {
                return Err(Error::InvalidOperation(
                    "begin_pass while a render pass is already active".to_string(),
                ));
            }
            RecordingState::Idle => {
                return Err(Error::InvalidOperation(
                    "begin_pass requires an active frame".to_string(),
                ));
            }
        }
        if let Some(mut batch) = batch {
            device.apply_batch(batch.take_ops())?;
        }

        let native = render_target.shared.native.borrow();
        let Some(native) = native.as_ref() else {
            return Err(Error::InvalidResource(
                "begin_pass on an unbuilt render target".to_string(),
            ));
        };
        match device.be.begin_pass(native.as_ref(), clear_color, clear_depth_stencil) {
            Ok(()) => {
                device.frame.set(RecordingState::InPass);
                Ok(())
            }
            Err(e) => {
                device.note_backend_error(&e);
                Err(e)
            }
        }
    }

    /// End the current render pass
    ///
    /// An optional batch is committed after the pass ends. Legal only in the
    /// InPass state.
    pub fn end_pass(&mut self, batch: Option<ResourceUpdateBatch>) -> Result<()> {
        let device = self.upgrade()?;
        device.check_thread();
        if device.frame.get() != RecordingState::InPass {
            return Err(Error::InvalidOperation(
                "end_pass without an active render pass".to_string(),
            ));
        }
        match device.be.end_pass() {
            Ok(()) => {}
            Err(e) => {
                device.note_backend_error(&e);
                return Err(e);
            }
        }
        device.frame.set(RecordingState::Recording);
        if let Some(mut batch) = batch {
            device.apply_batch(batch.take_ops())?;
        }
        Ok(())
    }

    /// Native handle introspection
    ///
    /// `None` outside an active frame, and on backends without a native
    /// command buffer object.
    pub fn native_handles(&self) -> Option<CommandBufferNativeHandles> {
        let device = self.device.upgrade()?;
        if device.frame.get() == RecordingState::Idle {
            return None;
        }
        device.be.command_buffer_native_handles()
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
