/// Resource-update batch - ordered recording of buffer writes and readbacks

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::nova_warn;
use crate::rhi::buffer::{Buffer, BufferShared, BufferUsage};
use crate::rhi::device::DeviceInner;

#[derive(Default)]
pub(crate) struct ReadbackInner {
    pub(crate) completed: bool,
    pub(crate) data: Vec<u8>,
    pub(crate) on_completed: Option<Box<dyn FnMut()>>,
}

/// Completion slot of a recorded buffer readback
///
/// Starts incomplete; the device marks it completed and fills in the data
/// when the frame the readback was committed in finishes. For offscreen
/// frames that is before `end_offscreen_frame` returns.
#[derive(Clone, Default)]
pub struct BufferReadbackResult {
    inner: Rc<RefCell<ReadbackInner>>,
}

impl BufferReadbackResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a callback invoked once when the readback completes
    pub fn set_on_completed<F: FnMut() + 'static>(&self, callback: F) {
        self.inner.borrow_mut().on_completed = Some(Box::new(callback));
    }

    pub fn is_completed(&self) -> bool {
        self.inner.borrow().completed
    }

    /// The bytes read back; empty until completed
    ///
    /// The payload is filled when the batch applies, but it is not exposed
    /// until the owning frame finishes.
    pub fn data(&self) -> Vec<u8> {
        let inner = self.inner.borrow();
        if inner.completed {
            inner.data.clone()
        } else {
            Vec::new()
        }
    }

    pub(crate) fn set_data(&self, data: Vec<u8>) {
        self.inner.borrow_mut().data = data;
    }

    pub(crate) fn finish(&self) {
        // Take the callback out before calling it so the borrow is not held
        // across user code
        let callback = {
            let mut inner = self.inner.borrow_mut();
            inner.completed = true;
            inner.on_completed.take()
        };
        if let Some(mut callback) = callback {
            callback();
        }
    }
}

/// A single recorded update operation
pub(crate) enum UpdateOp {
    UpdateDynamicBuffer {
        buffer: Rc<BufferShared>,
        offset: u64,
        data: Vec<u8>,
    },
    UploadStaticBuffer {
        buffer: Rc<BufferShared>,
        offset: u64,
        data: Vec<u8>,
    },
    ReadBackBuffer {
        buffer: Rc<BufferShared>,
        offset: u64,
        size: u64,
        result: BufferReadbackResult,
    },
}

/// Ordered batch of resource updates
///
/// Recording an operation copies its source data immediately; the caller's
/// buffer can be reused right after the call. Operations are applied in
/// recording order when the batch is committed to a command buffer, so a
/// later write wins on overlapping ranges.
pub struct ResourceUpdateBatch {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) ops: Vec<UpdateOp>,
}

impl ResourceUpdateBatch {
    pub(crate) fn new(device: Weak<DeviceInner>, ops: Vec<UpdateOp>) -> Self {
        Self { device, ops }
    }

    /// Record a partial update of a Dynamic buffer
    ///
    /// An operation against a buffer of the wrong usage is skipped with a
    /// warning; the rest of the batch is unaffected.
    pub fn update_dynamic_buffer(&mut self, buffer: &Buffer, offset: u64, data: &[u8]) {
        if buffer.usage() != BufferUsage::Dynamic {
            nova_warn!(
                "nova::rhi",
                "update_dynamic_buffer on a {:?} buffer, operation skipped",
                buffer.usage()
            );
            return;
        }
        self.ops.push(UpdateOp::UpdateDynamicBuffer {
            buffer: Rc::clone(&buffer.shared),
            offset,
            data: data.to_vec(),
        });
    }

    /// Record a full or partial upload of a Static buffer
    pub fn upload_static_buffer(&mut self, buffer: &Buffer, offset: u64, data: &[u8]) {
        if buffer.usage() != BufferUsage::Static {
            nova_warn!(
                "nova::rhi",
                "upload_static_buffer on a {:?} buffer, operation skipped",
                buffer.usage()
            );
            return;
        }
        self.ops.push(UpdateOp::UploadStaticBuffer {
            buffer: Rc::clone(&buffer.shared),
            offset,
            data: data.to_vec(),
        });
    }

    /// Record a readback of a buffer range into `result`
    ///
    /// On devices without the READ_BACK_NON_UNIFORM_BUFFER feature, readbacks
    /// of non-Uniform buffers are dropped at commit time and the result never
    /// completes.
    pub fn read_back_buffer(
        &mut self,
        buffer: &Buffer,
        offset: u64,
        size: u64,
        result: &BufferReadbackResult,
    ) {
        self.ops.push(UpdateOp::ReadBackBuffer {
            buffer: Rc::clone(&buffer.shared),
            offset,
            size,
            result: result.clone(),
        });
    }

    /// Number of recorded operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Discard the recorded operations without committing them and return
    /// the batch to the device pool
    pub fn release(mut self) {
        if let Some(device) = self.device.upgrade() {
            device.recycle_ops(std::mem::take(&mut self.ops));
        }
    }

    pub(crate) fn take_ops(&mut self) -> Vec<UpdateOp> {
        std::mem::take(&mut self.ops)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
