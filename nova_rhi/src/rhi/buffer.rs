/// Buffer resource handle

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::nova_warn;
use crate::rhi::backend::BackendBuffer;
use crate::rhi::device::DeviceInner;
use crate::rhi::native_handles::BufferNativeHandles;

/// Update frequency of a buffer's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded rarely, device-local storage preferred
    Static,
    /// Updated frequently, host-visible storage preferred
    Dynamic,
}

/// Pipeline role of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Vertex data source
    Vertex,
    /// Index data source
    Index,
    /// Shader uniform block
    Uniform,
    /// Shader read/write storage
    Storage,
}

/// Shared state between the buffer handle and recorded update operations
pub(crate) struct BufferShared {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) usage: BufferUsage,
    pub(crate) role: BufferRole,
    pub(crate) size: Cell<u64>,
    pub(crate) native: RefCell<Option<Box<dyn BackendBuffer>>>,
}

/// GPU buffer handle
///
/// Created unbuilt via `Device::new_buffer`; `build` allocates the backing
/// store from the declared usage, role and size. A built buffer can be
/// rebuilt after changing its size, which orphans the previous allocation.
pub struct Buffer {
    pub(crate) shared: Rc<BufferShared>,
}

impl Buffer {
    pub(crate) fn new(
        device: Weak<DeviceInner>,
        usage: BufferUsage,
        role: BufferRole,
        size: u64,
    ) -> Self {
        Self {
            shared: Rc::new(BufferShared {
                device,
                usage,
                role,
                size: Cell::new(size),
                native: RefCell::new(None),
            }),
        }
    }

    /// Update frequency declared at creation
    pub fn usage(&self) -> BufferUsage {
        self.shared.usage
    }

    /// Pipeline role declared at creation
    pub fn role(&self) -> BufferRole {
        self.shared.role
    }

    /// Current declared size in bytes
    pub fn size(&self) -> u64 {
        self.shared.size.get()
    }

    /// Change the declared size
    ///
    /// Takes effect at the next `build`; an already built allocation is not
    /// resized in place.
    pub fn set_size(&mut self, size: u64) {
        self.shared.size.set(size);
    }

    /// Whether the buffer currently owns a backend allocation
    pub fn is_built(&self) -> bool {
        self.shared.native.borrow().is_some()
    }

    /// Allocate (or reallocate) the backend storage
    ///
    /// Returns false and leaves the buffer unbuilt when the declared size is
    /// zero, the owning device is gone, or the backend rejects the
    /// allocation. A failed build may be retried on the same handle.
    pub fn build(&mut self) -> bool {
        let Some(device) = self.shared.device.upgrade() else {
            nova_warn!("nova::rhi", "build called on a buffer whose device is gone");
            return false;
        };
        device.check_thread();
        if device.lost.get() {
            nova_warn!("nova::rhi", "cannot build buffer, device is lost");
            return false;
        }

        // Rebuild orphans the previous allocation
        self.shared.native.borrow_mut().take();

        let size = self.shared.size.get();
        if size == 0 {
            nova_warn!("nova::rhi", "cannot build buffer with zero size");
            return false;
        }

        match device.be.create_buffer(self.shared.usage, self.shared.role, size) {
            Ok(native) => {
                *self.shared.native.borrow_mut() = Some(native);
                true
            }
            Err(e) => {
                nova_warn!("nova::rhi", "buffer build failed: {}", e);
                device.note_backend_error(&e);
                false
            }
        }
    }

    /// Release the backend allocation; the handle stays reusable
    pub fn release(&mut self) {
        self.shared.native.borrow_mut().take();
    }

    /// Native handle introspection; `None` while unbuilt
    pub fn native_handles(&self) -> Option<BufferNativeHandles> {
        self.shared
            .native
            .borrow()
            .as_ref()
            .and_then(|n| n.native_handles())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
