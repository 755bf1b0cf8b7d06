/// Render-pass descriptor handle

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::nova_warn;
use crate::rhi::backend::BackendRenderPass;
use crate::rhi::device::DeviceInner;
use crate::rhi::native_handles::RenderPassNativeHandles;
use crate::rhi::texture::TextureFormat;

/// Render-pass creation parameters handed to the backend
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub color_formats: Vec<TextureFormat>,
    pub sample_count: u32,
}

pub(crate) struct RenderPassShared {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) color_formats: Vec<TextureFormat>,
    pub(crate) sample_count: u32,
    pub(crate) native: RefCell<Option<Box<dyn BackendRenderPass>>>,
}

impl RenderPassShared {
    /// Two descriptors are compatible when their attachment formats and
    /// sample counts match
    pub(crate) fn is_compatible(&self, other: &RenderPassShared) -> bool {
        self.color_formats == other.color_formats && self.sample_count == other.sample_count
    }
}

/// Render-pass descriptor
///
/// Captures the attachment layout of a render target so pipelines can be
/// built against it. Obtained from
/// `TextureRenderTarget::new_compatible_render_pass_descriptor`.
pub struct RenderPassDescriptor {
    pub(crate) shared: Rc<RenderPassShared>,
}

impl RenderPassDescriptor {
    pub(crate) fn new(
        device: Weak<DeviceInner>,
        color_formats: Vec<TextureFormat>,
        sample_count: u32,
    ) -> Self {
        Self {
            shared: Rc::new(RenderPassShared {
                device,
                color_formats,
                sample_count,
                native: RefCell::new(None),
            }),
        }
    }

    /// Color attachment formats this descriptor was derived from
    pub fn color_formats(&self) -> &[TextureFormat] {
        &self.shared.color_formats
    }

    pub fn sample_count(&self) -> u32 {
        self.shared.sample_count
    }

    /// Whether another descriptor describes the same attachment layout
    pub fn is_compatible(&self, other: &RenderPassDescriptor) -> bool {
        self.shared.is_compatible(&other.shared)
    }

    pub fn is_built(&self) -> bool {
        self.shared.native.borrow().is_some()
    }

    /// Allocate the backend render-pass object
    pub fn build(&mut self) -> bool {
        let Some(device) = self.shared.device.upgrade() else {
            nova_warn!("nova::rhi", "build called on a render pass whose device is gone");
            return false;
        };
        device.check_thread();
        if device.lost.get() {
            nova_warn!("nova::rhi", "cannot build render pass, device is lost");
            return false;
        }

        self.shared.native.borrow_mut().take();

        let desc = RenderPassDesc {
            color_formats: self.shared.color_formats.clone(),
            sample_count: self.shared.sample_count,
        };
        match device.be.create_render_pass(&desc) {
            Ok(native) => {
                *self.shared.native.borrow_mut() = Some(native);
                true
            }
            Err(e) => {
                nova_warn!("nova::rhi", "render pass build failed: {}", e);
                device.note_backend_error(&e);
                false
            }
        }
    }

    /// Release the backend object; the handle stays reusable
    pub fn release(&mut self) {
        self.shared.native.borrow_mut().take();
    }

    /// Native handle introspection; `None` while unbuilt or for backends
    /// without a native render-pass object
    pub fn native_handles(&self) -> Option<RenderPassNativeHandles> {
        self.shared
            .native
            .borrow()
            .as_ref()
            .and_then(|n| n.native_handles())
    }
}

impl Drop for RenderPassDescriptor {
    fn drop(&mut self) {
        self.release();
    }
}
