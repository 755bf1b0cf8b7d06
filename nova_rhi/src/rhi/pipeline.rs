/// Graphics pipeline handle

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::nova_warn;
use crate::rhi::backend::BackendPipeline;
use crate::rhi::caps::Features;
use crate::rhi::device::DeviceInner;
use crate::rhi::render_pass::{RenderPassDescriptor, RenderPassShared};
use crate::rhi::texture::TextureFormat;

/// Primitive assembly topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    Triangles,
    TriangleStrip,
    /// Optional; gated on the TRIANGLE_FAN_TOPOLOGY feature
    TriangleFan,
    Lines,
    LineStrip,
    Points,
}

/// Pipeline creation parameters handed to the backend
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub topology: PrimitiveTopology,
    pub sample_count: u32,
    pub color_formats: Vec<TextureFormat>,
}

pub(crate) struct PipelineShared {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) topology: Cell<PrimitiveTopology>,
    pub(crate) render_pass: RefCell<Option<Rc<RenderPassShared>>>,
    pub(crate) native: RefCell<Option<Box<dyn BackendPipeline>>>,
}

/// Graphics pipeline state object
///
/// Built against a render-pass descriptor; usable with any render target
/// whose attachment layout is compatible with that descriptor.
pub struct GraphicsPipeline {
    pub(crate) shared: Rc<PipelineShared>,
}

impl GraphicsPipeline {
    pub(crate) fn new(device: Weak<DeviceInner>) -> Self {
        Self {
            shared: Rc::new(PipelineShared {
                device,
                topology: Cell::new(PrimitiveTopology::Triangles),
                render_pass: RefCell::new(None),
                native: RefCell::new(None),
            }),
        }
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.shared.topology.get()
    }

    /// Change the topology; takes effect at the next `build`
    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.shared.topology.set(topology);
    }

    /// Associate the render-pass descriptor to build against; required
    /// before `build`
    pub fn set_render_pass_descriptor(&mut self, rp: &RenderPassDescriptor) {
        *self.shared.render_pass.borrow_mut() = Some(Rc::clone(&rp.shared));
    }

    pub fn is_built(&self) -> bool {
        self.shared.native.borrow().is_some()
    }

    /// Allocate the backend pipeline object
    ///
    /// Requires a built render-pass descriptor. A triangle-fan topology on a
    /// device without the TRIANGLE_FAN_TOPOLOGY feature fails the build.
    pub fn build(&mut self) -> bool {
        let Some(device) = self.shared.device.upgrade() else {
            nova_warn!("nova::rhi", "build called on a pipeline whose device is gone");
            return false;
        };
        device.check_thread();
        if device.lost.get() {
            nova_warn!("nova::rhi", "cannot build pipeline, device is lost");
            return false;
        }

        self.shared.native.borrow_mut().take();

        let topology = self.shared.topology.get();
        if topology == PrimitiveTopology::TriangleFan
            && !device.caps.features.contains(Features::TRIANGLE_FAN_TOPOLOGY)
        {
            nova_warn!("nova::rhi", "triangle-fan topology is not supported by this device");
            return false;
        }

        let rp = self.shared.render_pass.borrow();
        let Some(rp) = rp.as_ref() else {
            nova_warn!("nova::rhi", "pipeline has no render pass descriptor set");
            return false;
        };
        if rp.native.borrow().is_none() {
            nova_warn!("nova::rhi", "render pass descriptor is not built");
            return false;
        }

        let desc = PipelineDesc {
            topology,
            sample_count: rp.sample_count,
            color_formats: rp.color_formats.clone(),
        };
        match device.be.create_pipeline(&desc) {
            Ok(native) => {
                *self.shared.native.borrow_mut() = Some(native);
                true
            }
            Err(e) => {
                nova_warn!("nova::rhi", "pipeline build failed: {}", e);
                device.note_backend_error(&e);
                false
            }
        }
    }

    /// Release the backend object; the handle stays reusable
    pub fn release(&mut self) {
        self.shared.native.borrow_mut().take();
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        self.release();
    }
}
