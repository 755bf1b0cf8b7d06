/// Texture render target handle

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::UVec2;

use crate::nova_warn;
use crate::rhi::backend::BackendRenderTarget;
use crate::rhi::caps::ResourceLimit;
use crate::rhi::device::DeviceInner;
use crate::rhi::render_pass::{RenderPassDescriptor, RenderPassShared};
use crate::rhi::texture::{Texture, TextureFlags, TextureFormat, TextureShared};

/// A single color attachment of a texture render target
pub struct ColorAttachment {
    pub(crate) texture: Rc<TextureShared>,
    pub(crate) layer: u32,
    pub(crate) level: u32,
}

impl ColorAttachment {
    /// Attach layer 0, mip level 0 of a texture
    pub fn new(texture: &Texture) -> Self {
        Self {
            texture: Rc::clone(&texture.shared),
            layer: 0,
            level: 0,
        }
    }

    /// Attach a specific layer and mip level
    pub fn with_layer_and_level(texture: &Texture, layer: u32, level: u32) -> Self {
        Self {
            texture: Rc::clone(&texture.shared),
            layer,
            level,
        }
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

/// Render-target creation parameters handed to the backend
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub pixel_size: UVec2,
    pub sample_count: u32,
    pub color_formats: Vec<TextureFormat>,
}

pub(crate) struct RenderTargetShared {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) attachments: Vec<ColorAttachment>,
    pub(crate) render_pass: RefCell<Option<Rc<RenderPassShared>>>,
    pub(crate) native: RefCell<Option<Box<dyn BackendRenderTarget>>>,
}

/// Render target backed by one or more texture attachments
///
/// Workflow: create with attachments, derive a compatible render-pass
/// descriptor, build the descriptor, set it on the target, then build the
/// target.
pub struct TextureRenderTarget {
    pub(crate) shared: Rc<RenderTargetShared>,
}

impl TextureRenderTarget {
    pub(crate) fn new(device: Weak<DeviceInner>, attachments: Vec<ColorAttachment>) -> Self {
        Self {
            shared: Rc::new(RenderTargetShared {
                device,
                attachments,
                render_pass: RefCell::new(None),
                native: RefCell::new(None),
            }),
        }
    }

    /// Derive a render-pass descriptor matching this target's attachment
    /// layout
    ///
    /// The descriptor is returned unbuilt; pipelines built against it can be
    /// used with any target whose layout is compatible.
    pub fn new_compatible_render_pass_descriptor(&self) -> RenderPassDescriptor {
        let color_formats = self
            .shared
            .attachments
            .iter()
            .map(|a| a.texture.format.get())
            .collect();
        let sample_count = self
            .shared
            .attachments
            .first()
            .map(|a| a.texture.sample_count.get())
            .unwrap_or(1);
        RenderPassDescriptor::new(self.shared.device.clone(), color_formats, sample_count)
    }

    /// Associate a built render-pass descriptor; required before `build`
    pub fn set_render_pass_descriptor(&mut self, rp: &RenderPassDescriptor) {
        *self.shared.render_pass.borrow_mut() = Some(Rc::clone(&rp.shared));
    }

    /// Size in pixels of the first attachment
    pub fn pixel_size(&self) -> UVec2 {
        self.shared
            .attachments
            .first()
            .map(|a| a.texture.pixel_size.get())
            .unwrap_or(UVec2::ZERO)
    }

    pub fn is_built(&self) -> bool {
        self.shared.native.borrow().is_some()
    }

    /// Allocate the backend render target
    ///
    /// Requires at least one attachment, all attachment textures built with
    /// the RENDER_TARGET flag, an attachment count within the device limit,
    /// and a built, layout-compatible render-pass descriptor.
    pub fn build(&mut self) -> bool {
        let Some(device) = self.shared.device.upgrade() else {
            nova_warn!("nova::rhi", "build called on a render target whose device is gone");
            return false;
        };
        device.check_thread();
        if device.lost.get() {
            nova_warn!("nova::rhi", "cannot build render target, device is lost");
            return false;
        }

        self.shared.native.borrow_mut().take();

        if self.shared.attachments.is_empty() {
            nova_warn!("nova::rhi", "render target needs at least one color attachment");
            return false;
        }
        let max = device.caps.resource_limit(ResourceLimit::MaxColorAttachments);
        if self.shared.attachments.len() as u32 > max {
            nova_warn!(
                "nova::rhi",
                "render target has {} attachments, device supports {}",
                self.shared.attachments.len(),
                max
            );
            return false;
        }
        for attachment in &self.shared.attachments {
            if attachment.texture.native.borrow().is_none() {
                nova_warn!("nova::rhi", "render target attachment texture is not built");
                return false;
            }
            if !attachment.texture.flags.contains(TextureFlags::RENDER_TARGET) {
                nova_warn!(
                    "nova::rhi",
                    "attachment texture was not created with the RENDER_TARGET flag"
                );
                return false;
            }
        }

        let rp = self.shared.render_pass.borrow();
        let Some(rp) = rp.as_ref() else {
            nova_warn!("nova::rhi", "render target has no render pass descriptor set");
            return false;
        };
        if rp.native.borrow().is_none() {
            nova_warn!("nova::rhi", "render pass descriptor is not built");
            return false;
        }
        let own_formats: Vec<TextureFormat> = self
            .shared
            .attachments
            .iter()
            .map(|a| a.texture.format.get())
            .collect();
        let own_samples = self.shared.attachments[0].texture.sample_count.get();
        if rp.color_formats != own_formats || rp.sample_count != own_samples {
            nova_warn!(
                "nova::rhi",
                "render pass descriptor is not compatible with the attachments"
            );
            return false;
        }

        let desc = RenderTargetDesc {
            pixel_size: self.shared.attachments[0].texture.pixel_size.get(),
            sample_count: own_samples,
            color_formats: own_formats,
        };
        match device.be.create_render_target(&desc) {
            Ok(native) => {
                *self.shared.native.borrow_mut() = Some(native);
                true
            }
            Err(e) => {
                nova_warn!("nova::rhi", "render target build failed: {}", e);
                device.note_backend_error(&e);
                false
            }
        }
    }

    /// Release the backend object; attachments and descriptor stay set
    pub fn release(&mut self) {
        self.shared.native.borrow_mut().take();
    }
}

impl Drop for TextureRenderTarget {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
