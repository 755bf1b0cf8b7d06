/// Texture resource handle

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::UVec2;

use crate::nova_warn;
use crate::rhi::backend::BackendTexture;
use crate::rhi::caps::Features;
use crate::rhi::device::DeviceInner;
use crate::rhi::native_handles::TextureNativeHandles;

/// Texture pixel formats
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8_UNORM,
    A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_FLOAT,
}

impl TextureFormat {
    /// Bytes per pixel for tightly packed data
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8_UNORM | TextureFormat::A8_UNORM => 1,
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::D32_FLOAT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    /// Whether this is a depth(-stencil) format
    pub fn is_depth_format(self) -> bool {
        matches!(self, TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT)
    }
}

bitflags::bitflags! {
    /// Texture creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureFlags: u32 {
        /// Usable as a render target color or depth attachment
        const RENDER_TARGET = 1 << 0;
        /// Six-layer cube map
        const CUBE_MAP = 1 << 1;
        /// Allocate a full mip chain
        const MIP_MAPPED = 1 << 2;
        /// Usable as a copy/readback source
        const USED_AS_TRANSFER_SOURCE = 1 << 3;
        /// Usable with shader load/store access
        const USED_WITH_LOAD_STORE = 1 << 4;
    }
}

/// Texture creation parameters handed to the backend
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub format: TextureFormat,
    pub pixel_size: UVec2,
    pub sample_count: u32,
    pub mip_levels: u32,
    pub flags: TextureFlags,
}

pub(crate) struct TextureShared {
    pub(crate) device: Weak<DeviceInner>,
    pub(crate) format: Cell<TextureFormat>,
    pub(crate) pixel_size: Cell<UVec2>,
    pub(crate) sample_count: Cell<u32>,
    pub(crate) flags: TextureFlags,
    pub(crate) native: RefCell<Option<Box<dyn BackendTexture>>>,
}

/// GPU texture handle
///
/// Created unbuilt via `Device::new_texture`. `build` validates the declared
/// properties against the device capabilities, adjusting what it can (size
/// clamping, sample count fallback) and refusing what it cannot.
pub struct Texture {
    pub(crate) shared: Rc<TextureShared>,
}

impl Texture {
    pub(crate) fn new(
        device: Weak<DeviceInner>,
        format: TextureFormat,
        pixel_size: UVec2,
        sample_count: u32,
        flags: TextureFlags,
    ) -> Self {
        Self {
            shared: Rc::new(TextureShared {
                device,
                format: Cell::new(format),
                pixel_size: Cell::new(pixel_size),
                sample_count: Cell::new(sample_count),
                flags,
                native: RefCell::new(None),
            }),
        }
    }

    pub fn format(&self) -> TextureFormat {
        self.shared.format.get()
    }

    /// Current size in pixels; `build` may have clamped the declared value
    pub fn pixel_size(&self) -> UVec2 {
        self.shared.pixel_size.get()
    }

    /// Current sample count; `build` may have fallen back to 1
    pub fn sample_count(&self) -> u32 {
        self.shared.sample_count.get()
    }

    pub fn flags(&self) -> TextureFlags {
        self.shared.flags
    }

    /// Change the declared format; takes effect at the next `build`
    pub fn set_format(&mut self, format: TextureFormat) {
        self.shared.format.set(format);
    }

    /// Change the declared size; takes effect at the next `build`
    pub fn set_pixel_size(&mut self, pixel_size: UVec2) {
        self.shared.pixel_size.set(pixel_size);
    }

    /// Change the declared sample count; takes effect at the next `build`
    pub fn set_sample_count(&mut self, sample_count: u32) {
        self.shared.sample_count.set(sample_count);
    }

    /// Whether the texture currently owns a backend allocation
    pub fn is_built(&self) -> bool {
        self.shared.native.borrow().is_some()
    }

    /// Allocate (or reallocate) the backend storage
    ///
    /// Returns false for a zero-area size, an unsupported format, or a
    /// multisample mip-mapped combination. An out-of-range size is clamped
    /// to the device limits and an unsupported sample count falls back to 1,
    /// both with a warning. A failed build may be retried after adjusting
    /// the declared properties.
    pub fn build(&mut self) -> bool {
        let Some(device) = self.shared.device.upgrade() else {
            nova_warn!("nova::rhi", "build called on a texture whose device is gone");
            return false;
        };
        device.check_thread();
        if device.lost.get() {
            nova_warn!("nova::rhi", "cannot build texture, device is lost");
            return false;
        }

        self.shared.native.borrow_mut().take();

        let size = self.shared.pixel_size.get();
        if size.x == 0 || size.y == 0 {
            nova_warn!("nova::rhi", "cannot build texture with zero area ({}x{})", size.x, size.y);
            return false;
        }

        let format = self.shared.format.get();
        if !device.caps.supported_formats.contains(&format) {
            nova_warn!("nova::rhi", "texture format {:?} is not supported", format);
            return false;
        }

        let min = device.caps.texture_size_min;
        let max = device.caps.texture_size_max;
        let clamped = UVec2::new(size.x.clamp(min, max), size.y.clamp(min, max));
        if clamped != size {
            nova_warn!(
                "nova::rhi",
                "texture size {}x{} clamped to {}x{}",
                size.x,
                size.y,
                clamped.x,
                clamped.y
            );
            self.shared.pixel_size.set(clamped);
        }

        let mut sample_count = self.shared.sample_count.get().max(1);
        if sample_count > 1 {
            if !device.caps.features.contains(Features::MULTISAMPLE_TEXTURE)
                || !device.caps.supported_sample_counts.contains(&sample_count)
            {
                nova_warn!(
                    "nova::rhi",
                    "sample count {} not supported, falling back to 1",
                    sample_count
                );
                sample_count = 1;
            }
            self.shared.sample_count.set(sample_count);
        }

        if sample_count > 1 && self.shared.flags.contains(TextureFlags::MIP_MAPPED) {
            nova_warn!("nova::rhi", "multisample textures cannot be mip-mapped");
            return false;
        }

        let mip_levels = if self.shared.flags.contains(TextureFlags::MIP_MAPPED) {
            1 + clamped.x.max(clamped.y).max(1).ilog2()
        } else {
            1
        };

        let desc = TextureDesc {
            format,
            pixel_size: clamped,
            sample_count,
            mip_levels,
            flags: self.shared.flags,
        };
        match device.be.create_texture(&desc) {
            Ok(native) => {
                *self.shared.native.borrow_mut() = Some(native);
                true
            }
            Err(e) => {
                nova_warn!("nova::rhi", "texture build failed: {}", e);
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
    pub fn native_handles(&self) -> Option<TextureNativeHandles> {
        self.shared
            .native
            .borrow()
            .as_ref()
            .and_then(|n| n.native_handles())
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
