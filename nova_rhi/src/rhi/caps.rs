/// Capability and limits registry - per-backend static facts computed at
/// device creation

use glam::Mat4;

use crate::error::{Error, Result};
use crate::rhi::texture::TextureFormat;

bitflags::bitflags! {
    /// Optional backend features
    ///
    /// Every feature has a definite boolean answer per backend: unsupported
    /// features report `false`, they never fail a query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        /// Multisample textures (sample count > 1) can be created
        const MULTISAMPLE_TEXTURE = 1 << 0;
        /// Multisample render buffers can be created
        const MULTISAMPLE_RENDER_BUFFER = 1 << 1;
        /// Debug markers / annotations in command streams
        const DEBUG_MARKERS = 1 << 2;
        /// GPU timestamp queries
        const TIMESTAMPS = 1 << 3;
        /// Instanced drawing
        const INSTANCING = 1 << 4;
        /// Per-attribute custom instance step rate
        const CUSTOM_INSTANCE_STEP_RATE = 1 << 5;
        /// Primitive restart index
        const PRIMITIVE_RESTART = 1 << 6;
        /// Uniform buffers with non-dynamic (immutable/static) usage
        const NON_DYNAMIC_UNIFORM_BUFFERS = 1 << 7;
        /// Index buffer offsets that are not 4-byte aligned
        const NON_FOUR_ALIGNED_EFFECTIVE_INDEX_BUFFER_OFFSET = 1 << 8;
        /// Repeat wrap mode on non-power-of-two textures
        const NPOT_TEXTURE_REPEAT = 1 << 9;
        /// Single-channel 8-bit formats alias to red (not alpha)
        const RED_OR_ALPHA8_IS_RED = 1 << 10;
        /// 32-bit index buffers
        const ELEMENT_INDEX_UINT = 1 << 11;
        /// Compute pipelines
        const COMPUTE = 1 << 12;
        /// Line widths other than 1
        const WIDE_LINES = 1 << 13;
        /// Point size set from the vertex shader
        const VERTEX_SHADER_POINT_SIZE = 1 << 14;
        /// Base vertex offset in indexed draws
        const BASE_VERTEX = 1 << 15;
        /// Base instance offset in instanced draws
        const BASE_INSTANCE = 1 << 16;
        /// Triangle-fan primitive topology
        const TRIANGLE_FAN_TOPOLOGY = 1 << 17;
        /// Readback of buffers whose role is not Uniform
        const READ_BACK_NON_UNIFORM_BUFFER = 1 << 18;
    }
}

/// Resource limit kinds queryable via `Device::resource_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    /// Minimum texture dimension (width or height)
    TextureSizeMin,
    /// Maximum texture dimension (width or height)
    TextureSizeMax,
    /// Maximum color attachments per render target
    MaxColorAttachments,
    /// Number of frames that may be in flight concurrently
    FramesInFlight,
}

/// Read-only capability set of a backend device
///
/// Computed once by the backend at device creation; fixed for the device's
/// lifetime.
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    /// Supported optional features
    pub features: Features,
    /// Minimum texture dimension
    pub texture_size_min: u32,
    /// Maximum texture dimension
    pub texture_size_max: u32,
    /// Maximum color attachments per render target
    pub max_color_attachments: u32,
    /// Frames that may be in flight concurrently
    pub frames_in_flight: u32,
    /// Supported MSAA sample counts; always contains 1
    pub supported_sample_counts: Vec<u32>,
    /// Texture formats the backend can allocate
    pub supported_formats: Vec<TextureFormat>,
    /// Uniform buffer offset alignment; power of two, >= 1
    pub ubuf_alignment: u64,
    /// True if framebuffer Y axis points up
    pub y_up_in_framebuffer: bool,
    /// True if NDC Y axis points up
    pub y_up_in_ndc: bool,
    /// True if clip-space depth range is [0, 1] (instead of [-1, 1])
    pub clip_depth_zero_to_one: bool,
    /// Correction matrix mapping default-convention (OpenGL-style) clip
    /// space to this backend's clip space
    pub clip_space_corr_matrix: Mat4,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        // Default-convention (OpenGL-style) coordinate system
        Self {
            features: Features::empty(),
            texture_size_min: 1,
            texture_size_max: 4096,
            max_color_attachments: 1,
            frames_in_flight: 1,
            supported_sample_counts: vec![1],
            supported_formats: vec![TextureFormat::R8G8B8A8_UNORM],
            ubuf_alignment: 256,
            y_up_in_framebuffer: true,
            y_up_in_ndc: true,
            clip_depth_zero_to_one: false,
            clip_space_corr_matrix: Mat4::IDENTITY,
        }
    }
}

impl DeviceCaps {
    /// Look up a resource limit value
    pub fn resource_limit(&self, limit: ResourceLimit) -> u32 {
        match limit {
            ResourceLimit::TextureSizeMin => self.texture_size_min,
            ResourceLimit::TextureSizeMax => self.texture_size_max,
            ResourceLimit::MaxColorAttachments => self.max_color_attachments,
            ResourceLimit::FramesInFlight => self.frames_in_flight,
        }
    }

    /// Check internal consistency of a backend-reported capability set
    ///
    /// Rejects capability tuples no real backend can report: a zero or
    /// non-power-of-two uniform alignment, an empty or 1-less sample count
    /// set, degenerate limits, or a [0, 1] depth range with an identity
    /// correction matrix.
    pub fn validate(&self) -> Result<()> {
        if self.ubuf_alignment == 0 || !self.ubuf_alignment.is_power_of_two() {
            return Err(Error::InitializationFailed(format!(
                "uniform buffer alignment {} is not a power of two",
                self.ubuf_alignment
            )));
        }
        if !self.supported_sample_counts.contains(&1) {
            return Err(Error::InitializationFailed(
                "supported sample counts must contain 1".to_string(),
            ));
        }
        if self.texture_size_min < 1 || self.texture_size_max < self.texture_size_min {
            return Err(Error::InitializationFailed(format!(
                "invalid texture size bounds [{}, {}]",
                self.texture_size_min, self.texture_size_max
            )));
        }
        if self.max_color_attachments < 1 {
            return Err(Error::InitializationFailed(
                "at least one color attachment must be supported".to_string(),
            ));
        }
        if self.frames_in_flight < 1 {
            return Err(Error::InitializationFailed(
                "frames in flight must be at least 1".to_string(),
            ));
        }
        if !self.supported_formats.contains(&TextureFormat::R8G8B8A8_UNORM) {
            return Err(Error::InitializationFailed(
                "RGBA8 texture support is mandatory".to_string(),
            ));
        }
        // A [0, 1] depth range differs from the default convention, so the
        // correction matrix cannot be the identity.
        if self.clip_depth_zero_to_one && self.clip_space_corr_matrix == Mat4::IDENTITY {
            return Err(Error::InitializationFailed(
                "zero-to-one clip depth requires a non-identity correction matrix".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "caps_tests.rs"]
mod tests;
