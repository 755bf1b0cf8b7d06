/// Backend-native handle introspection
///
/// Each resource kind exposes its native objects as a tagged enum keyed by
/// backend kind, never as an untyped pointer. Raw handles are carried as
/// plain integers (the numeric value of the native API object). An accessor
/// returns `None` only for backends that have no concept of the requested
/// handle; where the native concept exists and the resource is built, the
/// accessor returns `Some`.

use crate::rhi::backend::Backend;

/// Native handles of a device/context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceNativeHandles {
    /// The Null backend has no native objects; the variant itself is the
    /// (non-null) handle set
    Null,
    OpenGles2 {
        /// Native GL context
        context: u64,
    },
    Vulkan {
        phys_dev: u64,
        dev: u64,
        gfx_queue_family_idx: i32,
        gfx_queue: u64,
        cmd_pool: u64,
        vmem_allocator: u64,
    },
    D3d11 {
        dev: u64,
        context: u64,
    },
    Metal {
        dev: u64,
        cmd_queue: u64,
    },
}

/// Native handles of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferNativeHandles {
    Null { id: u64 },
    OpenGles2 { buffer: u32 },
    Vulkan { buffer: u64, allocation: u64 },
    D3d11 { buffer: u64 },
    Metal { buffer: u64 },
}

/// Native handles of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureNativeHandles {
    Null { id: u64 },
    OpenGles2 { texture: u32 },
    Vulkan { image: u64, layout: u32 },
    D3d11 { texture: u64 },
    Metal { texture: u64 },
}

/// Native handles of a command buffer
///
/// OpenGL-style and Direct3D 11-style backends have no native command buffer
/// object; their accessors return `None` rather than a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferNativeHandles {
    Null,
    Vulkan { command_buffer: u64 },
    Metal { command_buffer: u64, encoder: u64 },
}

/// Native handles of a render-pass descriptor
///
/// Only Vulkan-style backends expose a native render-pass object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassNativeHandles {
    Null,
    Vulkan { render_pass: u64 },
}

impl DeviceNativeHandles {
    /// The backend kind this handle set belongs to
    pub fn backend(&self) -> Backend {
        match self {
            DeviceNativeHandles::Null => Backend::Null,
            DeviceNativeHandles::OpenGles2 { .. } => Backend::OpenGles2,
            DeviceNativeHandles::Vulkan { .. } => Backend::Vulkan,
            DeviceNativeHandles::D3d11 { .. } => Backend::D3d11,
            DeviceNativeHandles::Metal { .. } => Backend::Metal,
        }
    }
}

impl BufferNativeHandles {
    /// The backend kind this handle set belongs to
    pub fn backend(&self) -> Backend {
        match self {
            BufferNativeHandles::Null { .. } => Backend::Null,
            BufferNativeHandles::OpenGles2 { .. } => Backend::OpenGles2,
            BufferNativeHandles::Vulkan { .. } => Backend::Vulkan,
            BufferNativeHandles::D3d11 { .. } => Backend::D3d11,
            BufferNativeHandles::Metal { .. } => Backend::Metal,
        }
    }
}

impl TextureNativeHandles {
    /// The backend kind this handle set belongs to
    pub fn backend(&self) -> Backend {
        match self {
            TextureNativeHandles::Null { .. } => Backend::Null,
            TextureNativeHandles::OpenGles2 { .. } => Backend::OpenGles2,
            TextureNativeHandles::Vulkan { .. } => Backend::Vulkan,
            TextureNativeHandles::D3d11 { .. } => Backend::D3d11,
            TextureNativeHandles::Metal { .. } => Backend::Metal,
        }
    }
}
