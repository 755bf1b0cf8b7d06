/// Backend contract - the operation set a native-API backend must satisfy,
/// plus the plugin registry for backend implementations

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::rhi::buffer::{BufferRole, BufferUsage};
use crate::rhi::caps::DeviceCaps;
use crate::rhi::device::DeviceFlags;
use crate::rhi::native_handles::{
    BufferNativeHandles, CommandBufferNativeHandles, DeviceNativeHandles, RenderPassNativeHandles,
    TextureNativeHandles,
};
use crate::rhi::pipeline::PipelineDesc;
use crate::rhi::render_pass::RenderPassDesc;
use crate::rhi::render_target::RenderTargetDesc;
use crate::rhi::texture::TextureDesc;

// ============================================================================
// Backend identification
// ============================================================================

/// Backend kinds
///
/// Fixed enumeration; a device's backend never changes during its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Built-in reference backend, always available, no GPU required
    Null,
    /// OpenGL ES 2.0-style backend
    OpenGles2,
    /// Vulkan-style backend
    Vulkan,
    /// Direct3D 11-style backend
    D3d11,
    /// Metal-style backend
    Metal,
}

impl Backend {
    /// Human-readable backend name
    pub fn name(self) -> &'static str {
        match self {
            Backend::Null => "Null",
            Backend::OpenGles2 => "OpenGL ES 2.0",
            Backend::Vulkan => "Vulkan",
            Backend::D3d11 => "Direct3D 11",
            Backend::Metal => "Metal",
        }
    }
}

// ============================================================================
// Backend-specific initialization parameters
// ============================================================================

/// Init parameters for the Null backend
#[derive(Debug, Clone, Default)]
pub struct NullInitParams;

/// Init parameters for OpenGL ES-style backends
#[derive(Debug, Clone, Default)]
pub struct Gles2InitParams {
    /// Native handle of an offscreen surface the context can fall back to
    /// when no window surface is current
    pub fallback_surface: Option<u64>,
}

/// Init parameters for Vulkan-style backends
#[derive(Debug, Clone, Default)]
pub struct VulkanInitParams {
    /// Native instance handle
    pub instance: u64,
    /// Validation/debug layers to enable
    pub enabled_layers: Vec<String>,
    /// Instance extensions to enable
    pub enabled_extensions: Vec<String>,
}

/// Init parameters for Direct3D 11-style backends
#[derive(Debug, Clone, Default)]
pub struct D3d11InitParams {
    /// Enable the native debug layer
    pub enable_debug_layer: bool,
}

/// Init parameters for Metal-style backends
#[derive(Debug, Clone, Default)]
pub struct MetalInitParams;

/// Backend-specific initialization parameters, tagged by backend kind
#[derive(Debug, Clone)]
pub enum InitParams {
    Null(NullInitParams),
    OpenGles2(Gles2InitParams),
    Vulkan(VulkanInitParams),
    D3d11(D3d11InitParams),
    Metal(MetalInitParams),
}

impl InitParams {
    /// The backend kind these parameters belong to
    pub fn backend(&self) -> Backend {
        match self {
            InitParams::Null(_) => Backend::Null,
            InitParams::OpenGles2(_) => Backend::OpenGles2,
            InitParams::Vulkan(_) => Backend::Vulkan,
            InitParams::D3d11(_) => Backend::D3d11,
            InitParams::Metal(_) => Backend::Metal,
        }
    }
}

// ============================================================================
// Device statistics
// ============================================================================

/// Live-resource statistics reported by a backend device
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceStats {
    /// Number of currently allocated buffers
    pub buffers_alive: u32,
    /// Number of currently allocated textures
    pub textures_alive: u32,
    /// GPU memory used by live resources (bytes)
    pub gpu_memory_used: u64,
}

// ============================================================================
// Backend resource contract
// ============================================================================

/// Backend storage of a built buffer
pub trait BackendBuffer {
    /// Write `data` at `offset`; the range must lie within the allocation
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `size` bytes starting at `offset`
    ///
    /// Blocks until device-side completion; callers on the offscreen frame
    /// path rely on this being synchronous.
    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>>;

    /// Native handle introspection; `None` only where the backend has no
    /// native buffer object
    fn native_handles(&self) -> Option<BufferNativeHandles>;
}

/// Backend storage of a built texture
pub trait BackendTexture {
    /// Native handle introspection
    fn native_handles(&self) -> Option<TextureNativeHandles>;
}

/// Backend storage of a built render target
pub trait BackendRenderTarget {}

/// Backend storage of a built render-pass descriptor
pub trait BackendRenderPass {
    /// Native handle introspection; `None` for backends without a native
    /// render-pass object
    fn native_handles(&self) -> Option<RenderPassNativeHandles>;
}

/// Backend storage of a built graphics pipeline
pub trait BackendPipeline {}

// ============================================================================
// Backend device contract
// ============================================================================

/// The operation set a backend implementation must satisfy
///
/// Implemented by the built-in Null backend and by backend plugin crates.
/// A backend device is affine to the thread that created it; the only
/// cross-thread operation is `make_thread_local_native_context_current`.
///
/// Unrecoverable backend errors are reported as `Error::DeviceLost`; the
/// device translates that into its sticky lost state.
pub trait BackendDevice {
    /// Capability set, probed once at device creation
    fn caps(&self) -> DeviceCaps;

    /// Native handle introspection for the device/context
    fn native_handles(&self) -> Option<DeviceNativeHandles>;

    /// Make the backend's native context current on the calling thread
    ///
    /// Only meaningful for backends with thread-bound native contexts
    /// (OpenGL-style); others return true without side effects.
    fn make_thread_local_native_context_current(&self) -> bool {
        true
    }

    /// Allocate backend storage for a buffer
    fn create_buffer(
        &self,
        usage: BufferUsage,
        role: BufferRole,
        size: u64,
    ) -> Result<Box<dyn BackendBuffer>>;

    /// Allocate backend storage for a texture
    fn create_texture(&self, desc: &TextureDesc) -> Result<Box<dyn BackendTexture>>;

    /// Allocate backend storage for a texture render target
    fn create_render_target(&self, desc: &RenderTargetDesc) -> Result<Box<dyn BackendRenderTarget>>;

    /// Allocate backend storage for a render-pass descriptor
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Box<dyn BackendRenderPass>>;

    /// Allocate backend storage for a graphics pipeline
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Box<dyn BackendPipeline>>;

    /// Begin a synchronous frame not tied to a presentable surface
    fn begin_offscreen_frame(&self) -> Result<()>;

    /// Submit the recorded frame and block until device-side completion
    fn end_offscreen_frame(&self) -> Result<()>;

    /// Begin a render pass on a built render target
    fn begin_pass(
        &self,
        render_target: &dyn BackendRenderTarget,
        clear_color: [f32; 4],
        clear_depth_stencil: (f32, u32),
    ) -> Result<()>;

    /// End the current render pass
    fn end_pass(&self) -> Result<()>;

    /// Native handles of the current command buffer, if the backend has one
    fn command_buffer_native_handles(&self) -> Option<CommandBufferNativeHandles> {
        None
    }

    /// Drop backend-side caches (e.g. compiled pipelines) without
    /// invalidating live resources
    fn release_cached_resources(&self) {}

    /// Live-resource statistics
    fn stats(&self) -> DeviceStats {
        DeviceStats::default()
    }
}

// ============================================================================
// Plugin system for registering backend implementations
// ============================================================================

/// Backend plugin factory function type
type BackendFactory =
    Box<dyn Fn(&InitParams, DeviceFlags) -> Result<Box<dyn BackendDevice>> + Send + Sync>;

/// Plugin registry for backend implementations
pub struct BackendPluginRegistry {
    factories: FxHashMap<Backend, BackendFactory>,
}

impl BackendPluginRegistry {
    /// Create a new plugin registry
    fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Register a plugin for a backend kind
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend kind the plugin implements
    /// * `factory` - Factory function creating the backend device
    pub fn register_plugin<F>(&mut self, backend: Backend, factory: F)
    where
        F: Fn(&InitParams, DeviceFlags) -> Result<Box<dyn BackendDevice>> + Send + Sync + 'static,
    {
        self.factories.insert(backend, Box::new(factory));
    }

    /// Create a backend device using a registered plugin
    pub fn create_backend_device(
        &self,
        backend: Backend,
        params: &InitParams,
        flags: DeviceFlags,
    ) -> Result<Box<dyn BackendDevice>> {
        self.factories
            .get(&backend)
            .ok_or_else(|| {
                Error::InitializationFailed(format!(
                    "no plugin registered for backend {}",
                    backend.name()
                ))
            })?(params, flags)
    }
}

static BACKEND_REGISTRY: Mutex<Option<BackendPluginRegistry>> = Mutex::new(None);

/// Get the global backend plugin registry
pub fn backend_plugin_registry() -> &'static Mutex<Option<BackendPluginRegistry>> {
    // Initialize on first access
    let mut registry = BACKEND_REGISTRY.lock().unwrap();
    if registry.is_none() {
        *registry = Some(BackendPluginRegistry::new());
    }
    drop(registry);
    &BACKEND_REGISTRY
}

/// Register a backend plugin in the global registry
///
/// # Arguments
///
/// * `backend` - Backend kind the plugin implements
/// * `factory` - Factory function
pub fn register_backend_plugin<F>(backend: Backend, factory: F)
where
    F: Fn(&InitParams, DeviceFlags) -> Result<Box<dyn BackendDevice>> + Send + Sync + 'static,
{
    backend_plugin_registry()
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .register_plugin(backend, factory);
}

/// Create a backend device through the global registry (internal use)
pub(crate) fn create_registered_backend_device(
    backend: Backend,
    params: &InitParams,
    flags: DeviceFlags,
) -> Result<Box<dyn BackendDevice>> {
    backend_plugin_registry()
        .lock()
        .unwrap()
        .as_ref()
        .unwrap()
        .create_backend_device(backend, params, flags)
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
