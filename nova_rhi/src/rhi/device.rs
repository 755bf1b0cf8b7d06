/// Device - root object of the rendering hardware interface

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

use glam::{Mat4, UVec2};

use crate::error::{Error, Result};
use crate::rhi::backend::{
    create_registered_backend_device, Backend, BackendDevice, DeviceStats, InitParams,
};
use crate::rhi::batch::{BufferReadbackResult, ResourceUpdateBatch, UpdateOp};
use crate::rhi::buffer::{Buffer, BufferRole, BufferUsage};
use crate::rhi::caps::{DeviceCaps, Features, ResourceLimit};
use crate::rhi::command_buffer::{CommandBuffer, RecordingState};
use crate::rhi::native_handles::DeviceNativeHandles;
use crate::rhi::null_backend::NullBackend;
use crate::rhi::pipeline::GraphicsPipeline;
use crate::rhi::render_target::{ColorAttachment, TextureRenderTarget};
use crate::rhi::texture::{Texture, TextureFlags, TextureFormat};
use crate::{nova_info, nova_warn};

bitflags::bitflags! {
    /// Device creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFlags: u32 {
        /// Collect per-frame profiling data where the backend supports it
        const ENABLE_PROFILING = 1 << 0;
        /// Emit debug markers into the native command stream
        const ENABLE_DEBUG_MARKERS = 1 << 1;
    }
}

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Maximum number of recycled operation vectors kept per device
const BATCH_POOL_LIMIT: usize = 8;

/// Readback committed in the current frame, waiting for frame completion
struct PendingReadback {
    result: BufferReadbackResult,
}

/// Device state shared with resource handles, batches and command buffers
/// through weak references
pub(crate) struct DeviceInner {
    pub(crate) id: u64,
    pub(crate) backend: Backend,
    pub(crate) flags: DeviceFlags,
    pub(crate) caps: DeviceCaps,
    pub(crate) be: Box<dyn BackendDevice>,
    pub(crate) thread: ThreadId,
    pub(crate) lost: Cell<bool>,
    pub(crate) frame: Cell<RecordingState>,
    cleanup_callbacks: RefCell<Vec<Box<dyn FnMut(&Device)>>>,
    batch_pool: RefCell<Vec<Vec<UpdateOp>>>,
    pending_readbacks: RefCell<Vec<PendingReadback>>,
}

impl DeviceInner {
    /// All operations except `make_thread_local_native_context_current` must
    /// run on the creating thread
    pub(crate) fn check_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.thread,
            "device used from a thread other than its creating thread"
        );
    }

    /// Record a backend error; DeviceLost makes the device permanently lost
    pub(crate) fn note_backend_error(&self, error: &Error) {
        if matches!(error, Error::DeviceLost) {
            self.lost.set(true);
        }
    }

    /// Apply a batch's operations in recording order
    ///
    /// Per-operation failures (missing allocation, out-of-range access,
    /// unsupported readback) skip the operation with a warning; only device
    /// loss aborts the batch.
    pub(crate) fn apply_batch(&self, ops: Vec<UpdateOp>) -> Result<()> {
        if self.lost.get() {
            self.recycle_ops(ops);
            return Err(Error::DeviceLost);
        }
        let mut aborted = false;
        'ops: for op in &ops {
            match op {
                UpdateOp::UpdateDynamicBuffer { buffer, offset, data }
                | UpdateOp::UploadStaticBuffer { buffer, offset, data } => {
                    let native = buffer.native.borrow();
                    let Some(native) = native.as_ref() else {
                        nova_warn!("nova::rhi", "buffer write against an unbuilt buffer, skipped");
                        continue;
                    };
                    // Overflowing ranges count as out of range
                    let end = offset.checked_add(data.len() as u64).unwrap_or(u64::MAX);
                    if end > buffer.size.get() {
                        nova_warn!(
                            "nova::rhi",
                            "buffer write at offset {} (len {}) exceeds size {}, skipped",
                            offset,
                            data.len(),
                            buffer.size.get()
                        );
                        continue;
                    }
                    if let Err(e) = native.write(*offset, data) {
                        nova_warn!("nova::rhi", "buffer write failed: {}", e);
                        self.note_backend_error(&e);
                        if self.lost.get() {
                            aborted = true;
                            break 'ops;
                        }
                    }
                }
                UpdateOp::ReadBackBuffer { buffer, offset, size, result } => {
                    if buffer.role != BufferRole::Uniform
                        && !self.caps.features.contains(Features::READ_BACK_NON_UNIFORM_BUFFER)
                    {
                        // Unsupported readback: dropped silently, the result
                        // never completes
                        continue;
                    }
                    let native = buffer.native.borrow();
                    let Some(native) = native.as_ref() else {
                        nova_warn!("nova::rhi", "readback against an unbuilt buffer, skipped");
                        continue;
                    };
                    let end = offset.checked_add(*size).unwrap_or(u64::MAX);
                    if end > buffer.size.get() {
                        nova_warn!(
                            "nova::rhi",
                            "readback at offset {} (len {}) exceeds size {}, skipped",
                            offset,
                            size,
                            buffer.size.get()
                        );
                        continue;
                    }
                    match native.read(*offset, *size) {
                        Ok(data) => {
                            result.set_data(data);
                            self.pending_readbacks
                                .borrow_mut()
                                .push(PendingReadback { result: result.clone() });
                        }
                        Err(e) => {
                            nova_warn!("nova::rhi", "readback failed: {}", e);
                            self.note_backend_error(&e);
                            if self.lost.get() {
                                aborted = true;
                                break 'ops;
                            }
                        }
                    }
                }
            }
        }
        self.recycle_ops(ops);
        if aborted {
            return Err(Error::DeviceLost);
        }
        Ok(())
    }

    /// Return an operation vector to the pool
    pub(crate) fn recycle_ops(&self, mut ops: Vec<UpdateOp>) {
        ops.clear();
        let mut pool = self.batch_pool.borrow_mut();
        if pool.len() < BATCH_POOL_LIMIT {
            pool.push(ops);
        }
    }

    /// Mark every readback committed in the finished frame as completed
    fn complete_pending_readbacks(&self) {
        let pending = std::mem::take(&mut *self.pending_readbacks.borrow_mut());
        for readback in pending {
            readback.result.finish();
        }
    }

    /// Drop readbacks of a frame that did not complete; their results stay
    /// incomplete
    fn abandon_pending_readbacks(&self) {
        self.pending_readbacks.borrow_mut().clear();
    }
}

/// Root object of the rendering hardware interface
///
/// Owns a backend device and hands out resource handles, update batches and
/// frame command buffers. Dropping the device invalidates everything created
/// from it; outstanding handles degrade to inert objects rather than
/// dangling.
///
/// # Example
///
/// ```
/// use nova_rhi::rhi::{Backend, Device, DeviceFlags, InitParams, NullInitParams};
///
/// let params = InitParams::Null(NullInitParams);
/// let device = Device::create(Backend::Null, &params, DeviceFlags::empty())
///     .expect("the Null backend is always available");
/// assert_eq!(device.backend(), Backend::Null);
/// ```
pub struct Device {
    pub(crate) inner: Rc<DeviceInner>,
}

impl Device {
    /// Create a device on the given backend
    ///
    /// Returns `None` when the backend is unavailable, no plugin is
    /// registered for it, or the parameters do not match the backend kind.
    /// Creation never panics on an unsupported backend.
    pub fn create(backend: Backend, params: &InitParams, flags: DeviceFlags) -> Option<Device> {
        if params.backend() != backend {
            nova_warn!(
                "nova::rhi",
                "init params are for backend {}, requested {}",
                params.backend().name(),
                backend.name()
            );
            return None;
        }
        let be: Box<dyn BackendDevice> = if backend == Backend::Null {
            Box::new(NullBackend::new())
        } else {
            match create_registered_backend_device(backend, params, flags) {
                Ok(be) => be,
                Err(e) => {
                    nova_warn!("nova::rhi", "backend {} unavailable: {}", backend.name(), e);
                    return None;
                }
            }
        };
        Self::with_backend(backend, flags, be)
    }

    /// Wrap an already constructed backend device
    pub(crate) fn with_backend(
        backend: Backend,
        flags: DeviceFlags,
        be: Box<dyn BackendDevice>,
    ) -> Option<Device> {
        let caps = be.caps();
        if let Err(e) = caps.validate() {
            nova_warn!(
                "nova::rhi",
                "backend {} reported an invalid capability set: {}",
                backend.name(),
                e
            );
            return None;
        }
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);
        nova_info!("nova::rhi", "device {} created on backend {}", id, backend.name());
        Some(Device {
            inner: Rc::new(DeviceInner {
                id,
                backend,
                flags,
                caps,
                be,
                thread: std::thread::current().id(),
                lost: Cell::new(false),
                frame: Cell::new(RecordingState::Idle),
                cleanup_callbacks: RefCell::new(Vec::new()),
                batch_pool: RefCell::new(Vec::new()),
                pending_readbacks: RefCell::new(Vec::new()),
            }),
        })
    }

    /// Backend kind this device runs on
    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Unique id of this device instance
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Flags the device was created with
    pub fn flags(&self) -> DeviceFlags {
        self.inner.flags
    }

    // ------------------------------------------------------------------------
    // Resource factories - handles are returned unbuilt
    // ------------------------------------------------------------------------

    /// Create an unbuilt buffer handle
    pub fn new_buffer(&self, usage: BufferUsage, role: BufferRole, size: u64) -> Buffer {
        Buffer::new(Rc::downgrade(&self.inner), usage, role, size)
    }

    /// Create an unbuilt texture handle
    pub fn new_texture(
        &self,
        format: TextureFormat,
        pixel_size: UVec2,
        sample_count: u32,
        flags: TextureFlags,
    ) -> Texture {
        Texture::new(Rc::downgrade(&self.inner), format, pixel_size, sample_count, flags)
    }

    /// Create an unbuilt texture render target from color attachments
    pub fn new_texture_render_target(
        &self,
        attachments: Vec<ColorAttachment>,
    ) -> TextureRenderTarget {
        TextureRenderTarget::new(Rc::downgrade(&self.inner), attachments)
    }

    /// Create an unbuilt graphics pipeline handle
    pub fn new_graphics_pipeline(&self) -> GraphicsPipeline {
        GraphicsPipeline::new(Rc::downgrade(&self.inner))
    }

    /// Get an empty resource-update batch, reusing pooled storage
    pub fn next_resource_update_batch(&self) -> ResourceUpdateBatch {
        let ops = self.inner.batch_pool.borrow_mut().pop().unwrap_or_default();
        ResourceUpdateBatch::new(Rc::downgrade(&self.inner), ops)
    }

    // ------------------------------------------------------------------------
    // Frame control
    // ------------------------------------------------------------------------

    /// Begin a synchronous frame not tied to a presentable surface
    ///
    /// Legal only when no frame is active.
    pub fn begin_offscreen_frame(&self) -> Result<CommandBuffer> {
        self.inner.check_thread();
        if self.inner.lost.get() {
            return Err(Error::DeviceLost);
        }
        if self.inner.frame.get() != RecordingState::Idle {
            return Err(Error::InvalidOperation(
                "begin_offscreen_frame while a frame is already active".to_string(),
            ));
        }
        match self.inner.be.begin_offscreen_frame() {
            Ok(()) => {
                self.inner.frame.set(RecordingState::Recording);
                Ok(CommandBuffer {
                    device: Rc::downgrade(&self.inner),
                })
            }
            Err(e) => {
                self.inner.note_backend_error(&e);
                Err(e)
            }
        }
    }

    /// Submit the offscreen frame and block until device-side completion
    ///
    /// Every readback committed during the frame is completed before this
    /// returns. Legal only in the Recording state; ending a frame with an
    /// open render pass is an error.
    pub fn end_offscreen_frame(&self) -> Result<()> {
        self.inner.check_thread();
        if self.inner.lost.get() {
            // The frame is abandoned: nothing is submitted and its
            // readbacks stay permanently incomplete
            self.inner.frame.set(RecordingState::Idle);
            self.inner.abandon_pending_readbacks();
            return Err(Error::DeviceLost);
        }
        match self.inner.frame.get() {
            RecordingState::Recording => {}
            RecordingState::InPass => {
                return Err(Error::InvalidOperation(
                    "end_offscreen_frame inside a render pass".to_string(),
                ));
            }
            RecordingState::Idle => {
                return Err(Error::InvalidOperation(
                    "end_offscreen_frame without an active frame".to_string(),
                ));
            }
        }
        match self.inner.be.end_offscreen_frame() {
            Ok(()) => {
                self.inner.frame.set(RecordingState::Idle);
                self.inner.complete_pending_readbacks();
                Ok(())
            }
            Err(e) => {
                self.inner.note_backend_error(&e);
                self.inner.frame.set(RecordingState::Idle);
                self.inner.abandon_pending_readbacks();
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Cleanup callbacks
    // ------------------------------------------------------------------------

    /// Register a callback invoked once when the device is destroyed or
    /// `run_cleanup` is called
    ///
    /// Registration order is preserved. After the callbacks ran they are
    /// deregistered; re-registration afterwards is allowed.
    pub fn add_cleanup_callback<F: FnMut(&Device) + 'static>(&self, callback: F) {
        self.inner
            .cleanup_callbacks
            .borrow_mut()
            .push(Box::new(callback));
    }

    /// Invoke and deregister all cleanup callbacks
    pub fn run_cleanup(&self) {
        // Take the list out first; a callback may register new callbacks
        // without re-entering the running set
        let mut callbacks = std::mem::take(&mut *self.inner.cleanup_callbacks.borrow_mut());
        for callback in callbacks.iter_mut() {
            callback(self);
        }
    }

    // ------------------------------------------------------------------------
    // Capability and convention queries
    // ------------------------------------------------------------------------

    /// Whether an optional feature is supported; never fails
    pub fn is_feature_supported(&self, feature: Features) -> bool {
        self.inner.caps.features.contains(feature)
    }

    /// Look up a resource limit value
    pub fn resource_limit(&self, limit: ResourceLimit) -> u32 {
        self.inner.caps.resource_limit(limit)
    }

    /// MSAA sample counts the device supports; always contains 1
    pub fn supported_sample_counts(&self) -> &[u32] {
        &self.inner.caps.supported_sample_counts
    }

    /// Whether a texture format can be allocated on this device
    pub fn is_texture_format_supported(&self, format: TextureFormat) -> bool {
        self.inner.caps.supported_formats.contains(&format)
    }

    /// Uniform buffer offset alignment in bytes; a power of two
    pub fn ubuf_alignment(&self) -> u64 {
        self.inner.caps.ubuf_alignment
    }

    /// Round `value` up to the uniform buffer offset alignment
    pub fn ubuf_aligned(&self, value: u64) -> u64 {
        let alignment = self.inner.caps.ubuf_alignment;
        (value + alignment - 1) & !(alignment - 1)
    }

    /// True if the framebuffer Y axis points up on this backend
    pub fn is_y_up_in_framebuffer(&self) -> bool {
        self.inner.caps.y_up_in_framebuffer
    }

    /// True if the NDC Y axis points up on this backend
    pub fn is_y_up_in_ndc(&self) -> bool {
        self.inner.caps.y_up_in_ndc
    }

    /// True if clip-space depth ranges over [0, 1] instead of [-1, 1]
    pub fn is_clip_depth_zero_to_one(&self) -> bool {
        self.inner.caps.clip_depth_zero_to_one
    }

    /// Matrix mapping default-convention clip space to this backend's clip
    /// space; bake it in front of the projection matrix
    pub fn clip_space_corr_matrix(&self) -> Mat4 {
        self.inner.caps.clip_space_corr_matrix
    }

    // ------------------------------------------------------------------------
    // Mip math helpers
    // ------------------------------------------------------------------------

    /// Number of mip levels in a full chain for a base size
    pub fn mip_levels_for_size(&self, size: UVec2) -> u32 {
        1 + size.x.max(size.y).max(1).ilog2()
    }

    /// Size of a mip level, halving each axis per level with a floor of 1
    pub fn size_for_mip_level(&self, level: u32, base: UVec2) -> UVec2 {
        let level = level.min(31);
        UVec2::new((base.x >> level).max(1), (base.y >> level).max(1))
    }

    // ------------------------------------------------------------------------
    // Introspection and maintenance
    // ------------------------------------------------------------------------

    /// Native handle introspection for the device/context
    pub fn native_handles(&self) -> Option<DeviceNativeHandles> {
        self.inner.be.native_handles()
    }

    /// Make the backend's native context current on the calling thread
    ///
    /// The one operation callable from any thread.
    pub fn make_thread_local_native_context_current(&self) -> bool {
        self.inner.be.make_thread_local_native_context_current()
    }

    /// Drop backend-side caches without invalidating live resources
    pub fn release_cached_resources(&self) {
        self.inner.check_thread();
        self.inner.be.release_cached_resources();
    }

    /// Whether the device has entered the permanent lost state
    pub fn is_device_lost(&self) -> bool {
        self.inner.lost.get()
    }

    /// Live-resource statistics reported by the backend
    pub fn stats(&self) -> DeviceStats {
        self.inner.be.stats()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.run_cleanup();
        nova_info!("nova::rhi", "device {} destroyed", self.inner.id);
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
