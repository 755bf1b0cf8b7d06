/*!
# Nova RHI

Cross-backend rendering hardware interface.

This crate provides one object model for GPU work — device, resource handles,
resource-update batches, and a frame controller — over pluggable native-3D-API
backends (OpenGL ES-style, Vulkan-style, Direct3D-style, Metal-style). Backend
implementations are loaded at runtime via the plugin system; the built-in Null
backend is always available and is the reference implementation used by the
test suite.

## Architecture

- **Device**: root object; backend selection, resource factories, frame
  orchestration, capability queries, cleanup callbacks
- **Buffer / Texture / TextureRenderTarget / RenderPassDescriptor /
  GraphicsPipeline**: resource handles with an explicit unbuilt → built →
  released lifecycle
- **ResourceUpdateBatch**: ordered, deferred buffer/texture updates and
  readbacks, decoupled from submission
- **CommandBuffer**: per-frame recording handle (offscreen synchronous frames
  and render-pass scoping)
- **BackendDevice** and friends: the contract a native-API backend plugin
  must satisfy

Backend crates provide concrete types that implement the backend traits and
register themselves with `register_backend_plugin`.
*/

// Internal modules
mod error;
pub mod log;
pub mod rhi;

// Main nova namespace module
pub mod nova {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
        // Note: nova_* macros are NOT re-exported here - they are internal only
    }

    // RHI sub-module with all rendering types
    pub mod rhi {
        pub use crate::rhi::*;
    }
}

// Re-export math library at crate root
pub use glam;
