/// RHI module - device, resource handles, update batches, frame control and
/// the backend contract

// Module declarations
pub mod backend;
pub mod batch;
pub mod buffer;
pub mod caps;
pub mod command_buffer;
pub mod device;
pub mod native_handles;
pub mod null_backend;
pub mod pipeline;
pub mod render_pass;
pub mod render_target;
pub mod texture;

// Mock backend for tests (no GPU, configurable capabilities)
#[cfg(test)]
pub mod mock_backend;

// Re-export from all modules
pub use backend::*;
pub use batch::*;
pub use buffer::*;
pub use caps::*;
pub use command_buffer::*;
pub use device::*;
pub use native_handles::*;
pub use null_backend::*;
pub use pipeline::*;
pub use render_pass::*;
pub use render_target::*;
pub use texture::*;
