//! Error types for Nova RHI
//!
//! This module defines the error types used throughout the crate, covering
//! backend failures, resource validation, frame-state misuse, and the sticky
//! device-lost condition.

use std::fmt;

/// Result type for Nova RHI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nova RHI errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, Direct3D, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, texture, render target, ...)
    InvalidResource(String),

    /// Operation not valid in the current state (frame state machine misuse,
    /// use after device destruction, ...)
    InvalidOperation(String),

    /// Initialization failed (device, backend plugin, subsystems)
    InitializationFailed(String),

    /// The backend device was lost. Sticky: once reported, all further
    /// submissions fail and pending readbacks never complete.
    DeviceLost,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
