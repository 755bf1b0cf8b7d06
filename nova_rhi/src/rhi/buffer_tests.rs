//! Unit tests for buffer.rs
//!
//! Tests the buffer handle lifecycle against the Null backend.

use crate::rhi::backend::{Backend, InitParams, NullInitParams};
use crate::rhi::buffer::{BufferRole, BufferUsage};
use crate::rhi::device::{Device, DeviceFlags};
use crate::rhi::native_handles::BufferNativeHandles;

fn null_device() -> Device {
    Device::create(
        Backend::Null,
        &InitParams::Null(NullInitParams),
        DeviceFlags::empty(),
    )
    .expect("the Null backend is always available")
}

// ============================================================================
// CREATION AND PROPERTY TESTS
// ============================================================================

#[test]
fn test_new_buffer_is_unbuilt() {
    let device = null_device();
    let buffer = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 256);
    assert!(!buffer.is_built());
    assert_eq!(buffer.usage(), BufferUsage::Dynamic);
    assert_eq!(buffer.role(), BufferRole::Uniform);
    assert_eq!(buffer.size(), 256);
    assert!(buffer.native_handles().is_none());
}

#[test]
fn test_build_allocates_backend_storage() {
    let device = null_device();
    let mut buffer = device.new_buffer(BufferUsage::Static, BufferRole::Vertex, 1024);
    assert!(buffer.build());
    assert!(buffer.is_built());
    assert!(matches!(
        buffer.native_handles(),
        Some(BufferNativeHandles::Null { .. })
    ));
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

#[test]
fn test_zero_size_build_fails_and_can_be_retried() {
    let device = null_device();
    let mut buffer = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 0);
    assert!(!buffer.build());
    assert!(!buffer.is_built());

    // Fix the size and retry on the same handle
    buffer.set_size(64);
    assert!(buffer.build());
    assert!(buffer.is_built());
}

#[test]
fn test_release_returns_to_unbuilt() {
    let device = null_device();
    let mut buffer = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 64);
    assert!(buffer.build());
    buffer.release();
    assert!(!buffer.is_built());
    assert!(buffer.native_handles().is_none());

    // The handle stays reusable
    assert!(buffer.build());
}

#[test]
fn test_rebuild_after_resize() {
    let device = null_device();
    let mut buffer = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 64);
    assert!(buffer.build());
    buffer.set_size(128);
    // Declared size changes immediately, the allocation at the next build
    assert_eq!(buffer.size(), 128);
    assert!(buffer.build());
    assert!(buffer.is_built());
}

#[test]
fn test_build_fails_after_device_is_gone() {
    let device = null_device();
    let mut buffer = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 64);
    drop(device);
    assert!(!buffer.build());
    assert!(!buffer.is_built());
}

// ============================================================================
// ACCOUNTING TESTS
// ============================================================================

#[test]
fn test_device_stats_track_live_buffers() {
    let device = null_device();
    assert_eq!(device.stats().buffers_alive, 0);

    let mut a = device.new_buffer(BufferUsage::Static, BufferRole::Vertex, 100);
    let mut b = device.new_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 50);
    assert!(a.build());
    assert!(b.build());
    assert_eq!(device.stats().buffers_alive, 2);
    assert_eq!(device.stats().gpu_memory_used, 150);

    a.release();
    assert_eq!(device.stats().buffers_alive, 1);
    assert_eq!(device.stats().gpu_memory_used, 50);

    drop(b);
    assert_eq!(device.stats().buffers_alive, 0);
    assert_eq!(device.stats().gpu_memory_used, 0);
}
