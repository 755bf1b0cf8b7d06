//! Unit tests for null_backend.rs
//!
//! Tests the Null backend directly through the backend contract.

use glam::UVec2;

use crate::rhi::backend::BackendDevice;
use crate::rhi::buffer::{BufferRole, BufferUsage};
use crate::rhi::caps::Features;
use crate::rhi::native_handles::{BufferNativeHandles, DeviceNativeHandles, TextureNativeHandles};
use crate::rhi::null_backend::NullBackend;
use crate::rhi::texture::{TextureDesc, TextureFlags, TextureFormat};

// ============================================================================
// CAPABILITY TESTS
// ============================================================================

#[test]
fn test_caps_are_internally_consistent() {
    let backend = NullBackend::new();
    assert!(backend.caps().validate().is_ok());
}

#[test]
fn test_caps_feature_set() {
    let caps = NullBackend::new().caps();
    assert!(!caps.features.contains(Features::MULTISAMPLE_TEXTURE));
    assert!(!caps.features.contains(Features::MULTISAMPLE_RENDER_BUFFER));
    assert!(!caps.features.contains(Features::TIMESTAMPS));
    assert!(!caps.features.contains(Features::WIDE_LINES));
    assert!(caps.features.contains(Features::COMPUTE));
    assert!(caps.features.contains(Features::READ_BACK_NON_UNIFORM_BUFFER));
}

#[test]
fn test_caps_support_all_formats() {
    let caps = NullBackend::new().caps();
    for format in [
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::R32G32B32A32_SFLOAT,
        TextureFormat::D32_FLOAT,
    ] {
        assert!(caps.supported_formats.contains(&format));
    }
}

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
fn test_buffer_write_and_read() {
    let backend = NullBackend::new();
    let buffer = backend
        .create_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 16)
        .unwrap();

    buffer.write(4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(buffer.read(4, 4).unwrap(), vec![1, 2, 3, 4]);
    // Untouched bytes stay zeroed
    assert_eq!(buffer.read(0, 4).unwrap(), vec![0; 4]);
}

#[test]
fn test_buffer_out_of_range_access_fails() {
    let backend = NullBackend::new();
    let buffer = backend
        .create_buffer(BufferUsage::Dynamic, BufferRole::Uniform, 8)
        .unwrap();

    assert!(buffer.write(4, &[0; 8]).is_err());
    assert!(buffer.read(0, 9).is_err());
    // Failed accesses leave the contents intact
    assert_eq!(buffer.read(0, 8).unwrap(), vec![0; 8]);
}

#[test]
fn test_buffer_native_handles_are_distinct() {
    let backend = NullBackend::new();
    let a = backend
        .create_buffer(BufferUsage::Static, BufferRole::Vertex, 4)
        .unwrap();
    let b = backend
        .create_buffer(BufferUsage::Static, BufferRole::Vertex, 4)
        .unwrap();

    let Some(BufferNativeHandles::Null { id: id_a }) = a.native_handles() else {
        panic!("expected Null buffer handles");
    };
    let Some(BufferNativeHandles::Null { id: id_b }) = b.native_handles() else {
        panic!("expected Null buffer handles");
    };
    assert_ne!(id_a, id_b);
}

// ============================================================================
// ACCOUNTING TESTS
// ============================================================================

#[test]
fn test_stats_track_buffers_and_textures() {
    let backend = NullBackend::new();
    assert_eq!(backend.stats().buffers_alive, 0);
    assert_eq!(backend.stats().gpu_memory_used, 0);

    let buffer = backend
        .create_buffer(BufferUsage::Static, BufferRole::Vertex, 100)
        .unwrap();
    let texture = backend
        .create_texture(&TextureDesc {
            format: TextureFormat::R8G8B8A8_UNORM,
            pixel_size: UVec2::new(8, 8),
            sample_count: 1,
            mip_levels: 1,
            flags: TextureFlags::empty(),
        })
        .unwrap();

    let stats = backend.stats();
    assert_eq!(stats.buffers_alive, 1);
    assert_eq!(stats.textures_alive, 1);
    assert_eq!(stats.gpu_memory_used, 100 + 8 * 8 * 4);

    drop(buffer);
    drop(texture);
    let stats = backend.stats();
    assert_eq!(stats.buffers_alive, 0);
    assert_eq!(stats.textures_alive, 0);
    assert_eq!(stats.gpu_memory_used, 0);
}

// ============================================================================
// INTROSPECTION TESTS
// ============================================================================

#[test]
fn test_native_handle_variants() {
    let backend = NullBackend::new();
    assert_eq!(backend.native_handles(), Some(DeviceNativeHandles::Null));

    let texture = backend
        .create_texture(&TextureDesc {
            format: TextureFormat::R8G8B8A8_UNORM,
            pixel_size: UVec2::new(4, 4),
            sample_count: 1,
            mip_levels: 1,
            flags: TextureFlags::empty(),
        })
        .unwrap();
    assert!(matches!(
        texture.native_handles(),
        Some(TextureNativeHandles::Null { .. })
    ));
}
