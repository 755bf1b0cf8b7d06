//! Unit tests for render_target.rs
//!
//! Tests the texture render target workflow (attachments, compatible
//! render-pass descriptors) and pipeline builds against descriptors.

use glam::UVec2;

use crate::rhi::backend::{Backend, InitParams, NullInitParams};
use crate::rhi::device::{Device, DeviceFlags};
use crate::rhi::mock_backend::MockBackend;
use crate::rhi::pipeline::PrimitiveTopology;
use crate::rhi::render_target::ColorAttachment;
use crate::rhi::texture::{Texture, TextureFlags, TextureFormat};

fn null_device() -> Device {
    Device::create(
        Backend::Null,
        &InitParams::Null(NullInitParams),
        DeviceFlags::empty(),
    )
    .expect("the Null backend is always available")
}

fn built_rt_texture(device: &Device, size: UVec2) -> Texture {
    let mut texture = device.new_texture(
        TextureFormat::R8G8B8A8_UNORM,
        size,
        1,
        TextureFlags::RENDER_TARGET,
    );
    assert!(texture.build());
    texture
}

// ============================================================================
// RENDER TARGET WORKFLOW TESTS
// ============================================================================

#[test]
fn test_full_render_target_workflow() {
    let device = null_device();
    let texture = built_rt_texture(&device, UVec2::new(128, 64));

    let mut rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert_eq!(rp.color_formats(), &[TextureFormat::R8G8B8A8_UNORM]);
    assert_eq!(rp.sample_count(), 1);
    assert!(rp.build());

    rt.set_render_pass_descriptor(&rp);
    assert!(rt.build());
    assert!(rt.is_built());
    assert_eq!(rt.pixel_size(), UVec2::new(128, 64));
}

#[test]
fn test_build_without_render_pass_descriptor_fails() {
    let device = null_device();
    let texture = built_rt_texture(&device, UVec2::new(32, 32));
    let mut rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    assert!(!rt.build());
}

#[test]
fn test_build_with_unbuilt_attachment_fails() {
    let device = null_device();
    let texture = device.new_texture(
        TextureFormat::R8G8B8A8_UNORM,
        UVec2::new(32, 32),
        1,
        TextureFlags::RENDER_TARGET,
    );
    let mut rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert!(rp.build());
    rt.set_render_pass_descriptor(&rp);
    assert!(!rt.build());
}

#[test]
fn test_attachment_without_render_target_flag_fails() {
    let device = null_device();
    let mut texture = device.new_texture(
        TextureFormat::R8G8B8A8_UNORM,
        UVec2::new(32, 32),
        1,
        TextureFlags::empty(),
    );
    assert!(texture.build());
    let mut rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert!(rp.build());
    rt.set_render_pass_descriptor(&rp);
    assert!(!rt.build());
}

#[test]
fn test_too_many_attachments_fail() {
    let device = null_device();
    // The Null backend supports 8 color attachments
    let textures: Vec<Texture> = (0..9)
        .map(|_| built_rt_texture(&device, UVec2::new(16, 16)))
        .collect();
    let attachments = textures.iter().map(ColorAttachment::new).collect();
    let mut rt = device.new_texture_render_target(attachments);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert!(rp.build());
    rt.set_render_pass_descriptor(&rp);
    assert!(!rt.build());
}

#[test]
fn test_incompatible_render_pass_descriptor_fails() {
    let device = null_device();
    let rgba = built_rt_texture(&device, UVec2::new(32, 32));
    let mut bgra = device.new_texture(
        TextureFormat::B8G8R8A8_UNORM,
        UVec2::new(32, 32),
        1,
        TextureFlags::RENDER_TARGET,
    );
    assert!(bgra.build());

    let other = device.new_texture_render_target(vec![ColorAttachment::new(&bgra)]);
    let mut foreign_rp = other.new_compatible_render_pass_descriptor();
    assert!(foreign_rp.build());

    let mut rt = device.new_texture_render_target(vec![ColorAttachment::new(&rgba)]);
    rt.set_render_pass_descriptor(&foreign_rp);
    assert!(!rt.build());
}

#[test]
fn test_descriptor_compatibility() {
    let device = null_device();
    let a = built_rt_texture(&device, UVec2::new(32, 32));
    let b = built_rt_texture(&device, UVec2::new(64, 64));

    let rt_a = device.new_texture_render_target(vec![ColorAttachment::new(&a)]);
    let rt_b = device.new_texture_render_target(vec![ColorAttachment::new(&b)]);
    let rp_a = rt_a.new_compatible_render_pass_descriptor();
    let rp_b = rt_b.new_compatible_render_pass_descriptor();

    // Same formats and sample count; size does not matter for compatibility
    assert!(rp_a.is_compatible(&rp_b));
}

#[test]
fn test_attachment_layer_and_level() {
    let device = null_device();
    let texture = built_rt_texture(&device, UVec2::new(32, 32));
    let attachment = ColorAttachment::with_layer_and_level(&texture, 2, 3);
    assert_eq!(attachment.layer(), 2);
    assert_eq!(attachment.level(), 3);
}

// ============================================================================
// PIPELINE TESTS
// ============================================================================

#[test]
fn test_pipeline_builds_against_descriptor() {
    let device = null_device();
    let texture = built_rt_texture(&device, UVec2::new(32, 32));
    let rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert!(rp.build());

    let mut pipeline = device.new_graphics_pipeline();
    assert_eq!(pipeline.topology(), PrimitiveTopology::Triangles);
    pipeline.set_render_pass_descriptor(&rp);
    assert!(pipeline.build());
    assert!(pipeline.is_built());

    pipeline.release();
    assert!(!pipeline.is_built());
}

#[test]
fn test_pipeline_without_descriptor_fails() {
    let device = null_device();
    let mut pipeline = device.new_graphics_pipeline();
    assert!(!pipeline.build());
}

#[test]
fn test_triangle_fan_gated_on_feature() {
    // Default mock caps have no optional features
    let device = Device::with_backend(
        Backend::Vulkan,
        DeviceFlags::empty(),
        Box::new(MockBackend::new()),
    )
    .unwrap();
    let mut texture = device.new_texture(
        TextureFormat::R8G8B8A8_UNORM,
        UVec2::new(32, 32),
        1,
        TextureFlags::RENDER_TARGET,
    );
    assert!(texture.build());
    let rt = device.new_texture_render_target(vec![ColorAttachment::new(&texture)]);
    let mut rp = rt.new_compatible_render_pass_descriptor();
    assert!(rp.build());

    let mut pipeline = device.new_graphics_pipeline();
    pipeline.set_render_pass_descriptor(&rp);
    pipeline.set_topology(PrimitiveTopology::TriangleFan);
    assert!(!pipeline.build());

    pipeline.set_topology(PrimitiveTopology::TriangleStrip);
    assert!(pipeline.build());
}
