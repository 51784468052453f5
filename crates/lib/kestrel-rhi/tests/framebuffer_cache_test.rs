use std::sync::Arc;

use kestrel_rhi::backend::HeadlessBackend;
use kestrel_rhi::{
    Device, FramebufferKey, PixelFormat, RenderPassAttachmentDesc, RenderPassDesc, RhiError,
    TextureDesc, TextureUsageFlags, TextureViewDesc,
};

fn create_device() -> (Arc<HeadlessBackend>, Arc<Device>) {
    let backend = HeadlessBackend::new();
    let device = Device::new(backend.clone()).unwrap();

    (backend, device)
}

const EXTENT: [u32; 2] = [800, 600];

#[test]
fn equal_keys_reuse_the_same_framebuffer() {
    let (backend, device) = create_device();

    let render_pass = device
        .create_render_pass(RenderPassDesc::new(
            &[RenderPassAttachmentDesc::new(PixelFormat::Bgra8Unorm).clear_input()],
            None,
        ))
        .unwrap();

    let target = device
        .create_texture(
            TextureDesc::new_2d(EXTENT, PixelFormat::Bgra8Unorm)
                .usage_flags(TextureUsageFlags::COLOR),
            "render target",
        )
        .unwrap();
    let view = target.view(&device, &TextureViewDesc::default()).unwrap();

    let key = FramebufferKey::new(EXTENT, std::iter::once(view), None);

    let first = render_pass.framebuffer_cache.get_or_create(&device, key.clone()).unwrap();
    let second = render_pass.framebuffer_cache.get_or_create(&device, key.clone()).unwrap();
    let third = render_pass.framebuffer_cache.get_or_create(&device, key).unwrap();

    // identity reuse: one creation, two hits
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(backend.alive_framebuffer_count(), 1);

    // a different extent is a different framebuffer
    let other_key = FramebufferKey::new([400, 300], std::iter::once(view), None);
    let other = render_pass.framebuffer_cache.get_or_create(&device, other_key).unwrap();
    assert_ne!(first, other);
    assert_eq!(backend.alive_framebuffer_count(), 2);

    device.destroy_render_pass(&render_pass);
    device.destroy_texture(target);
}

#[test]
fn cleared_cache_rejects_lookups_until_reinitialized() {
    let (backend, device) = create_device();

    let render_pass = device
        .create_render_pass(RenderPassDesc::new(
            &[RenderPassAttachmentDesc::new(PixelFormat::Rgba8Unorm)],
            None,
        ))
        .unwrap();

    let target = device
        .create_texture(
            TextureDesc::new_2d(EXTENT, PixelFormat::Rgba8Unorm)
                .usage_flags(TextureUsageFlags::COLOR),
            "render target",
        )
        .unwrap();
    let view = target.view(&device, &TextureViewDesc::default()).unwrap();

    let key = FramebufferKey::new(EXTENT, std::iter::once(view), None);
    render_pass.framebuffer_cache.get_or_create(&device, key.clone()).unwrap();
    assert_eq!(backend.alive_framebuffer_count(), 1);

    render_pass.framebuffer_cache.clear_up(&device);
    assert_eq!(backend.alive_framebuffer_count(), 0);

    let result = render_pass.framebuffer_cache.get_or_create(&device, key);
    assert!(matches!(result, Err(RhiError::FramebufferCacheInvalid)));

    device.destroy_texture(target);
}

#[test]
fn a_key_with_the_wrong_attachment_count_is_rejected() {
    let (_backend, device) = create_device();

    let render_pass = device
        .create_render_pass(RenderPassDesc::new(
            &[RenderPassAttachmentDesc::new(PixelFormat::Rgba8Unorm)],
            None,
        ))
        .unwrap();

    let target = device
        .create_texture(
            TextureDesc::new_2d(EXTENT, PixelFormat::Rgba8Unorm)
                .usage_flags(TextureUsageFlags::COLOR),
            "render target",
        )
        .unwrap();
    let depth = device
        .create_texture(
            TextureDesc::new_2d(EXTENT, PixelFormat::D32Float)
                .usage_flags(TextureUsageFlags::DEPTH_STENCIL),
            "depth target",
        )
        .unwrap();

    let color_view = target.view(&device, &TextureViewDesc::default()).unwrap();
    let depth_view = depth.view(&device, &TextureViewDesc::default()).unwrap();

    // the render pass has a single color attachment, this key carries two views
    let key = FramebufferKey::new(EXTENT, std::iter::once(color_view), Some(depth_view));
    let result = render_pass.framebuffer_cache.get_or_create(&device, key);

    assert!(matches!(result, Err(RhiError::FramebufferKeyMismatch { expected: 1, got: 2 })));

    device.destroy_render_pass(&render_pass);
    device.destroy_texture(target);
    device.destroy_texture(depth);
}
