use std::sync::Arc;

use kestrel_rg::TransientResourceCache;
use kestrel_rhi::backend::HeadlessBackend;
use kestrel_rhi::{BufferDesc, BufferUsageFlags, Device, PixelFormat, TextureDesc, TextureUsageFlags};

fn create_device() -> (Arc<HeadlessBackend>, Arc<Device>) {
    let backend = HeadlessBackend::new();
    let device = Device::new(backend.clone()).unwrap();

    (backend, device)
}

#[test]
fn fetch_and_restore_are_an_identity_on_the_pool() {
    let (_backend, device) = create_device();
    let mut cache = TransientResourceCache::new();

    let desc = BufferDesc::new_gpu_only(512, BufferUsageFlags::STORAGE);

    // empty pool: the caller has to create the resource itself
    assert!(cache.fetch_buffer(&desc).is_none());

    let buffer = device.create_buffer(desc, "pooled buffer").unwrap();
    let raw = buffer.raw;

    cache.restore_buffer(buffer);

    let fetched = cache.fetch_buffer(&desc).unwrap();
    assert_eq!(fetched.raw, raw);

    // the pool is a multiset: restoring brings it back to the same state
    cache.restore_buffer(fetched);
    let fetched_again = cache.fetch_buffer(&desc).unwrap();
    assert_eq!(fetched_again.raw, raw);
    assert!(cache.fetch_buffer(&desc).is_none());

    cache.restore_buffer(fetched_again);
    cache.destroy_all(&device);
}

#[test]
fn a_different_descriptor_misses_the_pool() {
    let (_backend, device) = create_device();
    let mut cache = TransientResourceCache::new();

    let desc = BufferDesc::new_gpu_only(512, BufferUsageFlags::STORAGE);
    let buffer = device.create_buffer(desc, "pooled buffer").unwrap();
    cache.restore_buffer(buffer);

    let bigger = BufferDesc::new_gpu_only(1024, BufferUsageFlags::STORAGE);
    assert!(cache.fetch_buffer(&bigger).is_none());

    cache.destroy_all(&device);
}

#[test]
fn update_dirty_named_is_idempotent_for_an_unchanged_descriptor() {
    let (_backend, device) = create_device();
    let mut cache = TransientResourceCache::new();

    let desc = TextureDesc::new_2d([256, 256], PixelFormat::Rgba8Unorm)
        .usage_flags(TextureUsageFlags::SAMPLED);

    // unknown names never count as dirty
    assert!(!cache.update_dirty_named_texture("history", &device, &desc).unwrap());

    let first = cache.get_or_create_named_texture("history", &device, &desc).unwrap();

    // the descriptor did not change: no replacement, twice in a row
    assert!(!cache.update_dirty_named_texture("history", &device, &desc).unwrap());
    assert!(!cache.update_dirty_named_texture("history", &device, &desc).unwrap());

    let second = cache.get_or_create_named_texture("history", &device, &desc).unwrap();
    assert_eq!(first.raw, second.raw);

    drop(first);
    drop(second);
    cache.destroy_all(&device);
}

#[test]
fn update_dirty_named_replaces_on_a_descriptor_change() {
    let (backend, device) = create_device();
    let mut cache = TransientResourceCache::new();

    let desc = TextureDesc::new_2d([256, 256], PixelFormat::Rgba8Unorm)
        .usage_flags(TextureUsageFlags::SAMPLED);
    let resized = TextureDesc::new_2d([512, 512], PixelFormat::Rgba8Unorm)
        .usage_flags(TextureUsageFlags::SAMPLED);

    let old = cache.get_or_create_named_texture("history", &device, &desc).unwrap();
    let old_raw = old.raw;
    drop(old); // the cache keeps the only reference

    device.begin_frame();
    assert!(cache.update_dirty_named_texture("history", &device, &resized).unwrap());
    device.end_frame();

    let new = cache.get_or_create_named_texture("history", &device, &resized).unwrap();
    assert_ne!(new.raw, old_raw);

    // the stale texture went through the deferred-release queue
    assert!(backend.is_texture_alive(old_raw));
    device.begin_frame();
    device.end_frame();
    assert!(!backend.is_texture_alive(old_raw));

    drop(new);
    cache.destroy_all(&device);
}
