use std::sync::Arc;

use kestrel_rhi::backend::HeadlessBackend;
use kestrel_rhi::{
    Device, MemoryShaderSystem, PipelineHandle, PipelineRegistry, PipelineShaderDesc,
    PipelineType, PixelFormat, RasterPipelineDesc, RenderPassAttachmentDesc, RenderPassDesc,
    ShaderReflection, ShaderResourceSystem, ShaderStage,
};

fn create_device() -> (Arc<HeadlessBackend>, Arc<Device>) {
    let backend = HeadlessBackend::new();
    let device = Device::new(backend.clone()).unwrap();

    (backend, device)
}

fn raster_desc(vs: &str, ps: &str) -> RasterPipelineDesc {
    RasterPipelineDesc::builder()
        .shaders(vec![
            PipelineShaderDesc::builder()
                .stage(ShaderStage::Vertex)
                .source(vs)
                .build()
                .unwrap(),
            PipelineShaderDesc::builder()
                .stage(ShaderStage::Pixel)
                .source(ps)
                .build()
                .unwrap(),
        ])
        .render_pass(RenderPassDesc::new(
            &[RenderPassAttachmentDesc::new(PixelFormat::Rgba8Unorm)],
            None,
        ))
        .build()
        .unwrap()
}

fn loaded_shaders(paths: &[&str]) -> MemoryShaderSystem {
    let shaders = MemoryShaderSystem::new();
    for path in paths {
        shaders.add_shader(*path, format!("bytecode of {}", path), ShaderReflection::default());
    }
    shaders
}

#[test]
fn registering_an_equal_descriptor_returns_the_same_handle() {
    let mut registry = PipelineRegistry::new();

    let first = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));
    let second = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));
    let third = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));

    assert!(first.is_valid());
    assert_eq!(first, second);
    assert_eq!(first, third);

    // entries and the backward handle map stay in size lockstep
    assert_eq!(registry.raster_entry_count(), 1);
    assert_eq!(registry.raster_handle_count(), 1);

    let other = registry.register_raster(&raster_desc("sky.vert.spv", "sky.frag.spv"));
    assert_ne!(first, other);
    assert_eq!(registry.raster_entry_count(), 2);
    assert_eq!(registry.raster_handle_count(), 2);
}

#[test]
fn pipeline_becomes_visible_once_its_shaders_load() {
    let (_backend, device) = create_device();
    let shaders = loaded_shaders(&["mesh.vert.spv", "mesh.frag.spv"]);
    let mut registry = PipelineRegistry::new();

    let handle = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));

    // nothing has been pumped yet
    assert!(!registry.is_pipeline_ready(handle));
    assert!(registry.get_raster_pipeline(handle).is_none());

    // issue the shader loads; they are still in flight
    registry.update(&shaders);
    assert!(registry.update_pipelines(&device, &shaders));
    assert!(!registry.is_pipeline_ready(handle));

    // the provider finishes loading, the next pump realizes the pipeline
    shaders.update();
    registry.update(&shaders);
    assert!(registry.update_pipelines(&device, &shaders));

    assert!(registry.is_pipeline_ready(handle));
    assert!(registry.get_raster_pipeline(handle).is_some());

    registry.destroy_all(&device);
    registry.shutdown(&shaders);
}

#[test]
fn failed_creation_is_retried_on_the_next_pump() {
    let (backend, device) = create_device();
    let shaders = loaded_shaders(&["mesh.vert.spv", "mesh.frag.spv"]);
    let mut registry = PipelineRegistry::new();

    let handle = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));

    registry.update(&shaders);
    shaders.update();
    registry.update(&shaders);

    backend.set_fail_pipeline_creation(true);
    assert!(!registry.update_pipelines(&device, &shaders));
    assert!(!registry.is_pipeline_ready(handle));

    // the device recovers, the retry queue promotes the entry
    backend.set_fail_pipeline_creation(false);
    assert!(registry.update_pipelines(&device, &shaders));
    assert!(registry.is_pipeline_ready(handle));

    registry.destroy_all(&device);
    registry.shutdown(&shaders);
}

#[test]
fn a_failed_shader_parks_the_entry_as_failed() {
    let (_backend, device) = create_device();
    // the pixel shader is never registered with the provider
    let shaders = loaded_shaders(&["mesh.vert.spv"]);
    let mut registry = PipelineRegistry::new();

    let handle = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));

    registry.update(&shaders);
    shaders.update();
    registry.update(&shaders);
    assert!(registry.update_pipelines(&device, &shaders));

    // the entry never becomes visible and never crashes lookups
    assert!(!registry.is_pipeline_ready(handle));
    assert!(registry.get_raster_pipeline(handle).is_none());

    registry.destroy_all(&device);
    registry.shutdown(&shaders);
}

#[test]
fn invalid_handles_never_crash_lookups() {
    let registry = PipelineRegistry::new();

    let invalid = PipelineHandle::invalid(PipelineType::Raster);
    assert!(!registry.is_pipeline_ready(invalid));
    assert!(registry.get_raster_pipeline(invalid).is_none());

    // an id the registry has never allocated
    let unknown = PipelineHandle::new(PipelineType::Raster, 42);
    assert!(!registry.is_pipeline_ready(unknown));
    assert!(registry.get_raster_pipeline(unknown).is_none());

    // a kind mismatch is a miss, not a crash
    let wrong_kind = PipelineHandle::new(PipelineType::Compute, 1);
    assert!(registry.get_raster_pipeline(wrong_kind).is_none());
}

#[test]
fn destroy_all_releases_the_realized_states() {
    let (backend, device) = create_device();
    let shaders = loaded_shaders(&["mesh.vert.spv", "mesh.frag.spv"]);
    let mut registry = PipelineRegistry::new();

    let handle = registry.register_raster(&raster_desc("mesh.vert.spv", "mesh.frag.spv"));

    registry.update(&shaders);
    shaders.update();
    registry.update(&shaders);
    assert!(registry.update_pipelines(&device, &shaders));
    assert_eq!(backend.alive_pipeline_count(), 1);

    registry.destroy_all(&device);

    assert_eq!(backend.alive_pipeline_count(), 0);
    assert!(!registry.is_pipeline_ready(handle));
    assert!(registry.get_raster_pipeline(handle).is_none());

    registry.shutdown(&shaders);
}
