use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use kestrel_rg::{Executor, ImportedAccess};
use kestrel_rhi::backend::{HeadlessBackend, RawBuffer};
use kestrel_rhi::{
    AccessState, BufferDesc, BufferUsageFlags, Device, MemoryShaderSystem, PipelineShaderDesc,
    PixelFormat, RasterPipelineDesc, RenderCommand, RenderPassAttachmentDesc, RenderPassDesc,
    ShaderReflection, ShaderResourceSystem, ShaderStage, TextureDesc, TextureUsageFlags,
    TextureViewDesc,
};

fn create_device() -> (Arc<HeadlessBackend>, Arc<Device>) {
    let backend = HeadlessBackend::new();
    let device = Device::new(backend.clone()).unwrap();

    (backend, device)
}

fn color_target_desc(extent: [u32; 2]) -> TextureDesc {
    TextureDesc::new_2d(extent, PixelFormat::Rgba8Unorm)
        .usage_flags(TextureUsageFlags::COLOR | TextureUsageFlags::SAMPLED)
}

fn texture_barriers(backend: &HeadlessBackend) -> Vec<(AccessState, AccessState)> {
    backend
        .submissions()
        .iter()
        .flat_map(|batch| batch.commands.iter())
        .filter_map(|command| match command {
            RenderCommand::TextureBarrier {
                prev_access,
                next_access,
                ..
            } => Some((*prev_access, *next_access)),
            _ => None,
        })
        .collect()
}

#[test]
fn named_resource_access_state_carries_over_frames() {
    let (backend, device) = create_device();
    let mut executor = Executor::new(device);

    let desc = color_target_desc([128, 128]);

    // frame 1: write the named target
    executor.prepare(|rg| {
        let mut gbuf = rg.get_or_create_named_texture("gbuf", desc).unwrap();

        let mut pass = rg.add_pass("gbuffer");
        pass.write(&mut gbuf, AccessState::ColorAttachmentReadWrite);
    });
    executor.compile();
    executor.execute();

    // the final access state is recorded under the resource's name
    assert_eq!(
        executor.exported_access("gbuf"),
        Some(AccessState::ColorAttachmentReadWrite)
    );

    // frame 2: read it back; exactly one barrier out of the exported state
    backend.clear_submissions();
    executor.prepare(|rg| {
        let gbuf = rg.get_or_create_named_texture("gbuf", desc).unwrap();

        let mut pass = rg.add_pass("lighting");
        pass.read(
            &gbuf,
            AccessState::FragmentShaderReadSampledImageOrUniformTexelBuffer,
        );
    });
    executor.compile();
    executor.execute();

    let barriers = texture_barriers(&backend);
    assert_eq!(barriers.len(), 1);
    assert_eq!(
        barriers[0],
        (
            AccessState::ColorAttachmentReadWrite,
            AccessState::FragmentShaderReadSampledImageOrUniformTexelBuffer,
        )
    );

    assert_eq!(
        executor.exported_access("gbuf"),
        Some(AccessState::FragmentShaderReadSampledImageOrUniformTexelBuffer)
    );
}

#[test]
fn reading_an_unchanged_state_emits_no_barrier() {
    let (backend, device) = create_device();
    let mut executor = Executor::new(device);

    let desc = color_target_desc([64, 64]);

    for frame in 0..3 {
        if frame == 1 {
            // the state settled after the first frame; later reads are barrier-free
            backend.clear_submissions();
        }

        executor.prepare(|rg| {
            let shadow = rg.get_or_create_named_texture("shadow", desc).unwrap();

            let mut pass = rg.add_pass("sample shadow");
            pass.read(
                &shadow,
                AccessState::FragmentShaderReadSampledImageOrUniformTexelBuffer,
            );
        });
        executor.compile();
        executor.execute();
    }

    assert!(texture_barriers(&backend).is_empty());
}

#[test]
fn transient_resources_recycle_through_the_cache() {
    let (backend, device) = create_device();
    let mut executor = Executor::new(device);

    let desc = BufferDesc::new_gpu_only(4096, BufferUsageFlags::STORAGE);
    let observed: Arc<Mutex<Vec<RawBuffer>>> = Default::default();

    for _ in 0..3 {
        let observed = observed.clone();

        executor.prepare(move |rg| {
            let mut scratch = rg.create_temporary_resource(desc);

            let mut pass = rg.add_pass("scatter");
            let scratch_ref = pass.write(&mut scratch, AccessState::ComputeShaderWrite);

            pass.render(move |context| {
                observed.lock().push(context.registry.get_buffer(scratch_ref).raw);
                Ok(())
            });
        });
        executor.compile();
        executor.execute();
    }

    let observed = observed.lock();
    assert_eq!(observed.len(), 3);
    // every frame got the same underlying buffer back from the cache
    assert_eq!(observed[0], observed[1]);
    assert_eq!(observed[0], observed[2]);

    // no transient leaked: only the one pooled buffer exists
    assert_eq!(backend.alive_buffer_count(), 1);
}

#[test]
fn imported_resources_write_their_final_access_back() {
    let (backend, device) = create_device();
    let mut executor = Executor::new(device.clone());

    let staging = Arc::new(
        device
            .create_buffer(
                BufferDesc::new_gpu_only(1024, BufferUsageFlags::TRANSFER_DST | BufferUsageFlags::TRANSFER_SRC),
                "upload target",
            )
            .unwrap(),
    );
    let access = ImportedAccess::new(AccessState::Nothing);

    {
        let staging = staging.clone();
        let access = access.clone();
        executor.prepare(move |rg| {
            let mut imported = rg.import_resource(staging, &access);

            let mut pass = rg.add_pass("upload");
            pass.write(&mut imported, AccessState::TransferWrite);
        });
    }
    executor.compile();
    executor.execute();

    // the caller observes the frame's final access through the import cell
    assert_eq!(access.get(), AccessState::TransferWrite);

    // importing again starts from the written-back state
    backend.clear_submissions();
    {
        let staging = staging.clone();
        let access = access.clone();
        executor.prepare(move |rg| {
            let imported = rg.import_resource(staging, &access);

            let mut pass = rg.add_pass("readback");
            pass.read(&imported, AccessState::TransferRead);
        });
    }
    executor.compile();
    executor.execute();

    assert_eq!(access.get(), AccessState::TransferRead);

    let buffer_barriers = backend
        .submissions()
        .iter()
        .flat_map(|batch| batch.commands.iter())
        .filter(|command| matches!(command, RenderCommand::BufferBarrier { .. }))
        .count();
    assert_eq!(buffer_barriers, 1);
}

fn overlay_pipeline_desc(render_pass_desc: RenderPassDesc) -> RasterPipelineDesc {
    RasterPipelineDesc::builder()
        .shaders(vec![
            PipelineShaderDesc::builder()
                .stage(ShaderStage::Vertex)
                .source("overlay.vert.spv")
                .build()
                .unwrap(),
            PipelineShaderDesc::builder()
                .stage(ShaderStage::Pixel)
                .source("overlay.frag.spv")
                .build()
                .unwrap(),
        ])
        .render_pass(render_pass_desc)
        .depth_test(false)
        .depth_write(false)
        .build()
        .unwrap()
}

#[test]
fn passes_with_pending_pipelines_skip_draws_until_visible() {
    let (backend, device) = create_device();
    let mut executor = Executor::new(device.clone());

    let shaders = MemoryShaderSystem::new();
    shaders.add_shader("overlay.vert.spv", "vertex bytecode", ShaderReflection::default());
    shaders.add_shader("overlay.frag.spv", "fragment bytecode", ShaderReflection::default());

    let extent = [256, 256];
    let render_pass = device
        .create_render_pass(RenderPassDesc::new(
            &[RenderPassAttachmentDesc::new(PixelFormat::Rgba8Unorm).clear_input()],
            None,
        ))
        .unwrap();
    let pipeline_desc = overlay_pipeline_desc(render_pass.desc.clone());

    let draw_count = Arc::new(AtomicU32::new(0));
    let mut draws_by_frame = Vec::new();

    for _ in 0..4 {
        let render_pass = render_pass.clone();
        let pipeline_desc = pipeline_desc.clone();
        let draw_count_for_pass = draw_count.clone();

        executor.prepare(move |rg| {
            let mut target = rg
                .get_or_create_named_texture("overlay_target", color_target_desc(extent))
                .unwrap();

            let mut pass = rg.add_pass("overlay");
            let target_rt = pass.raster_write(&mut target, AccessState::ColorAttachmentWrite);
            pass.register_raster_pipeline(pipeline_desc);

            pass.render(move |context| {
                let view_desc = TextureViewDesc::default();

                context.begin_render_pass(&render_pass, extent, &[(target_rt, &view_desc)], None)?;
                context.set_default_viewport_and_scissor(extent);
                context.bind_raster_pipeline()?.bind(0, &[])?;
                context.draw_indexed(3, 1, 0, 0);
                context.end_render_pass();

                draw_count_for_pass.fetch_add(1, Ordering::Release);
                Ok(())
            });
        });

        executor.update_pipelines(&shaders);
        shaders.update();

        executor.compile();
        executor.execute();

        draws_by_frame.push(draw_count.load(Ordering::Acquire));

        // the skipped pass still retires its resources
        assert_eq!(
            executor.exported_access("overlay_target"),
            Some(AccessState::ColorAttachmentWrite)
        );
    }

    // first frame: pipeline just registered, draws skipped; later frames draw
    assert_eq!(draws_by_frame[0], 0);
    assert!(
        *draws_by_frame.last().unwrap() > 0,
        "pipeline never became visible: {:?}",
        draws_by_frame
    );

    // the draws really reached the command stream
    let draw_commands = backend
        .submissions()
        .iter()
        .flat_map(|batch| batch.commands.iter())
        .filter(|command| matches!(command, RenderCommand::DrawIndexed { .. }))
        .count();
    assert_eq!(draw_commands, *draws_by_frame.last().unwrap() as usize);

    // consecutive frames hit the same cached framebuffer
    assert_eq!(backend.alive_framebuffer_count(), 1);

    executor.shutdown(&shaders);
}
