use std::sync::Arc;

use kestrel_rhi::backend::HeadlessBackend;
use kestrel_rhi::{
    BufferDesc, BufferUsageFlags, Device, PipelineStage, QueueType, RenderCommand, RhiError,
};

fn create_device() -> (Arc<HeadlessBackend>, Arc<Device>) {
    let backend = HeadlessBackend::new();
    let device = Device::new(backend.clone()).unwrap();

    (backend, device)
}

#[test]
fn mismatched_queue_submission_warns_and_does_nothing() {
    let (backend, device) = create_device();

    let mut cb = device.allocate_command_buffer();
    cb.begin();
    cb.set_viewport([8, 8]);
    cb.end();

    // a graphics command buffer offered to the transfer queue is rejected
    device.transfer_queue().submit(&mut cb, &[], &[], &[]).unwrap();
    assert!(backend.submissions().is_empty());

    // the recorded commands survive the rejection and land on the right queue
    device.graphics_queue().submit(&mut cb, &[], &[], &[]).unwrap();

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].queue, QueueType::Graphics);
    assert!(matches!(submissions[0].commands[..], [RenderCommand::SetViewport { extent: [8, 8] }]));
}

#[test]
fn semaphores_and_wait_stages_travel_with_the_submission() {
    let (backend, device) = create_device();

    let acquire = device.create_semaphore().unwrap();
    let present = device.create_semaphore().unwrap();

    let mut cb = device.allocate_command_buffer();
    cb.begin();
    cb.set_scissor([16, 16]);
    cb.end();

    device
        .graphics_queue()
        .submit(
            &mut cb,
            &[&acquire],
            &[&present],
            &[PipelineStage::ColorAttachmentOutput],
        )
        .unwrap();

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].wait_semaphores, vec![acquire.raw]);
    assert_eq!(submissions[0].signal_semaphores, vec![present.raw]);

    device.destroy_semaphore(acquire);
    device.destroy_semaphore(present);
}

#[test]
fn rejected_submission_surfaces_as_an_error() {
    let (backend, device) = create_device();

    backend.set_fail_submission(true);

    let mut cb = device.allocate_command_buffer();
    cb.begin();
    cb.end();

    let result = device.graphics_queue().submit(&mut cb, &[], &[], &[]);
    assert!(matches!(result, Err(RhiError::Submission { .. })));
}

#[test]
fn immediate_transfer_commands_replay_on_the_transfer_queue() {
    let (backend, device) = create_device();

    let src = device
        .create_buffer(
            BufferDesc::new_cpu_to_gpu(256, BufferUsageFlags::TRANSFER_SRC),
            "staging",
        )
        .unwrap();
    let dst = device
        .create_buffer(
            BufferDesc::new_gpu_only(256, BufferUsageFlags::TRANSFER_DST),
            "destination",
        )
        .unwrap();

    device
        .immediate_transfer_cmd(|cb| {
            cb.copy_buffer(&src, &dst, 256);
        })
        .unwrap();

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].queue, QueueType::Transfer);
    assert!(matches!(submissions[0].commands[..], [RenderCommand::CopyBuffer { size: 256, .. }]));

    device.destroy_buffer(src);
    device.destroy_buffer(dst);
}

#[test]
fn host_visible_buffers_can_be_mapped_and_written() {
    let (_backend, device) = create_device();

    let buffer = device
        .create_buffer(
            BufferDesc::new_cpu_to_gpu(64, BufferUsageFlags::UNIFORM),
            "mapped buffer",
        )
        .unwrap();

    let mapped = buffer.map(&device).unwrap();
    unsafe {
        std::ptr::write_bytes(mapped.as_ptr(), 0xAB, 64);
    }
    buffer.unmap(&device);

    // device-local memory refuses to map
    let gpu_only = device
        .create_buffer(
            BufferDesc::new_gpu_only(64, BufferUsageFlags::UNIFORM),
            "gpu only buffer",
        )
        .unwrap();
    assert!(matches!(gpu_only.map(&device), Err(RhiError::BufferNotMappable)));

    device.destroy_buffer(buffer);
    device.destroy_buffer(gpu_only);
}
