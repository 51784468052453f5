use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{RawDescriptorPool, RenderBackend};
use crate::command::{CommandBuffer, CommandPool};
use crate::defer_release::{DeferReleasable, DeferReleaseQueue};
use crate::error::RhiError;
use crate::queue::{CommandQueue, QueueType};

/// Number of pipelined CPU frame slots.
pub const NUM_DEVICE_FRAMES: usize = 2;

/// The RHI device.
///
/// Owns the queues, the thread-affine command pools and the per-frame-slot
/// deferred-release queues. The concrete driver sits behind the
/// [`RenderBackend`] passed at construction.
pub struct Device {
    backend: Arc<dyn RenderBackend>,

    graphics_queue: CommandQueue,
    transfer_queue: CommandQueue,

    // per-frame command buffers come from here; bound to the creating thread
    main_pool: Mutex<CommandPool>,
    immediate_graphics_pool: Mutex<CommandPool>,
    immediate_transfer_pool: Mutex<CommandPool>,

    frame_count: AtomicU64,
    frame_index: AtomicU32,
    in_frame: AtomicBool,

    defer_release_queues: [DeferReleaseQueue; NUM_DEVICE_FRAMES],
}

impl Device {
    pub fn new(backend: Arc<dyn RenderBackend>) -> anyhow::Result<Arc<Self>> {
        let graphics_queue = CommandQueue::new(backend.clone(), QueueType::Graphics);
        let transfer_queue = CommandQueue::new(backend.clone(), QueueType::Transfer);

        let main_pool = Mutex::new(CommandPool::new(
            QueueType::Graphics,
            graphics_queue.queue_family_index(),
        ));
        let immediate_graphics_pool = Mutex::new(CommandPool::new(
            QueueType::Graphics,
            graphics_queue.queue_family_index(),
        ));
        let immediate_transfer_pool = Mutex::new(CommandPool::new(
            QueueType::Transfer,
            transfer_queue.queue_family_index(),
        ));

        log::trace!("RHI device created!");

        Ok(Arc::new(Self {
            backend,

            graphics_queue,
            transfer_queue,

            main_pool,
            immediate_graphics_pool,
            immediate_transfer_pool,

            frame_count: AtomicU64::new(0),
            frame_index: AtomicU32::new(0),
            in_frame: AtomicBool::new(false),

            defer_release_queues: [DeferReleaseQueue::new(), DeferReleaseQueue::new()],
        }))
    }

    #[inline]
    pub(crate) fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    #[inline]
    pub fn graphics_queue(&self) -> &CommandQueue {
        &self.graphics_queue
    }

    #[inline]
    pub fn transfer_queue(&self) -> &CommandQueue {
        &self.transfer_queue
    }

    #[inline]
    pub fn device_frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn device_frame_index(&self) -> u32 {
        self.frame_index.load(Ordering::Acquire)
    }

    /// Device-level frame bracket begin.
    pub fn begin_frame(&self) {
        let was_in_frame = self.in_frame.swap(true, Ordering::AcqRel);
        debug_assert!(!was_in_frame, "begin_frame() called twice without end_frame()!");
    }

    /// Device-level frame bracket end.
    ///
    /// Drains the deferred-release slot the incoming frame is about to reuse
    /// (its resources were deferred N frames ago), then advances the frame
    /// index.
    pub fn end_frame(&self) {
        let was_in_frame = self.in_frame.swap(false, Ordering::AcqRel);
        debug_assert!(was_in_frame, "end_frame() called outside a frame bracket!");

        let frame_count = self.frame_count.load(Ordering::Acquire);
        let incoming = ((frame_count + 1) % NUM_DEVICE_FRAMES as u64) as usize;

        self.defer_release_queues[incoming].release_all_stale(self);

        self.frame_count.store(frame_count + 1, Ordering::Release);
        self.frame_index.store(incoming as u32, Ordering::Release);
    }

    /// Park a resource for destruction N frames from now.
    ///
    /// Safe to call from any thread.
    pub fn defer_release(&self, resource: impl DeferReleasable) {
        let slot = self.device_frame_index() as usize;
        resource.enqueue(&self.defer_release_queues[slot]);
    }

    /// Block until every queue is drained.
    pub fn wait_until_idle(&self) {
        self.backend.wait_idle();
    }

    /// Allocate a command buffer from the main graphics pool.
    pub fn allocate_command_buffer(&self) -> CommandBuffer {
        self.main_pool.lock().allocate()
    }

    pub fn create_descriptor_pool(&self) -> anyhow::Result<RawDescriptorPool, RhiError> {
        self.backend.create_descriptor_pool()
    }

    pub fn destroy_descriptor_pool(&self, pool: RawDescriptorPool) {
        self.backend.destroy_descriptor_pool(pool);
    }

    /// Record and submit a one-shot batch on the graphics queue.
    ///
    /// Returns once the submission is accepted; waiting for completion is the
    /// caller's responsibility.
    pub fn immediate_graphics_cmd(&self, record: impl FnOnce(&mut CommandBuffer)) -> anyhow::Result<(), RhiError> {
        let pool = self.immediate_graphics_pool.lock();
        let mut cb = pool.allocate();

        cb.begin();
        record(&mut cb);
        cb.end();

        self.graphics_queue.submit(&mut cb, &[], &[], &[])
    }

    /// Record and submit a one-shot batch on the transfer queue.
    pub fn immediate_transfer_cmd(&self, record: impl FnOnce(&mut CommandBuffer)) -> anyhow::Result<(), RhiError> {
        let pool = self.immediate_transfer_pool.lock();
        let mut cb = pool.allocate();

        cb.begin();
        record(&mut cb);
        cb.end();

        self.transfer_queue.submit(&mut cb, &[], &[], &[])
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.backend.wait_idle();

        // the GPU is idle, the remaining slots can drain early
        for queue in &self.defer_release_queues {
            queue.release_all_stale(self);

            if !queue.is_empty() {
                log::warn!("Resources still shared at device teardown, their holders outlive the device!");
            }
        }
    }
}
