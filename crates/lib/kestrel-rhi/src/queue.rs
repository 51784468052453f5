use std::sync::Arc;

use parking_lot::Mutex;

use crate::access::PipelineStage;
use crate::backend::RenderBackend;
use crate::command::CommandBuffer;
use crate::error::RhiError;
use crate::semaphore::Semaphore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Transfer,
}

pub struct CommandQueue {
    backend: Arc<dyn RenderBackend>,
    ty: QueueType,
    family_index: u32,
    submit_mutex: Mutex<()>,
}

impl CommandQueue {
    pub(crate) fn new(backend: Arc<dyn RenderBackend>, ty: QueueType) -> Self {
        let family_index = backend.queue_family_index(ty);

        Self {
            backend,
            ty,
            family_index,
            submit_mutex: Mutex::new(()),
        }
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.family_index
    }

    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.ty
    }

    /// Submit a recorded command buffer.
    ///
    /// The wait semaphore and wait stage arrays are order-correlated; a length
    /// mismatch is a programmer error. Concurrent submissions are serialized
    /// behind an internal mutex.
    pub fn submit(
        &self,
        cb: &mut CommandBuffer,
        wait_semaphores: &[&Semaphore],
        signal_semaphores: &[&Semaphore],
        wait_stages: &[PipelineStage],
    ) -> anyhow::Result<(), RhiError> {
        assert_eq!(
            wait_semaphores.len(),
            wait_stages.len(),
            "Wait semaphores and wait stages must correlate one to one!"
        );
        assert!(!cb.is_recording(), "Submitting a command buffer that is still recording!");

        if cb.queue_family_index() != self.family_index {
            log::warn!(
                "Submit rejected: command buffer belongs to queue family {}, this queue is family {}.",
                cb.queue_family_index(),
                self.family_index
            );
            return Ok(());
        }

        let commands = std::mem::take(&mut cb.commands);

        let wait_semaphores = wait_semaphores.iter().map(|s| s.raw).collect::<Vec<_>>();
        let signal_semaphores = signal_semaphores.iter().map(|s| s.raw).collect::<Vec<_>>();

        let _submit_guard = self.submit_mutex.lock();
        self.backend.submit(
            self.ty,
            commands,
            &wait_semaphores,
            &signal_semaphores,
            wait_stages,
        )
    }

    pub fn wait_until_idle(&self) {
        self.backend.wait_queue_idle(self.ty);
    }

    pub fn flush(&self) {
        self.backend.flush_queue(self.ty);
    }
}
