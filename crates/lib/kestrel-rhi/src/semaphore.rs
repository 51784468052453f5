use crate::backend::RawSemaphore;
use crate::device::Device;
use crate::error::RhiError;

/// GPU synchronization semaphore.
#[derive(Debug)]
pub struct Semaphore {
    pub raw: RawSemaphore,
}

impl Device {
    pub fn create_semaphore(&self) -> anyhow::Result<Semaphore, RhiError> {
        let raw = self.backend().create_semaphore()?;

        Ok(Semaphore {
            raw,
        })
    }

    pub fn destroy_semaphore(&self, semaphore: Semaphore) {
        self.backend().destroy_semaphore(semaphore.raw);
    }
}
