use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

use crate::backend::RawBuffer;
use crate::device::Device;
use crate::error::RhiError;

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct BufferUsageFlags: u32 {
        const VERTEX         = 0b0000_0001;
        const INDEX          = 0b0000_0010;
        const UNIFORM        = 0b0000_0100;
        const STORAGE        = 0b0000_1000;
        const TRANSFER_SRC   = 0b0001_0000;
        const TRANSFER_DST   = 0b0010_0000;
        const INDIRECT       = 0b0100_0000;
        const DEVICE_ADDRESS = 0b1000_0000;
    }
}

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct MemoryFlags: u32 {
        const PERSISTENT_MAPPING = 0b1;
    }
}

/// Where the backing memory of a resource lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryLocation {
    GpuOnly,
    CpuToGpu,
    GpuToCpu,
    CpuOnly,
    CpuCopy,
    GpuLazy,
}

impl MemoryLocation {
    pub fn is_host_visible(self) -> bool {
        matches!(
            self,
            MemoryLocation::CpuToGpu
                | MemoryLocation::GpuToCpu
                | MemoryLocation::CpuOnly
                | MemoryLocation::CpuCopy
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferDesc {
    pub size: usize,
    pub usage: BufferUsageFlags,
    pub memory: MemoryLocation,
    pub memory_flags: MemoryFlags,
}

impl BufferDesc {
    pub fn new_gpu_only(size: usize, usage: BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            memory: MemoryLocation::GpuOnly,
            memory_flags: MemoryFlags::empty(),
        }
    }

    pub fn new_cpu_to_gpu(size: usize, usage: BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            memory: MemoryLocation::CpuToGpu,
            memory_flags: MemoryFlags::empty(),
        }
    }

    pub fn new_gpu_to_cpu(size: usize, usage: BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            memory: MemoryLocation::GpuToCpu,
            memory_flags: MemoryFlags::empty(),
        }
    }

    #[inline]
    pub fn usage_flags(mut self, usage: BufferUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn memory_flags(mut self, flags: MemoryFlags) -> Self {
        self.memory_flags = flags;
        self
    }
}

#[derive(Debug)]
pub struct Buffer {
    pub raw: RawBuffer,
    pub desc: BufferDesc,
}

impl Buffer {
    /// Map the buffer memory for CPU access.
    ///
    /// Only valid for host-visible memory locations; mutation of a mapped
    /// buffer must not race with a pending submission that references it.
    pub fn map(&self, device: &Device) -> anyhow::Result<NonNull<u8>, RhiError> {
        if !self.desc.memory.is_host_visible() {
            return Err(RhiError::BufferNotMappable);
        }

        device.backend().map_buffer(self.raw)
    }

    pub fn unmap(&self, device: &Device) {
        device.backend().unmap_buffer(self.raw);
    }
}

// implement buffer associated functions for device
impl Device {
    pub fn create_buffer(&self, desc: BufferDesc, name: &str) -> anyhow::Result<Buffer, RhiError> {
        let raw = self.backend().create_buffer(&desc, name)?;

        Ok(Buffer {
            raw,
            desc,
        })
    }

    /// Create a buffer and fill it with `data` through a mapped staging copy.
    pub fn create_buffer_init(&self, desc: BufferDesc, name: &str, data: &[u8]) -> anyhow::Result<Buffer, RhiError> {
        let buffer = self.create_buffer(desc.usage_flags(desc.usage | BufferUsageFlags::TRANSFER_DST), name)?;

        if !data.is_empty() {
            let staging = self.create_buffer(
                BufferDesc::new_cpu_to_gpu(desc.size, BufferUsageFlags::TRANSFER_SRC),
                "temp staging buffer",
            )?;

            let mapped = staging.map(self)?;
            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.as_ptr(), data.len().min(desc.size));
            }
            staging.unmap(self);

            self.immediate_transfer_cmd(|cb| {
                cb.copy_buffer(&staging, &buffer, desc.size as u64);
            })?;

            self.destroy_buffer(staging);
        }

        Ok(buffer)
    }

    pub fn destroy_buffer(&self, buffer: Buffer) {
        self.backend().destroy_buffer(buffer.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desc_serde_round_trip() {
        let desc = BufferDesc::new_cpu_to_gpu(4096, BufferUsageFlags::UNIFORM | BufferUsageFlags::TRANSFER_DST)
            .memory_flags(MemoryFlags::PERSISTENT_MAPPING);

        let json = serde_json::to_string(&desc).unwrap();
        let back: BufferDesc = serde_json::from_str(&json).unwrap();

        assert_eq!(desc, back);
    }
}
