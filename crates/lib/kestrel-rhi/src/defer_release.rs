use std::sync::Arc;

use crossbeam::queue::SegQueue;

use crate::backend::RawDescriptorPool;
use crate::buffer::Buffer;
use crate::device::Device;
use crate::texture::Texture;

/// A resource parked for destruction once the GPU can no longer see it.
pub enum DeferredResource {
    Buffer(Buffer),
    Texture(Texture),
    SharedBuffer(Arc<Buffer>),
    SharedTexture(Arc<Texture>),
    DescriptorPool(RawDescriptorPool),
}

/// Anything that can be routed through [`Device::defer_release`].
pub trait DeferReleasable {
    fn enqueue(self, queue: &DeferReleaseQueue);
}

impl DeferReleasable for Buffer {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        queue.resources.push(DeferredResource::Buffer(self));
    }
}

impl DeferReleasable for Texture {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        queue.resources.push(DeferredResource::Texture(self));
    }
}

impl DeferReleasable for Arc<Buffer> {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        queue.resources.push(DeferredResource::SharedBuffer(self));
    }
}

impl DeferReleasable for Arc<Texture> {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        queue.resources.push(DeferredResource::SharedTexture(self));
    }
}

impl DeferReleasable for RawDescriptorPool {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        queue.resources.push(DeferredResource::DescriptorPool(self));
    }
}

// releasing nothing is a no-op
impl<T: DeferReleasable> DeferReleasable for Option<T> {
    fn enqueue(self, queue: &DeferReleaseQueue) {
        if let Some(resource) = self {
            resource.enqueue(queue);
        }
    }
}

/// One frame slot's queue of resources awaiting safe destruction.
///
/// Multi-producer and lock-free: any thread may enqueue while the main thread
/// drains from `end_frame`.
pub struct DeferReleaseQueue {
    resources: SegQueue<DeferredResource>,
}

impl DeferReleaseQueue {
    pub fn new() -> Self {
        Self {
            resources: SegQueue::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Destroy every resource parked in this slot.
    ///
    /// A resource enqueued during frame f is guaranteed destroyed no earlier
    /// than frame f + N - 1's `end_frame`, N being the device frame slot
    /// count. A shared resource that still has outside holders at that point
    /// stays parked and is retried the next time this slot drains, so it is
    /// destroyed once the last holder lets go, never leaked.
    pub fn release_all_stale(&self, device: &Device) {
        let mut still_shared = Vec::new();

        while let Some(resource) = self.resources.pop() {
            match resource {
                DeferredResource::Buffer(buffer) => {
                    device.destroy_buffer(buffer);
                }
                DeferredResource::Texture(texture) => {
                    device.destroy_texture(texture);
                }
                DeferredResource::SharedBuffer(buffer) => {
                    match Arc::try_unwrap(buffer) {
                        Ok(buffer) => device.destroy_buffer(buffer),
                        Err(buffer) => {
                            log::warn!("Deferred buffer {:?} still shared, retrying next release cycle.", buffer.raw);
                            still_shared.push(DeferredResource::SharedBuffer(buffer));
                        }
                    }
                }
                DeferredResource::SharedTexture(texture) => {
                    match Arc::try_unwrap(texture) {
                        Ok(texture) => device.destroy_texture(texture),
                        Err(texture) => {
                            log::warn!("Deferred texture {:?} still shared, retrying next release cycle.", texture.raw);
                            still_shared.push(DeferredResource::SharedTexture(texture));
                        }
                    }
                }
                DeferredResource::DescriptorPool(pool) => {
                    device.backend().destroy_descriptor_pool(pool);
                }
            }
        }

        // park the survivors back into this slot, it drains again N frames on
        for resource in still_shared {
            self.resources.push(resource);
        }
    }
}

impl Default for DeferReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}
