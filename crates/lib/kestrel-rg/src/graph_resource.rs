use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use kestrel_rhi::{AccessState, Buffer, BufferDesc, Texture, TextureDesc};

use crate::resource::{Resource, ResourceView};

/// Description for a render graph resource.
///
/// The graph's resource table is untyped, so the typed descriptions collapse
/// into this enum; [`Handle`] keeps the typed description for the user.
#[derive(Clone, Copy, Debug)]
pub enum GraphResourceDesc {
    Buffer(BufferDesc),
    Texture(TextureDesc),
}

/// Access-state cell shared between the caller and one frame of the graph.
///
/// The caller states the initial access when importing; after execution the
/// graph writes the final access back, so the next import observes it.
#[derive(Clone)]
pub struct ImportedAccess {
    inner: Arc<Mutex<AccessState>>,
}

impl ImportedAccess {
    pub fn new(initial: AccessState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self) -> AccessState {
        *self.inner.lock()
    }

    pub(crate) fn set(&self, access: AccessState) {
        *self.inner.lock() = access;
    }
}

impl Default for ImportedAccess {
    fn default() -> Self {
        Self::new(AccessState::Nothing)
    }
}

/// One entry of the graph's resource table.
pub(crate) enum GraphResource {
    /// Transient: created (or fetched from the cache) during compile, returned
    /// to the cache when the frame retires.
    Created {
        desc: GraphResourceDesc,
    },
    /// Named: persisted across frames under a stable string identifier; its
    /// access state carries over.
    Named {
        name: String,
        desc: GraphResourceDesc,
    },
    /// Imported: externally-owned, made visible to this frame only.
    ImportedBuffer {
        raw: Arc<Buffer>,
        access: ImportedAccess,
    },
    ImportedTexture {
        raw: Arc<Texture>,
        access: ImportedAccess,
    },
}

/// Dense index of a resource inside one graph.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub(crate) struct GraphResourceHandle {
    pub(crate) id: u32,
    /// Bumped on every write so stale references are distinguishable.
    pub(crate) generation: u32,
}

impl GraphResourceHandle {
    pub(crate) fn expired(self) -> Self {
        Self {
            id: self.id,
            generation: self.generation.wrapping_add(1),
        }
    }
}

/// Typed handle to a resource declared in the render graph.
#[derive(Debug)]
pub struct Handle<ResourceType: Resource> {
    pub(crate) handle: GraphResourceHandle,
    pub(crate) desc: <ResourceType as Resource>::Desc,
    pub(crate) _marker: PhantomData<ResourceType>,
}

impl<ResourceType: Resource> Handle<ResourceType> {
    pub fn desc(&self) -> &<ResourceType as Resource>::Desc {
        &self.desc
    }
}

impl<ResourceType: Resource> PartialEq for Handle<ResourceType> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<ResourceType: Resource> Eq for Handle<ResourceType> {}

/// Same as [`Handle`], plus a view marker stating how the pass will use the
/// resource.
pub struct GraphResourceRef<ResType: Resource, ViewType: ResourceView> {
    pub(crate) handle: GraphResourceHandle,
    pub(crate) _marker: PhantomData<(ResType, ViewType)>,
}

/// Raster pipeline registered on a pass, by index into the graph's pipeline
/// table.
#[derive(Clone, Copy)]
pub struct GraphRasterPipelineHandle {
    pub(crate) idx: usize,
}

#[derive(Clone, Copy)]
pub struct GraphComputePipelineHandle {
    pub(crate) idx: usize,
}
