use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use kestrel_rhi::{
    AccessState, Buffer, ComputePipelineState, Device, PipelineHandle, PipelineRegistry,
    RasterPipelineState, Texture,
};

use crate::executing_graph::ExecutingRenderGraph;
use crate::graph::RenderGraph;
use crate::graph_resource::{GraphResource, GraphResourceDesc, ImportedAccess};
use crate::pass::Pass;
use crate::transient_resource_cache::TransientResourceCache;

/// A graph resource resolved to a live RHI resource.
pub(crate) enum GraphPreparedResource {
    CreatedBuffer(Buffer),
    CreatedTexture(Texture),
    NamedBuffer(Arc<Buffer>),
    NamedTexture(Arc<Texture>),
    ImportedBuffer(Arc<Buffer>),
    ImportedTexture(Arc<Texture>),
    /// Creation failed; every pass touching it becomes a no-op this frame.
    Missing,
}

impl GraphPreparedResource {
    pub fn borrow(&self) -> Option<GraphPreparedResourceRef> {
        match self {
            GraphPreparedResource::CreatedBuffer(buffer) => Some(GraphPreparedResourceRef::Buffer(buffer)),
            GraphPreparedResource::NamedBuffer(buffer) => Some(GraphPreparedResourceRef::Buffer(buffer)),
            GraphPreparedResource::ImportedBuffer(buffer) => Some(GraphPreparedResourceRef::Buffer(buffer)),

            GraphPreparedResource::CreatedTexture(texture) => Some(GraphPreparedResourceRef::Texture(texture)),
            GraphPreparedResource::NamedTexture(texture) => Some(GraphPreparedResourceRef::Texture(texture)),
            GraphPreparedResource::ImportedTexture(texture) => Some(GraphPreparedResourceRef::Texture(texture)),

            GraphPreparedResource::Missing => None,
        }
    }
}

// flattens out the ownership differences between created, named and imported
pub(crate) enum GraphPreparedResourceRef<'a> {
    Buffer(&'a Buffer),
    Texture(&'a Texture),
}

/// How a compiled resource leaves the frame.
pub(crate) enum RetireClass {
    /// Back into the transient resource cache.
    Transient,
    /// Final access state recorded under the name for the next frame.
    Named(String),
    /// Final access state written back to the caller's import cell.
    Imported(ImportedAccess),
    /// Nothing to retire (resource creation failed).
    Skip,
}

pub(crate) struct RegisteredResource {
    pub(crate) resource: GraphPreparedResource,
    pub(crate) retire: RetireClass,
    access: Cell<AccessState>,
}

impl RegisteredResource {
    pub fn get_current_access(&self) -> AccessState {
        self.access.get()
    }

    #[inline]
    pub fn transition_to(&self, dst_access: AccessState) {
        self.access.set(dst_access);
    }
}

#[derive(Clone)]
pub(crate) struct ResolvedRasterPipeline {
    pub(crate) handle: PipelineHandle,
    /// Some iff the registry entry is visible.
    pub(crate) pipeline: Option<Arc<RasterPipelineState>>,
}

#[derive(Clone)]
pub(crate) struct ResolvedComputePipeline {
    pub(crate) handle: PipelineHandle,
    pub(crate) pipeline: Option<Arc<ComputePipelineState>>,
}

/// A render graph with every resource resolved and every registered pipeline
/// looked up, ready to record commands.
pub struct CompiledRenderGraph {
    pub(crate) passes: Vec<Pass>,
    pub(crate) registered_resources: Vec<RegisteredResource>,
    pub(crate) raster_pipelines: Vec<ResolvedRasterPipeline>,
    pub(crate) compute_pipelines: Vec<ResolvedComputePipeline>,
}

impl RenderGraph {
    /// Resolve the graph against the pipeline registry and the transient
    /// resource cache.
    ///
    /// Per-resource failures do not abort the frame: the resource is marked
    /// missing, a diagnostic is reported and dependent passes become no-ops.
    pub(crate) fn compile(
        self,
        device: &Device,
        registry: &mut PipelineRegistry,
        cache: &mut TransientResourceCache,
        exported_access: &HashMap<String, AccessState>,
    ) -> CompiledRenderGraph {
        let raster_pipelines = self.raster_pipelines.iter()
            .map(|desc| {
                let handle = registry.register_raster(desc);
                ResolvedRasterPipeline {
                    handle,
                    pipeline: registry.get_raster_pipeline(handle),
                }
            })
            .collect::<Vec<_>>();

        let compute_pipelines = self.compute_pipelines.iter()
            .map(|desc| {
                let handle = registry.register_compute(desc);
                ResolvedComputePipeline {
                    handle,
                    pipeline: registry.get_compute_pipeline(handle),
                }
            })
            .collect::<Vec<_>>();

        let registered_resources = self.resources.into_iter()
            .map(|resource| match resource {
                GraphResource::Created { desc } => Self::compile_transient(device, cache, desc),
                GraphResource::Named { name, desc } => {
                    Self::compile_named(device, cache, exported_access, name, desc)
                }
                GraphResource::ImportedBuffer { raw, access } => RegisteredResource {
                    access: Cell::new(access.get()),
                    retire: RetireClass::Imported(access),
                    resource: GraphPreparedResource::ImportedBuffer(raw),
                },
                GraphResource::ImportedTexture { raw, access } => RegisteredResource {
                    access: Cell::new(access.get()),
                    retire: RetireClass::Imported(access),
                    resource: GraphPreparedResource::ImportedTexture(raw),
                },
            })
            .collect::<Vec<_>>();

        CompiledRenderGraph {
            passes: self.passes,
            registered_resources,
            raster_pipelines,
            compute_pipelines,
        }
    }

    fn compile_transient(
        device: &Device,
        cache: &mut TransientResourceCache,
        desc: GraphResourceDesc,
    ) -> RegisteredResource {
        // a resource created within this frame starts with no defined access
        match desc {
            GraphResourceDesc::Buffer(desc) => {
                let buffer = match cache.fetch_buffer(&desc) {
                    Some(buffer) => Some(buffer),
                    None => match device.create_buffer(desc, "rg transient buffer") {
                        Ok(buffer) => Some(buffer),
                        Err(err) => {
                            log::error!("Failed to create transient buffer {:?}: {}", desc, err);
                            None
                        }
                    },
                };

                match buffer {
                    Some(buffer) => RegisteredResource {
                        access: Cell::new(AccessState::Nothing),
                        retire: RetireClass::Transient,
                        resource: GraphPreparedResource::CreatedBuffer(buffer),
                    },
                    None => RegisteredResource::missing(),
                }
            }
            GraphResourceDesc::Texture(desc) => {
                let texture = match cache.fetch_texture(&desc) {
                    Some(texture) => Some(texture),
                    None => match device.create_texture(desc, "rg transient texture") {
                        Ok(texture) => Some(texture),
                        Err(err) => {
                            log::error!("Failed to create transient texture {:?}: {}", desc, err);
                            None
                        }
                    },
                };

                match texture {
                    Some(texture) => RegisteredResource {
                        access: Cell::new(AccessState::Nothing),
                        retire: RetireClass::Transient,
                        resource: GraphPreparedResource::CreatedTexture(texture),
                    },
                    None => RegisteredResource::missing(),
                }
            }
        }
    }

    fn compile_named(
        device: &Device,
        cache: &mut TransientResourceCache,
        exported_access: &HashMap<String, AccessState>,
        name: String,
        desc: GraphResourceDesc,
    ) -> RegisteredResource {
        // the previous frame's final access carries over by name
        let initial_access = exported_access.get(&name)
            .copied()
            .unwrap_or(AccessState::Nothing);

        match desc {
            GraphResourceDesc::Buffer(desc) => {
                if let Err(err) = cache.update_dirty_named_buffer(&name, device, &desc) {
                    log::error!("Failed to refresh named buffer {:?}: {}", name, err);
                    return RegisteredResource::missing();
                }

                match cache.get_or_create_named_buffer(&name, device, &desc) {
                    Ok(buffer) => RegisteredResource {
                        access: Cell::new(initial_access),
                        retire: RetireClass::Named(name),
                        resource: GraphPreparedResource::NamedBuffer(buffer),
                    },
                    Err(err) => {
                        log::error!("Failed to create named buffer {:?}: {}", name, err);
                        RegisteredResource::missing()
                    }
                }
            }
            GraphResourceDesc::Texture(desc) => {
                if let Err(err) = cache.update_dirty_named_texture(&name, device, &desc) {
                    log::error!("Failed to refresh named texture {:?}: {}", name, err);
                    return RegisteredResource::missing();
                }

                match cache.get_or_create_named_texture(&name, device, &desc) {
                    Ok(texture) => RegisteredResource {
                        access: Cell::new(initial_access),
                        retire: RetireClass::Named(name),
                        resource: GraphPreparedResource::NamedTexture(texture),
                    },
                    Err(err) => {
                        log::error!("Failed to create named texture {:?}: {}", name, err);
                        RegisteredResource::missing()
                    }
                }
            }
        }
    }
}

impl RegisteredResource {
    fn missing() -> Self {
        Self {
            access: Cell::new(AccessState::Nothing),
            retire: RetireClass::Skip,
            resource: GraphPreparedResource::Missing,
        }
    }
}

impl CompiledRenderGraph {
    #[must_use]
    pub(crate) fn begin_execute(self, device: &Device) -> ExecutingRenderGraph<'_> {
        ExecutingRenderGraph {
            device,
            passes: self.passes,
            registered_resources: self.registered_resources,
            raster_pipelines: self.raster_pipelines,
            compute_pipelines: self.compute_pipelines,
        }
    }
}
