use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use kestrel_rhi::{Buffer, Texture};

use crate::graph_resource::{
    GraphResource, GraphResourceDesc, GraphResourceHandle, Handle, ImportedAccess,
};
use crate::pass::{Pass, PassBuilder};
use crate::resource::{Resource, ResourceDesc, TypeEqualTo};

use kestrel_rhi::{ComputePipelineDesc, RasterPipelineDesc};

/// Resources that can be imported into a render graph for one frame.
pub trait ImportGraphResource
where
    Self: Resource + Sized,
{
    // imported resources are externally owned, hence Arc
    fn import(
        self: Arc<Self>,
        render_graph: &mut RenderGraph,
        access: &ImportedAccess,
    ) -> Handle<Self>;
}

impl ImportGraphResource for Buffer {
    fn import(
        self: Arc<Self>,
        render_graph: &mut RenderGraph,
        access: &ImportedAccess,
    ) -> Handle<Self> {
        let handle = GraphResourceHandle {
            id: render_graph.resources.len() as u32,
            generation: 0,
        };
        let desc = self.desc;
        render_graph.resources.push(GraphResource::ImportedBuffer {
            raw: self,
            access: access.clone(),
        });

        Handle {
            handle,
            desc,
            _marker: PhantomData,
        }
    }
}

impl ImportGraphResource for Texture {
    fn import(
        self: Arc<Self>,
        render_graph: &mut RenderGraph,
        access: &ImportedAccess,
    ) -> Handle<Self> {
        let handle = GraphResourceHandle {
            id: render_graph.resources.len() as u32,
            generation: 0,
        };
        let desc = self.desc;
        render_graph.resources.push(GraphResource::ImportedTexture {
            raw: self,
            access: access.clone(),
        });

        Handle {
            handle,
            desc,
            _marker: PhantomData,
        }
    }
}

/// Per-frame render graph under construction.
///
/// Single-threaded builder: passes execute in registration order, resources
/// are a dense table referenced by index.
pub struct RenderGraph {
    pub(crate) passes: Vec<Pass>,
    pub(crate) resources: Vec<GraphResource>,
    named_handles: HashMap<String, GraphResourceHandle>,

    pub(crate) raster_pipelines: Vec<RasterPipelineDesc>,
    pub(crate) compute_pipelines: Vec<ComputePipelineDesc>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            resources: Vec::new(),
            named_handles: HashMap::new(),

            raster_pipelines: Vec::new(),
            compute_pipelines: Vec::new(),
        }
    }

    /// Add a new pass to the render graph.
    pub fn add_pass<'rg>(&'rg mut self, name: &str) -> PassBuilder<'rg> {
        let curr_pass_idx = self.passes.len();

        PassBuilder {
            rg: self,
            pass: Some(Pass::new_empty(curr_pass_idx, name.to_string())),
        }
    }

    pub(crate) fn finish_add_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// Declare a transient resource: its lifetime is confined to this frame's
    /// graph, backed by the transient resource cache.
    pub fn create_temporary_resource<Desc: ResourceDesc>(
        &mut self,
        desc: Desc,
    ) -> Handle<<Desc as ResourceDesc>::Resource>
    where
        Desc: TypeEqualTo<Other = <<Desc as ResourceDesc>::Resource as Resource>::Desc>,
    {
        let handle = GraphResourceHandle {
            id: self.resources.len() as u32,
            generation: 0,
        };

        self.resources.push(GraphResource::Created {
            desc: desc.clone().into(),
        });

        Handle {
            handle,
            desc: TypeEqualTo::same(desc),
            _marker: PhantomData,
        }
    }

    /// Declare (or re-reference) a named persistent texture.
    pub fn get_or_create_named_texture(
        &mut self,
        name: impl Into<String>,
        desc: kestrel_rhi::TextureDesc,
    ) -> anyhow::Result<Handle<Texture>> {
        let name = name.into();

        if let Some(handle) = self.named_handles.get(&name) {
            match &self.resources[handle.id as usize] {
                GraphResource::Named {
                    desc: GraphResourceDesc::Texture(existing),
                    ..
                } => {
                    return Ok(Handle {
                        handle: *handle,
                        desc: *existing,
                        _marker: PhantomData,
                    });
                }
                _ => anyhow::bail!("Named resource {:?} is not a texture!", name),
            }
        }

        let handle = GraphResourceHandle {
            id: self.resources.len() as u32,
            generation: 0,
        };
        self.resources.push(GraphResource::Named {
            name: name.clone(),
            desc: GraphResourceDesc::Texture(desc),
        });
        self.named_handles.insert(name, handle);

        Ok(Handle {
            handle,
            desc,
            _marker: PhantomData,
        })
    }

    /// Declare (or re-reference) a named persistent buffer.
    pub fn get_or_create_named_buffer(
        &mut self,
        name: impl Into<String>,
        desc: kestrel_rhi::BufferDesc,
    ) -> anyhow::Result<Handle<Buffer>> {
        let name = name.into();

        if let Some(handle) = self.named_handles.get(&name) {
            match &self.resources[handle.id as usize] {
                GraphResource::Named {
                    desc: GraphResourceDesc::Buffer(existing),
                    ..
                } => {
                    return Ok(Handle {
                        handle: *handle,
                        desc: *existing,
                        _marker: PhantomData,
                    });
                }
                _ => anyhow::bail!("Named resource {:?} is not a buffer!", name),
            }
        }

        let handle = GraphResourceHandle {
            id: self.resources.len() as u32,
            generation: 0,
        };
        self.resources.push(GraphResource::Named {
            name: name.clone(),
            desc: GraphResourceDesc::Buffer(desc),
        });
        self.named_handles.insert(name, handle);

        Ok(Handle {
            handle,
            desc,
            _marker: PhantomData,
        })
    }

    /// Import an externally-owned resource into this frame of the graph.
    ///
    /// The graph observes the initial access through `access` and writes the
    /// final access back into it when the frame retires.
    pub fn import_resource<ResourceType: ImportGraphResource>(
        &mut self,
        resource: Arc<ResourceType>,
        access: &ImportedAccess,
    ) -> Handle<ResourceType> {
        ImportGraphResource::import(resource, self, access)
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}
