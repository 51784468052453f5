use std::marker::PhantomData;

use kestrel_rhi::access::{
    is_read_only_access, is_read_only_raster_access, is_write_access, is_write_raster_access,
};
use kestrel_rhi::{AccessState, ComputePipelineDesc, RasterPipelineDesc, RhiError};

use crate::graph::RenderGraph;
use crate::graph_resource::{
    GraphComputePipelineHandle, GraphRasterPipelineHandle, GraphResourceHandle, GraphResourceRef,
    Handle,
};
use crate::pass_context::PassContext;
use crate::resource::{Resource, ResourceView, Rt, Srv, Uav};

pub type RenderFn = dyn FnOnce(&mut PassContext) -> anyhow::Result<(), RhiError>;

/// Access a pass declared on one of its resources.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PassResourceAccess {
    pub(crate) access: AccessState,
    /// Reads of an already-matching state need no barrier; writes always do.
    pub(crate) skip_sync_if_same: bool,
}

pub(crate) struct PassResourceHandle {
    pub handle: GraphResourceHandle,
    pub access: PassResourceAccess,
}

/// A declared pass of the render graph.
///
/// Carries the declared resource accesses (barriers are derived from them at
/// execution time), the optionally registered pipelines and the render
/// callback.
pub(crate) struct Pass {
    #[allow(dead_code)]
    pub id: usize,
    pub name: String,
    pub inputs: Vec<PassResourceHandle>,
    pub outputs: Vec<PassResourceHandle>,
    pub raster_pipeline: Option<GraphRasterPipelineHandle>,
    pub compute_pipeline: Option<GraphComputePipelineHandle>,
    pub render_fn: Option<Box<RenderFn>>,
}

impl Pass {
    pub(crate) fn new_empty(id: usize, name: String) -> Self {
        Self {
            id,
            name,
            inputs: Vec::new(),
            outputs: Vec::new(),
            raster_pipeline: None,
            compute_pipeline: None,
            render_fn: None,
        }
    }
}

/// Helper struct to build a pass.
pub struct PassBuilder<'rg> {
    pub(crate) rg: &'rg mut RenderGraph,
    pub(crate) pass: Option<Pass>,
}

impl<'rg> Drop for PassBuilder<'rg> {
    /// On drop the built pass is handed back to the render graph.
    fn drop(&mut self) {
        self.rg.finish_add_pass(self.pass.take().unwrap());
    }
}

impl<'rg> PassBuilder<'rg> {
    /// Declare a read of `handle` in this pass. The access must be a
    /// read-only class.
    pub fn read<ResType: Resource>(
        &mut self,
        handle: &Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, Srv> {
        assert!(is_read_only_access(&access), "Invalid read access: {:?}", &access);

        self.read_impl(handle, access)
    }

    /// Declare a write of `handle` in this pass. The access must be a write
    /// class.
    pub fn write<ResType: Resource>(
        &mut self,
        handle: &mut Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, Uav> {
        assert!(is_write_access(&access), "Invalid write access: {:?}", &access);

        self.write_impl(handle, access)
    }

    /// Declare a render-target read.
    pub fn raster_read<ResType: Resource>(
        &mut self,
        handle: &Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, Rt> {
        assert!(
            is_read_only_raster_access(&access),
            "Invalid raster read access: {:?}",
            &access
        );

        self.read_impl(handle, access)
    }

    /// Declare a render-target write.
    pub fn raster_write<ResType: Resource>(
        &mut self,
        handle: &mut Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, Rt> {
        assert!(
            is_write_raster_access(&access),
            "Invalid raster write access: {:?}",
            &access
        );

        self.write_impl(handle, access)
    }

    /// Register the raster pipeline this pass draws with.
    pub fn register_raster_pipeline(&mut self, desc: RasterPipelineDesc) -> GraphRasterPipelineHandle {
        let idx = self.rg.raster_pipelines.len();
        self.rg.raster_pipelines.push(desc);

        let handle = GraphRasterPipelineHandle { idx };
        self.pass.as_mut().unwrap().raster_pipeline = Some(handle);

        handle
    }

    /// Register the compute pipeline this pass dispatches with.
    pub fn register_compute_pipeline(&mut self, desc: ComputePipelineDesc) -> GraphComputePipelineHandle {
        let idx = self.rg.compute_pipelines.len();
        self.rg.compute_pipelines.push(desc);

        let handle = GraphComputePipelineHandle { idx };
        self.pass.as_mut().unwrap().compute_pipeline = Some(handle);

        handle
    }

    /// Attach the render callback. Invoked at execution time with the
    /// compiled-resource context; skipped when a registered pipeline is not
    /// visible yet.
    pub fn render(
        mut self,
        func: impl (FnOnce(&mut PassContext) -> anyhow::Result<(), RhiError>) + 'static,
    ) {
        let pass = self.pass.as_mut().unwrap();

        let old_render_fn = pass.render_fn.replace(Box::new(func));
        assert!(old_render_fn.is_none(), "Pass {:?} already has a render callback!", pass.name);
    }

    fn write_impl<ResType: Resource, ViewType: ResourceView>(
        &mut self,
        handle: &mut Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, ViewType> {
        let pass = self.pass.as_mut().unwrap();

        pass.outputs.push(PassResourceHandle {
            handle: handle.handle, // write to the old generation
            access: PassResourceAccess {
                access,
                skip_sync_if_same: false,
            },
        });

        GraphResourceRef {
            // after a write it is a new generation
            handle: handle.handle.expired(),
            _marker: PhantomData,
        }
    }

    fn read_impl<ResType: Resource, ViewType: ResourceView>(
        &mut self,
        handle: &Handle<ResType>,
        access: AccessState,
    ) -> GraphResourceRef<ResType, ViewType> {
        let pass = self.pass.as_mut().unwrap();

        pass.inputs.push(PassResourceHandle {
            handle: handle.handle,
            access: PassResourceAccess {
                access,
                skip_sync_if_same: true,
            },
        });

        GraphResourceRef {
            handle: handle.handle,
            _marker: PhantomData,
        }
    }
}
