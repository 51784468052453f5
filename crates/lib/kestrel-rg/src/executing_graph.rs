use arrayvec::ArrayVec;

use kestrel_rhi::barrier::{self, BufferBarrier, TextureBarrier};
use kestrel_rhi::{CommandBuffer, Device};

use crate::compiled_graph::{
    GraphPreparedResource, GraphPreparedResourceRef, RegisteredResource, ResolvedComputePipeline,
    ResolvedRasterPipeline,
};
use crate::pass::{Pass, PassResourceAccess};
use crate::pass_context::{GraphResourceRegistry, PassContext};
use crate::retired_graph::RetiredRenderGraph;

const MAX_TRANSITION_PER_BATCH: usize = 64;

/// A compiled graph while it records commands.
///
/// Passes run in registration order; hazards are resolved by just-in-time
/// access transitions immediately before the later access.
pub(crate) struct ExecutingRenderGraph<'exec> {
    pub(crate) device: &'exec Device,

    pub(crate) passes: Vec<Pass>,
    pub(crate) registered_resources: Vec<RegisteredResource>,
    pub(crate) raster_pipelines: Vec<ResolvedRasterPipeline>,
    pub(crate) compute_pipelines: Vec<ResolvedComputePipeline>,
}

impl<'exec> ExecutingRenderGraph<'exec> {
    pub fn record_commands(&mut self, cb: &mut CommandBuffer) {
        let passes = std::mem::take(&mut self.passes);

        for pass in passes {
            self.record_pass_commands(cb, pass);
        }
    }

    pub fn into_retired(self) -> RetiredRenderGraph {
        RetiredRenderGraph {
            registered_resources: self.registered_resources,
        }
    }

    fn record_pass_commands(&self, cb: &mut CommandBuffer, pass: Pass) {
        // a pass declaring a handle this graph never created, or touching a
        // resource that failed to compile, is a no-op
        let unavailable = pass.inputs.iter().chain(pass.outputs.iter()).any(|pass_res| {
            match self.registered_resources.get(pass_res.handle.id as usize) {
                Some(registered) => matches!(registered.resource, GraphPreparedResource::Missing),
                None => true,
            }
        });
        if unavailable {
            log::error!("Pass {:?} skipped: one of its resources is unavailable.", pass.name);
            return;
        }

        // transition all declared resources to their target access
        let transitions = pass.inputs.iter().chain(pass.outputs.iter())
            .map(|pass_res| (&self.registered_resources[pass_res.handle.id as usize], pass_res.access))
            .collect::<Vec<_>>();

        self.resource_transition_batched(cb, transitions);

        // a registered pipeline that is not visible yet skips the draws, the
        // barriers above still happened
        let raster_pipeline = pass.raster_pipeline.map(|handle| self.raster_pipelines[handle.idx].clone());
        if let Some(resolved) = &raster_pipeline {
            if resolved.pipeline.is_none() {
                log::warn!(
                    "Pass {:?} skipped: raster pipeline {:?} is not visible yet.",
                    pass.name,
                    resolved.handle
                );
                return;
            }
        }

        let compute_pipeline = pass.compute_pipeline.map(|handle| self.compute_pipelines[handle.idx].clone());
        if let Some(resolved) = &compute_pipeline {
            if resolved.pipeline.is_none() {
                log::warn!(
                    "Pass {:?} skipped: compute pipeline {:?} is not visible yet.",
                    pass.name,
                    resolved.handle
                );
                return;
            }
        }

        let mut context = PassContext {
            cb,
            registry: GraphResourceRegistry {
                device: self.device,
                registered_resources: &self.registered_resources,
                raster_pipeline,
                compute_pipeline,
            },
        };

        if let Some(render_fn) = pass.render_fn {
            if let Err(err) = render_fn(&mut context) {
                log::error!("Pass {:?} failed while recording: {}", pass.name, err);
            }
        }
    }

    /// Transition resources in bounded batches; recording them one by one is
    /// less efficient than batching the whole pass.
    fn resource_transition_batched(
        &self,
        cb: &mut CommandBuffer,
        resources: Vec<(&RegisteredResource, PassResourceAccess)>,
    ) {
        if resources.is_empty() {
            return;
        }

        for batch in resources.chunks(MAX_TRANSITION_PER_BATCH) {
            self.resource_transition_batch_impl(cb, batch);
        }
    }

    fn resource_transition_batch_impl(
        &self,
        cb: &mut CommandBuffer,
        resources: &[(&RegisteredResource, PassResourceAccess)],
    ) {
        let mut texture_barriers: ArrayVec<TextureBarrier, MAX_TRANSITION_PER_BATCH> = ArrayVec::new();
        let mut buffer_barriers: ArrayVec<BufferBarrier, MAX_TRANSITION_PER_BATCH> = ArrayVec::new();

        for (resource, target) in resources {
            // allow the pipeline to overlap on matching read accesses
            if resource.get_current_access() == target.access && target.skip_sync_if_same {
                continue;
            }

            let prev_access = resource.get_current_access();

            match resource.resource.borrow() {
                Some(GraphPreparedResourceRef::Texture(texture)) => {
                    texture_barriers.push(TextureBarrier {
                        texture,
                        prev_access,
                        next_access: target.access,
                        discard_contents: false,
                    });
                }
                Some(GraphPreparedResourceRef::Buffer(buffer)) => {
                    buffer_barriers.push(BufferBarrier {
                        buffer,
                        prev_access,
                        next_access: target.access,
                    });
                }
                None => unreachable!("Missing resources never reach transition recording!"),
            }

            // do NOT forget to update the access
            resource.transition_to(target.access);
        }

        if !texture_barriers.is_empty() {
            barrier::texture_barrier(cb, &texture_barriers);
        }
        if !buffer_barriers.is_empty() {
            barrier::buffer_barrier(cb, &buffer_barriers);
        }
    }
}
