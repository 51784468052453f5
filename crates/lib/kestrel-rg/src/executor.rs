use std::collections::HashMap;
use std::sync::Arc;

use kestrel_rhi::{AccessState, Device, PipelineRegistry, ShaderResourceSystem};

use crate::compiled_graph::CompiledRenderGraph;
use crate::graph::RenderGraph;
use crate::transient_resource_cache::TransientResourceCache;

/// Builds and runs one render graph per frame on top of the RHI.
///
/// Owns the pipeline registry, the transient resource cache and the exported
/// access-state map that carries named resources' states across frames.
pub struct Executor {
    device: Arc<Device>,

    pipeline_registry: PipelineRegistry,
    transient_resource_cache: TransientResourceCache,
    exported_access: HashMap<String, AccessState>,

    render_graph: Option<RenderGraph>,
    compiled_rg: Option<CompiledRenderGraph>,
}

impl Executor {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,

            pipeline_registry: PipelineRegistry::new(),
            transient_resource_cache: TransientResourceCache::new(),
            exported_access: HashMap::new(),

            render_graph: None,
            compiled_rg: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn pipeline_registry(&self) -> &PipelineRegistry {
        &self.pipeline_registry
    }

    #[inline]
    pub fn pipeline_registry_mut(&mut self) -> &mut PipelineRegistry {
        &mut self.pipeline_registry
    }

    /// The access state a named resource retired with, if it has run.
    pub fn exported_access(&self, name: &str) -> Option<AccessState> {
        self.exported_access.get(name).copied()
    }

    /// Build this frame's render graph through the user callback.
    pub fn prepare<PrepareFn>(&mut self, prepare_fn: PrepareFn)
    where
        PrepareFn: FnOnce(&mut RenderGraph),
    {
        debug_assert!(
            self.render_graph.is_none() && self.compiled_rg.is_none(),
            "prepare() called while a frame is already in flight!"
        );

        let mut render_graph = RenderGraph::new();
        prepare_fn(&mut render_graph);

        self.render_graph = Some(render_graph);
    }

    /// Pump the pipeline registry's state machine: issue shader loads, promote
    /// loaded entries and try to realize their pipeline states.
    ///
    /// Returns `false` iff any pipeline creation failed (those entries retry
    /// next frame).
    pub fn update_pipelines(&mut self, shaders: &dyn ShaderResourceSystem) -> bool {
        self.pipeline_registry.update(shaders);
        self.pipeline_registry.update_pipelines(&self.device, shaders)
    }

    /// Resolve the prepared graph against the registry and the caches.
    pub fn compile(&mut self) {
        let render_graph = match self.render_graph.take() {
            Some(render_graph) => render_graph,
            None => {
                log::warn!("compile() called without a prepared render graph!");
                return;
            }
        };

        self.compiled_rg = Some(render_graph.compile(
            &self.device,
            &mut self.pipeline_registry,
            &mut self.transient_resource_cache,
            &self.exported_access,
        ));
    }

    /// Record, submit and retire the compiled graph inside a device frame
    /// bracket.
    ///
    /// A rejected submission degrades the frame (no retry); resources still
    /// retire normally.
    pub fn execute(&mut self) {
        let compiled_rg = match self.compiled_rg.take() {
            Some(compiled_rg) => compiled_rg,
            None => {
                log::warn!("Render graph is not compiled yet, execute request denied!");
                return;
            }
        };

        let device = self.device.clone();
        device.begin_frame();

        let mut cb = device.allocate_command_buffer();
        cb.begin();

        let mut executing_rg = compiled_rg.begin_execute(&device);
        executing_rg.record_commands(&mut cb);

        cb.end();

        if let Err(err) = device.graphics_queue().submit(&mut cb, &[], &[], &[]) {
            log::error!("Frame degraded, submission rejected: {}", err);
        }

        let retired_rg = executing_rg.into_retired();
        retired_rg.retire(&mut self.transient_resource_cache, &mut self.exported_access);

        device.end_frame();
    }

    /// Explicitly clean up everything the executor holds onto the device.
    pub fn shutdown(mut self, shaders: &dyn ShaderResourceSystem) {
        self.device.wait_until_idle();

        self.pipeline_registry.destroy_all(&self.device);
        self.pipeline_registry.shutdown(shaders);
        self.transient_resource_cache.destroy_all(&self.device);
    }
}
