mod graph;
mod compiled_graph;
mod executing_graph;
mod retired_graph;

mod graph_resource;
mod resource;

mod pass;
mod pass_context;

mod executor;
mod transient_resource_cache;

pub use executor::Executor;
pub use graph::{ImportGraphResource, RenderGraph};
pub use graph_resource::{
    GraphComputePipelineHandle, GraphRasterPipelineHandle, GraphResourceDesc, GraphResourceRef,
    Handle, ImportedAccess,
};
pub use pass::PassBuilder;
pub use pass_context::{
    BoundComputePipeline, BoundRasterPipeline, PassContext, RenderGraphPassBindable,
    RenderGraphPassBinding,
};
pub use resource::{Resource, ResourceDesc, ResourceView, Rt, Srv, TypeEqualTo, Uav};
pub use transient_resource_cache::TransientResourceCache;
