pub mod headless;

use std::ptr::NonNull;
use std::sync::Arc;

use crate::access::PipelineStage;
use crate::buffer::BufferDesc;
use crate::command::RenderCommand;
use crate::error::RhiError;
use crate::pipeline::{ComputePipelineDesc, RasterPipelineDesc};
use crate::queue::QueueType;
use crate::renderpass::{FramebufferKey, RenderPassDesc};
use crate::shader::CompiledShader;
use crate::texture::{TextureDesc, TextureViewDesc};

pub use headless::HeadlessBackend;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawBuffer(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawTexture(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawTextureView(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawShaderModule(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawRenderPass(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawFramebuffer(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawPipeline(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawSemaphore(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawDescriptorPool(pub u64);

/// Capability interface over the underlying graphics driver.
///
/// The concrete backend is selected at device construction. All handles are
/// backend-opaque; command buffers record a typed stream that the backend
/// replays on `submit`.
pub trait RenderBackend: Send + Sync {
    fn queue_family_index(&self, ty: QueueType) -> u32;

    fn create_buffer(&self, desc: &BufferDesc, name: &str) -> anyhow::Result<RawBuffer, RhiError>;
    fn destroy_buffer(&self, raw: RawBuffer);
    fn map_buffer(&self, raw: RawBuffer) -> anyhow::Result<NonNull<u8>, RhiError>;
    fn unmap_buffer(&self, raw: RawBuffer);

    fn create_texture(&self, desc: &TextureDesc, name: &str) -> anyhow::Result<RawTexture, RhiError>;
    fn destroy_texture(&self, raw: RawTexture);
    /// Views belong to their texture and are destroyed with it.
    fn create_texture_view(&self, texture: RawTexture, desc: &TextureViewDesc) -> anyhow::Result<RawTextureView, RhiError>;

    fn create_shader_module(&self, bytecode: &[u8]) -> anyhow::Result<RawShaderModule, RhiError>;
    fn destroy_shader_module(&self, raw: RawShaderModule);

    fn create_render_pass(&self, desc: &RenderPassDesc) -> anyhow::Result<RawRenderPass, RhiError>;
    fn destroy_render_pass(&self, raw: RawRenderPass);

    fn create_framebuffer(&self, render_pass: RawRenderPass, key: &FramebufferKey) -> anyhow::Result<RawFramebuffer, RhiError>;
    fn destroy_framebuffer(&self, raw: RawFramebuffer);

    fn create_raster_pipeline(&self, desc: &RasterPipelineDesc, shaders: &[Arc<CompiledShader>]) -> anyhow::Result<RawPipeline, RhiError>;
    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc, shader: &Arc<CompiledShader>) -> anyhow::Result<RawPipeline, RhiError>;
    fn destroy_pipeline(&self, raw: RawPipeline);

    fn create_semaphore(&self) -> anyhow::Result<RawSemaphore, RhiError>;
    fn destroy_semaphore(&self, raw: RawSemaphore);

    fn create_descriptor_pool(&self) -> anyhow::Result<RawDescriptorPool, RhiError>;
    fn destroy_descriptor_pool(&self, raw: RawDescriptorPool);

    fn submit(
        &self,
        queue: QueueType,
        commands: Vec<RenderCommand>,
        wait_semaphores: &[RawSemaphore],
        signal_semaphores: &[RawSemaphore],
        wait_stages: &[PipelineStage],
    ) -> anyhow::Result<(), RhiError>;

    fn wait_queue_idle(&self, queue: QueueType);
    fn flush_queue(&self, queue: QueueType);
    fn wait_idle(&self);
}
