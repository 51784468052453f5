use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::access::PipelineStage;
use crate::buffer::BufferDesc;
use crate::command::RenderCommand;
use crate::error::RhiError;
use crate::pipeline::{ComputePipelineDesc, RasterPipelineDesc};
use crate::queue::QueueType;
use crate::renderpass::{FramebufferKey, RenderPassDesc};
use crate::shader::CompiledShader;
use crate::texture::{TextureDesc, TextureViewDesc};

use super::{
    RawBuffer, RawDescriptorPool, RawFramebuffer, RawPipeline, RawRenderPass, RawSemaphore,
    RawShaderModule, RawTexture, RawTextureView, RenderBackend,
};

struct HeadlessBuffer {
    #[allow(dead_code)]
    desc: BufferDesc,
    // host-visible buffers own real storage so mapping hands out a live pointer
    storage: Option<Box<[u8]>>,
}

/// One batch of commands accepted by a queue.
#[derive(Clone)]
pub struct SubmittedBatch {
    pub queue: QueueType,
    pub commands: Vec<RenderCommand>,
    pub wait_semaphores: Vec<RawSemaphore>,
    pub signal_semaphores: Vec<RawSemaphore>,
}

#[derive(Default)]
struct HeadlessState {
    next_raw: u64,

    buffers: HashMap<u64, HeadlessBuffer>,
    textures: HashMap<u64, TextureDesc>,
    views: HashMap<u64, u64>,
    shader_modules: HashMap<u64, usize>,
    render_passes: HashMap<u64, usize>,
    framebuffers: HashMap<u64, u64>,
    pipelines: HashMap<u64, ()>,
    semaphores: HashMap<u64, ()>,
    descriptor_pools: HashMap<u64, ()>,

    submissions: Vec<SubmittedBatch>,

    fail_pipeline_creation: bool,
    fail_submission: bool,

    destroyed_buffer_count: u64,
    destroyed_texture_count: u64,
}

impl HeadlessState {
    fn allocate_raw(&mut self) -> u64 {
        self.next_raw += 1;
        self.next_raw
    }
}

/// Driverless backend.
///
/// Implements the full [`RenderBackend`] contract in process: handles are
/// monotonic ids, submissions are retained for inspection, and host-visible
/// buffers are backed by real allocations. Used by the sandbox and the test
/// suites; a Vulkan or DX backend would implement the same trait.
#[derive(Default)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alive_buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn alive_texture_count(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn alive_framebuffer_count(&self) -> usize {
        self.state.lock().framebuffers.len()
    }

    pub fn alive_pipeline_count(&self) -> usize {
        self.state.lock().pipelines.len()
    }

    pub fn is_buffer_alive(&self, raw: RawBuffer) -> bool {
        self.state.lock().buffers.contains_key(&raw.0)
    }

    pub fn is_texture_alive(&self, raw: RawTexture) -> bool {
        self.state.lock().textures.contains_key(&raw.0)
    }

    pub fn destroyed_buffer_count(&self) -> u64 {
        self.state.lock().destroyed_buffer_count
    }

    pub fn destroyed_texture_count(&self) -> u64 {
        self.state.lock().destroyed_texture_count
    }

    /// Every batch accepted so far, in submission order.
    pub fn submissions(&self) -> Vec<SubmittedBatch> {
        self.state.lock().submissions.clone()
    }

    pub fn clear_submissions(&self) {
        self.state.lock().submissions.clear();
    }

    /// Make every subsequent pipeline creation fail, to exercise the
    /// registry's retry path.
    pub fn set_fail_pipeline_creation(&self, fail: bool) {
        self.state.lock().fail_pipeline_creation = fail;
    }

    /// Make every subsequent submission fail, to exercise frame degradation.
    pub fn set_fail_submission(&self, fail: bool) {
        self.state.lock().fail_submission = fail;
    }
}

impl RenderBackend for HeadlessBackend {
    fn queue_family_index(&self, ty: QueueType) -> u32 {
        match ty {
            QueueType::Graphics => 0,
            QueueType::Compute => 1,
            QueueType::Transfer => 2,
        }
    }

    fn create_buffer(&self, desc: &BufferDesc, _name: &str) -> anyhow::Result<RawBuffer, RhiError> {
        let mut state = self.state.lock();
        let raw = state.allocate_raw();

        let storage = desc.memory.is_host_visible()
            .then(|| vec![0u8; desc.size].into_boxed_slice());

        state.buffers.insert(raw, HeadlessBuffer {
            desc: *desc,
            storage,
        });

        Ok(RawBuffer(raw))
    }

    fn destroy_buffer(&self, raw: RawBuffer) {
        let mut state = self.state.lock();
        if state.buffers.remove(&raw.0).is_none() {
            log::error!("Headless backend destroyed unknown buffer {:?}!", raw);
            return;
        }
        state.destroyed_buffer_count += 1;
    }

    fn map_buffer(&self, raw: RawBuffer) -> anyhow::Result<NonNull<u8>, RhiError> {
        let mut state = self.state.lock();
        let buffer = state.buffers.get_mut(&raw.0).ok_or(RhiError::BufferNotMappable)?;

        buffer.storage.as_mut()
            .map(|storage| NonNull::new(storage.as_mut_ptr()).unwrap())
            .ok_or(RhiError::BufferNotMappable)
    }

    fn unmap_buffer(&self, _raw: RawBuffer) {}

    fn create_texture(&self, desc: &TextureDesc, _name: &str) -> anyhow::Result<RawTexture, RhiError> {
        let mut state = self.state.lock();
        let raw = state.allocate_raw();
        state.textures.insert(raw, *desc);

        Ok(RawTexture(raw))
    }

    fn destroy_texture(&self, raw: RawTexture) {
        let mut state = self.state.lock();
        if state.textures.remove(&raw.0).is_none() {
            log::error!("Headless backend destroyed unknown texture {:?}!", raw);
            return;
        }
        state.views.retain(|_, texture| *texture != raw.0);
        state.destroyed_texture_count += 1;
    }

    fn create_texture_view(&self, texture: RawTexture, _desc: &TextureViewDesc) -> anyhow::Result<RawTextureView, RhiError> {
        let mut state = self.state.lock();

        if !state.textures.contains_key(&texture.0) {
            return Err(RhiError::ResourceCreate {
                kind: "texture view",
                name: format!("{:?}", texture),
            });
        }

        let raw = state.allocate_raw();
        state.views.insert(raw, texture.0);

        Ok(RawTextureView(raw))
    }

    fn create_shader_module(&self, bytecode: &[u8]) -> anyhow::Result<RawShaderModule, RhiError> {
        if bytecode.is_empty() {
            return Err(RhiError::ResourceCreate {
                kind: "shader module",
                name: "<empty bytecode>".to_owned(),
            });
        }

        let mut state = self.state.lock();
        let raw = state.allocate_raw();
        state.shader_modules.insert(raw, bytecode.len());

        Ok(RawShaderModule(raw))
    }

    fn destroy_shader_module(&self, raw: RawShaderModule) {
        self.state.lock().shader_modules.remove(&raw.0);
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> anyhow::Result<RawRenderPass, RhiError> {
        let mut state = self.state.lock();
        let raw = state.allocate_raw();
        state.render_passes.insert(raw, desc.attachment_count());

        Ok(RawRenderPass(raw))
    }

    fn destroy_render_pass(&self, raw: RawRenderPass) {
        self.state.lock().render_passes.remove(&raw.0);
    }

    fn create_framebuffer(&self, render_pass: RawRenderPass, key: &FramebufferKey) -> anyhow::Result<RawFramebuffer, RhiError> {
        let mut state = self.state.lock();

        match state.render_passes.get(&render_pass.0) {
            Some(attachment_count) => {
                debug_assert_eq!(*attachment_count, key.attachments.len());
            }
            None => {
                return Err(RhiError::ResourceCreate {
                    kind: "framebuffer",
                    name: format!("{:?}", render_pass),
                });
            }
        }

        let raw = state.allocate_raw();
        state.framebuffers.insert(raw, render_pass.0);

        Ok(RawFramebuffer(raw))
    }

    fn destroy_framebuffer(&self, raw: RawFramebuffer) {
        self.state.lock().framebuffers.remove(&raw.0);
    }

    fn create_raster_pipeline(&self, _desc: &RasterPipelineDesc, shaders: &[Arc<CompiledShader>]) -> anyhow::Result<RawPipeline, RhiError> {
        let mut state = self.state.lock();

        if state.fail_pipeline_creation {
            return Err(RhiError::ResourceCreate {
                kind: "raster pipeline",
                name: "<headless failure injection>".to_owned(),
            });
        }

        if shaders.iter().any(|shader| shader.bytecode.is_empty()) {
            return Err(RhiError::ResourceCreate {
                kind: "raster pipeline",
                name: "<empty shader bytecode>".to_owned(),
            });
        }

        let raw = state.allocate_raw();
        state.pipelines.insert(raw, ());

        Ok(RawPipeline(raw))
    }

    fn create_compute_pipeline(&self, _desc: &ComputePipelineDesc, shader: &Arc<CompiledShader>) -> anyhow::Result<RawPipeline, RhiError> {
        let mut state = self.state.lock();

        if state.fail_pipeline_creation || shader.bytecode.is_empty() {
            return Err(RhiError::ResourceCreate {
                kind: "compute pipeline",
                name: "<headless failure injection>".to_owned(),
            });
        }

        let raw = state.allocate_raw();
        state.pipelines.insert(raw, ());

        Ok(RawPipeline(raw))
    }

    fn destroy_pipeline(&self, raw: RawPipeline) {
        self.state.lock().pipelines.remove(&raw.0);
    }

    fn create_semaphore(&self) -> anyhow::Result<RawSemaphore, RhiError> {
        let mut state = self.state.lock();
        let raw = state.allocate_raw();
        state.semaphores.insert(raw, ());

        Ok(RawSemaphore(raw))
    }

    fn destroy_semaphore(&self, raw: RawSemaphore) {
        self.state.lock().semaphores.remove(&raw.0);
    }

    fn create_descriptor_pool(&self) -> anyhow::Result<RawDescriptorPool, RhiError> {
        let mut state = self.state.lock();
        let raw = state.allocate_raw();
        state.descriptor_pools.insert(raw, ());

        Ok(RawDescriptorPool(raw))
    }

    fn destroy_descriptor_pool(&self, raw: RawDescriptorPool) {
        self.state.lock().descriptor_pools.remove(&raw.0);
    }

    fn submit(
        &self,
        queue: QueueType,
        commands: Vec<RenderCommand>,
        wait_semaphores: &[RawSemaphore],
        signal_semaphores: &[RawSemaphore],
        wait_stages: &[PipelineStage],
    ) -> anyhow::Result<(), RhiError> {
        debug_assert_eq!(wait_semaphores.len(), wait_stages.len());

        let mut state = self.state.lock();

        if state.fail_submission {
            return Err(RhiError::Submission {
                reason: "headless failure injection".to_owned(),
            });
        }

        state.submissions.push(SubmittedBatch {
            queue,
            commands,
            wait_semaphores: wait_semaphores.to_vec(),
            signal_semaphores: signal_semaphores.to_vec(),
        });

        Ok(())
    }

    // the headless device executes nothing asynchronously, idle waits are immediate
    fn wait_queue_idle(&self, _queue: QueueType) {}

    fn flush_queue(&self, _queue: QueueType) {}

    fn wait_idle(&self) {}
}
