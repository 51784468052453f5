use std::thread::ThreadId;

use crate::access::AccessState;
use crate::backend::{
    RawBuffer, RawFramebuffer, RawPipeline, RawRenderPass, RawTexture, RawTextureView,
};
use crate::buffer::Buffer;
use crate::pipeline::{ComputePipelineState, RasterPipelineState};
use crate::queue::QueueType;
use crate::renderpass::RenderPass;

/// Binding of one descriptor slot inside a descriptor set.
#[derive(Clone, Debug)]
pub enum DescriptorSetBinding {
    Texture {
        view: RawTextureView,
    },
    TextureArray {
        views: Vec<RawTextureView>,
    },
    Buffer {
        buffer: RawBuffer,
    },
}

/// A recorded rendering command.
///
/// Command buffers record a typed command stream; the backend replays it at
/// submit time. This keeps the render graph free of per-draw virtual dispatch.
#[derive(Clone, Debug)]
pub enum RenderCommand {
    BeginRenderPass {
        render_pass: RawRenderPass,
        framebuffer: RawFramebuffer,
        extent: [u32; 2],
    },
    EndRenderPass,
    SetViewport {
        extent: [u32; 2],
    },
    SetScissor {
        extent: [u32; 2],
    },
    BindRasterPipeline {
        pipeline: RawPipeline,
    },
    BindComputePipeline {
        pipeline: RawPipeline,
    },
    BindDescriptorSet {
        set_index: u32,
        bindings: Vec<DescriptorSetBinding>,
    },
    BindVertexBuffer {
        buffer: RawBuffer,
        binding: u32,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: RawBuffer,
        offset: u64,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    CopyBuffer {
        src: RawBuffer,
        dst: RawBuffer,
        size: u64,
    },
    TextureBarrier {
        texture: RawTexture,
        prev_access: AccessState,
        next_access: AccessState,
        discard_contents: bool,
    },
    BufferBarrier {
        buffer: RawBuffer,
        prev_access: AccessState,
        next_access: AccessState,
    },
}

/// Command buffer pool bound to one queue family and one thread.
///
/// Pools are thread-affine: the creating thread is recorded and every
/// operation from another thread is a programmer error.
pub struct CommandPool {
    queue_type: QueueType,
    queue_family_index: u32,
    thread_id: ThreadId,
}

impl CommandPool {
    pub fn new(queue_type: QueueType, queue_family_index: u32) -> Self {
        Self {
            queue_type,
            queue_family_index,
            thread_id: std::thread::current().id(),
        }
    }

    pub fn allocate(&self) -> CommandBuffer {
        self.assert_owning_thread();

        CommandBuffer {
            queue_type: self.queue_type,
            queue_family_index: self.queue_family_index,
            commands: Vec::new(),
            is_recording: false,
        }
    }

    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    #[inline]
    fn assert_owning_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.thread_id,
            "Command pool used from a thread other than its creator!"
        );
    }
}

pub struct CommandBuffer {
    queue_type: QueueType,
    queue_family_index: u32,
    pub(crate) commands: Vec<RenderCommand>,
    is_recording: bool,
}

impl CommandBuffer {
    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn begin(&mut self) {
        debug_assert!(!self.is_recording, "Command buffer already recording!");
        self.commands.clear();
        self.is_recording = true;
    }

    pub fn end(&mut self) {
        debug_assert!(self.is_recording, "Command buffer is not recording!");
        self.is_recording = false;
    }

    pub fn reset(&mut self) {
        self.commands.clear();
        self.is_recording = false;
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    #[inline]
    pub(crate) fn push(&mut self, command: RenderCommand) {
        debug_assert!(self.is_recording, "Recording into a command buffer outside begin/end!");
        self.commands.push(command);
    }

    pub fn begin_render_pass(&mut self, render_pass: &RenderPass, framebuffer: RawFramebuffer, extent: [u32; 2]) {
        self.push(RenderCommand::BeginRenderPass {
            render_pass: render_pass.raw,
            framebuffer,
            extent,
        });
    }

    pub fn end_render_pass(&mut self) {
        self.push(RenderCommand::EndRenderPass);
    }

    pub fn set_viewport(&mut self, extent: [u32; 2]) {
        self.push(RenderCommand::SetViewport { extent });
    }

    pub fn set_scissor(&mut self, extent: [u32; 2]) {
        self.push(RenderCommand::SetScissor { extent });
    }

    pub fn bind_raster_pipeline(&mut self, pipeline: &RasterPipelineState) {
        self.push(RenderCommand::BindRasterPipeline {
            pipeline: pipeline.raw,
        });
    }

    pub fn bind_compute_pipeline(&mut self, pipeline: &ComputePipelineState) {
        self.push(RenderCommand::BindComputePipeline {
            pipeline: pipeline.raw,
        });
    }

    pub fn bind_descriptor_set(&mut self, set_index: u32, bindings: Vec<DescriptorSetBinding>) {
        self.push(RenderCommand::BindDescriptorSet {
            set_index,
            bindings,
        });
    }

    pub fn bind_vertex_buffer(&mut self, buffer: &Buffer, binding: u32, offset: u64) {
        self.push(RenderCommand::BindVertexBuffer {
            buffer: buffer.raw,
            binding,
            offset,
        });
    }

    pub fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64) {
        self.push(RenderCommand::BindIndexBuffer {
            buffer: buffer.raw,
            offset,
        });
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32) {
        self.push(RenderCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
        });
    }

    pub fn dispatch(&mut self, group_count: [u32; 3]) {
        self.push(RenderCommand::Dispatch { group_count });
    }

    pub fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, size: u64) {
        self.push(RenderCommand::CopyBuffer {
            src: src.raw,
            dst: dst.raw,
            size,
        });
    }
}
