#[macro_use]
extern crate derive_builder;

pub mod access;
pub mod backend;
pub mod barrier;
pub mod buffer;
pub mod command;
pub mod defer_release;
pub mod device;
pub mod error;
pub mod format;
pub mod handle;
pub mod pipeline;
pub mod pipeline_registry;
pub mod queue;
pub mod renderpass;
pub mod semaphore;
pub mod shader;
pub mod texture;

pub use access::{AccessState, PipelineStage};
pub use buffer::{Buffer, BufferDesc, BufferUsageFlags, MemoryFlags, MemoryLocation};
pub use command::{CommandBuffer, CommandPool, DescriptorSetBinding, RenderCommand};
pub use device::{Device, NUM_DEVICE_FRAMES};
pub use error::RhiError;
pub use format::{PixelFormat, SampleCount};
pub use handle::{ResourceId, ResourceTag};
pub use pipeline::{
    BlendFactor, BlendOp, BlendState, ComputePipelineDesc, ComputePipelineState, CullMode,
    FillMode, FrontFace, PipelineHandle, PipelineShaderDesc, PipelineType, PrimitiveTopology,
    RasterPipelineDesc, RasterPipelineState, RasterState, VertexAttribute, VertexLayout,
};
pub use pipeline_registry::PipelineRegistry;
pub use queue::{CommandQueue, QueueType};
pub use renderpass::{
    AttachmentLoadOp, AttachmentStoreOp, FramebufferKey, RenderPass, RenderPassAttachmentDesc,
    RenderPassDesc, MAX_RENDER_PASS_ATTACHMENTS,
};
pub use semaphore::Semaphore;
pub use shader::{
    CompiledShader, DescriptorType, MemoryShaderSystem, ShaderBindingDesc, ShaderLoadState,
    ShaderReflection, ShaderResourceSystem, ShaderStage, ShaderStageFlags,
};
pub use texture::{
    Texture, TextureCreateFlags, TextureDesc, TextureTiling, TextureType, TextureUsageFlags,
    TextureViewDesc,
};
