use thiserror::Error;

use crate::handle::ResourceId;
use crate::pipeline::PipelineHandle;

#[derive(Debug, Error)]
pub enum RhiError {
    #[error("Failed to create {kind} {name:?}")]
    ResourceCreate {
        kind: &'static str,
        name: String,
    },

    #[error("Shader {shader:?} is not loaded yet")]
    ShaderNotReady {
        shader: ResourceId,
    },

    #[error("Pipeline {handle:?} is not visible yet")]
    PipelineNotVisible {
        handle: PipelineHandle,
    },

    #[error("Framebuffer cache is invalid, it must be re-initialized before use!")]
    FramebufferCacheInvalid,

    #[error("Framebuffer key carries {got} attachments, but the render pass expects {expected}!")]
    FramebufferKeyMismatch {
        expected: usize,
        got: usize,
    },

    #[error("Buffer is not host visible, it can not be mapped!")]
    BufferNotMappable,

    #[error("Command queue rejected the submission: {reason}")]
    Submission {
        reason: String,
    },

    #[error("Device is lost: {reason}")]
    DeviceLost {
        reason: String,
    },
}
