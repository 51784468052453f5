use serde::{Deserialize, Serialize};

use self::AccessState::*;

/// Combined (pipeline stage, visibility) barrier class of a resource.
///
/// Every live resource carries exactly one of these across the frame; barriers
/// are derived by diffing the current state against the next declared one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessState {
    /// Undefined. No previous access, contents may be garbage.
    Nothing,

    IndirectBuffer,
    IndexBuffer,
    VertexBuffer,

    VertexShaderReadUniformBuffer,
    VertexShaderReadSampledImageOrUniformTexelBuffer,
    VertexShaderReadOther,
    FragmentShaderReadUniformBuffer,
    FragmentShaderReadSampledImageOrUniformTexelBuffer,
    FragmentShaderReadColorInputAttachment,
    FragmentShaderReadOther,
    ColorAttachmentRead,
    DepthStencilAttachmentRead,
    ComputeShaderReadUniformBuffer,
    ComputeShaderReadSampledImageOrUniformTexelBuffer,
    ComputeShaderReadOther,
    AnyShaderReadUniformBuffer,
    AnyShaderReadSampledImageOrUniformTexelBuffer,
    AnyShaderReadOther,
    TransferRead,
    HostRead,
    Present,

    VertexShaderWrite,
    FragmentShaderWrite,
    ColorAttachmentWrite,
    DepthStencilAttachmentWrite,
    DepthAttachmentWriteStencilReadOnly,
    ComputeShaderWrite,
    AnyShaderWrite,
    TransferWrite,
    HostWrite,

    ColorAttachmentReadWrite,
    General,
}

impl Default for AccessState {
    fn default() -> Self {
        Nothing
    }
}

#[inline]
pub fn is_read_only_access(access: &AccessState) -> bool {
    matches!(
        access,
        IndirectBuffer
            | IndexBuffer
            | VertexBuffer
            | VertexShaderReadUniformBuffer
            | VertexShaderReadSampledImageOrUniformTexelBuffer
            | VertexShaderReadOther
            | FragmentShaderReadUniformBuffer
            | FragmentShaderReadSampledImageOrUniformTexelBuffer
            | FragmentShaderReadColorInputAttachment
            | FragmentShaderReadOther
            | ColorAttachmentRead
            | DepthStencilAttachmentRead
            | ComputeShaderReadUniformBuffer
            | ComputeShaderReadSampledImageOrUniformTexelBuffer
            | ComputeShaderReadOther
            | AnyShaderReadUniformBuffer
            | AnyShaderReadSampledImageOrUniformTexelBuffer
            | AnyShaderReadOther
            | TransferRead
            | HostRead
            | Present
    )
}

#[inline]
pub fn is_write_access(access: &AccessState) -> bool {
    matches!(
        access,
        VertexShaderWrite
            | FragmentShaderWrite
            | ColorAttachmentWrite
            | DepthStencilAttachmentWrite
            | DepthAttachmentWriteStencilReadOnly
            | ComputeShaderWrite
            | AnyShaderWrite
            | TransferWrite
            | HostWrite
            | ColorAttachmentReadWrite
            | General
    )
}

#[inline]
pub fn is_raster_access(access: &AccessState) -> bool {
    matches!(
        access,
        ColorAttachmentRead
            | DepthStencilAttachmentRead
            | ColorAttachmentWrite
            | DepthStencilAttachmentWrite
            | DepthAttachmentWriteStencilReadOnly
            | ColorAttachmentReadWrite
    )
}

#[inline]
pub fn is_read_only_raster_access(access: &AccessState) -> bool {
    matches!(access, ColorAttachmentRead | DepthStencilAttachmentRead)
}

#[inline]
pub fn is_write_raster_access(access: &AccessState) -> bool {
    matches!(
        access,
        ColorAttachmentWrite
            | DepthStencilAttachmentWrite
            | DepthAttachmentWriteStencilReadOnly
            | ColorAttachmentReadWrite
    )
}

/// Pipeline stage a queue submission waits at, order-correlated with its wait
/// semaphores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    TopOfPipe,
    VertexInput,
    VertexShader,
    FragmentShader,
    ColorAttachmentOutput,
    ComputeShader,
    Transfer,
    BottomOfPipe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_partition() {
        // every state except the undefined one is either a read or a write
        let all = [
            IndirectBuffer, IndexBuffer, VertexBuffer,
            VertexShaderReadUniformBuffer, ColorAttachmentRead, TransferRead,
            Present, ColorAttachmentWrite, DepthStencilAttachmentWrite,
            ComputeShaderWrite, TransferWrite, ColorAttachmentReadWrite, General,
        ];

        for access in all {
            assert!(
                is_read_only_access(&access) ^ is_write_access(&access),
                "{:?} must be exactly one of read-only or write",
                access
            );
        }

        assert!(!is_read_only_access(&Nothing));
        assert!(!is_write_access(&Nothing));
    }

    #[test]
    fn raster_classification() {
        assert!(is_write_raster_access(&ColorAttachmentWrite));
        assert!(is_read_only_raster_access(&ColorAttachmentRead));
        assert!(!is_raster_access(&ComputeShaderWrite));
        assert!(!is_raster_access(&TransferRead));
    }
}
