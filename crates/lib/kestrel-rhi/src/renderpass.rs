use std::collections::HashMap;
use std::sync::Arc;

use arrayvec::ArrayVec;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::{RawFramebuffer, RawRenderPass, RawTextureView};
use crate::device::Device;
use crate::error::RhiError;
use crate::format::{PixelFormat, SampleCount};

// A render pass decides how to draw at a given range of time, a framebuffer
// decides what to draw on. The framebuffer cache key only carries the data
// the render pass itself does not know: the concrete attachment views and
// the extent.

pub const MAX_RENDER_PASS_ATTACHMENTS: usize = 8;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentLoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentStoreOp {
    Store,
    DontCare,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPassAttachmentDesc {
    pub format: PixelFormat,
    pub samples: SampleCount,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
    pub stencil_load_op: AttachmentLoadOp,
    pub stencil_store_op: AttachmentStoreOp,
}

impl RenderPassAttachmentDesc {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            samples: SampleCount::X1,
            load_op: AttachmentLoadOp::Load,
            store_op: AttachmentStoreOp::Store,
            stencil_load_op: AttachmentLoadOp::DontCare,
            stencil_store_op: AttachmentStoreOp::DontCare,
        }
    }

    pub fn useless_input(mut self) -> Self {
        self.load_op = AttachmentLoadOp::DontCare;
        self
    }

    pub fn clear_input(mut self) -> Self {
        self.load_op = AttachmentLoadOp::Clear;
        self
    }

    pub fn discard_output(mut self) -> Self {
        self.store_op = AttachmentStoreOp::DontCare;
        self
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct RenderPassDesc {
    pub color_attachments: ArrayVec<RenderPassAttachmentDesc, MAX_RENDER_PASS_ATTACHMENTS>,
    // a render pass may NOT have a depth attachment
    pub depth_attachment: Option<RenderPassAttachmentDesc>,
}

impl RenderPassDesc {
    pub fn new(color_attachments: &[RenderPassAttachmentDesc], depth_attachment: Option<RenderPassAttachmentDesc>) -> Self {
        let mut colors = ArrayVec::new();
        colors.try_extend_from_slice(color_attachments)
            .expect("Too many render pass color attachments!");

        Self {
            color_attachments: colors,
            depth_attachment,
        }
    }

    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len() + self.depth_attachment.iter().count()
    }
}

/// Identity of a framebuffer: the concrete attachment views in declaration
/// order plus the render extent.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FramebufferKey {
    pub extent: [u32; 2],
    pub attachments: ArrayVec<RawTextureView, { MAX_RENDER_PASS_ATTACHMENTS + 1 }>,
}

impl FramebufferKey {
    pub fn new(
        extent: [u32; 2],
        color_attachments: impl Iterator<Item = RawTextureView>,
        depth_attachment: Option<RawTextureView>,
    ) -> Self {
        let attachments = color_attachments
            .chain(depth_attachment.into_iter())
            .collect();

        Self {
            extent,
            attachments,
        }
    }
}

/// Memoizes framebuffers per render pass.
///
/// After `clear_up()` the cache is invalid and every `get_or_create()` fails
/// until it is re-initialized with a render pass.
pub struct FramebufferCache {
    cache: Mutex<Option<HashMap<FramebufferKey, RawFramebuffer>>>,
    render_pass: RawRenderPass,
    attachment_count: usize,
    color_attachment_count: usize,
}

impl FramebufferCache {
    pub fn new(render_pass: RawRenderPass, desc: &RenderPassDesc) -> Self {
        Self {
            cache: Mutex::new(Some(HashMap::new())),
            render_pass,
            attachment_count: desc.attachment_count(),
            color_attachment_count: desc.color_attachments.len(),
        }
    }

    pub fn color_attachment_count(&self) -> usize {
        self.color_attachment_count
    }

    pub fn get_or_create(&self, device: &Device, key: FramebufferKey) -> anyhow::Result<RawFramebuffer, RhiError> {
        let mut guard = self.cache.lock();
        let cache = guard.as_mut().ok_or(RhiError::FramebufferCacheInvalid)?;

        if key.attachments.len() != self.attachment_count {
            return Err(RhiError::FramebufferKeyMismatch {
                expected: self.attachment_count,
                got: key.attachments.len(),
            });
        }

        if let Some(framebuffer) = cache.get(&key) {
            return Ok(*framebuffer);
        }

        let framebuffer = device.backend().create_framebuffer(self.render_pass, &key)?;
        cache.insert(key, framebuffer);

        Ok(framebuffer)
    }

    /// Destroy every cached framebuffer and invalidate the cache.
    pub fn clear_up(&self, device: &Device) {
        let mut guard = self.cache.lock();

        if let Some(cache) = guard.take() {
            for (_, framebuffer) in cache {
                device.backend().destroy_framebuffer(framebuffer);
            }
        }
    }
}

pub struct RenderPass {
    pub raw: RawRenderPass,
    pub desc: RenderPassDesc,
    pub framebuffer_cache: FramebufferCache,
}

// implement render pass associated functions for device
impl Device {
    pub fn create_render_pass(&self, desc: RenderPassDesc) -> anyhow::Result<Arc<RenderPass>, RhiError> {
        assert!(
            !desc.color_attachments.is_empty() || desc.depth_attachment.is_some(),
            "Render pass must have at least one attachment!"
        );

        let raw = self.backend().create_render_pass(&desc)?;

        Ok(Arc::new(RenderPass {
            raw,
            framebuffer_cache: FramebufferCache::new(raw, &desc),
            desc,
        }))
    }

    /// Shut down a render pass: its cached framebuffers are destroyed with it.
    pub fn destroy_render_pass(&self, render_pass: &RenderPass) {
        render_pass.framebuffer_cache.clear_up(self);
        self.backend().destroy_render_pass(render_pass.raw);
    }
}
