use crate::access::AccessState;
use crate::buffer::Buffer;
use crate::command::{CommandBuffer, RenderCommand};
use crate::texture::Texture;

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct TextureBarrier<'a> {
    pub texture: &'a Texture,
    pub prev_access: AccessState,
    pub next_access: AccessState,
    #[builder(default = "false")]
    pub discard_contents: bool,
}

impl<'a> TextureBarrier<'a> {
    pub fn builder() -> TextureBarrierBuilder<'a> {
        Default::default()
    }
}

pub fn texture_barrier(cb: &mut CommandBuffer, barriers: &[TextureBarrier]) {
    for barrier in barriers {
        cb.push(RenderCommand::TextureBarrier {
            texture: barrier.texture.raw,
            prev_access: barrier.prev_access,
            next_access: barrier.next_access,
            discard_contents: barrier.discard_contents,
        });
    }
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct BufferBarrier<'a> {
    pub buffer: &'a Buffer,
    pub prev_access: AccessState,
    pub next_access: AccessState,
}

impl<'a> BufferBarrier<'a> {
    pub fn builder() -> BufferBarrierBuilder<'a> {
        Default::default()
    }
}

pub fn buffer_barrier(cb: &mut CommandBuffer, barriers: &[BufferBarrier]) {
    for barrier in barriers {
        cb.push(RenderCommand::BufferBarrier {
            buffer: barrier.buffer.raw,
            prev_access: barrier.prev_access,
            next_access: barrier.next_access,
        });
    }
}
