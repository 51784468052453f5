use std::collections::HashMap;
use std::sync::Arc;

use kestrel_rhi::{Buffer, BufferDesc, Device, RhiError, Texture, TextureDesc};

/// Recycles the render graph's per-frame resources and owns its named
/// persistent ones.
///
/// Pooled resources are keyed by their full descriptor: a transient declared
/// with the same descriptor next frame gets the same underlying resource
/// back. Named resources live under a stable string and are replaced (through
/// the deferred-release queue) when their descriptor changes.
pub struct TransientResourceCache {
    buffers: HashMap<BufferDesc, Vec<Buffer>>,
    textures: HashMap<TextureDesc, Vec<Texture>>,

    named_buffers: HashMap<String, Arc<Buffer>>,
    named_textures: HashMap<String, Arc<Texture>>,
}

impl TransientResourceCache {
    pub fn new() -> Self {
        Self {
            buffers: Default::default(),
            textures: Default::default(),

            named_buffers: Default::default(),
            named_textures: Default::default(),
        }
    }

    /// Pop a pooled buffer matching `desc`. `None` means the caller must
    /// create a fresh one through the device.
    pub fn fetch_buffer(&mut self, desc: &BufferDesc) -> Option<Buffer> {
        self.buffers.get_mut(desc).and_then(|buffers| buffers.pop())
    }

    pub fn fetch_texture(&mut self, desc: &TextureDesc) -> Option<Texture> {
        self.textures.get_mut(desc).and_then(|textures| textures.pop())
    }

    /// Give a buffer back to the pool, keyed by its own descriptor. Cheap and
    /// never fails.
    pub fn restore_buffer(&mut self, buffer: Buffer) {
        self.buffers.entry(buffer.desc).or_default().push(buffer);
    }

    pub fn restore_texture(&mut self, texture: Texture) {
        self.textures.entry(texture.desc).or_default().push(texture);
    }

    pub fn get_or_create_named_buffer(
        &mut self,
        name: &str,
        device: &Device,
        desc: &BufferDesc,
    ) -> anyhow::Result<Arc<Buffer>, RhiError> {
        if let Some(buffer) = self.named_buffers.get(name) {
            return Ok(buffer.clone());
        }

        let buffer = Arc::new(device.create_buffer(*desc, name)?);
        self.named_buffers.insert(name.to_owned(), buffer.clone());

        Ok(buffer)
    }

    pub fn get_or_create_named_texture(
        &mut self,
        name: &str,
        device: &Device,
        desc: &TextureDesc,
    ) -> anyhow::Result<Arc<Texture>, RhiError> {
        if let Some(texture) = self.named_textures.get(name) {
            return Ok(texture.clone());
        }

        let texture = Arc::new(device.create_texture(*desc, name)?);
        self.named_textures.insert(name.to_owned(), texture.clone());

        Ok(texture)
    }

    /// Replace a named buffer whose descriptor went stale.
    ///
    /// The old buffer is routed through the deferred-release queue (the GPU
    /// may still be reading it) and a fresh one is created immediately.
    /// Returns whether a replacement happened.
    pub fn update_dirty_named_buffer(
        &mut self,
        name: &str,
        device: &Device,
        desc: &BufferDesc,
    ) -> anyhow::Result<bool, RhiError> {
        let stale = match self.named_buffers.get(name) {
            Some(buffer) if buffer.desc != *desc => self.named_buffers.remove(name).unwrap(),
            _ => return Ok(false),
        };

        device.defer_release(stale);

        let buffer = Arc::new(device.create_buffer(*desc, name)?);
        self.named_buffers.insert(name.to_owned(), buffer);

        Ok(true)
    }

    pub fn update_dirty_named_texture(
        &mut self,
        name: &str,
        device: &Device,
        desc: &TextureDesc,
    ) -> anyhow::Result<bool, RhiError> {
        let stale = match self.named_textures.get(name) {
            Some(texture) if texture.desc != *desc => self.named_textures.remove(name).unwrap(),
            _ => return Ok(false),
        };

        device.defer_release(stale);

        let texture = Arc::new(device.create_texture(*desc, name)?);
        self.named_textures.insert(name.to_owned(), texture);

        Ok(true)
    }

    /// Destroy every pooled and named resource. Called at graph teardown with
    /// an idle device.
    pub fn destroy_all(&mut self, device: &Device) {
        for (_, buffers) in self.buffers.drain() {
            for buffer in buffers {
                device.destroy_buffer(buffer);
            }
        }

        for (_, textures) in self.textures.drain() {
            for texture in textures {
                device.destroy_texture(texture);
            }
        }

        // an outside holder may still keep a named resource alive; route it
        // through the deferred-release queue so it dies with the last
        // reference instead of leaking
        for (_, buffer) in self.named_buffers.drain() {
            match Arc::try_unwrap(buffer) {
                Ok(buffer) => device.destroy_buffer(buffer),
                Err(buffer) => device.defer_release(buffer),
            }
        }

        for (_, texture) in self.named_textures.drain() {
            match Arc::try_unwrap(texture) {
                Ok(texture) => device.destroy_texture(texture),
                Err(texture) => device.defer_release(texture),
            }
        }
    }
}

impl Default for TransientResourceCache {
    fn default() -> Self {
        Self::new()
    }
}
