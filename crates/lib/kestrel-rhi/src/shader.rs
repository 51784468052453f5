use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::RawShaderModule;
use crate::device::Device;
use crate::error::RhiError;
use crate::handle::ResourceId;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

bitflags::bitflags! {
    /// Shader stage visibility mask of a descriptor binding.
    #[derive(Serialize, Deserialize)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX  = 0b001;
        const PIXEL   = 0b010;
        const COMPUTE = 0b100;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Pixel => ShaderStageFlags::PIXEL,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
}

/// One descriptor binding enumerated by a shader's reflection manifest.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShaderBindingDesc {
    pub set: u32,
    pub binding: u32,
    pub ty: DescriptorType,
    pub count: u32,
    pub visibility: ShaderStageFlags,
}

/// Reflection manifest shipped alongside compiled shader bytecode.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShaderReflection {
    pub bindings: Vec<ShaderBindingDesc>,
}

/// A compiled shader artifact: bytecode blob plus its reflection manifest.
pub struct CompiledShader {
    pub path: PathBuf,
    pub bytecode: Bytes,
    pub reflection: ShaderReflection,
}

// implement shader associated functions for device
impl Device {
    pub fn create_shader_module(&self, shader: &CompiledShader) -> anyhow::Result<RawShaderModule, RhiError> {
        self.backend().create_shader_module(&shader.bytecode)
    }

    pub fn destroy_shader_module(&self, module: RawShaderModule) {
        self.backend().destroy_shader_module(module);
    }
}

#[derive(Clone)]
pub enum ShaderLoadState {
    Unloaded,
    Loading,
    Loaded(Arc<CompiledShader>),
    Failed,
}

impl ShaderLoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ShaderLoadState::Loaded(_))
    }

    pub fn has_failed(&self) -> bool {
        matches!(self, ShaderLoadState::Failed)
    }
}

/// The shader half of the external resource system.
///
/// Load requests are tagged with a requester id (the pipeline handle id) so
/// the provider can track who is keeping a shader alive. `update()` must be
/// pumped from the main thread to observe state transitions.
pub trait ShaderResourceSystem: Send + Sync {
    fn load(&self, shader: ResourceId, path: &Path, requester: u32);
    fn unload(&self, shader: ResourceId, requester: u32);
    fn state(&self, shader: ResourceId) -> ShaderLoadState;
    fn update(&self);
    fn is_busy(&self) -> bool;
}

struct MemoryShaderEntry {
    artifact: Option<Arc<CompiledShader>>,
    state: ShaderLoadState,
    requesters: Vec<u32>,
}

/// In-memory shader provider.
///
/// Shaders are registered up front as byte blobs; a load request parks the
/// entry in `Loading` until the next `update()` pump, which mirrors the
/// one-frame latency of the real file-backed provider.
#[derive(Default)]
pub struct MemoryShaderSystem {
    entries: Mutex<HashMap<ResourceId, MemoryShaderEntry>>,
}

impl MemoryShaderSystem {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register shader bytecode under its artifact path. Returns the shader
    /// resource id that pipeline descriptors will refer to.
    pub fn add_shader(&self, path: impl Into<PathBuf>, bytecode: impl Into<Bytes>, reflection: ShaderReflection) -> ResourceId {
        let path = path.into();
        let id = ResourceId::from_shader_path(&path);

        self.entries.lock().insert(id, MemoryShaderEntry {
            artifact: Some(Arc::new(CompiledShader {
                path,
                bytecode: bytecode.into(),
                reflection,
            })),
            state: ShaderLoadState::Unloaded,
            requesters: Vec::new(),
        });

        id
    }

    pub fn contains(&self, shader: ResourceId) -> bool {
        self.entries.lock().contains_key(&shader)
    }
}

impl ShaderResourceSystem for MemoryShaderSystem {
    fn load(&self, shader: ResourceId, path: &Path, requester: u32) {
        let mut entries = self.entries.lock();

        let entry = entries.entry(shader).or_insert_with(|| MemoryShaderEntry {
            artifact: None,
            state: ShaderLoadState::Unloaded,
            requesters: Vec::new(),
        });

        if !entry.requesters.contains(&requester) {
            entry.requesters.push(requester);
        }

        match entry.state {
            ShaderLoadState::Unloaded => {
                if entry.artifact.is_none() {
                    log::warn!("Shader artifact {:?} ({:?}) is not registered!", path, shader);
                    entry.state = ShaderLoadState::Failed;
                } else {
                    entry.state = ShaderLoadState::Loading;
                }
            }
            // already loading, loaded or failed, nothing to do
            _ => {}
        }
    }

    fn unload(&self, shader: ResourceId, requester: u32) {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&shader) {
            entry.requesters.retain(|r| *r != requester);

            if entry.requesters.is_empty() {
                entry.state = ShaderLoadState::Unloaded;
            }
        }
    }

    fn state(&self, shader: ResourceId) -> ShaderLoadState {
        self.entries.lock()
            .get(&shader)
            .map(|entry| entry.state.clone())
            .unwrap_or(ShaderLoadState::Unloaded)
    }

    fn update(&self) {
        let mut entries = self.entries.lock();

        for entry in entries.values_mut() {
            if matches!(entry.state, ShaderLoadState::Loading) {
                entry.state = match &entry.artifact {
                    Some(artifact) => ShaderLoadState::Loaded(artifact.clone()),
                    None => ShaderLoadState::Failed,
                };
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.entries.lock()
            .values()
            .any(|entry| matches!(entry.state, ShaderLoadState::Loading))
    }
}
