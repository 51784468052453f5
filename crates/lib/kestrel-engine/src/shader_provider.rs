use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use kestrel_rhi::{
    CompiledShader, ResourceId, ShaderLoadState, ShaderReflection, ShaderResourceSystem,
};

struct FileShaderEntry {
    state: ShaderLoadState,
    requesters: Vec<u32>,
}

/// File-backed shader provider.
///
/// Shader bytecode and its optional `<artifact>.refl` reflection manifest are
/// read off-thread; completions surface on the next `update()` pump from the
/// main thread.
pub struct FileShaderSystem {
    root: PathBuf,
    entries: Mutex<HashMap<ResourceId, FileShaderEntry>>,
    completed: Arc<Mutex<Vec<(ResourceId, anyhow::Result<CompiledShader>)>>>,
}

impl FileShaderSystem {
    /// `root` is the directory shader artifact paths are resolved against.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(HashMap::new()),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn load_shader_artifact(path: PathBuf) -> anyhow::Result<CompiledShader> {
    let bytecode = {
        let path = path.clone();
        smol::unblock(move || std::fs::read(path)).await?
    };

    let manifest_path = {
        let mut os = path.clone().into_os_string();
        os.push(".refl");
        PathBuf::from(os)
    };

    let reflection = match smol::unblock(move || std::fs::read_to_string(manifest_path)).await {
        Ok(manifest) => serde_json::from_str::<ShaderReflection>(&manifest)?,
        // a shader without bindings ships no manifest
        Err(_) => ShaderReflection::default(),
    };

    Ok(CompiledShader {
        path,
        bytecode: bytecode.into(),
        reflection,
    })
}

impl ShaderResourceSystem for FileShaderSystem {
    fn load(&self, shader: ResourceId, path: &Path, requester: u32) {
        let mut entries = self.entries.lock();

        let entry = entries.entry(shader).or_insert_with(|| FileShaderEntry {
            state: ShaderLoadState::Unloaded,
            requesters: Vec::new(),
        });

        if !entry.requesters.contains(&requester) {
            entry.requesters.push(requester);
        }

        if !matches!(entry.state, ShaderLoadState::Unloaded) {
            return;
        }
        entry.state = ShaderLoadState::Loading;

        let full_path = self.root.join(path);
        let completed = self.completed.clone();

        smol::spawn(async move {
            let result = load_shader_artifact(full_path).await;
            completed.lock().push((shader, result));
        })
        .detach();
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
        let completions = {
            let mut completed = self.completed.lock();
            std::mem::take(&mut *completed)
        };

        if completions.is_empty() {
            return;
        }

        let mut entries = self.entries.lock();
        for (shader, result) in completions {
            let entry = match entries.get_mut(&shader) {
                Some(entry) => entry,
                // unloaded while the read was in flight
                None => continue,
            };

            // a late completion for an entry that went back to unloaded is dropped
            if !matches!(entry.state, ShaderLoadState::Loading) {
                continue;
            }

            entry.state = match result {
                Ok(artifact) => ShaderLoadState::Loaded(Arc::new(artifact)),
                Err(err) => {
                    log::error!("Shader {:?} failed to load: {}", shader, err);
                    ShaderLoadState::Failed
                }
            };
        }
    }

    fn is_busy(&self) -> bool {
        self.entries.lock()
            .values()
            .any(|entry| matches!(entry.state, ShaderLoadState::Loading))
    }
}
