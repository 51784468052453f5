use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::device::Device;
use crate::handle::ResourceId;
use crate::pipeline::{
    ComputePipelineDesc, ComputePipelineState, PipelineHandle, PipelineType, RasterPipelineDesc,
    RasterPipelineState,
};
use crate::shader::{CompiledShader, ShaderLoadState, ShaderResourceSystem, ShaderStage};

struct ShaderRef {
    id: ResourceId,
    path: PathBuf,
}

/// Lifecycle of a pipeline entry. The realized pipeline state exists if and
/// only if the entry is `Visible`.
enum RasterEntryState {
    Registered,
    ShadersLoading,
    ShadersLoaded,
    Visible(Arc<RasterPipelineState>),
    Failed,
}

enum ComputeEntryState {
    Registered,
    ShadersLoading,
    ShadersLoaded,
    Visible(Arc<ComputePipelineState>),
    Failed,
}

struct RasterPipelineEntry {
    handle: PipelineHandle,
    desc: RasterPipelineDesc,
    shaders: Vec<ShaderRef>,
    state: RasterEntryState,
}

impl RasterPipelineEntry {
    fn is_visible(&self) -> bool {
        matches!(self.state, RasterEntryState::Visible(_))
    }
}

struct ComputePipelineEntry {
    handle: PipelineHandle,
    desc: ComputePipelineDesc,
    shader: ShaderRef,
    state: ComputeEntryState,
}

impl ComputePipelineEntry {
    fn is_visible(&self) -> bool {
        matches!(self.state, ComputeEntryState::Visible(_))
    }
}

/// Tracks every pipeline descriptor from registration through shader loading
/// to a realized, bindable pipeline state.
///
/// All mutating operations must run on the main thread. Entries are never
/// removed before shutdown, so handle ids stay monotonic and stable.
pub struct PipelineRegistry {
    raster_entries: Vec<RasterPipelineEntry>,
    desc_to_raster_handle: HashMap<RasterPipelineDesc, PipelineHandle>,

    compute_entries: Vec<ComputePipelineEntry>,
    desc_to_compute_handle: HashMap<ComputePipelineDesc, PipelineHandle>,

    wait_to_submit: Vec<PipelineHandle>,
    wait_to_load: Vec<PipelineHandle>,
    wait_to_register: Vec<PipelineHandle>,
    retry: Vec<PipelineHandle>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self {
            raster_entries: Vec::new(),
            desc_to_raster_handle: HashMap::new(),

            compute_entries: Vec::new(),
            desc_to_compute_handle: HashMap::new(),
            wait_to_submit: Vec::new(),
            wait_to_load: Vec::new(),
            wait_to_register: Vec::new(),
            retry: Vec::new(),
        }
    }

    /// Register a raster pipeline descriptor.
    ///
    /// Deduplicates by descriptor equality: registering an equal descriptor
    /// again returns the existing handle.
    pub fn register_raster(&mut self, desc: &RasterPipelineDesc) -> PipelineHandle {
        if let Some(handle) = self.desc_to_raster_handle.get(desc) {
            return *handle;
        }

        let shaders = desc.shaders.iter()
            .map(|shader| {
                assert!(
                    shader.stage != ShaderStage::Compute,
                    "Registering a raster pipeline, but a compute shader was found!"
                );

                ShaderRef {
                    id: ResourceId::from_shader_path(&shader.source),
                    path: shader.source.clone(),
                }
            })
            .collect();

        let next_id = self.raster_entries.len() as u32 + 1;
        let handle = PipelineHandle::new(PipelineType::Raster, next_id);

        self.raster_entries.push(RasterPipelineEntry {
            handle,
            desc: desc.clone(),
            shaders,
            state: RasterEntryState::Registered,
        });
        self.desc_to_raster_handle.insert(desc.clone(), handle);

        debug_assert_eq!(self.raster_entries.len(), self.desc_to_raster_handle.len());

        self.wait_to_submit.push(handle);

        handle
    }

    pub fn register_compute(&mut self, desc: &ComputePipelineDesc) -> PipelineHandle {
        if let Some(handle) = self.desc_to_compute_handle.get(desc) {
            return *handle;
        }

        let next_id = self.compute_entries.len() as u32 + 1;
        let handle = PipelineHandle::new(PipelineType::Compute, next_id);

        self.compute_entries.push(ComputePipelineEntry {
            handle,
            desc: desc.clone(),
            shader: ShaderRef {
                id: ResourceId::from_shader_path(&desc.source),
                path: desc.source.clone(),
            },
            state: ComputeEntryState::Registered,
        });
        self.desc_to_compute_handle.insert(desc.clone(), handle);

        debug_assert_eq!(self.compute_entries.len(), self.desc_to_compute_handle.len());

        self.wait_to_submit.push(handle);

        handle
    }

    /// Pump the shader side of the state machine: issue load requests for
    /// freshly registered entries and promote entries whose shaders finished
    /// loading.
    pub fn update(&mut self, shaders: &dyn ShaderResourceSystem) {
        self.update_load_pipeline_shaders(shaders);
        self.update_loaded_pipeline_shaders(shaders);
    }

    fn update_load_pipeline_shaders(&mut self, shaders: &dyn ShaderResourceSystem) {
        for handle in std::mem::take(&mut self.wait_to_submit) {
            match handle.ty {
                PipelineType::Raster => {
                    let entry = &mut self.raster_entries[(handle.id - 1) as usize];

                    for shader in &entry.shaders {
                        shaders.load(shader.id, &shader.path, handle.id);
                    }
                    entry.state = RasterEntryState::ShadersLoading;
                }
                PipelineType::Compute => {
                    let entry = &mut self.compute_entries[(handle.id - 1) as usize];

                    shaders.load(entry.shader.id, &entry.shader.path, handle.id);
                    entry.state = ComputeEntryState::ShadersLoading;
                }
            }

            self.wait_to_load.push(handle);
        }
    }

    fn update_loaded_pipeline_shaders(&mut self, shaders: &dyn ShaderResourceSystem) {
        let mut still_loading = Vec::new();

        for handle in std::mem::take(&mut self.wait_to_load) {
            let shader_states = match handle.ty {
                PipelineType::Raster => {
                    let entry = &self.raster_entries[(handle.id - 1) as usize];
                    entry.shaders.iter().map(|s| shaders.state(s.id)).collect::<Vec<_>>()
                }
                PipelineType::Compute => {
                    let entry = &self.compute_entries[(handle.id - 1) as usize];
                    vec![shaders.state(entry.shader.id)]
                }
            };

            if shader_states.iter().any(|state| state.has_failed()) {
                log::error!("Pipeline {:?} failed: one of its shaders failed to load!", handle);
                match handle.ty {
                    PipelineType::Raster => {
                        self.raster_entries[(handle.id - 1) as usize].state = RasterEntryState::Failed;
                    }
                    PipelineType::Compute => {
                        self.compute_entries[(handle.id - 1) as usize].state = ComputeEntryState::Failed;
                    }
                }
            } else if shader_states.iter().all(|state| state.is_loaded()) {
                match handle.ty {
                    PipelineType::Raster => {
                        self.raster_entries[(handle.id - 1) as usize].state = RasterEntryState::ShadersLoaded;
                    }
                    PipelineType::Compute => {
                        self.compute_entries[(handle.id - 1) as usize].state = ComputeEntryState::ShadersLoaded;
                    }
                }
                self.wait_to_register.push(handle);
            } else {
                still_loading.push(handle);
            }
        }

        self.wait_to_load = still_loading;
    }

    /// Try to realize device pipeline states for every entry whose shaders
    /// are loaded. Failed creations are parked on the retry queue and picked
    /// up again next call. Returns `false` iff any creation failed.
    pub fn update_pipelines(&mut self, device: &Device, shaders: &dyn ShaderResourceSystem) -> bool {
        let mut has_failure = false;

        for handle in std::mem::take(&mut self.wait_to_register) {
            match handle.ty {
                PipelineType::Raster => {
                    // double check in case the entry was unloaded in between
                    if !matches!(self.raster_entries[(handle.id - 1) as usize].state, RasterEntryState::ShadersLoaded) {
                        continue;
                    }

                    if !self.try_create_raster_pipeline_state(handle, device, shaders) {
                        self.retry.push(handle);
                        has_failure = true;
                    }
                }
                PipelineType::Compute => {
                    if !matches!(self.compute_entries[(handle.id - 1) as usize].state, ComputeEntryState::ShadersLoaded) {
                        continue;
                    }

                    if !self.try_create_compute_pipeline_state(handle, device, shaders) {
                        self.retry.push(handle);
                        has_failure = true;
                    }
                }
            }
        }

        std::mem::swap(&mut self.wait_to_register, &mut self.retry);

        !has_failure
    }

    fn try_create_raster_pipeline_state(
        &mut self,
        handle: PipelineHandle,
        device: &Device,
        shaders: &dyn ShaderResourceSystem,
    ) -> bool {
        let entry = &mut self.raster_entries[(handle.id - 1) as usize];
        debug_assert!(!entry.is_visible());

        let mut compiled: Vec<Arc<CompiledShader>> = Vec::with_capacity(entry.shaders.len());
        for shader in &entry.shaders {
            match shaders.state(shader.id) {
                ShaderLoadState::Loaded(artifact) => compiled.push(artifact),
                _ => return false,
            }
        }

        match device.create_raster_pipeline(entry.desc.clone(), &compiled) {
            Ok(state) => {
                entry.state = RasterEntryState::Visible(Arc::new(state));
                log::debug!("[{}] raster pipeline visible.", handle.id);
                true
            }
            Err(err) => {
                log::warn!("Failed to create raster pipeline {:?}: {}", handle, err);
                false
            }
        }
    }

    fn try_create_compute_pipeline_state(
        &mut self,
        handle: PipelineHandle,
        device: &Device,
        shaders: &dyn ShaderResourceSystem,
    ) -> bool {
        let entry = &mut self.compute_entries[(handle.id - 1) as usize];
        debug_assert!(!entry.is_visible());

        let compiled = match shaders.state(entry.shader.id) {
            ShaderLoadState::Loaded(artifact) => artifact,
            _ => return false,
        };

        match device.create_compute_pipeline(entry.desc.clone(), &compiled) {
            Ok(state) => {
                entry.state = ComputeEntryState::Visible(Arc::new(state));
                log::debug!("[{}] compute pipeline visible.", handle.id);
                true
            }
            Err(err) => {
                log::warn!("Failed to create compute pipeline {:?}: {}", handle, err);
                false
            }
        }
    }

    /// Destroy every realized pipeline state, keeping the entry metadata so
    /// shader unloading can still run afterwards.
    pub fn destroy_all(&mut self, device: &Device) {
        for entry in &mut self.raster_entries {
            if let RasterEntryState::Visible(state) =
                std::mem::replace(&mut entry.state, RasterEntryState::ShadersLoaded)
            {
                device.destroy_raster_pipeline(&state);
            }
        }

        for entry in &mut self.compute_entries {
            if let ComputeEntryState::Visible(state) =
                std::mem::replace(&mut entry.state, ComputeEntryState::ShadersLoaded)
            {
                device.destroy_compute_pipeline(&state);
            }
        }
    }

    pub fn is_pipeline_ready(&self, handle: PipelineHandle) -> bool {
        if !handle.is_valid() {
            return false;
        }

        match handle.ty {
            PipelineType::Raster => self.raster_entries
                .get((handle.id - 1) as usize)
                .map(|entry| entry.is_visible())
                .unwrap_or(false),
            PipelineType::Compute => self.compute_entries
                .get((handle.id - 1) as usize)
                .map(|entry| entry.is_visible())
                .unwrap_or(false),
        }
    }

    pub fn get_raster_pipeline(&self, handle: PipelineHandle) -> Option<Arc<RasterPipelineState>> {
        if !handle.is_valid() || handle.ty != PipelineType::Raster {
            return None;
        }

        self.raster_entries.get((handle.id - 1) as usize)
            .and_then(|entry| match &entry.state {
                RasterEntryState::Visible(state) => Some(state.clone()),
                _ => None,
            })
    }

    pub fn get_compute_pipeline(&self, handle: PipelineHandle) -> Option<Arc<ComputePipelineState>> {
        if !handle.is_valid() || handle.ty != PipelineType::Compute {
            return None;
        }

        self.compute_entries.get((handle.id - 1) as usize)
            .and_then(|entry| match &entry.state {
                ComputeEntryState::Visible(state) => Some(state.clone()),
                _ => None,
            })
    }

    pub fn raster_entry_count(&self) -> usize {
        self.raster_entries.len()
    }

    pub fn raster_handle_count(&self) -> usize {
        self.desc_to_raster_handle.len()
    }

    /// Release every shader reference and forget all entries.
    ///
    /// `destroy_all` must have been called before.
    pub fn shutdown(&mut self, shaders: &dyn ShaderResourceSystem) {
        debug_assert_eq!(self.raster_entries.len(), self.desc_to_raster_handle.len());

        for entry in &self.raster_entries {
            assert!(
                !entry.is_visible(),
                "Pipeline states not cleared up. Did you forget to call destroy_all()?"
            );

            for shader in &entry.shaders {
                shaders.unload(shader.id, entry.handle.id);
            }
        }

        for entry in &self.compute_entries {
            assert!(
                !entry.is_visible(),
                "Pipeline states not cleared up. Did you forget to call destroy_all()?"
            );

            shaders.unload(entry.shader.id, entry.handle.id);
        }

        self.raster_entries.clear();
        self.desc_to_raster_handle.clear();
        self.compute_entries.clear();
        self.desc_to_compute_handle.clear();

        self.wait_to_submit.clear();
        self.wait_to_load.clear();
        self.wait_to_register.clear();
        self.retry.clear();
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
