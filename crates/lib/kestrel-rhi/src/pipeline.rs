use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::RawPipeline;
use crate::device::Device;
use crate::error::RhiError;
use crate::format::PixelFormat;
use crate::renderpass::RenderPassDesc;
use crate::shader::{CompiledShader, ShaderBindingDesc, ShaderStage};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum PipelineType {
    Raster,
    Compute,
}

/// Handle into the pipeline registry. The zero id is invalid; valid ids are
/// allocated monotonically starting at 1.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct PipelineHandle {
    pub ty: PipelineType,
    pub id: u32,
}

impl PipelineHandle {
    pub fn new(ty: PipelineType, id: u32) -> Self {
        Self { ty, id }
    }

    pub fn invalid(ty: PipelineType) -> Self {
        Self { ty, id: 0 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct RasterState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub fill_mode: FillMode,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            fill_mode: FillMode::Solid,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    Min,
    Max,
}

/// Blend state of one color attachment.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct BlendState {
    pub enable: bool,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub op: BlendOp,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enable: false,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            op: BlendOp::Add,
        }
    }
}

impl BlendState {
    pub fn alpha_blending() -> Self {
        Self {
            enable: true,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            op: BlendOp::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u32,
    pub format: PixelFormat,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// One shader stage of a pipeline, referring to its compiled artifact by path.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Builder)]
#[builder(pattern = "owned", derive(Clone))]
pub struct PipelineShaderDesc {
    pub stage: ShaderStage,
    #[builder(setter(into))]
    pub source: PathBuf,
    #[builder(setter(into), default = "\"main\".to_owned()")]
    pub entry: String,
}

impl PipelineShaderDesc {
    pub fn builder() -> PipelineShaderDescBuilder {
        Default::default()
    }
}

// Raster pipeline description
#[derive(Clone, Debug, Hash, PartialEq, Eq, Builder)]
#[builder(pattern = "owned", derive(Clone))]
pub struct RasterPipelineDesc {
    pub shaders: Vec<PipelineShaderDesc>,
    pub render_pass: RenderPassDesc,
    #[builder(default)]
    pub raster: RasterState,
    #[builder(default)]
    pub blends: Vec<BlendState>,
    #[builder(default = "true")]
    pub depth_test: bool,
    #[builder(default = "true")]
    pub depth_write: bool,
    #[builder(default = "PrimitiveTopology::TriangleList")]
    pub topology: PrimitiveTopology,
    #[builder(default)]
    pub vertex_layout: VertexLayout,
}

impl RasterPipelineDesc {
    pub fn builder() -> RasterPipelineDescBuilder {
        RasterPipelineDescBuilder::default()
    }
}

// Compute pipeline description
#[derive(Clone, Debug, Hash, PartialEq, Eq, Builder)]
#[builder(pattern = "owned", derive(Clone))]
pub struct ComputePipelineDesc {
    #[builder(setter(into))]
    pub source: PathBuf,
    #[builder(setter(into), default = "\"main\".to_owned()")]
    pub entry: String,
}

impl ComputePipelineDesc {
    pub fn builder() -> ComputePipelineDescBuilder {
        ComputePipelineDescBuilder::default()
    }
}

/// A realized, bindable raster pipeline.
pub struct RasterPipelineState {
    pub raw: RawPipeline,
    pub desc: RasterPipelineDesc,
    /// Descriptor bindings merged from every stage's reflection manifest.
    pub bindings: Vec<ShaderBindingDesc>,
}

/// A realized, bindable compute pipeline.
pub struct ComputePipelineState {
    pub raw: RawPipeline,
    pub desc: ComputePipelineDesc,
    pub bindings: Vec<ShaderBindingDesc>,
}

fn merge_stage_bindings(shaders: &[Arc<CompiledShader>]) -> Vec<ShaderBindingDesc> {
    let mut merged: Vec<ShaderBindingDesc> = Vec::new();

    for shader in shaders {
        for binding in &shader.reflection.bindings {
            match merged.iter_mut().find(|b| b.set == binding.set && b.binding == binding.binding) {
                Some(existing) => {
                    existing.visibility |= binding.visibility;
                }
                None => merged.push(*binding),
            }
        }
    }

    merged
}

// implement pipeline associated functions for device
impl Device {
    pub fn create_raster_pipeline(
        &self,
        desc: RasterPipelineDesc,
        compiled_shaders: &[Arc<CompiledShader>],
    ) -> anyhow::Result<RasterPipelineState, RhiError> {
        let raw = self.backend().create_raster_pipeline(&desc, compiled_shaders)?;

        Ok(RasterPipelineState {
            raw,
            bindings: merge_stage_bindings(compiled_shaders),
            desc,
        })
    }

    pub fn create_compute_pipeline(
        &self,
        desc: ComputePipelineDesc,
        compiled_shader: &Arc<CompiledShader>,
    ) -> anyhow::Result<ComputePipelineState, RhiError> {
        let raw = self.backend().create_compute_pipeline(&desc, compiled_shader)?;

        Ok(ComputePipelineState {
            raw,
            bindings: compiled_shader.reflection.bindings.clone(),
            desc,
        })
    }

    pub fn destroy_raster_pipeline(&self, pipeline: &RasterPipelineState) {
        self.backend().destroy_pipeline(pipeline.raw);
    }

    pub fn destroy_compute_pipeline(&self, pipeline: &ComputePipelineState) {
        self.backend().destroy_pipeline(pipeline.raw);
    }
}
