use kestrel_rhi::backend::RawTextureView;
use kestrel_rhi::{
    Buffer, CommandBuffer, DescriptorSetBinding, Device, FramebufferKey, RenderPass, RhiError,
    Texture, TextureViewDesc,
};

use crate::compiled_graph::{
    GraphPreparedResourceRef, RegisteredResource, ResolvedComputePipeline, ResolvedRasterPipeline,
};
use crate::graph_resource::{GraphResourceHandle, GraphResourceRef};
use crate::resource::{ResourceView, Rt, Srv, Uav};

/// Binding of a graph resource into a pass's descriptor set.
pub enum RenderGraphPassBinding {
    Texture {
        handle: GraphResourceHandle,
        view_desc: TextureViewDesc,
    },
    Buffer {
        handle: GraphResourceHandle,
    },
}

pub trait RenderGraphPassBindable {
    fn bind(&self) -> RenderGraphPassBinding;
}

impl RenderGraphPassBindable for GraphResourceRef<Texture, Srv> {
    fn bind(&self) -> RenderGraphPassBinding {
        RenderGraphPassBinding::Texture {
            handle: self.handle,
            view_desc: TextureViewDesc::default(),
        }
    }
}

impl RenderGraphPassBindable for GraphResourceRef<Texture, Uav> {
    fn bind(&self) -> RenderGraphPassBinding {
        RenderGraphPassBinding::Texture {
            handle: self.handle,
            view_desc: TextureViewDesc::default(),
        }
    }
}

impl RenderGraphPassBindable for GraphResourceRef<Buffer, Srv> {
    fn bind(&self) -> RenderGraphPassBinding {
        RenderGraphPassBinding::Buffer {
            handle: self.handle,
        }
    }
}

impl RenderGraphPassBindable for GraphResourceRef<Buffer, Uav> {
    fn bind(&self) -> RenderGraphPassBinding {
        RenderGraphPassBinding::Buffer {
            handle: self.handle,
        }
    }
}

/// Compiled-resource accessors handed to a pass's render callback.
pub struct GraphResourceRegistry<'exec> {
    pub(crate) device: &'exec Device,
    pub(crate) registered_resources: &'exec [RegisteredResource],
    pub(crate) raster_pipeline: Option<ResolvedRasterPipeline>,
    pub(crate) compute_pipeline: Option<ResolvedComputePipeline>,
}

impl<'exec> GraphResourceRegistry<'exec> {
    // Resource accessors consume the GraphResourceRef by value: once the user
    // borrows the raw resource, the typed reference can no longer be bound
    // into a descriptor set behind its back.

    pub fn get_buffer<View: ResourceView>(&self, buf_ref: GraphResourceRef<Buffer, View>) -> &Buffer {
        self.get_buffer_from_raw_handle(buf_ref.handle)
    }

    pub fn get_texture<View: ResourceView>(&self, tex_ref: GraphResourceRef<Texture, View>) -> &Texture {
        self.get_texture_from_raw_handle(tex_ref.handle)
    }

    pub(crate) fn get_buffer_from_raw_handle(&self, handle: GraphResourceHandle) -> &Buffer {
        match self.registered_resources[handle.id as usize].resource.borrow() {
            Some(GraphPreparedResourceRef::Buffer(buffer)) => buffer,
            _ => panic!("Expected a buffer behind graph resource {:?}!", handle),
        }
    }

    pub(crate) fn get_texture_from_raw_handle(&self, handle: GraphResourceHandle) -> &Texture {
        match self.registered_resources[handle.id as usize].resource.borrow() {
            Some(GraphPreparedResourceRef::Texture(texture)) => texture,
            _ => panic!("Expected a texture behind graph resource {:?}!", handle),
        }
    }

    pub(crate) fn get_texture_view_from_raw_handle(
        &self,
        handle: GraphResourceHandle,
        view_desc: &TextureViewDesc,
    ) -> anyhow::Result<RawTextureView, RhiError> {
        let texture = self.get_texture_from_raw_handle(handle);
        texture.view(self.device, view_desc)
    }
}

/// Context a pass records its commands through.
pub struct PassContext<'exec, 'a> {
    /// Command buffer the pass records into.
    pub cb: &'a mut CommandBuffer,
    /// Compiled resources and pipelines of this frame.
    pub registry: GraphResourceRegistry<'exec>,
}

impl<'exec, 'a> PassContext<'exec, 'a> {
    #[inline]
    pub fn device(&self) -> &Device {
        self.registry.device
    }

    /// Begin a render pass over the given render-target views.
    ///
    /// The framebuffer is fetched through the render pass's framebuffer cache
    /// keyed by the views and the extent.
    pub fn begin_render_pass(
        &mut self,
        render_pass: &RenderPass,
        extent: [u32; 2],
        color_attachments: &[(GraphResourceRef<Texture, Rt>, &TextureViewDesc)],
        depth_attachment: Option<(GraphResourceRef<Texture, Rt>, &TextureViewDesc)>,
    ) -> anyhow::Result<(), RhiError> {
        let color_views = color_attachments.iter()
            .map(|(tex_ref, view_desc)| {
                self.registry.get_texture_view_from_raw_handle(tex_ref.handle, *view_desc)
            })
            .collect::<anyhow::Result<Vec<_>, RhiError>>()?;

        let depth_view = depth_attachment
            .map(|(tex_ref, view_desc)| {
                self.registry.get_texture_view_from_raw_handle(tex_ref.handle, view_desc)
            })
            .transpose()?;

        let framebuffer = render_pass.framebuffer_cache.get_or_create(
            self.registry.device,
            FramebufferKey::new(extent, color_views.into_iter(), depth_view),
        )?;

        self.cb.begin_render_pass(render_pass, framebuffer, extent);

        Ok(())
    }

    #[inline]
    pub fn end_render_pass(&mut self) {
        self.cb.end_render_pass();
    }

    #[inline]
    pub fn set_default_viewport_and_scissor(&mut self, extent: [u32; 2]) {
        self.set_viewport(extent);
        self.set_scissor(extent);
    }

    #[inline]
    pub fn set_viewport(&mut self, extent: [u32; 2]) {
        self.cb.set_viewport(extent);
    }

    #[inline]
    pub fn set_scissor(&mut self, extent: [u32; 2]) {
        self.cb.set_scissor(extent);
    }

    pub fn bind_vertex_buffer(&mut self, buf_ref: GraphResourceRef<Buffer, Srv>, binding: u32, offset: u64) {
        let buffer = self.registry.get_buffer_from_raw_handle(buf_ref.handle);
        self.cb.bind_vertex_buffer(buffer, binding, offset);
    }

    pub fn bind_index_buffer(&mut self, buf_ref: GraphResourceRef<Buffer, Srv>, offset: u64) {
        let buffer = self.registry.get_buffer_from_raw_handle(buf_ref.handle);
        self.cb.bind_index_buffer(buffer, offset);
    }

    #[inline]
    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32) {
        self.cb.draw_indexed(index_count, instance_count, first_index, vertex_offset);
    }

    /// Bind the pass's registered raster pipeline.
    ///
    /// Only reachable when the pipeline entry is visible; a pass with a
    /// pending pipeline never gets its callback invoked.
    pub fn bind_raster_pipeline(&mut self) -> anyhow::Result<BoundRasterPipeline<'_, 'exec, 'a>, RhiError> {
        let resolved = self.registry.raster_pipeline.clone()
            .expect("Pass has no registered raster pipeline!");

        let pipeline = resolved.pipeline
            .ok_or(RhiError::PipelineNotVisible {
                handle: resolved.handle,
            })?;

        self.cb.bind_raster_pipeline(&pipeline);

        Ok(BoundRasterPipeline {
            context: self,
        })
    }

    /// Bind the pass's registered compute pipeline.
    pub fn bind_compute_pipeline(&mut self) -> anyhow::Result<BoundComputePipeline<'_, 'exec, 'a>, RhiError> {
        let resolved = self.registry.compute_pipeline.clone()
            .expect("Pass has no registered compute pipeline!");

        let pipeline = resolved.pipeline
            .ok_or(RhiError::PipelineNotVisible {
                handle: resolved.handle,
            })?;

        self.cb.bind_compute_pipeline(&pipeline);

        Ok(BoundComputePipeline {
            context: self,
        })
    }

    fn resolve_bindings(
        &self,
        bindings: &[RenderGraphPassBinding],
    ) -> anyhow::Result<Vec<DescriptorSetBinding>, RhiError> {
        bindings.iter()
            .map(|binding| {
                Ok(match binding {
                    RenderGraphPassBinding::Texture { handle, view_desc } => DescriptorSetBinding::Texture {
                        view: self.registry.get_texture_view_from_raw_handle(*handle, view_desc)?,
                    },
                    RenderGraphPassBinding::Buffer { handle } => DescriptorSetBinding::Buffer {
                        buffer: self.registry.get_buffer_from_raw_handle(*handle).raw,
                    },
                })
            })
            .collect()
    }
}

/// The pass's raster pipeline, bound into the command stream.
pub struct BoundRasterPipeline<'ctx, 'exec, 'a> {
    context: &'ctx mut PassContext<'exec, 'a>,
}

impl<'ctx, 'exec, 'a> BoundRasterPipeline<'ctx, 'exec, 'a> {
    pub fn bind(&mut self, set_index: u32, bindings: &[RenderGraphPassBinding]) -> anyhow::Result<(), RhiError> {
        let resolved = self.context.resolve_bindings(bindings)?;
        self.context.cb.bind_descriptor_set(set_index, resolved);

        Ok(())
    }
}

/// The pass's compute pipeline, bound into the command stream.
pub struct BoundComputePipeline<'ctx, 'exec, 'a> {
    context: &'ctx mut PassContext<'exec, 'a>,
}

impl<'ctx, 'exec, 'a> BoundComputePipeline<'ctx, 'exec, 'a> {
    pub fn bind(&mut self, set_index: u32, bindings: &[RenderGraphPassBinding]) -> anyhow::Result<(), RhiError> {
        let resolved = self.context.resolve_bindings(bindings)?;
        self.context.cb.bind_descriptor_set(set_index, resolved);

        Ok(())
    }

    pub fn dispatch(&mut self, group_count: [u32; 3]) {
        self.context.cb.dispatch(group_count);
    }
}
