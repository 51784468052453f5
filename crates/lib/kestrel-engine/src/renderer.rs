use std::sync::Arc;

use kestrel_rg::{ImportedAccess, RenderGraph};
use kestrel_rhi::{
    AccessState, BlendState, Buffer, BufferDesc, BufferUsageFlags, Device, PipelineShaderDesc,
    PixelFormat, RasterPipelineDesc, RenderPass, RenderPassAttachmentDesc, RenderPassDesc,
    ShaderStage, TextureDesc, TextureUsageFlags, TextureViewDesc,
};

pub const SCENE_COLOR_NAME: &str = "scene_color";

/// Builds the engine's per-frame render graph: a scene pass clearing the
/// persistent color target, then a UI overlay drawn on top of it.
pub struct WorldRenderer {
    render_extent: [u32; 2],

    clear_render_pass: Arc<RenderPass>,
    overlay_render_pass: Arc<RenderPass>,

    ui_index_buffer: Arc<Buffer>,
    ui_index_access: ImportedAccess,
    ui_pipeline_desc: RasterPipelineDesc,
}

impl WorldRenderer {
    pub fn new(device: &Device, render_extent: [u32; 2]) -> anyhow::Result<Self> {
        let color = RenderPassAttachmentDesc::new(PixelFormat::Bgra8Unorm);

        let clear_render_pass = device.create_render_pass(
            RenderPassDesc::new(&[color.clear_input()], None),
        )?;
        let overlay_render_pass = device.create_render_pass(
            RenderPassDesc::new(&[color], None),
        )?;

        // one fullscreen triangle
        let ui_indices: [u8; 6] = [0, 0, 1, 0, 2, 0];
        let ui_index_buffer = Arc::new(device.create_buffer_init(
            BufferDesc::new_gpu_only(ui_indices.len(), BufferUsageFlags::INDEX),
            "ui index buffer",
            &ui_indices,
        )?);

        let ui_pipeline_desc = RasterPipelineDesc::builder()
            .shaders(vec![
                PipelineShaderDesc::builder()
                    .stage(ShaderStage::Vertex)
                    .source("shaders/ui.vert.spv")
                    .build()
                    .unwrap(),
                PipelineShaderDesc::builder()
                    .stage(ShaderStage::Pixel)
                    .source("shaders/ui.frag.spv")
                    .build()
                    .unwrap(),
            ])
            .render_pass(overlay_render_pass.desc.clone())
            .blends(vec![BlendState::alpha_blending()])
            .depth_test(false)
            .depth_write(false)
            .build()
            .unwrap();

        Ok(Self {
            render_extent,

            clear_render_pass,
            overlay_render_pass,

            ui_index_buffer,
            ui_index_access: ImportedAccess::new(AccessState::Nothing),
            ui_pipeline_desc,
        })
    }

    pub fn build_graph(&self, rg: &mut RenderGraph) -> anyhow::Result<()> {
        let extent = self.render_extent;

        let scene_color_desc = TextureDesc::new_2d(extent, PixelFormat::Bgra8Unorm)
            .usage_flags(TextureUsageFlags::COLOR | TextureUsageFlags::SAMPLED);
        let mut scene_color = rg.get_or_create_named_texture(SCENE_COLOR_NAME, scene_color_desc)?;

        {
            let mut pass = rg.add_pass("scene clear");
            let color_rt = pass.raster_write(&mut scene_color, AccessState::ColorAttachmentWrite);

            let render_pass = self.clear_render_pass.clone();
            pass.render(move |context| {
                let view_desc = TextureViewDesc::default();

                context.begin_render_pass(&render_pass, extent, &[(color_rt, &view_desc)], None)?;
                context.set_default_viewport_and_scissor(extent);
                context.end_render_pass();

                Ok(())
            });
        }

        let index_buffer = rg.import_resource(self.ui_index_buffer.clone(), &self.ui_index_access);

        {
            let mut pass = rg.add_pass("ui overlay");
            let index_ref = pass.read(&index_buffer, AccessState::IndexBuffer);
            let color_rt = pass.raster_write(&mut scene_color, AccessState::ColorAttachmentReadWrite);
            pass.register_raster_pipeline(self.ui_pipeline_desc.clone());

            let render_pass = self.overlay_render_pass.clone();
            pass.render(move |context| {
                let view_desc = TextureViewDesc::default();

                context.begin_render_pass(&render_pass, extent, &[(color_rt, &view_desc)], None)?;
                context.set_default_viewport_and_scissor(extent);

                context.bind_raster_pipeline()?.bind(0, &[])?;
                context.bind_index_buffer(index_ref, 0);
                context.draw_indexed(3, 1, 0, 0);

                context.end_render_pass();

                Ok(())
            });
        }

        Ok(())
    }

    pub fn shutdown(self, device: &Device) {
        device.destroy_render_pass(&self.clear_render_pass);
        device.destroy_render_pass(&self.overlay_render_pass);

        // if an in-flight frame still references the index buffer, the
        // deferred-release queue destroys it with the last holder
        match Arc::try_unwrap(self.ui_index_buffer) {
            Ok(buffer) => device.destroy_buffer(buffer),
            Err(buffer) => device.defer_release(buffer),
        }
    }
}
