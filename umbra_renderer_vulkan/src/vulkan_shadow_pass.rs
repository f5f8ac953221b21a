/// ShadowPass - depth-only render of the scene from the light
///
/// Built once, drawn once before the frame loop. The depth image outlives the
/// draw and is sampled by the color pass in `SHADER_READ_ONLY_OPTIMAL`.

use umbra_engine::umbra::asset::ShaderCode;
use umbra_engine::umbra::camera::{light_view_projection, ShadowPushConstants};
use umbra_engine::umbra::config::SHADOW_MAP_SIZE;
use umbra_engine::umbra::Result;
use umbra_engine::{engine_debug, engine_err};
use ash::vk;
use glam::Mat4;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_mesh::{GpuMesh, POSITION_STRIDE};
use crate::vulkan_pipeline::{DepthBias, GraphicsPipeline, PipelineDesc, ShaderStage, VertexAttribute};
use crate::vulkan_texture::{GpuImage, ImageDesc};

/// Slope-scaled bias against shadow acne
pub const SHADOW_DEPTH_BIAS: DepthBias = DepthBias {
    constant_factor: 1.25,
    slope_factor: 1.75,
    clamp: 0.0,
};

pub struct ShadowPass {
    pipeline: GraphicsPipeline,
    render_pass: vk::RenderPass,
    depth: GpuImage,
    light_view_projection: Mat4,
    drawn: bool,
    ctx: Arc<GpuContext>,
}

impl ShadowPass {
    /// Create the shadow map, its render pass and the vertex-only pipeline
    pub fn build(ctx: Arc<GpuContext>, vertex_shader: ShaderCode) -> Result<Self> {
        let format = ctx.adapter.depth_format;
        let depth = GpuImage::new(
            Arc::clone(&ctx),
            &ImageDesc::new(
                "shadow_map",
                vk::Extent2D { width: SHADOW_MAP_SIZE, height: SHADOW_MAP_SIZE },
                format,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                vk::ImageAspectFlags::DEPTH,
            ),
        )?;

        let render_pass = Self::create_render_pass(&ctx, format)?;

        let attributes = [VertexAttribute { binding: 0, format: vk::Format::R32G32B32_SFLOAT, offset: 0 }];
        let stages = [ShaderStage { stage: vk::ShaderStageFlags::VERTEX, code: vertex_shader }];
        let pipeline = GraphicsPipeline::build(
            Arc::clone(&ctx),
            &PipelineDesc {
                name: "shadow",
                stages: &stages,
                bindings: &[],
                vertex_strides: &[POSITION_STRIDE],
                vertex_attributes: &attributes,
                push_constant_size: std::mem::size_of::<ShadowPushConstants>() as u32,
                push_constant_stages: vk::ShaderStageFlags::VERTEX,
                samples: vk::SampleCountFlags::TYPE_1,
                depth_bias: Some(SHADOW_DEPTH_BIAS),
                color_attachment_count: 0,
                render_pass,
            },
        );
        let pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe { ctx.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };

        engine_debug!("umbra::vulkan", "Shadow pass built ({}x{}, {:?})", SHADOW_MAP_SIZE, SHADOW_MAP_SIZE, format);
        Ok(Self {
            pipeline,
            render_pass,
            depth,
            light_view_projection: light_view_projection(),
            drawn: false,
            ctx,
        })
    }

    fn create_render_pass(ctx: &GpuContext, format: vk::Format) -> Result<vk::RenderPass> {
        let depth_attachment = vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        let depth_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .depth_stencil_attachment(&depth_attachment_ref);

        // The one-shot submission is waited on, so no external dependency
        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&depth_attachment))
            .subpasses(std::slice::from_ref(&subpass));

        unsafe {
            ctx.device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create shadow render pass: {:?}", e))
        }
    }

    /// Render `mesh` into the shadow map and wait for completion
    pub fn draw(&mut self, mesh: &GpuMesh) -> Result<()> {
        let device = &self.ctx.device;
        let extent = self.depth.extent();

        let attachments = [self.depth.view()];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(self.render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create shadow framebuffer: {:?}", e))?
        };

        let result = self.record_and_submit(framebuffer, extent, mesh);
        unsafe { device.destroy_framebuffer(framebuffer, None) };
        result?;

        self.drawn = true;
        engine_debug!("umbra::vulkan", "Shadow map rendered ({} indices)", mesh.index_count);
        Ok(())
    }

    fn record_and_submit(&self, framebuffer: vk::Framebuffer, extent: vk::Extent2D, mesh: &GpuMesh) -> Result<()> {
        let device = &self.ctx.device;
        let command_buffer = self.ctx.begin_one_shot()?;

        let clear_values = [vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        }];
        let render_area = vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent };
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(&clear_values);

        let push = ShadowPushConstants { light_mvp: self.light_view_projection * Mat4::IDENTITY };

        unsafe {
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(
                command_buffer,
                0,
                &[vk::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: extent.width as f32,
                    height: extent.height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            );
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);

            self.pipeline.bind(command_buffer);
            self.pipeline
                .push_constants(command_buffer, vk::ShaderStageFlags::VERTEX, bytemuck::bytes_of(&push));
            mesh.bind_positions(device, command_buffer);
            mesh.draw(device, command_buffer);

            device.cmd_end_render_pass(command_buffer);
        }

        self.ctx.submit_one_shot(command_buffer)
    }

    /// Shadow map view, in `SHADER_READ_ONLY_OPTIMAL` once drawn
    pub fn shadow_view(&self) -> vk::ImageView {
        self.depth.view()
    }

    pub fn light_view_projection(&self) -> Mat4 {
        self.light_view_projection
    }

    /// True once the shadow map holds a rendered frame
    pub fn is_drawn(&self) -> bool {
        self.drawn
    }
}

impl Drop for ShadowPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
