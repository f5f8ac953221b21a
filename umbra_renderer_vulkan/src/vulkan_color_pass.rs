/// ColorPass - shaded, multisampled pass that resolves into the swapchain
///
/// Swapchain-dependent targets (MSAA color, depth, framebuffers) are released
/// before every swapchain recreation and rebuilt afterwards. Pipeline, render
/// pass, samplers and per-slot command buffers live for the whole run.

use umbra_engine::umbra::asset::ShaderCode;
use umbra_engine::umbra::camera::ColorPushConstants;
use umbra_engine::umbra::config::MAX_FRAMES_IN_FLIGHT;
use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_debug, engine_err, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_mesh::{GpuMesh, POSITION_STRIDE, SURFACE_STRIDE};
use crate::vulkan_pipeline::{DescriptorBinding, GraphicsPipeline, PipelineDesc, ShaderStage, VertexAttribute};
use crate::vulkan_sampler::{Sampler, SamplerKind};
use crate::vulkan_shadow_pass::ShadowPass;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::{GpuImage, ImageDesc};

/// Attachments of the color render pass.
///
/// Multisampled: `[msaa color, depth, resolve]`. Single-sampled:
/// `[swapchain color, depth]`.
pub fn color_pass_attachments(
    samples: vk::SampleCountFlags,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Vec<vk::AttachmentDescription> {
    let depth = vk::AttachmentDescription::default()
        .format(depth_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let presented = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .store_op(vk::AttachmentStoreOp::STORE);

    if samples == vk::SampleCountFlags::TYPE_1 {
        return vec![presented.load_op(vk::AttachmentLoadOp::CLEAR), depth];
    }

    let msaa_color = vk::AttachmentDescription::default()
        .format(color_format)
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    vec![msaa_color, depth, presented.load_op(vk::AttachmentLoadOp::DONT_CARE)]
}

/// Opaque black color, depth 1.0; one value per attachment
pub fn clear_values(attachment_count: usize) -> Vec<vk::ClearValue> {
    let color = vk::ClearValue { color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] } };
    let depth = vk::ClearValue { depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 } };
    (0..attachment_count)
        .map(|i| if i == 1 { depth } else { color })
        .collect()
}

/// Attachments sized to the current swapchain
struct ColorTargets {
    framebuffers: Vec<vk::Framebuffer>,
    color: Option<GpuImage>,
    depth: GpuImage,
    extent: vk::Extent2D,
}

pub struct ColorPass {
    targets: Option<ColorTargets>,
    pipeline: GraphicsPipeline,
    render_pass: vk::RenderPass,
    _material_sampler: Sampler,
    _shadow_sampler: Sampler,
    command_buffers: Vec<vk::CommandBuffer>,
    samples: vk::SampleCountFlags,
    ctx: Arc<GpuContext>,
}

/// Sources the color pass samples from
pub struct ColorPassInputs<'a> {
    pub albedo: &'a GpuImage,
    pub normal: &'a GpuImage,
    pub shadow: &'a ShadowPass,
    pub vertex_shader: ShaderCode<'a>,
    pub fragment_shader: ShaderCode<'a>,
}

impl ColorPass {
    /// Build targets, render pass and pipeline.
    ///
    /// The shadow map must already be rendered: its view is written into the
    /// descriptor set here.
    pub fn build(ctx: Arc<GpuContext>, swapchain: &Swapchain, inputs: ColorPassInputs) -> Result<Self> {
        if !inputs.shadow.is_drawn() {
            engine_error!("umbra::vulkan", "Color pass built before the shadow map was rendered");
            return Err(Error::InvalidResource("Shadow map has not been rendered".to_string()));
        }

        let samples = ctx.adapter.msaa_samples;
        let material_sampler = Sampler::new(Arc::clone(&ctx), SamplerKind::Material)?;
        let shadow_sampler = Sampler::new(Arc::clone(&ctx), SamplerKind::Shadow)?;
        let render_pass = Self::create_render_pass(&ctx, samples, swapchain.format())?;

        let fragment = vk::ShaderStageFlags::FRAGMENT;
        let bindings = [
            DescriptorBinding::sampled_image(fragment, inputs.albedo.view(), material_sampler.handle()),
            DescriptorBinding::sampled_image(fragment, inputs.normal.view(), material_sampler.handle()),
            DescriptorBinding::sampled_image(fragment, inputs.shadow.shadow_view(), shadow_sampler.handle()),
        ];
        // Location order: position, normal, tangent, texcoord
        let attributes = [
            VertexAttribute { binding: 0, format: vk::Format::R32G32B32_SFLOAT, offset: 0 },
            VertexAttribute { binding: 1, format: vk::Format::R32G32B32_SFLOAT, offset: 0 },
            VertexAttribute { binding: 1, format: vk::Format::R32G32B32A32_SFLOAT, offset: 12 },
            VertexAttribute { binding: 1, format: vk::Format::R32G32_SFLOAT, offset: 28 },
        ];
        let stages = [
            ShaderStage { stage: vk::ShaderStageFlags::VERTEX, code: inputs.vertex_shader },
            ShaderStage { stage: vk::ShaderStageFlags::FRAGMENT, code: inputs.fragment_shader },
        ];

        let pipeline = GraphicsPipeline::build(
            Arc::clone(&ctx),
            &PipelineDesc {
                name: "color",
                stages: &stages,
                bindings: &bindings,
                vertex_strides: &[POSITION_STRIDE, SURFACE_STRIDE],
                vertex_attributes: &attributes,
                push_constant_size: std::mem::size_of::<ColorPushConstants>() as u32,
                push_constant_stages: vk::ShaderStageFlags::VERTEX,
                samples,
                depth_bias: None,
                color_attachment_count: 1,
                render_pass,
            },
        )
        .and_then(|pipeline| {
            let command_buffers = ctx.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;
            Ok((pipeline, command_buffers))
        });
        let (pipeline, command_buffers) = match pipeline {
            Ok(built) => built,
            Err(e) => {
                unsafe { ctx.device.destroy_render_pass(render_pass, None) };
                return Err(e);
            }
        };

        let mut pass = Self {
            targets: None,
            pipeline,
            render_pass,
            _material_sampler: material_sampler,
            _shadow_sampler: shadow_sampler,
            command_buffers,
            samples,
            ctx,
        };
        pass.rebuild_targets(swapchain)?;

        engine_debug!("umbra::vulkan", "Color pass built ({:?}, {:?})", samples, swapchain.format());
        Ok(pass)
    }

    fn create_render_pass(ctx: &GpuContext, samples: vk::SampleCountFlags, color_format: vk::Format) -> Result<vk::RenderPass> {
        let attachments = color_pass_attachments(samples, color_format, ctx.adapter.depth_format);

        let color_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        let resolve_ref = vk::AttachmentReference::default()
            .attachment(2)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref))
            .depth_stencil_attachment(&depth_ref);
        if samples != vk::SampleCountFlags::TYPE_1 {
            subpass = subpass.resolve_attachments(std::slice::from_ref(&resolve_ref));
        }

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        unsafe {
            ctx.device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create color render pass: {:?}", e))
        }
    }

    /// Destroy framebuffers and attachments (device must be idle)
    pub fn release_targets(&mut self) {
        if let Some(targets) = self.targets.take() {
            unsafe {
                for framebuffer in targets.framebuffers {
                    self.ctx.device.destroy_framebuffer(framebuffer, None);
                }
            }
            engine_debug!("umbra::vulkan", "Color targets released");
        }
    }

    /// Recreate attachments and framebuffers for the current swapchain
    pub fn rebuild_targets(&mut self, swapchain: &Swapchain) -> Result<()> {
        self.release_targets();

        let extent = swapchain.extent();
        let depth = GpuImage::new(
            Arc::clone(&self.ctx),
            &ImageDesc::new(
                "color_pass_depth",
                extent,
                self.ctx.adapter.depth_format,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
                vk::ImageAspectFlags::DEPTH,
            )
            .samples(self.samples),
        )?;

        let color = if self.samples == vk::SampleCountFlags::TYPE_1 {
            None
        } else {
            Some(GpuImage::new(
                Arc::clone(&self.ctx),
                &ImageDesc::new(
                    "color_pass_msaa",
                    extent,
                    swapchain.format(),
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
                    vk::ImageAspectFlags::COLOR,
                )
                .samples(self.samples),
            )?)
        };

        let mut targets = ColorTargets { framebuffers: Vec::new(), color, depth, extent };
        for &swapchain_view in swapchain.image_views() {
            let attachments: Vec<vk::ImageView> = match &targets.color {
                Some(msaa) => vec![msaa.view(), targets.depth.view(), swapchain_view],
                None => vec![swapchain_view, targets.depth.view()],
            };
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe { self.ctx.device.create_framebuffer(&framebuffer_info, None) };
            match framebuffer {
                Ok(framebuffer) => targets.framebuffers.push(framebuffer),
                Err(e) => {
                    unsafe {
                        for framebuffer in targets.framebuffers.drain(..) {
                            self.ctx.device.destroy_framebuffer(framebuffer, None);
                        }
                    }
                    return Err(engine_err!("umbra::vulkan", "Failed to create color framebuffer: {:?}", e));
                }
            }
        }

        engine_debug!(
            "umbra::vulkan",
            "Color targets built: {}x{}, {} framebuffer(s)",
            extent.width,
            extent.height,
            targets.framebuffers.len()
        );
        self.targets = Some(targets);
        Ok(())
    }

    /// Record the slot's command buffer for swapchain image `image_index`.
    ///
    /// With `capture`, the presented image is also copied into that buffer
    /// after the render pass.
    pub fn draw(
        &self,
        slot: usize,
        image_index: u32,
        swapchain_image: vk::Image,
        mesh: &GpuMesh,
        push: &ColorPushConstants,
        capture: Option<&GpuBuffer>,
    ) -> Result<vk::CommandBuffer> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| engine_err!("umbra::vulkan", "Color pass drawn without targets"))?;
        let framebuffer = *targets
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| engine_err!("umbra::vulkan", "No framebuffer for swapchain image {}", image_index))?;
        let command_buffer = self.command_buffers[slot % self.command_buffers.len()];
        let device = &self.ctx.device;
        let extent = targets.extent;

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to reset frame command buffer: {:?}", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to begin frame command buffer: {:?}", e))?;

            let clear_values = clear_values(if targets.color.is_some() { 3 } else { 2 });
            let render_area = vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent };
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
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
                .push_constants(command_buffer, vk::ShaderStageFlags::VERTEX, bytemuck::bytes_of(push));
            mesh.bind_all(device, command_buffer);
            mesh.draw(device, command_buffer);

            device.cmd_end_render_pass(command_buffer);

            if let Some(readback) = capture {
                self.record_capture(command_buffer, swapchain_image, extent, readback);
            }

            device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to end frame command buffer: {:?}", e))?;
        }

        Ok(command_buffer)
    }

    unsafe fn record_capture(
        &self,
        command_buffer: vk::CommandBuffer,
        image: vk::Image,
        extent: vk::Extent2D,
        readback: &GpuBuffer,
    ) {
        let device = &self.ctx.device;
        let range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let to_transfer = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(range)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_access_mask(vk::AccessFlags::TRANSFER_READ);
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_transfer],
        );

        let region = vk::BufferImageCopy::default()
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(vk::Extent3D { width: extent.width, height: extent.height, depth: 1 });
        device.cmd_copy_image_to_buffer(
            command_buffer,
            image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            readback.handle(),
            &[region],
        );

        let to_present = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(range)
            .src_access_mask(vk::AccessFlags::TRANSFER_READ)
            .dst_access_mask(vk::AccessFlags::empty());
        let host_read = vk::BufferMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::HOST_READ)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(readback.handle())
            .offset(0)
            .size(vk::WHOLE_SIZE);
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE | vk::PipelineStageFlags::HOST,
            vk::DependencyFlags::empty(),
            &[],
            &[host_read],
            &[to_present],
        );
    }

    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    /// Extent of the current targets, `None` while released
    pub fn target_extent(&self) -> Option<vk::Extent2D> {
        self.targets.as_ref().map(|targets| targets.extent)
    }

    pub fn framebuffer_count(&self) -> usize {
        self.targets.as_ref().map_or(0, |targets| targets.framebuffers.len())
    }
}

impl Drop for ColorPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        self.release_targets();
        self.ctx.free_command_buffers(&self.command_buffers);
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_color_pass_tests.rs"]
mod tests;
