/// GraphicsPipeline - pipeline plus the descriptor objects it binds
///
/// Built from a declarative [`PipelineDesc`]. Construction is all-or-nothing:
/// every sub-object is stored on the pipeline as soon as it exists, so an
/// early return drops the partial pipeline and destroys what was created.

use umbra_engine::umbra::asset::ShaderCode;
use umbra_engine::umbra::config::MAX_PUSH_CONSTANT_SIZE;
use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_debug, engine_err, engine_error};
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_shader::{reflect_push_constant_size, ShaderModule};

/// Resource currently bound to a descriptor binding
#[derive(Debug, Clone, Copy)]
pub enum BoundResource {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

/// One descriptor binding; its binding number is its index in the list
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBinding {
    pub ty: vk::DescriptorType,
    pub stages: vk::ShaderStageFlags,
    pub resource: BoundResource,
}

impl DescriptorBinding {
    /// Combined image sampler in shader-read-only layout
    pub fn sampled_image(stages: vk::ShaderStageFlags, view: vk::ImageView, sampler: vk::Sampler) -> Self {
        Self {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            stages,
            resource: BoundResource::Image(
                vk::DescriptorImageInfo::default()
                    .image_view(view)
                    .sampler(sampler)
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            ),
        }
    }

    /// Whole-buffer uniform binding
    pub fn uniform_buffer(stages: vk::ShaderStageFlags, buffer: vk::Buffer) -> Self {
        Self {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            stages,
            resource: BoundResource::Buffer(
                vk::DescriptorBufferInfo::default()
                    .buffer(buffer)
                    .offset(0)
                    .range(vk::WHOLE_SIZE),
            ),
        }
    }
}

/// Shader stage and its SPIR-V (entry point `main`)
#[derive(Debug, Clone, Copy)]
pub struct ShaderStage<'a> {
    pub stage: vk::ShaderStageFlags,
    pub code: ShaderCode<'a>,
}

/// Vertex attribute; its shader location is its index in the attribute list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub binding: u32,
    pub format: vk::Format,
    pub offset: u32,
}

/// Rasterizer depth bias
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant_factor: f32,
    pub slope_factor: f32,
    pub clamp: f32,
}

/// Everything needed to build a graphics pipeline.
///
/// Fixed state: triangle list, dynamic viewport and scissor, depth test LESS
/// with writes, no blending, back-face culling with clockwise front faces.
pub struct PipelineDesc<'a> {
    pub name: &'a str,
    pub stages: &'a [ShaderStage<'a>],
    /// Binding *i* is descriptor binding *i* of set 0
    pub bindings: &'a [DescriptorBinding],
    /// Stride of vertex buffer binding *b*
    pub vertex_strides: &'a [u32],
    /// Attribute *i* is read at shader location *i*
    pub vertex_attributes: &'a [VertexAttribute],
    pub push_constant_size: u32,
    pub push_constant_stages: vk::ShaderStageFlags,
    pub samples: vk::SampleCountFlags,
    pub depth_bias: Option<DepthBias>,
    /// Number of color attachments in the subpass (0 for depth-only passes)
    pub color_attachment_count: u32,
    pub render_pass: vk::RenderPass,
}

/// Built pipeline and everything it owns
pub struct GraphicsPipeline {
    ctx: Arc<GpuContext>,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

/// Vertex binding descriptions, binding *b* taking the *b*-th stride
pub fn vertex_binding_descriptions(strides: &[u32]) -> Vec<vk::VertexInputBindingDescription> {
    strides
        .iter()
        .enumerate()
        .map(|(binding, &stride)| vk::VertexInputBindingDescription {
            binding: binding as u32,
            stride,
            input_rate: vk::VertexInputRate::VERTEX,
        })
        .collect()
}

/// Vertex attribute descriptions, attribute *i* at location *i*
pub fn vertex_attribute_descriptions(attributes: &[VertexAttribute]) -> Vec<vk::VertexInputAttributeDescription> {
    attributes
        .iter()
        .enumerate()
        .map(|(location, attribute)| vk::VertexInputAttributeDescription {
            location: location as u32,
            binding: attribute.binding,
            format: attribute.format,
            offset: attribute.offset,
        })
        .collect()
}

/// Pool sizes covering exactly one descriptor per binding
pub fn descriptor_pool_sizes(bindings: &[DescriptorBinding]) -> Vec<vk::DescriptorPoolSize> {
    let mut counts: FxHashMap<vk::DescriptorType, u32> = FxHashMap::default();
    let mut order = Vec::new();
    for binding in bindings {
        let count = counts.entry(binding.ty).or_insert_with(|| {
            order.push(binding.ty);
            0
        });
        *count += 1;
    }
    order
        .into_iter()
        .map(|ty| vk::DescriptorPoolSize { ty, descriptor_count: counts[&ty] })
        .collect()
}

/// Reject push-constant ranges the device or the shaders cannot honor
pub fn check_push_constant_size(declared: u32, reflected: Option<u32>) -> Result<()> {
    if declared > MAX_PUSH_CONSTANT_SIZE {
        engine_error!("umbra::vulkan", "Push constant range {} bytes exceeds {} bytes", declared, MAX_PUSH_CONSTANT_SIZE);
        return Err(Error::InvalidResource(format!(
            "Push constant range of {} bytes exceeds the {} byte limit",
            declared, MAX_PUSH_CONSTANT_SIZE
        )));
    }
    match reflected {
        Some(size) if size > declared => {
            engine_error!("umbra::vulkan", "Shader push constant block is {} bytes, range is {} bytes", size, declared);
            Err(Error::InvalidResource(format!(
                "Shader push constant block of {} bytes does not fit the declared {} bytes",
                size, declared
            )))
        }
        _ => Ok(()),
    }
}

impl GraphicsPipeline {
    /// Build the pipeline, its layout and (if there are bindings) its descriptor set
    pub fn build(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        for stage in desc.stages {
            check_push_constant_size(desc.push_constant_size, reflect_push_constant_size(&stage.code)?)?;
        }

        let mut pipeline = Self {
            ctx,
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };

        if !desc.bindings.is_empty() {
            pipeline.create_descriptor_set(desc)?;
        }
        pipeline.create_layout(desc)?;
        pipeline.create_pipeline(desc)?;

        engine_debug!(
            "umbra::vulkan",
            "Pipeline '{}' built: {} stage(s), {} binding(s), {} vertex attribute(s)",
            desc.name,
            desc.stages.len(),
            desc.bindings.len(),
            desc.vertex_attributes.len()
        );
        Ok(pipeline)
    }

    fn create_descriptor_set(&mut self, desc: &PipelineDesc) -> Result<()> {
        let device = &self.ctx.device;

        let layout_bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
            .bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(i as u32)
                    .descriptor_type(binding.ty)
                    .descriptor_count(1)
                    .stage_flags(binding.stages)
            })
            .collect();

        unsafe {
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&layout_bindings);
            self.set_layout = device.create_descriptor_set_layout(&layout_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Pipeline '{}': failed to create descriptor set layout: {:?}", desc.name, e)
            })?;

            let pool_sizes = descriptor_pool_sizes(desc.bindings);
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(1)
                .pool_sizes(&pool_sizes);
            self.descriptor_pool = device.create_descriptor_pool(&pool_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Pipeline '{}': failed to create descriptor pool: {:?}", desc.name, e)
            })?;

            let set_layouts = [self.set_layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.descriptor_pool)
                .set_layouts(&set_layouts);
            self.descriptor_set = device.allocate_descriptor_sets(&alloc_info).map_err(|e| {
                engine_err!("umbra::vulkan", "Pipeline '{}': failed to allocate descriptor set: {:?}", desc.name, e)
            })?[0];

            let writes: Vec<vk::WriteDescriptorSet> = desc
                .bindings
                .iter()
                .enumerate()
                .map(|(i, binding)| {
                    let write = vk::WriteDescriptorSet::default()
                        .dst_set(self.descriptor_set)
                        .dst_binding(i as u32)
                        .dst_array_element(0)
                        .descriptor_type(binding.ty);
                    match &binding.resource {
                        BoundResource::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
                        BoundResource::Image(info) => write.image_info(std::slice::from_ref(info)),
                    }
                })
                .collect();
            device.update_descriptor_sets(&writes, &[]);
        }
        Ok(())
    }

    fn create_layout(&mut self, desc: &PipelineDesc) -> Result<()> {
        let set_layouts: Vec<vk::DescriptorSetLayout> = if self.set_layout == vk::DescriptorSetLayout::null() {
            Vec::new()
        } else {
            vec![self.set_layout]
        };
        let push_constant_ranges: Vec<vk::PushConstantRange> = if desc.push_constant_size > 0 {
            vec![vk::PushConstantRange {
                stage_flags: desc.push_constant_stages,
                offset: 0,
                size: desc.push_constant_size,
            }]
        } else {
            Vec::new()
        };

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        self.layout = unsafe {
            self.ctx.device.create_pipeline_layout(&layout_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Pipeline '{}': failed to create pipeline layout: {:?}", desc.name, e)
            })?
        };
        Ok(())
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<()> {
        let device = &self.ctx.device;

        let modules = desc
            .stages
            .iter()
            .map(|stage| ShaderModule::new(device, &stage.code))
            .collect::<Result<Vec<_>>>()?;
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = desc
            .stages
            .iter()
            .zip(&modules)
            .map(|(stage, module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(module.module)
                    .name(c"main")
            })
            .collect();

        let vertex_bindings = vertex_binding_descriptions(desc.vertex_strides);
        let vertex_attributes = vertex_attribute_descriptions(desc.vertex_attributes);
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let mut rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE);
        if let Some(bias) = desc.depth_bias {
            rasterization_state = rasterization_state
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_slope_factor(bias.slope_factor)
                .depth_bias_clamp(bias.clamp);
        } else {
            rasterization_state = rasterization_state.depth_bias_enable(false);
        }

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(desc.samples);

        let blend_attachments = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false);
            desc.color_attachment_count as usize
        ];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(self.layout)
            .render_pass(desc.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| {
                    engine_err!("umbra::vulkan", "Pipeline '{}': failed to create graphics pipeline: {:?}", desc.name, e)
                })?
        };
        self.pipeline = pipelines[0];
        Ok(())
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Descriptor set of set 0, `None` when the pipeline has no bindings
    pub fn descriptor_set(&self) -> Option<vk::DescriptorSet> {
        (self.descriptor_set != vk::DescriptorSet::null()).then_some(self.descriptor_set)
    }

    /// Bind the pipeline and its descriptor set
    pub fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            let device = &self.ctx.device;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            if let Some(set) = self.descriptor_set() {
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.layout,
                    0,
                    &[set],
                    &[],
                );
            }
        }
    }

    /// Push `bytes` at offset 0 for the declared push-constant stages
    pub fn push_constants(&self, command_buffer: vk::CommandBuffer, stages: vk::ShaderStageFlags, bytes: &[u8]) {
        unsafe {
            self.ctx
                .device
                .cmd_push_constants(command_buffer, self.layout, stages, 0, bytes);
        }
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            if self.pipeline != vk::Pipeline::null() {
                device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                device.destroy_pipeline_layout(self.layout, None);
            }
            // Destroying the pool frees its set
            if self.descriptor_pool != vk::DescriptorPool::null() {
                device.destroy_descriptor_pool(self.descriptor_pool, None);
            }
            if self.set_layout != vk::DescriptorSetLayout::null() {
                device.destroy_descriptor_set_layout(self.set_layout, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
