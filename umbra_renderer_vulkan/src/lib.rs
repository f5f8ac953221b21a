/*!
# Umbra - Vulkan Renderer Backend

Vulkan half of the Umbra renderer, built on Ash for the bindings and
gpu-allocator for memory management.

Setup order: [`VulkanDevice`] bootstrap, [`UploadBatch`] for the mesh and
material textures, [`ShadowPass`] (built and drawn once), [`ColorPass`].
[`VulkanRenderer`] wires these together and runs the frame loop.

Validation layers and the debug messenger are compiled in only with the
`vulkan-validation` feature.
*/

mod debug;
mod vulkan_buffer;
mod vulkan_color_pass;
mod vulkan_context;
mod vulkan_device;
mod vulkan_mesh;
mod vulkan_pipeline;
mod vulkan_renderer;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_shadow_pass;
mod vulkan_swapchain;
mod vulkan_texture;
mod vulkan_upload;

pub mod umbra {
    pub use crate::vulkan_buffer::GpuBuffer;
    pub use crate::vulkan_color_pass::{ColorPass, ColorPassInputs};
    pub use crate::vulkan_context::{AdapterInfo, GpuContext};
    pub use crate::vulkan_device::{
        choose_depth_format, choose_extent, choose_image_count, choose_present_mode, choose_sample_count,
        choose_surface_format, find_queue_families, is_software_adapter, FrameSync, VulkanDevice,
        DEPTH_FORMAT_CANDIDATES, TEXTURE_FORMAT,
    };
    pub use crate::vulkan_mesh::{GpuMesh, POSITION_STRIDE, SURFACE_STRIDE};
    pub use crate::vulkan_pipeline::{
        BoundResource, DepthBias, DescriptorBinding, GraphicsPipeline, PipelineDesc, ShaderStage, VertexAttribute,
    };
    pub use crate::vulkan_renderer::{CapturedFrame, FrameOutcome, SceneAssets, ShaderPaths, VulkanRenderer};
    pub use crate::vulkan_sampler::{Sampler, SamplerKind};
    pub use crate::vulkan_shader::reflect_push_constant_size;
    pub use crate::vulkan_shadow_pass::{ShadowPass, SHADOW_DEPTH_BIAS};
    pub use crate::vulkan_swapchain::{Swapchain, SwapchainStatus};
    pub use crate::vulkan_texture::{GpuImage, ImageDesc};
    pub use crate::vulkan_upload::{read_buffer, UploadBatch};

    // Validation statistics
    pub use crate::debug::{get_validation_stats, print_validation_stats_report, reset_validation_stats, ValidationStats};
}

pub use umbra::{UploadBatch, VulkanDevice, VulkanRenderer};
pub use umbra::{ColorPass, ShadowPass};

// Re-export ash so callers can name Vulkan types without a direct dependency
pub use ash;
