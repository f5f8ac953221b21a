/// GpuImage - image + view + allocation, used for material textures,
/// the shadow map and the color pass attachments

use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Description of a device-local 2D image
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc<'a> {
    pub name: &'a str,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub aspect: vk::ImageAspectFlags,
    pub mip_levels: u32,
    pub samples: vk::SampleCountFlags,
}

impl<'a> ImageDesc<'a> {
    /// Single-sample, single-level image
    pub fn new(
        name: &'a str,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Self {
        Self {
            name,
            extent,
            format,
            usage,
            aspect,
            mip_levels: 1,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }

    pub fn mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    pub fn samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }
}

/// Device-local Vulkan image with a view over all its levels
pub struct GpuImage {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) allocation: Option<Allocation>,
    extent: vk::Extent2D,
    format: vk::Format,
    mip_levels: u32,
    samples: vk::SampleCountFlags,
}

impl GpuImage {
    pub fn new(ctx: Arc<GpuContext>, desc: &ImageDesc) -> Result<Self> {
        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(desc.format)
                .extent(vk::Extent3D {
                    width: desc.extent.width,
                    height: desc.extent.height,
                    depth: 1,
                })
                .mip_levels(desc.mip_levels)
                .array_layers(1)
                .samples(desc.samples)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(desc.usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create image '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);

            let allocation = match ctx.allocator.lock() {
                Ok(mut allocator) => allocator.allocate(&AllocationCreateDesc {
                    name: desc.name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                }),
                Err(_) => {
                    ctx.device.destroy_image(image, None);
                    return Err(engine_err!("umbra::vulkan", "Allocator mutex poisoned"));
                }
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    ctx.device.destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(
                        "umbra::vulkan",
                        "Out of GPU memory for image '{}' ({}x{}, {:.2} MB)",
                        desc.name,
                        desc.extent.width,
                        desc.extent.height,
                        size_mb
                    );
                    return Err(Error::OutOfMemory);
                }
            };

            // Drop releases whatever exists from here on
            let mut gpu_image = Self {
                ctx,
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                extent: desc.extent,
                format: desc.format,
                mip_levels: desc.mip_levels,
                samples: desc.samples,
            };

            if let Some(allocation) = &gpu_image.allocation {
                gpu_image
                    .ctx
                    .device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("umbra::vulkan", "Failed to bind memory of image '{}': {:?}", desc.name, e))?;
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(desc.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: desc.aspect,
                    base_mip_level: 0,
                    level_count: desc.mip_levels,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            gpu_image.view = gpu_image
                .ctx
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create view of image '{}': {:?}", desc.name, e))?;

            Ok(gpu_image)
        }
    }

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
