/// Swapchain - presentable images for the window surface
///
/// Handles image acquisition, presentation, and recreation on resize.
/// Surface format and present mode are fixed at adapter selection; only the
/// extent (and with it the images) changes on recreation.

use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_debug, engine_err, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_device::{choose_extent, choose_image_count};

/// Result of presenting or acquiring against a possibly stale swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainStatus {
    /// Matches the surface
    Optimal,
    /// Still usable but should be recreated
    Suboptimal,
    /// Unusable, must be recreated
    OutOfDate,
}

impl SwapchainStatus {
    pub fn needs_recreate(self) -> bool {
        self != SwapchainStatus::Optimal
    }
}

/// Vulkan swapchain, its per-image views and per-image present semaphores
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    /// Signaled by the submission rendering image *i*, waited on by its present
    render_finished: Vec<vk::Semaphore>,
    format: vk::Format,
    extent: vk::Extent2D,
    usage: vk::ImageUsageFlags,
}

impl Swapchain {
    /// Create the initial swapchain for a window of `window_extent` pixels
    pub fn new(ctx: Arc<GpuContext>, window_extent: (u32, u32)) -> Result<Self> {
        let loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
        let mut swapchain = Self {
            format: ctx.adapter.surface_format.format,
            ctx,
            loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            render_finished: Vec::new(),
            extent: vk::Extent2D::default(),
            usage: vk::ImageUsageFlags::empty(),
        };
        swapchain.rebuild(window_extent)?;
        Ok(swapchain)
    }

    /// Rebuild for a new window extent, handing the old swapchain to the driver.
    ///
    /// The caller guarantees the device is idle.
    pub fn recreate(&mut self, window_extent: (u32, u32)) -> Result<()> {
        self.rebuild(window_extent)
    }

    fn rebuild(&mut self, window_extent: (u32, u32)) -> Result<()> {
        unsafe {
            // Views and semaphores of the old images go first
            self.destroy_image_objects();

            let capabilities = self
                .ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.ctx.surface)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let extent = choose_extent(&capabilities, window_extent);
            let image_count = choose_image_count(&capabilities);

            // TRANSFER_SRC lets tests read the presented image back
            let usage = vk::ImageUsageFlags::COLOR_ATTACHMENT
                | (capabilities.supported_usage_flags & vk::ImageUsageFlags::TRANSFER_SRC);

            let families = [self.ctx.graphics_queue_family, self.ctx.present_queue_family];
            let old_swapchain = self.swapchain;
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.ctx.surface)
                .min_image_count(image_count)
                .image_format(self.format)
                .image_color_space(self.ctx.adapter.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(usage)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.ctx.adapter.present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            create_info = if families[0] != families[1] {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&families)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self.loader.create_swapchain(&create_info, None).map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

            if old_swapchain != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;
            self.usage = usage;

            self.images = self.loader.get_swapchain_images(swapchain).map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;

            for &image in &self.images {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = self.ctx.device.create_image_view(&create_info, None).map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create swapchain image view: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                })?;
                self.image_views.push(view);

                let semaphore = self
                    .ctx
                    .device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| engine_err!("umbra::vulkan", "Failed to create render-finished semaphore: {:?}", e))?;
                self.render_finished.push(semaphore);
            }

            engine_debug!(
                "umbra::vulkan",
                "Swapchain built: {}x{}, {} images, {:?}",
                extent.width,
                extent.height,
                self.images.len(),
                self.format
            );
            Ok(())
        }
    }

    unsafe fn destroy_image_objects(&mut self) {
        for view in self.image_views.drain(..) {
            self.ctx.device.destroy_image_view(view, None);
        }
        for semaphore in self.render_finished.drain(..) {
            self.ctx.device.destroy_semaphore(semaphore, None);
        }
    }

    /// Acquire the next image, signaling `image_available` when it is ready.
    ///
    /// Returns `None` when the swapchain is out of date.
    pub fn acquire_next_image(&self, image_available: vk::Semaphore) -> Result<Option<(u32, SwapchainStatus)>> {
        unsafe {
            match self
                .loader
                .acquire_next_image(self.swapchain, u64::MAX, image_available, vk::Fence::null())
            {
                Ok((index, false)) => Ok(Some((index, SwapchainStatus::Optimal))),
                Ok((index, true)) => Ok(Some((index, SwapchainStatus::Suboptimal))),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
                Err(e) => Err(engine_err!("umbra::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
            }
        }
    }

    /// Semaphore the frame rendering `image_index` signals and presentation waits on
    pub fn render_finished(&self, image_index: u32) -> vk::Semaphore {
        self.render_finished[image_index as usize]
    }

    /// Present `image_index` once its render-finished semaphore is signaled
    pub fn present(&self, image_index: u32) -> Result<SwapchainStatus> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [self.render_finished(image_index)];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self.loader.queue_present(self.ctx.present_queue, &present_info) {
                Ok(false) => Ok(SwapchainStatus::Optimal),
                Ok(true) => Ok(SwapchainStatus::Suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SwapchainStatus::OutOfDate),
                Err(e) => Err(engine_err!("umbra::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// True when images can be copied out (used by frame capture)
    pub fn supports_readback(&self) -> bool {
        self.usage.contains(vk::ImageUsageFlags::TRANSFER_SRC)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            self.destroy_image_objects();
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
