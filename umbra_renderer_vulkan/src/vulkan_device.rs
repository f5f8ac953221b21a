/// VulkanDevice - instance, adapter selection, logical device and swapchain
///
/// Bootstrap picks the first adapter that passes every capability check
/// (discrete GPUs are tried first), creates the logical device, allocator,
/// command pool, swapchain and the per-slot synchronization objects.

use umbra_engine::umbra::config::{RendererConfig, MAX_FRAMES_IN_FLIGHT, MAX_MSAA_SAMPLES};
use umbra_engine::umbra::{Error, Result, WindowHost};
use umbra_engine::host::is_degenerate_extent;
use umbra_engine::{engine_debug, engine_err, engine_error, engine_info};
#[cfg(feature = "vulkan-validation")]
use umbra_engine::engine_warn;
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::{AdapterInfo, GpuContext, GpuContextParts};
use crate::vulkan_swapchain::Swapchain;

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Optimal-tiling features the depth format needs: it is the shadow pass
/// attachment and is then read through a filtered compare sampler
pub const SHADOW_DEPTH_FEATURES: vk::FormatFeatureFlags = vk::FormatFeatureFlags::from_raw(
    vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT.as_raw()
        | vk::FormatFeatureFlags::SAMPLED_IMAGE.as_raw()
        | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR.as_raw(),
);

/// Format every material texture is uploaded in
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

// ===== SELECTION HELPERS =====

/// `B8G8R8A8_SRGB` + `SRGB_NONLINEAR` if offered, else the first format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// `MAILBOX` if offered, else `FIFO` (always available)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Highest sample count supported by both color and depth framebuffers, capped at 8x
pub fn choose_sample_count(color: vk::SampleCountFlags, depth: vk::SampleCountFlags) -> vk::SampleCountFlags {
    let shared = color & depth;
    [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ]
    .into_iter()
    .filter(|&count| count.as_raw() <= MAX_MSAA_SAMPLES)
    .find(|&count| shared.contains(count))
    .unwrap_or(vk::SampleCountFlags::TYPE_1)
}

/// CPU (software rasterizer) and virtual adapters are never selected
pub fn is_software_adapter(device_type: vk::PhysicalDeviceType) -> bool {
    device_type == vk::PhysicalDeviceType::CPU || device_type == vk::PhysicalDeviceType::VIRTUAL_GPU
}

/// `currentExtent` when the surface dictates it, else the window size clamped to the limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, (width, height): (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// `minImageCount + 1`, clamped to `maxImageCount` (0 means unbounded)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// True if `features` cover every use of the shadow depth format
pub fn supports_shadow_depth(features: vk::FormatFeatureFlags) -> bool {
    features.contains(SHADOW_DEPTH_FEATURES)
}

/// First candidate depth format whose optimal-tiling features pass `supports`
pub fn choose_depth_format(supports: impl Fn(vk::Format) -> bool) -> Option<vk::Format> {
    DEPTH_FORMAT_CANDIDATES.into_iter().find(|&format| supports(format))
}

/// Graphics and present family indices, preferring one family that does both
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<(u32, u32)> {
    let graphics: Vec<u32> = families
        .iter()
        .enumerate()
        .filter(|(_, family)| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(i, _)| i as u32)
        .collect();
    let present: Vec<u32> = (0..families.len() as u32).filter(|&i| supports_present(i)).collect();

    if let Some(&shared) = graphics.iter().find(|i| present.contains(i)) {
        return Some((shared, shared));
    }
    Some((*graphics.first()?, *present.first()?))
}

// ===== ADAPTER EVALUATION =====

struct AdapterCandidate {
    physical_device: vk::PhysicalDevice,
    device_type: vk::PhysicalDeviceType,
    graphics_family: u32,
    present_family: u32,
    info: AdapterInfo,
}

unsafe fn evaluate_adapter(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> std::result::Result<AdapterCandidate, String> {
    let properties = instance.get_physical_device_properties(physical_device);
    let name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed adapter>".to_string());

    if is_software_adapter(properties.device_type) {
        return Err(format!("{}: software or virtual adapter", name));
    }

    let features = instance.get_physical_device_features(physical_device);
    if features.sampler_anisotropy == vk::FALSE {
        return Err(format!("{}: no sampler anisotropy", name));
    }

    let texture_format = instance.get_physical_device_format_properties(physical_device, TEXTURE_FORMAT);
    if !texture_format
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
    {
        return Err(format!("{}: {:?} does not support linear filtering", name, TEXTURE_FORMAT));
    }

    let extensions = instance
        .enumerate_device_extension_properties(physical_device)
        .map_err(|e| format!("{}: cannot enumerate extensions: {:?}", name, e))?;
    let has_swapchain = extensions
        .iter()
        .any(|ext| ext.extension_name_as_c_str() == Ok(ash::khr::swapchain::NAME));
    if !has_swapchain {
        return Err(format!("{}: VK_KHR_swapchain missing", name));
    }

    let families = instance.get_physical_device_queue_family_properties(physical_device);
    let (graphics_family, present_family) = find_queue_families(&families, |index| {
        surface_loader
            .get_physical_device_surface_support(physical_device, index, surface)
            .unwrap_or(false)
    })
    .ok_or_else(|| format!("{}: no graphics + present queue families", name))?;

    let formats = surface_loader
        .get_physical_device_surface_formats(physical_device, surface)
        .map_err(|e| format!("{}: cannot query surface formats: {:?}", name, e))?;
    let surface_format = choose_surface_format(&formats).ok_or_else(|| format!("{}: no surface format", name))?;

    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(physical_device, surface)
        .map_err(|e| format!("{}: cannot query present modes: {:?}", name, e))?;
    if present_modes.is_empty() {
        return Err(format!("{}: no present mode", name));
    }

    let depth_format = choose_depth_format(|format| {
        supports_shadow_depth(
            instance
                .get_physical_device_format_properties(physical_device, format)
                .optimal_tiling_features,
        )
    })
    .ok_or_else(|| format!("{}: no usable depth format", name))?;

    let limits = properties.limits;
    Ok(AdapterCandidate {
        physical_device,
        device_type: properties.device_type,
        graphics_family,
        present_family,
        info: AdapterInfo {
            name,
            surface_format,
            present_mode: choose_present_mode(&present_modes),
            msaa_samples: choose_sample_count(
                limits.framebuffer_color_sample_counts,
                limits.framebuffer_depth_sample_counts,
            ),
            depth_format,
            max_anisotropy: limits.max_sampler_anisotropy,
        },
    })
}

// ===== BOOTSTRAP ROLLBACK =====

/// Cleanup for objects created before [`GpuContext`] owns them.
///
/// Steps run newest first when the rollback is dropped, so an early `?`
/// in bootstrap releases everything made so far. `disarm` hands ownership
/// over to the context.
#[derive(Default)]
pub(crate) struct Rollback {
    steps: Vec<Box<dyn FnOnce()>>,
}

impl Rollback {
    pub(crate) fn push(&mut self, step: impl FnOnce() + 'static) {
        self.steps.push(Box::new(step));
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn disarm(mut self) {
        self.steps.clear();
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            engine_debug!("umbra::vulkan", "Rolling back {} bootstrap object(s)", self.len());
        }
        while let Some(step) = self.steps.pop() {
            step();
        }
    }
}

// ===== FRAME SYNC =====

/// Synchronization objects of one frame-in-flight slot
#[derive(Debug, Clone, Copy)]
pub struct FrameSync {
    /// Signaled when the slot's last submission finished (created signaled)
    pub in_flight: vk::Fence,
    /// Signaled by acquire, waited on before color attachment output
    pub image_available: vk::Semaphore,
}

impl FrameSync {
    fn new(device: &ash::Device) -> Result<Self> {
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let semaphore_info = vk::SemaphoreCreateInfo::default();

        unsafe {
            let in_flight = device
                .create_fence(&fence_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create in-flight fence: {:?}", e))?;
            let image_available = device.create_semaphore(&semaphore_info, None).map_err(|e| {
                device.destroy_fence(in_flight, None);
                engine_err!("umbra::vulkan", "Failed to create image-available semaphore: {:?}", e)
            })?;
            Ok(Self { in_flight, image_available })
        }
    }

    unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_fence(self.in_flight, None);
        device.destroy_semaphore(self.image_available, None);
    }
}

// ===== DEVICE =====

/// Device context: shared GPU context, swapchain and per-slot sync objects
pub struct VulkanDevice {
    frames: Vec<FrameSync>,
    swapchain: Swapchain,
    ctx: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Bring up Vulkan for `window`, whose framebuffer is `extent` pixels
    pub fn initialize<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        extent: (u32, u32),
        config: &RendererConfig,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let validation = Self::validation_requested(&entry, config);
            let instance = Self::create_instance(&entry, display_handle.as_raw(), config, validation)?;

            let mut rollback = Rollback::default();
            {
                let instance = instance.clone();
                rollback.push(move || instance.destroy_instance(None));
            }

            #[cfg(feature = "vulkan-validation")]
            let debug = if validation {
                let messenger = crate::debug::DebugMessenger::new(&entry, &instance, config.debug_severity)?;
                rollback.push(messenger.rollback_step());
                Some(messenger)
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            {
                let surface_loader = surface_loader.clone();
                rollback.push(move || surface_loader.destroy_surface(surface, None));
            }

            let candidate = Self::select_adapter(&instance, &surface_loader, surface)?;
            engine_info!("umbra::vulkan", "Selected GPU: {}", candidate.info.name);
            engine_debug!(
                "umbra::vulkan",
                "MSAA {:?}, depth {:?}, present {:?}",
                candidate.info.msaa_samples,
                candidate.info.depth_format,
                candidate.info.present_mode
            );

            let device = Self::create_logical_device(&instance, &candidate)?;
            {
                let device = device.clone();
                rollback.push(move || device.destroy_device(None));
            }

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: candidate.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(candidate.graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = match device.create_command_pool(&pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    // The allocator must go before the device it allocates from
                    drop(allocator);
                    engine_error!("umbra::vulkan", "Failed to create command pool: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create command pool: {:?}", e)));
                }
            };

            // From here on, dropping the context releases everything created so far
            rollback.disarm();
            let ctx = Arc::new(GpuContext::new(GpuContextParts {
                entry,
                instance,
                surface_loader,
                surface,
                physical_device: candidate.physical_device,
                device,
                allocator,
                graphics_queue_family: candidate.graphics_family,
                present_queue_family: candidate.present_family,
                command_pool,
                adapter: candidate.info,
                #[cfg(feature = "vulkan-validation")]
                debug,
            }));

            let swapchain = Swapchain::new(Arc::clone(&ctx), extent)?;

            let mut frames = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                match FrameSync::new(&ctx.device) {
                    Ok(sync) => frames.push(sync),
                    Err(e) => {
                        for sync in &frames {
                            sync.destroy(&ctx.device);
                        }
                        return Err(e);
                    }
                }
            }

            Ok(Self { frames, swapchain, ctx })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    fn validation_requested(entry: &ash::Entry, config: &RendererConfig) -> bool {
        if !config.enable_validation {
            return false;
        }
        let available = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let found = available
            .iter()
            .any(|layer| layer.layer_name_as_c_str() == Ok(c"VK_LAYER_KHRONOS_validation"));
        if !found {
            engine_warn!("umbra::vulkan", "VK_LAYER_KHRONOS_validation not installed, continuing without it");
        }
        found
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_requested(_entry: &ash::Entry, config: &RendererConfig) -> bool {
        if config.enable_validation {
            engine_debug!("umbra::vulkan", "Validation requested but the vulkan-validation feature is off");
        }
        false
    }

    unsafe fn create_instance(
        entry: &ash::Entry,
        display_handle: raw_window_handle::RawDisplayHandle,
        config: &RendererConfig,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = std::ffi::CString::new(config.app_name.as_str())
            .unwrap_or_else(|_| std::ffi::CString::from(c"Umbra"));
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Umbra")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let mut extension_names = ash_window::enumerate_required_extensions(display_handle)
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to get required extensions: {}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
            })?
            .to_vec();

        let mut layer_names = Vec::new();
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry.create_instance(&create_info, None).map_err(|e| {
            engine_error!("umbra::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })
    }

    unsafe fn select_adapter(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<AdapterCandidate> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("umbra::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let mut candidates = Vec::new();
        for physical_device in physical_devices {
            match evaluate_adapter(instance, surface_loader, surface, physical_device) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => engine_debug!("umbra::vulkan", "Skipping adapter {}", reason),
            }
        }

        // Discrete GPUs first, enumeration order otherwise
        candidates.sort_by_key(|c| c.device_type != vk::PhysicalDeviceType::DISCRETE_GPU);
        candidates.into_iter().next().ok_or_else(|| {
            engine_error!("umbra::vulkan", "No suitable GPU found");
            Error::InitializationFailed("No suitable GPU found".to_string())
        })
    }

    unsafe fn create_logical_device(instance: &ash::Instance, candidate: &AdapterCandidate) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(candidate.graphics_family)
            .queue_priorities(&queue_priorities)];
        if candidate.present_family != candidate.graphics_family {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(candidate.present_family)
                    .queue_priorities(&queue_priorities),
            );
        }

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        instance
            .create_device(candidate.physical_device, &create_info, None)
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })
    }

    // ===== ACCESSORS =====

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn frame(&self, slot: usize) -> FrameSync {
        self.frames[slot % self.frames.len()]
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    // ===== RESIZE =====

    /// Block until the host reports a drawable (non-zero) framebuffer extent
    pub fn wait_for_drawable_extent(host: &mut dyn WindowHost) -> (u32, u32) {
        let mut extent = host.framebuffer_extent();
        while is_degenerate_extent(extent) {
            host.wait_events();
            extent = host.framebuffer_extent();
        }
        extent
    }

    /// Rebuild the swapchain for the host's current extent.
    ///
    /// Blocks while the window is minimized, then waits device idle before
    /// touching anything. Safe to call repeatedly.
    pub fn recreate_swapchain(&mut self, host: &mut dyn WindowHost) -> Result<()> {
        let extent = Self::wait_for_drawable_extent(host);
        self.ctx.wait_idle()?;
        self.swapchain.recreate(extent)
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            for sync in &self.frames {
                sync.destroy(&self.ctx.device);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
