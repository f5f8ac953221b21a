/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything the renderer's components borrow:
/// - Instance, surface and physical device (for swapchain queries)
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics and present queues
/// - Command pool for one-shot and per-frame command buffers

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use umbra_engine::umbra::Result;
use umbra_engine::engine_err;

/// Capabilities of the selected adapter, fixed at startup
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Human-readable device name
    pub name: String,
    /// Swapchain surface format (kept across recreations)
    pub surface_format: vk::SurfaceFormatKHR,
    /// Swapchain present mode
    pub present_mode: vk::PresentModeKHR,
    /// MSAA sample count used by the color pass
    pub msaa_samples: vk::SampleCountFlags,
    /// Depth attachment format
    pub depth_format: vk::Format,
    /// Anisotropy ceiling for the material sampler
    pub max_anisotropy: f32,
}

/// Shared GPU context for all Vulkan resources.
///
/// Every GPU resource keeps an `Arc<GpuContext>`, so the context is the last
/// Vulkan object alive and its `Drop` tears down device and instance.
pub struct GpuContext {
    /// Vulkan entry (keeps the loader library mapped)
    _entry: ash::Entry,

    /// Vulkan instance
    pub instance: ash::Instance,

    /// Surface loader and window surface
    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,

    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// Present queue (may be the same as graphics)
    pub present_queue: vk::Queue,
    pub present_queue_family: u32,

    /// Command pool for every command buffer the renderer allocates
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub command_pool: Mutex<vk::CommandPool>,

    /// Selected adapter capabilities
    pub adapter: AdapterInfo,

    /// Validation messenger (only with the `vulkan-validation` feature)
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug: Option<crate::debug::DebugMessenger>,
}

/// Everything the bootstrap hands over to [`GpuContext::new`]
pub(crate) struct GpuContextParts {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub allocator: Allocator,
    pub graphics_queue_family: u32,
    pub present_queue_family: u32,
    pub command_pool: vk::CommandPool,
    pub adapter: AdapterInfo,
    #[cfg(feature = "vulkan-validation")]
    pub debug: Option<crate::debug::DebugMessenger>,
}

impl GpuContext {
    pub(crate) fn new(parts: GpuContextParts) -> Self {
        // SAFETY: both families were requested with one queue at device creation.
        let (graphics_queue, present_queue) = unsafe {
            (
                parts.device.get_device_queue(parts.graphics_queue_family, 0),
                parts.device.get_device_queue(parts.present_queue_family, 0),
            )
        };

        Self {
            _entry: parts.entry,
            instance: parts.instance,
            surface_loader: parts.surface_loader,
            surface: parts.surface,
            physical_device: parts.physical_device,
            device: parts.device,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(parts.allocator))),
            graphics_queue,
            graphics_queue_family: parts.graphics_queue_family,
            present_queue,
            present_queue_family: parts.present_queue_family,
            command_pool: Mutex::new(parts.command_pool),
            adapter: parts.adapter,
            #[cfg(feature = "vulkan-validation")]
            debug: parts.debug,
        }
    }

    /// Allocate primary command buffers from the shared pool
    pub fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let pool = self
            .command_pool
            .lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Command pool mutex poisoned"))?;

        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .allocate_command_buffers(&info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to allocate {} command buffer(s): {:?}", count, e))
        }
    }

    /// Return command buffers to the shared pool
    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if let Ok(pool) = self.command_pool.lock() {
            unsafe { self.device.free_command_buffers(*pool, command_buffers) };
        }
    }

    /// Allocate and begin a single-use command buffer
    pub fn begin_one_shot(&self) -> Result<vk::CommandBuffer> {
        let command_buffer = self.allocate_command_buffers(1)?[0];
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            if let Err(e) = self.device.begin_command_buffer(command_buffer, &begin_info) {
                self.free_command_buffers(&[command_buffer]);
                return Err(engine_err!("umbra::vulkan", "Failed to begin one-shot command buffer: {:?}", e));
            }
        }
        Ok(command_buffer)
    }

    /// End, submit on the graphics queue, wait queue idle, free the buffer
    pub fn submit_one_shot(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let result = unsafe { self.submit_and_wait(command_buffer) };
        self.free_command_buffers(&[command_buffer]);
        result
    }

    unsafe fn submit_and_wait(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to end one-shot command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device
            .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit one-shot commands: {:?}", e))?;

        self.device
            .queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for one-shot completion: {:?}", e))
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    /// Format properties of the selected adapter
    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }
}

impl GpuContext {
    #[cfg(feature = "vulkan-validation")]
    fn destroy_debug_messenger(&mut self) {
        if let Some(debug) = self.debug.take() {
            debug.destroy();
        }
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn destroy_debug_messenger(&mut self) {}
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Command pool (frees every command buffer still allocated)
            if let Ok(pool) = self.command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 2. Allocator: free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Device
            self.device.destroy_device(None);

            // 4. Surface
            self.surface_loader.destroy_surface(self.surface, None);

            // 5. Debug messenger, before the instance
            self.destroy_debug_messenger();

            // 6. Instance
            self.instance.destroy_instance(None);
        }
    }
}
