/// GpuBuffer - buffer + allocation pair owned by its creator

use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer with its dedicated allocation
pub struct GpuBuffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size in bytes
    pub(crate) size: u64,
}

impl GpuBuffer {
    /// Create a buffer of `size` bytes and bind fresh memory from `location`
    pub fn new(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create buffer '{}' of {} bytes: {:?}", name, size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = match ctx.allocator.lock() {
                    Ok(allocator) => allocator,
                    Err(_) => {
                        ctx.device.destroy_buffer(buffer, None);
                        return Err(engine_err!("umbra::vulkan", "Allocator mutex poisoned"));
                    }
                };
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    ctx.device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("umbra::vulkan", "Out of GPU memory for buffer '{}' (required: {:.2} MB)", name, size_mb);
                    return Err(Error::OutOfMemory);
                }
            };

            // From here on, Drop releases both halves
            let gpu_buffer = Self { ctx, buffer, allocation: Some(allocation), size };

            if let Some(allocation) = &gpu_buffer.allocation {
                gpu_buffer
                    .ctx
                    .device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("umbra::vulkan", "Failed to bind memory of buffer '{}': {:?}", name, e))?;
            }

            Ok(gpu_buffer)
        }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` into the persistent mapping at `offset`
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_error!(
                "umbra::vulkan",
                "Buffer write out of range: offset {} + {} bytes > {} bytes",
                offset,
                data.len(),
                self.size
            );
            return Err(Error::InvalidResource("Buffer write out of range".to_string()));
        }

        let mapped_ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Bytes of a host-visible buffer (the caller has waited for GPU writes)
    pub fn read_mapped(&self) -> Result<Vec<u8>> {
        let mapped_ptr = self.mapped_ptr()?;
        let bytes = unsafe { std::slice::from_raw_parts(mapped_ptr as *const u8, self.size as usize) };
        Ok(bytes.to_vec())
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!("umbra::vulkan", "Buffer has no allocation"))?;
        allocation
            .mapped_ptr()
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
