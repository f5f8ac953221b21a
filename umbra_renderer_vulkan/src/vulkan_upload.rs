/// UploadBatch - staging-buffer upload of meshes and textures
///
/// Every asset goes through the same protocol: a device-local destination,
/// a host-visible staging buffer of the same size, a copy through the
/// persistent mapping and a recorded transfer. One command buffer collects
/// every transfer of the batch; `finish()` submits it once, waits for the
/// queue to drain and frees the staging buffers.

use umbra_engine::umbra::asset::{mip_extent, TextureData};
use umbra_engine::umbra::{Error, Result};
use umbra_engine::{engine_debug, engine_err, engine_error};
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_device::TEXTURE_FORMAT;
use crate::vulkan_texture::{GpuImage, ImageDesc};

/// One open upload command buffer plus the staging buffers it reads from
pub struct UploadBatch {
    ctx: Arc<GpuContext>,
    command_buffer: vk::CommandBuffer,
    staging: Vec<GpuBuffer>,
}

impl UploadBatch {
    /// Allocate and begin the batch's command buffer
    pub fn begin(ctx: Arc<GpuContext>) -> Result<Self> {
        let command_buffer = ctx.begin_one_shot()?;
        Ok(Self { ctx, command_buffer, staging: Vec::new() })
    }

    /// Number of staging buffers waiting for submission
    pub fn pending(&self) -> usize {
        self.staging.len()
    }

    fn stage(&mut self, bytes: &[u8], name: &str) -> Result<vk::Buffer> {
        let staging = GpuBuffer::new(
            Arc::clone(&self.ctx),
            bytes.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        staging.write(0, bytes)?;
        let handle = staging.handle();
        self.staging.push(staging);
        Ok(handle)
    }

    /// Upload `bytes` into a new device-local buffer with `usage`
    pub fn buffer(&mut self, bytes: &[u8], usage: vk::BufferUsageFlags, name: &str) -> Result<GpuBuffer> {
        if bytes.is_empty() {
            engine_error!("umbra::vulkan", "Refusing to upload empty buffer '{}'", name);
            return Err(Error::InvalidResource(format!("Buffer '{}' has no data", name)));
        }

        let size = bytes.len() as u64;
        let destination = GpuBuffer::new(
            Arc::clone(&self.ctx),
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::GpuOnly,
            name,
        )?;
        let staging = self.stage(bytes, "upload_staging_buffer")?;

        let region = vk::BufferCopy::default().src_offset(0).dst_offset(0).size(size);
        unsafe {
            self.ctx
                .device
                .cmd_copy_buffer(self.command_buffer, staging, destination.handle(), &[region]);
        }
        Ok(destination)
    }

    /// Upload a texture's level 0 and generate the rest of its mip chain by linear blits
    pub fn texture(&mut self, texture: &TextureData, name: &str) -> Result<GpuImage> {
        let features = self.ctx.format_properties(TEXTURE_FORMAT).optimal_tiling_features;
        if !features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR) {
            engine_error!("umbra::vulkan", "{:?} does not support linear blits, cannot build mip chain", TEXTURE_FORMAT);
            return Err(Error::InitializationFailed(format!(
                "{:?} does not support linear blit filtering",
                TEXTURE_FORMAT
            )));
        }

        let mip_levels = texture.mip_levels();
        let image = GpuImage::new(
            Arc::clone(&self.ctx),
            &ImageDesc::new(
                name,
                vk::Extent2D { width: texture.width, height: texture.height },
                TEXTURE_FORMAT,
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::TRANSFER_SRC,
                vk::ImageAspectFlags::COLOR,
            )
            .mip_levels(mip_levels),
        )?;
        let staging = self.stage(&texture.pixels, "texture_staging_buffer")?;

        let device = &self.ctx.device;
        let command_buffer = self.command_buffer;
        let level_range = |base_mip_level: u32, level_count: u32| vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        };
        let level_layers = |mip_level: u32| vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level,
            base_array_layer: 0,
            layer_count: 1,
        };
        let barrier = |range: vk::ImageSubresourceRange,
                       old_layout: vk::ImageLayout,
                       new_layout: vk::ImageLayout,
                       src_access: vk::AccessFlags,
                       dst_access: vk::AccessFlags| {
            vk::ImageMemoryBarrier::default()
                .old_layout(old_layout)
                .new_layout(new_layout)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image.handle())
                .subresource_range(range)
                .src_access_mask(src_access)
                .dst_access_mask(dst_access)
        };

        unsafe {
            // All levels: UNDEFINED -> TRANSFER_DST
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier(
                    level_range(0, mip_levels),
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::AccessFlags::empty(),
                    vk::AccessFlags::TRANSFER_WRITE,
                )],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(level_layers(0))
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width: texture.width, height: texture.height, depth: 1 });
            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging,
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            for mip in 1..mip_levels {
                let src_mip = mip - 1;
                let (src_width, src_height) = mip_extent(texture.width, texture.height, src_mip);
                let (dst_width, dst_height) = mip_extent(texture.width, texture.height, mip);

                device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[barrier(
                        level_range(src_mip, 1),
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::AccessFlags::TRANSFER_READ,
                    )],
                );

                let blit = vk::ImageBlit::default()
                    .src_subresource(level_layers(src_mip))
                    .src_offsets([
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: src_width as i32, y: src_height as i32, z: 1 },
                    ])
                    .dst_subresource(level_layers(mip))
                    .dst_offsets([
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: dst_width as i32, y: dst_height as i32, z: 1 },
                    ]);
                device.cmd_blit_image(
                    command_buffer,
                    image.handle(),
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );

                // Source level is final
                device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[barrier(
                        level_range(src_mip, 1),
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::AccessFlags::TRANSFER_READ,
                        vk::AccessFlags::SHADER_READ,
                    )],
                );
            }

            // Last level was only ever written
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier(
                    level_range(mip_levels - 1, 1),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::AccessFlags::TRANSFER_WRITE,
                    vk::AccessFlags::SHADER_READ,
                )],
            );
        }

        engine_debug!(
            "umbra::vulkan",
            "Recorded upload of texture '{}' ({}x{}, {} mip levels)",
            name,
            texture.width,
            texture.height,
            mip_levels
        );
        Ok(image)
    }

    /// Submit every recorded transfer, wait for completion, free the staging buffers
    pub fn finish(mut self) -> Result<()> {
        let command_buffer = std::mem::replace(&mut self.command_buffer, vk::CommandBuffer::null());
        let result = self.ctx.submit_one_shot(command_buffer);
        engine_debug!("umbra::vulkan", "Upload batch finished, releasing {} staging buffer(s)", self.staging.len());
        self.staging.clear();
        result
    }
}

impl Drop for UploadBatch {
    fn drop(&mut self) {
        // Abandoned batch: the command buffer was never submitted
        if self.command_buffer != vk::CommandBuffer::null() {
            self.ctx.free_command_buffers(&[self.command_buffer]);
        }
        self.staging.clear();
    }
}

/// Copy a device-local buffer into host memory and return its bytes.
///
/// The buffer must have been created with `TRANSFER_SRC` usage (every
/// buffer made by [`UploadBatch::buffer`] is).
pub fn read_buffer(ctx: &Arc<GpuContext>, source: &GpuBuffer) -> Result<Vec<u8>> {
    let readback = GpuBuffer::new(
        Arc::clone(ctx),
        source.size(),
        vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuToCpu,
        "readback_buffer",
    )?;

    let command_buffer = ctx.begin_one_shot()?;
    let region = vk::BufferCopy::default().size(source.size());
    unsafe {
        ctx.device
            .cmd_copy_buffer(command_buffer, source.handle(), readback.handle(), &[region]);

        let barrier = vk::BufferMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::HOST_READ)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(readback.handle())
            .offset(0)
            .size(vk::WHOLE_SIZE);
        ctx.device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::HOST,
            vk::DependencyFlags::empty(),
            &[],
            &[barrier],
            &[],
        );
    }
    ctx.submit_one_shot(command_buffer)
        .map_err(|e| engine_err!("umbra::vulkan", "Buffer readback failed: {}", e))?;

    readback.read_mapped()
}
