/// VulkanRenderer - setup sequence and per-frame loop
///
/// Setup: device bootstrap, asset upload, shadow pass (built and drawn once),
/// color pass. Each frame waits for its slot's fence, acquires a swapchain
/// image, records the color pass, submits and presents. Stale swapchains and
/// resize notifications trigger a full swapchain recreation.

use umbra_engine::umbra::asset::{load_shader, MeshData, TextureData};
use umbra_engine::umbra::camera::{CameraTransform, ColorPushConstants};
use umbra_engine::umbra::config::{
    RendererConfig, SCENE_FRAGMENT_SHADER_PATH, SCENE_VERTEX_SHADER_PATH, SHADOW_VERTEX_SHADER_PATH,
};
use umbra_engine::umbra::{Result, ScratchArena, WindowHost};
use umbra_engine::{engine_debug, engine_err, engine_info};
use ash::vk;
use glam::Mat4;
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::path::PathBuf;
use std::sync::Arc;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_color_pass::{ColorPass, ColorPassInputs};
use crate::vulkan_context::GpuContext;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_mesh::GpuMesh;
use crate::vulkan_shadow_pass::ShadowPass;
use crate::vulkan_texture::GpuImage;
use crate::vulkan_upload::UploadBatch;

/// SPIR-V files for the three shader stages
#[derive(Debug, Clone)]
pub struct ShaderPaths {
    pub shadow_vertex: PathBuf,
    pub scene_vertex: PathBuf,
    pub scene_fragment: PathBuf,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            shadow_vertex: SHADOW_VERTEX_SHADER_PATH.into(),
            scene_vertex: SCENE_VERTEX_SHADER_PATH.into(),
            scene_fragment: SCENE_FRAGMENT_SHADER_PATH.into(),
        }
    }
}

/// Decoded assets the renderer uploads at startup
pub struct SceneAssets<'a> {
    pub mesh: &'a MeshData,
    pub albedo: &'a TextureData,
    pub normal: &'a TextureData,
    pub shaders: ShaderPaths,
}

/// Copy of a presented swapchain image
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    /// Tightly packed rows of 4-byte texels, in swapchain channel order
    pub pixels: Vec<u8>,
}

impl CapturedFrame {
    /// Texel at `(x, y)` as RGBA
    pub fn rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let texel = self.pixels.get(offset..offset + 4)?;
        Some(match self.format {
            vk::Format::B8G8R8A8_SRGB | vk::Format::B8G8R8A8_UNORM => [texel[2], texel[1], texel[0], texel[3]],
            _ => [texel[0], texel[1], texel[2], texel[3]],
        })
    }
}

/// Outcome of one pass through the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Submitted and presented
    Presented,
    /// Swapchain was out of date at acquire; it was recreated and nothing was drawn
    Skipped,
}

pub struct VulkanRenderer {
    // Field order is drop order: passes and resources before the device
    color_pass: ColorPass,
    shadow_pass: ShadowPass,
    // Sampled through the color pass descriptor set; held so they outlive it
    _normal: GpuImage,
    _albedo: GpuImage,
    mesh: GpuMesh,
    device: VulkanDevice,
    current_frame: usize,
    resized: bool,
    frame_count: u64,
}

impl VulkanRenderer {
    /// Bring up the device, upload the scene and build both passes.
    ///
    /// `arena` holds the shader bytecode and the interleaved vertex array
    /// while they are needed; it is restored to its entry state on return.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        window_extent: (u32, u32),
        config: &RendererConfig,
        arena: &mut ScratchArena,
        assets: SceneAssets,
    ) -> Result<Self> {
        let device = VulkanDevice::initialize(window, window_extent, config)?;
        let ctx = Arc::clone(device.context());

        let mut batch = UploadBatch::begin(Arc::clone(&ctx))?;
        let mesh = GpuMesh::upload(&mut batch, arena, assets.mesh)?;
        let albedo = batch.texture(assets.albedo, "albedo_texture")?;
        let normal = batch.texture(assets.normal, "normal_texture")?;
        batch.finish()?;
        engine_debug!(
            "umbra::vulkan",
            "Scene uploaded: {} vertices, {} indices",
            assets.mesh.vertex_count(),
            mesh.index_count
        );

        let mark = arena.save();
        let passes = Self::build_passes(&ctx, &device, arena, &assets.shaders, &mesh, &albedo, &normal);
        arena.restore(mark);
        let (shadow_pass, color_pass) = passes?;

        engine_info!(
            "umbra::vulkan",
            "Renderer ready: {}x{} swapchain, {} images, {:?}",
            device.swapchain().extent().width,
            device.swapchain().extent().height,
            device.swapchain().image_count(),
            ctx.adapter.msaa_samples
        );

        Ok(Self {
            color_pass,
            shadow_pass,
            _normal: normal,
            _albedo: albedo,
            mesh,
            device,
            current_frame: 0,
            resized: false,
            frame_count: 0,
        })
    }

    fn build_passes(
        ctx: &Arc<GpuContext>,
        device: &VulkanDevice,
        arena: &ScratchArena,
        shaders: &ShaderPaths,
        mesh: &GpuMesh,
        albedo: &GpuImage,
        normal: &GpuImage,
    ) -> Result<(ShadowPass, ColorPass)> {
        let shadow_vertex = load_shader(arena, &shaders.shadow_vertex)?;
        let scene_vertex = load_shader(arena, &shaders.scene_vertex)?;
        let scene_fragment = load_shader(arena, &shaders.scene_fragment)?;

        let mut shadow_pass = ShadowPass::build(Arc::clone(ctx), shadow_vertex)?;
        shadow_pass.draw(mesh)?;

        let color_pass = ColorPass::build(
            Arc::clone(ctx),
            device.swapchain(),
            ColorPassInputs {
                albedo,
                normal,
                shadow: &shadow_pass,
                vertex_shader: scene_vertex,
                fragment_shader: scene_fragment,
            },
        )?;
        Ok((shadow_pass, color_pass))
    }

    /// Draw and present one frame as seen by `camera`
    pub fn draw_frame(&mut self, host: &mut dyn WindowHost, camera: &CameraTransform) -> Result<FrameOutcome> {
        self.render(host, camera, None)
    }

    /// Draw one frame and copy the presented image back to the host.
    ///
    /// `None` when the swapchain images cannot be read back or when the frame
    /// was skipped.
    pub fn capture_frame(&mut self, host: &mut dyn WindowHost, camera: &CameraTransform) -> Result<Option<CapturedFrame>> {
        let swapchain = self.device.swapchain();
        if !swapchain.supports_readback() {
            return Ok(None);
        }
        let extent = swapchain.extent();
        let format = swapchain.format();
        let readback = GpuBuffer::new(
            Arc::clone(self.device.context()),
            extent.width as u64 * extent.height as u64 * 4,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
            "frame_capture",
        )?;

        if self.render(host, camera, Some(&readback))? != FrameOutcome::Presented {
            return Ok(None);
        }
        self.device.context().wait_idle()?;

        Ok(Some(CapturedFrame {
            width: extent.width,
            height: extent.height,
            format,
            pixels: readback.read_mapped()?,
        }))
    }

    fn render(
        &mut self,
        host: &mut dyn WindowHost,
        camera: &CameraTransform,
        capture: Option<&GpuBuffer>,
    ) -> Result<FrameOutcome> {
        let frame = self.device.frame(self.current_frame);
        let ctx = Arc::clone(self.device.context());

        unsafe {
            ctx.device
                .wait_for_fences(&[frame.in_flight], true, u64::MAX)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for frame fence: {:?}", e))?;
        }

        let Some((image_index, acquire_status)) = self.device.swapchain().acquire_next_image(frame.image_available)?
        else {
            engine_debug!("umbra::vulkan", "Swapchain out of date at acquire");
            self.recreate_swapchain(host)?;
            return Ok(FrameOutcome::Skipped);
        };

        // Only reset once work is guaranteed to be submitted
        unsafe {
            ctx.device
                .reset_fences(&[frame.in_flight])
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to reset frame fence: {:?}", e))?;
        }

        let swapchain = self.device.swapchain();
        let extent = swapchain.extent();
        let capture = capture.filter(|buffer| buffer.size() >= extent.width as u64 * extent.height as u64 * 4);
        let push = ColorPushConstants::new(camera, Mat4::IDENTITY);
        let swapchain_image = swapchain.images()[image_index as usize];
        let command_buffer = self
            .color_pass
            .draw(self.current_frame, image_index, swapchain_image, &self.mesh, &push, capture)?;

        let wait_semaphores = [frame.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [swapchain.render_finished(image_index)];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            ctx.device
                .queue_submit(ctx.graphics_queue, &[submit_info], frame.in_flight)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit frame: {:?}", e))?;
        }

        let present_status = swapchain.present(image_index)?;

        self.frame_count += 1;
        self.current_frame = (self.current_frame + 1) % self.device.frames_in_flight();

        if acquire_status.needs_recreate() || present_status.needs_recreate() || self.resized {
            engine_debug!(
                "umbra::vulkan",
                "Recreating swapchain (acquire {:?}, present {:?}, resized {})",
                acquire_status,
                present_status,
                self.resized
            );
            self.resized = false;
            self.recreate_swapchain(host)?;
        }

        Ok(FrameOutcome::Presented)
    }

    /// Flag the window as resized; the swapchain is rebuilt after the next present
    pub fn notify_resized(&mut self) {
        self.resized = true;
    }

    /// Rebuild the swapchain and everything sized to it.
    ///
    /// Blocks while the host reports a zero-sized framebuffer. Safe to call
    /// repeatedly.
    pub fn recreate_swapchain(&mut self, host: &mut dyn WindowHost) -> Result<()> {
        VulkanDevice::wait_for_drawable_extent(host);
        self.device.context().wait_idle()?;

        self.color_pass.release_targets();
        self.device.recreate_swapchain(host)?;
        self.color_pass.rebuild_targets(self.device.swapchain())
    }

    pub fn device(&self) -> &VulkanDevice {
        &self.device
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        self.device.context()
    }

    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.device.swapchain().extent()
    }

    pub fn swapchain_format(&self) -> vk::Format {
        self.device.swapchain().format()
    }

    pub fn swapchain_image_count(&self) -> usize {
        self.device.swapchain().image_count()
    }

    pub fn color_pass(&self) -> &ColorPass {
        &self.color_pass
    }

    pub fn shadow_pass(&self) -> &ShadowPass {
        &self.shadow_pass
    }

    /// Frames presented since startup
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        self.device.context().wait_idle().ok();
        engine_debug!("umbra::vulkan", "Renderer shut down after {} frame(s)", self.frame_count);
    }
}
