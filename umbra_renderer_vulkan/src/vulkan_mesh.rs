/// GpuMesh - device-local copies of a mesh's vertex and index arrays

use umbra_engine::umbra::asset::{MeshData, SurfaceVertex};
use umbra_engine::umbra::{Result, ScratchArena};
use ash::vk;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_upload::UploadBatch;

/// Vertex binding 0: positions (both passes)
pub const POSITION_STRIDE: u32 = std::mem::size_of::<[f32; 3]>() as u32;

/// Vertex binding 1: interleaved normal/tangent/texcoord (color pass only)
pub const SURFACE_STRIDE: u32 = std::mem::size_of::<SurfaceVertex>() as u32;

/// Uploaded mesh
pub struct GpuMesh {
    pub positions: GpuBuffer,
    pub surface: GpuBuffer,
    pub indices: GpuBuffer,
    pub index_count: u32,
}

impl GpuMesh {
    /// Record the mesh upload into `batch`.
    ///
    /// The surface array is interleaved in `arena`; the scratch region is
    /// released before returning (the staging copy has already been made).
    pub fn upload(batch: &mut UploadBatch, arena: &mut ScratchArena, mesh: &MeshData) -> Result<Self> {
        let positions = batch.buffer(mesh.position_bytes(), vk::BufferUsageFlags::VERTEX_BUFFER, "mesh_positions")?;

        let mark = arena.save();
        let surface = mesh
            .interleave_surface(arena)
            .and_then(|bytes| batch.buffer(bytes, vk::BufferUsageFlags::VERTEX_BUFFER, "mesh_surface"));
        arena.restore(mark);
        let surface = surface?;

        let indices = batch.buffer(mesh.index_bytes(), vk::BufferUsageFlags::INDEX_BUFFER, "mesh_indices")?;

        Ok(Self { positions, surface, indices, index_count: mesh.index_count() })
    }

    /// Bind positions only (shadow pass)
    pub fn bind_positions(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.positions.handle()], &[0]);
            device.cmd_bind_index_buffer(command_buffer, self.indices.handle(), 0, vk::IndexType::UINT16);
        }
    }

    /// Bind both vertex arrays (color pass)
    pub fn bind_all(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe {
            device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[self.positions.handle(), self.surface.handle()],
                &[0, 0],
            );
            device.cmd_bind_index_buffer(command_buffer, self.indices.handle(), 0, vk::IndexType::UINT16);
        }
    }

    /// One indexed draw covering the whole mesh
    pub fn draw(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe { device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0) };
    }
}
