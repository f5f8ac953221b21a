//! Asset loading: mesh, textures and shader bytecode

pub mod mesh;
pub mod shader;
pub mod texture;

pub use mesh::{assemble_mesh, load_mesh, AttributeKind, MeshData, RawAttribute, RawMesh, RawPrimitive, SurfaceVertex};
pub use shader::{load_shader, shader_from_bytes, ShaderCode};
pub use texture::{load_texture, mip_extent, mip_level_count, TextureData};
