//! SPIR-V shader loading into the scratch arena

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::arena::ScratchArena;
use crate::config::SHADER_CODE_ALIGNMENT;
use crate::engine_error;
use crate::error::{Error, Result};

/// SPIR-V magic number (first word of every module)
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Shader bytecode living in a scratch arena region
///
/// The region is zero-padded to [`SHADER_CODE_ALIGNMENT`] bytes; `words()`
/// only exposes the module itself.
#[derive(Debug, Clone, Copy)]
pub struct ShaderCode<'a> {
    padded: &'a [u32],
    byte_len: usize,
}

impl<'a> ShaderCode<'a> {
    /// Module words, without padding
    pub fn words(&self) -> &'a [u32] {
        &self.padded[..self.byte_len / 4]
    }

    /// Full padded region
    pub fn padded_words(&self) -> &'a [u32] {
        self.padded
    }

    /// Size of the module in bytes, without padding
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

/// Round a bytecode size up to the shader padding boundary
pub fn padded_code_size(byte_len: usize) -> usize {
    byte_len.div_ceil(SHADER_CODE_ALIGNMENT) * SHADER_CODE_ALIGNMENT
}

fn load_failed(path: &Path, reason: String) -> Error {
    engine_error!("umbra::asset", "Failed to load shader {}: {}", path.display(), reason);
    Error::AssetLoadFailed(format!("{}: {}", path.display(), reason))
}

/// Copy SPIR-V bytecode into the arena, zero-padded
pub fn shader_from_bytes<'a>(arena: &'a ScratchArena, bytes: &[u8]) -> Result<ShaderCode<'a>> {
    let region = push_padded(arena, bytes.len())?;
    region[..bytes.len()].copy_from_slice(bytes);
    finish(region, bytes.len()).map_err(Error::AssetLoadFailed)
}

/// Read a SPIR-V file straight into the arena, zero-padded
pub fn load_shader<'a>(arena: &'a ScratchArena, path: impl AsRef<Path>) -> Result<ShaderCode<'a>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| load_failed(path, e.to_string()))?;
    let byte_len = file
        .metadata()
        .map_err(|e| load_failed(path, e.to_string()))?
        .len() as usize;

    let region = push_padded(arena, byte_len)?;
    file.read_exact(&mut region[..byte_len])
        .map_err(|e| load_failed(path, e.to_string()))?;

    finish(region, byte_len).map_err(|reason| load_failed(path, reason))
}

fn push_padded(arena: &ScratchArena, byte_len: usize) -> Result<&mut [u8]> {
    let padded = padded_code_size(byte_len);
    let remaining = arena.remaining();
    arena
        .push(padded)
        .ok_or(Error::ArenaExhausted { requested: padded, remaining })
}

fn finish(region: &mut [u8], byte_len: usize) -> std::result::Result<ShaderCode<'_>, String> {
    if byte_len == 0 || byte_len % 4 != 0 {
        return Err(format!("bytecode size {} is not a non-zero multiple of 4", byte_len));
    }

    // Arena memory is reused after a restore, so the tail may hold old bytes
    region[byte_len..].fill(0);

    let padded: &[u32] = bytemuck::try_cast_slice(&*region).map_err(|e| format!("{:?}", e))?;
    if padded[0] != SPIRV_MAGIC {
        return Err(format!("bad SPIR-V magic 0x{:08x}", padded[0]));
    }

    Ok(ShaderCode { padded, byte_len })
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
