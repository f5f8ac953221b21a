//! Texture asset (RGBA8 pixels plus mip chain math)

use std::path::Path;

use crate::engine_error;
use crate::error::{Error, Result};

/// Bytes per RGBA8 texel
pub const BYTES_PER_TEXEL: usize = 4;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels, checking the buffer matches the extent
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture extent must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * BYTES_PER_TEXEL;
        if pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "Texture {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Single-color texture
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let texels = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(texels))
    }

    pub fn mip_levels(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }

    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Number of levels in a full mip chain: `floor(log2(max(w, h))) + 1`
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    u32::BITS - largest.leading_zeros()
}

/// Extent of `level`, each dimension halved per level and clamped to 1
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    let shrink = |size: u32| size.checked_shr(level).unwrap_or(0).max(1);
    (shrink(width), shrink(height))
}

/// Load an image file and convert it to RGBA8
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|e| {
        engine_error!("umbra::asset", "Failed to load texture {}: {}", path.display(), e);
        Error::AssetLoadFailed(format!("{}: {}", path.display(), e))
    })?;

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    TextureData::new(width, height, rgba.into_raw())
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
