//! Unit tests for texture.rs

use crate::asset::texture::{load_texture, mip_extent, mip_level_count, TextureData};
use crate::error::Error;

// ============================================================================
// MIP CHAIN
// ============================================================================

#[test]
fn test_mip_level_count() {
    assert_eq!(mip_level_count(1, 1), 1);
    assert_eq!(mip_level_count(4, 4), 3);
    assert_eq!(mip_level_count(512, 512), 10);
    assert_eq!(mip_level_count(1024, 16), 11);
    assert_eq!(mip_level_count(3, 5), 3);
}

#[test]
fn test_mip_level_count_zero_extent() {
    assert_eq!(mip_level_count(0, 0), 1);
}

#[test]
fn test_mip_extent_halves_and_clamps() {
    assert_eq!(mip_extent(8, 2, 0), (8, 2));
    assert_eq!(mip_extent(8, 2, 1), (4, 1));
    assert_eq!(mip_extent(8, 2, 2), (2, 1));
    assert_eq!(mip_extent(8, 2, 3), (1, 1));
    assert_eq!(mip_extent(8, 2, 40), (1, 1));
}

#[test]
fn test_last_mip_is_one_texel() {
    for (w, h) in [(4, 4), (300, 17), (1, 64)] {
        let last = mip_level_count(w, h) - 1;
        assert_eq!(mip_extent(w, h, last), (1, 1));
    }
}

// ============================================================================
// TEXTURE DATA
// ============================================================================

#[test]
fn test_solid_texture() {
    let tex = TextureData::solid(4, 4, [255, 0, 0, 255]).unwrap();
    assert_eq!(tex.byte_size(), 64);
    assert_eq!(tex.mip_levels(), 3);
    assert_eq!(&tex.pixels[60..64], &[255, 0, 0, 255]);
}

#[test]
fn test_new_rejects_size_mismatch() {
    assert!(matches!(
        TextureData::new(2, 2, vec![0; 15]),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_new_rejects_zero_extent() {
    assert!(matches!(TextureData::new(0, 4, Vec::new()), Err(Error::InvalidResource(_))));
}

#[test]
fn test_load_texture_missing_file() {
    assert!(matches!(
        load_texture("definitely/not/here.png"),
        Err(Error::AssetLoadFailed(_))
    ));
}
