//! Unit tests for shader.rs

use crate::arena::ScratchArena;
use crate::asset::shader::{load_shader, padded_code_size, shader_from_bytes, SPIRV_MAGIC};
use crate::error::Error;

fn fake_module(words: usize) -> Vec<u8> {
    let mut code = vec![SPIRV_MAGIC, 0x0001_0000];
    code.resize(words, 0xdead_beef);
    bytemuck::cast_slice(&code).to_vec()
}

#[test]
fn test_padded_code_size() {
    assert_eq!(padded_code_size(4), 32);
    assert_eq!(padded_code_size(32), 32);
    assert_eq!(padded_code_size(36), 64);
}

#[test]
fn test_shader_from_bytes_pads_with_zeros() {
    let mut arena = ScratchArena::with_capacity(1024).unwrap();

    // Dirty the region first so the zero padding is observable
    let mark = arena.save();
    arena.push_copy(&[0xffu8; 64]).unwrap();
    arena.restore(mark);

    let bytes = fake_module(9);
    let code = shader_from_bytes(&arena, &bytes).unwrap();
    assert_eq!(code.byte_len(), 36);
    assert_eq!(code.words().len(), 9);
    assert_eq!(code.padded_words().len(), 16);
    assert!(code.padded_words()[9..].iter().all(|&w| w == 0));
    assert_eq!(code.words()[0], SPIRV_MAGIC);
}

#[test]
fn test_shader_rejects_bad_magic() {
    let arena = ScratchArena::with_capacity(1024).unwrap();
    let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
    assert!(matches!(shader_from_bytes(&arena, &bytes), Err(Error::AssetLoadFailed(_))));
}

#[test]
fn test_shader_rejects_unaligned_size() {
    let arena = ScratchArena::with_capacity(1024).unwrap();
    let mut bytes = fake_module(4);
    bytes.pop();
    assert!(matches!(shader_from_bytes(&arena, &bytes), Err(Error::AssetLoadFailed(_))));
}

#[test]
fn test_shader_arena_exhausted() {
    let arena = ScratchArena::with_capacity(64).unwrap();
    let bytes = fake_module(32);
    assert!(matches!(
        shader_from_bytes(&arena, &bytes),
        Err(Error::ArenaExhausted { requested: 128, .. })
    ));
}

#[test]
fn test_load_shader_from_file() {
    let path = std::env::temp_dir().join("umbra_shader_test.spv");
    std::fs::write(&path, fake_module(10)).unwrap();

    let arena = ScratchArena::with_capacity(1024).unwrap();
    let code = load_shader(&arena, &path).unwrap();
    assert_eq!(code.byte_len(), 40);
    assert_eq!(code.words()[1], 0x0001_0000);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_load_shader_missing_file() {
    let arena = ScratchArena::with_capacity(1024).unwrap();
    assert!(matches!(
        load_shader(&arena, "definitely/not/here.spv"),
        Err(Error::AssetLoadFailed(_))
    ));
    assert_eq!(arena.used(), 0);
}
