//! Unit tests for arena.rs

use crate::arena::{align_up, ScratchArena, ARENA_ALIGNMENT};
use crate::error::Error;

fn small_arena() -> ScratchArena {
    ScratchArena::with_capacity(1024).unwrap()
}

// ============================================================================
// ALIGNMENT
// ============================================================================

#[test]
fn test_align_up() {
    assert_eq!(align_up(0), 0);
    assert_eq!(align_up(1), 64);
    assert_eq!(align_up(64), 64);
    assert_eq!(align_up(65), 128);
}

#[test]
fn test_regions_are_aligned() {
    let arena = small_arena();
    let a = arena.push(3).unwrap().as_ptr() as usize;
    let b = arena.push(100).unwrap().as_ptr() as usize;
    assert_eq!(a % ARENA_ALIGNMENT, 0);
    assert_eq!(b % ARENA_ALIGNMENT, 0);
    assert_eq!(b - a, 64);
}

#[test]
fn test_default_capacity_is_32_mib() {
    let arena = ScratchArena::new().unwrap();
    assert_eq!(arena.capacity(), 32 * 1024 * 1024);
    assert_eq!(arena.used(), 0);
}

// ============================================================================
// PUSH / PROMISE
// ============================================================================

#[test]
fn test_push_advances_cursor_by_aligned_size() {
    let arena = small_arena();
    let region = arena.push(10).unwrap();
    assert_eq!(region.len(), 10);
    assert_eq!(arena.used(), 64);
    assert_eq!(arena.remaining(), 1024 - 64);
}

#[test]
fn test_promise_does_not_advance() {
    let mut arena = small_arena();
    let len = arena.promise(200).unwrap().len();
    assert_eq!(len, 200);
    assert_eq!(arena.used(), 0);

    // The promised region is the one the next push returns
    let promised = arena.promise(8).unwrap().as_ptr();
    let pushed = arena.push(8).unwrap().as_ptr();
    assert_eq!(promised, pushed);
}

#[test]
fn test_push_over_capacity_fails_without_moving() {
    let arena = small_arena();
    arena.push(512).unwrap();
    let before = arena.used();
    assert!(arena.push(1024).is_none());
    assert_eq!(arena.used(), before);
}

#[test]
fn test_promise_over_capacity_fails() {
    let mut arena = small_arena();
    assert!(arena.promise(1025).is_none());
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_push_exactly_to_capacity() {
    let arena = small_arena();
    assert!(arena.push(1024).is_some());
    assert_eq!(arena.remaining(), 0);
    assert!(arena.push(1).is_none());
    assert!(arena.push(0).is_some());
}

#[test]
fn test_push_huge_size_does_not_overflow() {
    let arena = small_arena();
    assert!(arena.push(usize::MAX).is_none());
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_push_copy() {
    let arena = small_arena();
    let copy = arena.push_copy(&[1, 2, 3, 4]).unwrap();
    assert_eq!(copy, &[1, 2, 3, 4]);
}

#[test]
fn test_push_copy_exhausted_reports_sizes() {
    let arena = small_arena();
    arena.push(1000).unwrap();
    match arena.push_copy(&[0u8; 100]) {
        Err(Error::ArenaExhausted { requested, remaining }) => {
            assert_eq!(requested, 100);
            assert_eq!(remaining, 0);
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
    }
}

// ============================================================================
// SAVE / RESTORE
// ============================================================================

#[test]
fn test_save_push_restore_round_trip() {
    let mut arena = small_arena();
    arena.push(70).unwrap();
    let mark = arena.save();
    let saved = arena.used();

    for size in [1, 63, 64, 65, 200] {
        arena.push(size).unwrap();
    }
    assert!(arena.used() > saved);

    arena.restore(mark);
    assert_eq!(arena.used(), saved);
    assert_eq!(mark.offset(), saved);
}

#[test]
fn test_nested_marks() {
    let mut arena = small_arena();
    let outer = arena.save();
    arena.push(64).unwrap();
    let inner = arena.save();
    arena.push(64).unwrap();

    arena.restore(inner);
    assert_eq!(arena.used(), 64);
    arena.restore(outer);
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_restore_to_future_mark_is_ignored() {
    let mut arena = small_arena();
    arena.push(256).unwrap();
    let mark = arena.save();
    arena.restore(crate::arena::ArenaMark(0));
    arena.restore(mark);
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_region_reused_after_restore() {
    let mut arena = small_arena();
    let mark = arena.save();
    arena.push_copy(&[9u8; 16]).unwrap();
    arena.restore(mark);

    let region = arena.push(16).unwrap();
    assert_eq!(region, &[9u8; 16]);
}
