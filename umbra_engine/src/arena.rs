//! Scratch arena
//!
//! A fixed-capacity bump allocator for transient, call-scoped byte buffers
//! (shader bytecode, interleaved vertex data waiting to be staged).
//! Regions are 64-byte aligned and only released in bulk by rolling the
//! cursor back to a saved mark.
//!
//! Borrowing rules carry the lifetime discipline: `push` hands out disjoint
//! regions through `&self`, while `promise` and `restore` need `&mut self`,
//! so no region can be alive across a rollback.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use crate::config::SCRATCH_ARENA_CAPACITY;
use crate::error::{Error, Result};

/// Alignment of every region handed out by the arena
pub const ARENA_ALIGNMENT: usize = 64;

/// Cursor checkpoint returned by [`ScratchArena::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaMark(usize);

impl ArenaMark {
    /// Byte offset of the cursor when the mark was taken
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Fixed-capacity monotonic byte arena
pub struct ScratchArena {
    base: NonNull<u8>,
    layout: Layout,
    cursor: Cell<usize>,
}

impl ScratchArena {
    /// Create an arena with the default capacity (32 MiB)
    pub fn new() -> Result<Self> {
        Self::with_capacity(SCRATCH_ARENA_CAPACITY)
    }

    /// Create an arena with an explicit capacity (rounded up to the alignment)
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = align_up(capacity.max(ARENA_ALIGNMENT));
        let layout = Layout::from_size_align(capacity, ARENA_ALIGNMENT)
            .map_err(|e| Error::InitializationFailed(format!("Invalid arena layout: {}", e)))?;

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or_else(|| {
            Error::InitializationFailed(format!("Failed to reserve {} bytes of scratch memory", capacity))
        })?;

        Ok(Self { base, layout, cursor: Cell::new(0) })
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bytes currently pushed
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor.get()
    }

    /// Peek at the next region of at least `size` bytes without allocating it.
    ///
    /// Returns `None` when the region would not fit.
    pub fn promise(&mut self, size: usize) -> Option<&mut [u8]> {
        let offset = self.cursor.get();
        self.fits(offset, size)?;
        // SAFETY: &mut self guarantees no other region aliases [offset, capacity).
        Some(unsafe { self.region(offset, size) })
    }

    /// Allocate a region of at least `size` bytes and advance the cursor.
    ///
    /// Returns `None` (and leaves the cursor untouched) when the region would not fit.
    #[allow(clippy::mut_from_ref)]
    pub fn push(&self, size: usize) -> Option<&mut [u8]> {
        let offset = self.cursor.get();
        let end = self.fits(offset, size)?;
        self.cursor.set(end);
        // SAFETY: [offset, end) lies past every region handed out since the last
        // restore, and restore needs &mut self, so the new region is unaliased.
        Some(unsafe { self.region(offset, size) })
    }

    /// Push `bytes` into the arena and return the copy
    #[allow(clippy::mut_from_ref)]
    pub fn push_copy(&self, bytes: &[u8]) -> Result<&mut [u8]> {
        let remaining = self.remaining();
        let region = self.push(bytes.len()).ok_or(Error::ArenaExhausted {
            requested: bytes.len(),
            remaining,
        })?;
        region.copy_from_slice(bytes);
        Ok(region)
    }

    /// Checkpoint the cursor
    pub fn save(&self) -> ArenaMark {
        ArenaMark(self.cursor.get())
    }

    /// Roll the cursor back to `mark`, releasing everything pushed since.
    ///
    /// Marks past the current cursor are ignored.
    pub fn restore(&mut self, mark: ArenaMark) {
        if mark.0 <= self.cursor.get() {
            self.cursor.set(mark.0);
        }
    }

    fn fits(&self, offset: usize, size: usize) -> Option<usize> {
        let aligned = size.div_ceil(ARENA_ALIGNMENT).checked_mul(ARENA_ALIGNMENT)?;
        let end = offset.checked_add(aligned)?;
        (end <= self.capacity()).then_some(end)
    }

    /// # Safety
    ///
    /// `[offset, offset + size)` must be in bounds and not aliased by a live region.
    #[allow(clippy::mut_from_ref)]
    unsafe fn region(&self, offset: usize, size: usize) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.base.as_ptr().add(offset), size)
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        // SAFETY: base was allocated with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

/// Round `size` up to the arena alignment
pub fn align_up(size: usize) -> usize {
    size.div_ceil(ARENA_ALIGNMENT) * ARENA_ALIGNMENT
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
