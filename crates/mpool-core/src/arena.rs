//! Arena carving and the pool registry record.
//!
//! An arena is one OS-mapped region subdivided into equal-size chunks of
//! a single size class. At creation the chunks are pre-linked into an
//! intrusive free list: each free chunk's first machine word holds the
//! address of the next free chunk, and the final chunk's link is null.

use std::mem;
use std::ptr::{self, NonNull};

/// One mapped arena, recorded exactly once at map time and unmapped
/// exactly once at teardown.
#[derive(Debug, Clone, Copy)]
pub struct ArenaRecord {
    /// Base address of the mapping.
    pub base: NonNull<u8>,
    /// Mapped length in bytes (at least one OS page).
    pub len: usize,
}

/// Number of chunks an arena of `len` bytes yields for a class.
///
/// A class larger than the arena length still yields one chunk (the
/// mapping is sized up to the class in that case).
pub fn chunk_count(len: usize, class_size: usize) -> usize {
    (len / class_size).max(1)
}

/// Threads `base..base + len` into a free list of `class_size` chunks
/// and returns the list head (the arena base).
///
/// # Safety
///
/// `base` must point to a fresh, exclusively owned, writable mapping of
/// at least `max(len, class_size)` bytes, aligned to at least
/// `class_size`. `class_size` must be a power of two no smaller than a
/// machine word.
pub unsafe fn carve(base: NonNull<u8>, len: usize, class_size: usize) -> NonNull<u8> {
    debug_assert!(class_size.is_power_of_two());
    debug_assert!(class_size >= mem::size_of::<*mut u8>());

    let count = chunk_count(len, class_size);
    let raw = base.as_ptr();
    for i in 0..count - 1 {
        // SAFETY: both offsets are in bounds and class-aligned, so the
        // link word write is aligned and non-overlapping.
        unsafe {
            let chunk = raw.add(i * class_size);
            let next = raw.add((i + 1) * class_size);
            chunk.cast::<*mut u8>().write(next);
        }
    }
    // Null sentinel marks the end of the arena's list.
    // SAFETY: the last chunk starts in bounds and is class-aligned.
    unsafe {
        raw.add((count - 1) * class_size).cast::<*mut u8>().write(ptr::null_mut());
    }
    base
}
