//! Fastbin cache for the smallest size classes.
//!
//! A fixed number of per-class free-list heads checked before the main
//! free lists, shortcutting the common "many tiny reused objects" case.
//! Chunks held here are indistinguishable from chunks on the main free
//! lists — same link-in-first-word convention, same header on
//! allocation — so the fastbin is purely a faster first-check layer.

use std::ptr::{self, NonNull};

/// Number of size classes served by the fastbin (class indices
/// `0..FASTBIN_COUNT`).
pub const FASTBIN_COUNT: usize = 7;

/// Per-class LIFO heads for the smallest classes.
#[derive(Debug, Default)]
pub struct Fastbin {
    heads: [Option<NonNull<u8>>; FASTBIN_COUNT],
}

impl Fastbin {
    /// Creates an empty fastbin.
    pub fn new() -> Self {
        Self {
            heads: [None; FASTBIN_COUNT],
        }
    }

    /// Whether chunks of `class` are cached here.
    pub fn qualifies(class: usize) -> bool {
        class < FASTBIN_COUNT
    }

    /// Pops the most recently pushed chunk for `class`, if any.
    ///
    /// Out-of-range classes simply miss. Arena-growth logic is never
    /// involved here; an empty head falls through to the main free list.
    ///
    /// # Safety
    ///
    /// Every chunk previously pushed for `class` must still be free and
    /// hold a valid next-free link in its first word.
    pub unsafe fn pop(&mut self, class: usize) -> Option<NonNull<u8>> {
        let head = self.heads.get_mut(class)?;
        let chunk = (*head)?;
        // SAFETY: a cached chunk's first word is its next-free link.
        let next = unsafe { chunk.as_ptr().cast::<*mut u8>().read() };
        *head = NonNull::new(next);
        Some(chunk)
    }

    /// Pushes a free chunk of `class` onto its head.
    ///
    /// # Safety
    ///
    /// `chunk` must be an exclusively owned free chunk of `class`'s
    /// size, writable for at least one machine word.
    pub unsafe fn push(&mut self, class: usize, chunk: NonNull<u8>) {
        debug_assert!(Self::qualifies(class));
        let head = &mut self.heads[class];
        let next = head.map_or(ptr::null_mut(), NonNull::as_ptr);
        // SAFETY: caller guarantees the chunk is free and writable.
        unsafe { chunk.as_ptr().cast::<*mut u8>().write(next) };
        *head = Some(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_at(backing: &mut [usize], index: usize) -> NonNull<u8> {
        NonNull::new(backing[index * 2..].as_mut_ptr().cast::<u8>()).unwrap()
    }

    #[test]
    fn test_empty_pops_none() {
        let mut bin = Fastbin::new();
        for class in 0..FASTBIN_COUNT {
            // SAFETY: nothing has been pushed.
            assert!(unsafe { bin.pop(class) }.is_none());
        }
    }

    #[test]
    fn test_lifo_order() {
        let mut backing = [0usize; 8];
        let a = chunk_at(&mut backing, 0);
        let b = chunk_at(&mut backing, 1);

        let mut bin = Fastbin::new();
        // SAFETY: a and b are distinct word-aligned 16-byte chunks.
        unsafe {
            bin.push(1, a);
            bin.push(1, b);
            assert_eq!(bin.pop(1), Some(b));
            assert_eq!(bin.pop(1), Some(a));
            assert_eq!(bin.pop(1), None);
        }
    }

    #[test]
    fn test_classes_are_independent() {
        let mut backing = [0usize; 8];
        let a = chunk_at(&mut backing, 0);
        let b = chunk_at(&mut backing, 1);

        let mut bin = Fastbin::new();
        // SAFETY: a and b are distinct word-aligned chunks.
        unsafe {
            bin.push(0, a);
            bin.push(3, b);
            assert_eq!(bin.pop(3), Some(b));
            assert_eq!(bin.pop(0), Some(a));
        }
    }

    #[test]
    fn test_out_of_range_class_misses() {
        let mut bin = Fastbin::new();
        assert!(!Fastbin::qualifies(FASTBIN_COUNT));
        // SAFETY: nothing has been pushed.
        assert!(unsafe { bin.pop(FASTBIN_COUNT) }.is_none());
        assert!(unsafe { bin.pop(usize::MAX) }.is_none());
    }
}
