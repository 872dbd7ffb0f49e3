//! Anonymous page mapping.
//!
//! Wraps the OS virtual memory interface behind the [`PageSource`]
//! trait so the pool can be driven by an instrumented source in tests.
//! The production implementation, [`SystemPages`], maps zero-initialized
//! anonymous private pages with `mmap` and releases them with `munmap`.

use std::io;
use std::ptr::{self, NonNull};

use crate::error::Error;

/// Supplier of OS-backed memory regions.
///
/// Regions handed out by [`map`](PageSource::map) are zero-initialized,
/// page-aligned, readable and writable, and exclusively owned by the
/// caller until returned through [`unmap`](PageSource::unmap).
pub trait PageSource {
    /// Size of one OS page in bytes. Queried once; governs the minimum
    /// arena mapping granularity. Must be a power of two: the pool
    /// rounds oversized mapping lengths with page-mask arithmetic.
    fn page_size(&self) -> usize;

    /// Maps `len` bytes of fresh anonymous memory.
    fn map(&mut self, len: usize) -> Result<NonNull<u8>, Error>;

    /// Unmaps a region previously returned by [`map`](PageSource::map).
    ///
    /// # Safety
    ///
    /// `base` and `len` must denote exactly one live mapping obtained
    /// from this source, and no pointer into the region may be used
    /// afterwards.
    unsafe fn unmap(&mut self, base: NonNull<u8>, len: usize) -> Result<(), Error>;
}

/// The real OS page source.
#[derive(Debug, Clone)]
pub struct SystemPages {
    page_size: usize,
}

impl SystemPages {
    /// Creates a page source, querying the system page size once.
    pub fn new() -> Self {
        // SAFETY: sysconf has no memory-safety preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page_size = if raw > 0 { raw as usize } else { 4096 };
        Self { page_size }
    }
}

impl Default for SystemPages {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for SystemPages {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn map(&mut self, len: usize) -> Result<NonNull<u8>, Error> {
        // SAFETY: anonymous private mapping with a kernel-chosen address
        // has no pointer-validity preconditions.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(Error::Map {
                len,
                errno: last_errno(),
            });
        }
        NonNull::new(raw.cast::<u8>()).ok_or(Error::Map { len, errno: 0 })
    }

    unsafe fn unmap(&mut self, base: NonNull<u8>, len: usize) -> Result<(), Error> {
        // SAFETY: caller guarantees base/len cover one live mapping.
        let rc = unsafe { libc::munmap(base.as_ptr().cast(), len) };
        if rc == 0 {
            Ok(())
        } else {
            Err(Error::Unmap {
                len,
                errno: last_errno(),
            })
        }
    }
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_a_power_of_two() {
        let pages = SystemPages::new();
        assert!(pages.page_size().is_power_of_two());
        assert!(pages.page_size() >= 4096);
    }

    #[test]
    fn test_map_returns_zeroed_writable_memory() {
        let mut pages = SystemPages::new();
        let len = pages.page_size();
        let base = pages.map(len).expect("anonymous mapping");

        // SAFETY: base..base+len is a fresh exclusive mapping.
        unsafe {
            let slice = std::slice::from_raw_parts_mut(base.as_ptr(), len);
            assert!(slice.iter().all(|&b| b == 0));
            slice[0] = 0xA5;
            slice[len - 1] = 0x5A;
            assert_eq!(slice[0], 0xA5);
            pages.unmap(base, len).expect("unmap");
        }
    }

    #[test]
    fn test_map_failure_reports_errno() {
        let mut pages = SystemPages::new();
        // A length the kernel will refuse.
        let err = pages.map(usize::MAX & !0xfff).unwrap_err();
        match err {
            Error::Map { errno, .. } => assert_ne!(errno, 0),
            other => panic!("expected Map error, got {other:?}"),
        }
    }
}
