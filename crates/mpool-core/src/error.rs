//! Error taxonomy for the pool allocator.
//!
//! Every failure is surfaced once, immediately, to the nearest caller;
//! there are no retries. Unmap failures hit during release or teardown
//! are logged and swallowed at the call site instead of propagating.

use thiserror::Error;

/// Failures the allocator can report to its caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The exponent bounds passed at initialization are unusable.
    ///
    /// `min_exp` must be at least 3 (a chunk must be able to hold its
    /// free-list link word) and `max_exp` must lie in
    /// `min_exp..=31` (the chunk header stores sizes as `u32`).
    #[error("pool bounds must satisfy 3 <= min_exp <= max_exp <= 31 (got {min_exp}..={max_exp})")]
    Config { min_exp: u32, max_exp: u32 },

    /// The operating system could not satisfy a mapping request.
    #[error("mmap of {len} bytes failed (errno {errno})")]
    Map { len: usize, errno: i32 },

    /// The operating system refused to unmap a region.
    #[error("munmap of {len} bytes failed (errno {errno})")]
    Unmap { len: usize, errno: i32 },

    /// The pool registry could not grow its backing storage.
    ///
    /// Growth is reserved before any arena is mapped, so this failure
    /// commits no partial state.
    #[error("pool registry could not grow its backing storage")]
    RegistryGrow,

    /// The request, once header-prefixed and page-rounded, does not fit
    /// the 4-byte chunk header.
    #[error("request of {size} bytes exceeds the addressable chunk size range")]
    TooLarge { size: usize },
}
