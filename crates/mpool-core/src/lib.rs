//! # mpool-core
//!
//! A fixed-size-class memory pool allocator for workloads dominated by
//! many small, same-sized, short-lived allocations.
//!
//! Requests are rounded up to a power-of-two size class between the
//! pool's configured minimum and maximum. Each class is served from an
//! intrusive free list threaded through page-sized arenas obtained
//! lazily from the operating system; a small fastbin cache fronts the
//! free lists for the smallest classes. Requests at or above the maximum
//! class size bypass the class system entirely and are mapped (and later
//! unmapped) directly.
//!
//! The pool is single-threaded by design: a [`Mpool`] handle is
//! exclusively owned and is neither `Send` nor `Sync`. Callers needing
//! concurrency must wrap the handle in external synchronization.

pub mod arena;
pub mod error;
pub mod fastbin;
pub mod page;
pub mod pool;
pub mod size_class;

pub use error::Error;
pub use fastbin::FASTBIN_COUNT;
pub use page::{PageSource, SystemPages};
pub use pool::Mpool;
pub use size_class::{ClassTable, HEADER_SIZE};
