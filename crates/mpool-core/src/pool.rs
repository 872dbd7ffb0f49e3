//! The allocator facade.
//!
//! [`Mpool`] coordinates the size-class table, the fastbin cache, the
//! per-class free lists with lazy arena growth, and the pool registry
//! consumed at teardown. The handle is explicitly owned by the caller;
//! there is no ambient global state and no internal locking.
//!
//! An allocation request consults the class table, then the fastbin,
//! then the class free list, mapping fresh arenas on demand. A release
//! walks the 4-byte header embedded before the user pointer to recover
//! the chunk size, then pushes the chunk back onto the fastbin or the
//! class free list — or unmaps it directly if it was an oversized,
//! directly mapped chunk.

use std::ptr::{self, NonNull};

use crate::arena::{self, ArenaRecord};
use crate::error::Error;
use crate::fastbin::Fastbin;
use crate::page::{PageSource, SystemPages};
use crate::size_class::{ClassTable, HEADER_SIZE};

/// A fixed-size-class memory pool.
///
/// Chunks handed out by [`alloc`](Mpool::alloc) are lent to the caller
/// and must be returned exactly once via [`repool`](Mpool::repool).
/// Dropping the pool unmaps every arena it ever mapped; any chunk
/// pointer still held at that point becomes dangling.
pub struct Mpool<P: PageSource = SystemPages> {
    pages: P,
    classes: ClassTable,
    /// One free-list head per size class.
    heads: Vec<Option<NonNull<u8>>>,
    fastbin: Fastbin,
    /// Every arena ever mapped, unmapped exactly once at teardown.
    registry: Vec<ArenaRecord>,
}

impl Mpool<SystemPages> {
    /// Creates a pool managing classes `2^min_exp ..= 2^max_exp` over
    /// the system page source.
    ///
    /// Requests whose header-inclusive size reaches `2^max_exp` are
    /// mapped and unmapped directly instead of entering a class.
    pub fn new(min_exp: u32, max_exp: u32) -> Result<Self, Error> {
        Self::with_page_source(SystemPages::new(), min_exp, max_exp)
    }
}

impl<P: PageSource> Mpool<P> {
    /// Creates a pool over an arbitrary page source.
    pub fn with_page_source(pages: P, min_exp: u32, max_exp: u32) -> Result<Self, Error> {
        if min_exp < 3 || max_exp < min_exp || max_exp >= 32 {
            return Err(Error::Config { min_exp, max_exp });
        }
        let classes = ClassTable::new(min_exp, max_exp);
        let count = classes.count();

        let mut registry = Vec::new();
        registry
            .try_reserve(count.next_power_of_two())
            .map_err(|_| Error::RegistryGrow)?;
        let mut heads = Vec::new();
        heads.try_reserve(count).map_err(|_| Error::RegistryGrow)?;
        heads.resize(count, None);

        Ok(Self {
            pages,
            classes,
            heads,
            fastbin: Fastbin::new(),
            registry,
        })
    }

    /// Smallest managed chunk size in bytes.
    pub fn min_pool(&self) -> usize {
        self.classes.min_pool()
    }

    /// Size bound above which requests bypass the class system.
    pub fn max_pool(&self) -> usize {
        self.classes.max_pool()
    }

    /// Number of managed size classes.
    pub fn class_count(&self) -> usize {
        self.classes.count()
    }

    /// Number of arenas mapped so far.
    pub fn arena_count(&self) -> usize {
        self.registry.len()
    }

    /// Allocates at least `size` usable bytes.
    ///
    /// May map new OS pages as a side effect. The returned pointer is
    /// 4-byte aligned (it sits immediately after the size header).
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>, Error> {
        let total = size
            .checked_add(HEADER_SIZE)
            .ok_or(Error::TooLarge { size })?;
        match self.classes.class_for(total) {
            Some(class) => self.alloc_classed(class),
            None => self.alloc_oversized(size, total),
        }
    }

    /// Returns a chunk obtained from [`alloc`](Mpool::alloc) on this
    /// pool.
    ///
    /// Oversized chunks are unmapped immediately; an unmap failure is
    /// logged and treated as non-fatal. Class chunks go back onto the
    /// fastbin (smallest classes) or their class free list.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `alloc` on this pool instance
    /// and must not have been repooled already. No validation is
    /// performed; this is a trusted-caller contract.
    pub unsafe fn repool(&mut self, ptr: NonNull<u8>) {
        // SAFETY: alloc returned base + HEADER_SIZE, so the chunk base
        // and its header are immediately before ptr.
        let chunk = unsafe { ptr.as_ptr().sub(HEADER_SIZE) };
        let size = unsafe { chunk.cast::<u32>().read() } as usize;

        if size > self.classes.max_pool() {
            // Directly mapped chunk: the header holds the full mapped
            // length, so this unmaps exactly the original extent.
            let base = unsafe { NonNull::new_unchecked(chunk) };
            // SAFETY: base/size denote the one mapping alloc created.
            if let Err(err) = unsafe { self.pages.unmap(base, size) } {
                tracing::error!(%err, "leaking oversized chunk: unmap failed");
            }
            return;
        }

        let class = self.classes.index_of_size(size);
        let chunk = unsafe { NonNull::new_unchecked(chunk) };
        if Fastbin::qualifies(class) {
            // SAFETY: the chunk is free again and exclusively ours.
            unsafe { self.fastbin.push(class, chunk) };
            return;
        }

        let next = self.heads[class].map_or(ptr::null_mut(), NonNull::as_ptr);
        // SAFETY: the chunk is free again; its first word becomes the
        // next-free link.
        unsafe { chunk.as_ptr().cast::<*mut u8>().write(next) };
        self.heads[class] = Some(chunk);
    }

    /// Consumes the pool, unmapping every registered arena.
    ///
    /// Equivalent to dropping it; provided as an explicit spelling of
    /// teardown.
    pub fn destroy(self) {}

    fn alloc_classed(&mut self, class: usize) -> Result<NonNull<u8>, Error> {
        let class_size = self.classes.class_size(class);

        // SAFETY: fastbin chunks were pushed by repool and stayed free.
        if let Some(chunk) = unsafe { self.fastbin.pop(class) } {
            // SAFETY: chunk spans class_size exclusively owned bytes.
            return Ok(unsafe { stamp_header(chunk, class_size) });
        }

        let chunk = self.pop_free_list(class)?;
        // SAFETY: chunk spans class_size exclusively owned bytes.
        Ok(unsafe { stamp_header(chunk, class_size) })
    }

    /// Pops the head chunk of `class`'s free list, growing it with
    /// fresh arenas when empty or exhausted.
    fn pop_free_list(&mut self, class: usize) -> Result<NonNull<u8>, Error> {
        let cur = match self.heads[class] {
            Some(head) => head,
            // Lazy growth: first request for this class, or the list
            // fully drained without a repool in between.
            None => self.map_arena(class)?,
        };

        // SAFETY: cur is a free chunk; its first word is the next link.
        let mut next = unsafe { cur.as_ptr().cast::<*mut u8>().read() };
        if next.is_null() {
            // End-of-arena growth: cur is the last free chunk, so a new
            // arena is linked on before it is handed out. The list
            // never silently terminates while allocation continues.
            let fresh = self.map_arena(class)?;
            // SAFETY: cur is still free and exclusively ours.
            unsafe { cur.as_ptr().cast::<*mut u8>().write(fresh.as_ptr()) };
            next = fresh.as_ptr();
        }
        self.heads[class] = NonNull::new(next);
        Ok(cur)
    }

    /// Maps one arena for `class`, threads it into a free list, and
    /// records it in the registry. Returns the arena's first chunk.
    fn map_arena(&mut self, class: usize) -> Result<NonNull<u8>, Error> {
        let class_size = self.classes.class_size(class);
        let len = class_size.max(self.pages.page_size());

        // Reserve the registry slot before mapping so a bookkeeping
        // growth failure commits no partial state.
        self.registry.try_reserve(1).map_err(|_| Error::RegistryGrow)?;

        let base = self.pages.map(len)?;
        // SAFETY: base..base+len is a fresh exclusive page-aligned
        // mapping and class_size is a word-sized-or-larger power of two.
        let head = unsafe { arena::carve(base, len, class_size) };
        self.registry.push(ArenaRecord { base, len });
        Ok(head)
    }

    /// Direct mapping for a request at or above `max_pool`.
    ///
    /// The chunk never enters a class: it is mapped exactly large
    /// enough for the header-inclusive request rounded up to a page,
    /// and released by unmapping that same extent.
    fn alloc_oversized(&mut self, size: usize, total: usize) -> Result<NonNull<u8>, Error> {
        let page = self.pages.page_size();
        debug_assert!(page.is_power_of_two(), "page size must be a power of two");
        let mut len = total
            .checked_add(page - 1)
            .ok_or(Error::TooLarge { size })?
            & !(page - 1);
        if len == self.classes.max_pool() {
            // The header must disambiguate a direct chunk from the top
            // class at release, so the stored size is kept strictly
            // above max_pool.
            len += page;
        }
        if len > u32::MAX as usize {
            return Err(Error::TooLarge { size });
        }

        let base = self.pages.map(len)?;
        // SAFETY: base spans len >= total exclusively owned bytes.
        Ok(unsafe { stamp_header(base, len) })
    }
}

impl<P: PageSource> Drop for Mpool<P> {
    fn drop(&mut self) {
        for record in std::mem::take(&mut self.registry) {
            // SAFETY: every record denotes one live arena mapped by
            // this pool; teardown is the single unmap site.
            if let Err(err) = unsafe { self.pages.unmap(record.base, record.len) } {
                tracing::error!(%err, "leaking arena: unmap failed at teardown");
            }
        }
    }
}

/// Writes `size` into the chunk header and returns the user pointer
/// immediately following it.
///
/// The header word and the free-list link occupy the same storage, but
/// the two interpretations are temporally disjoint: the link is never
/// read again once the chunk is handed to a caller.
///
/// # Safety
///
/// `chunk` must be an exclusively owned region of at least `size`
/// bytes, 4-byte aligned, and `size` must fit in a `u32`.
unsafe fn stamp_header(chunk: NonNull<u8>, size: usize) -> NonNull<u8> {
    debug_assert!(size <= u32::MAX as usize);
    // SAFETY: per the contract above.
    unsafe {
        chunk.as_ptr().cast::<u32>().write(size as u32);
        NonNull::new_unchecked(chunk.as_ptr().add(HEADER_SIZE))
    }
}
