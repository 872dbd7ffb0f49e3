//! Power-of-two size classes.
//!
//! All managed allocations are rounded up to one of a fixed set of
//! power-of-two byte sizes between the pool's minimum and maximum
//! bounds. Requests whose header-inclusive size reaches the maximum
//! bound fall outside the table and are mapped directly.

/// Width of the size header that precedes every returned pointer.
pub const HEADER_SIZE: usize = 4;

/// The table of size classes for one pool, generated by repeated
/// doubling from `2^min_exp`; the class index is the doubling count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassTable {
    min_exp: u32,
    max_exp: u32,
}

impl ClassTable {
    /// Builds the table for classes `2^min_exp ..= 2^max_exp`.
    ///
    /// Bounds are validated by the pool facade before construction.
    pub fn new(min_exp: u32, max_exp: u32) -> Self {
        debug_assert!(min_exp >= 3);
        debug_assert!(max_exp >= min_exp);
        debug_assert!(max_exp < 32);
        Self { min_exp, max_exp }
    }

    /// Number of size classes.
    pub fn count(&self) -> usize {
        (self.max_exp - self.min_exp + 1) as usize
    }

    /// Smallest class size in bytes (`2^min_exp`).
    pub fn min_pool(&self) -> usize {
        1 << self.min_exp
    }

    /// Largest class size in bytes (`2^max_exp`). Header-inclusive
    /// requests of this size or more bypass the class system.
    pub fn max_pool(&self) -> usize {
        1 << self.max_exp
    }

    /// Index of the smallest class whose size is `>= total`, or `None`
    /// when `total` must be satisfied by a direct mapping.
    ///
    /// `total` already includes the header width. Requests below the
    /// smallest class still consume a full `min_pool` chunk.
    pub fn class_for(&self, total: usize) -> Option<usize> {
        if total >= self.max_pool() {
            return None;
        }
        let mut size = self.min_pool();
        let mut index = 0;
        while size < total {
            size <<= 1;
            index += 1;
        }
        Some(index)
    }

    /// Byte size of the class at `index`.
    pub fn class_size(&self, index: usize) -> usize {
        debug_assert!(index < self.count());
        self.min_pool() << index
    }

    /// Recovers the class index from a stored power-of-two chunk size.
    pub fn index_of_size(&self, size: usize) -> usize {
        debug_assert!(size.is_power_of_two());
        debug_assert!(size >= self.min_pool());
        debug_assert!(size <= self.max_pool());
        (size.trailing_zeros() - self.min_exp) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ClassTable {
        // Classes 8B..4096B.
        ClassTable::new(3, 12)
    }

    #[test]
    fn test_count_and_bounds() {
        let t = table();
        assert_eq!(t.count(), 10);
        assert_eq!(t.min_pool(), 8);
        assert_eq!(t.max_pool(), 4096);
    }

    #[test]
    fn test_class_for_rounds_up() {
        let t = table();
        assert_eq!(t.class_for(1), Some(0));
        assert_eq!(t.class_for(8), Some(0));
        assert_eq!(t.class_for(9), Some(1));
        assert_eq!(t.class_for(14), Some(1));
        assert_eq!(t.class_for(16), Some(1));
        assert_eq!(t.class_for(17), Some(2));
        assert_eq!(t.class_for(4095), Some(9));
    }

    #[test]
    fn test_class_for_oversized() {
        let t = table();
        assert_eq!(t.class_for(4096), None);
        assert_eq!(t.class_for(100_000), None);
    }

    #[test]
    fn test_class_size_roundtrip() {
        let t = table();
        for index in 0..t.count() {
            let size = t.class_size(index);
            assert!(size.is_power_of_two());
            assert_eq!(t.index_of_size(size), index);
            if size < t.max_pool() {
                assert_eq!(t.class_for(size), Some(index));
            }
        }
    }

    #[test]
    fn test_monotonic() {
        let t = table();
        let mut last = 0;
        for total in 1..t.max_pool() {
            let size = t.class_size(t.class_for(total).unwrap());
            assert!(size >= last, "class size regressed at total={total}");
            assert!(size >= total);
            last = size;
        }
    }
}
