//! # Table Allocator
//!
//! Tables live back to back in one buffer starting at `TTBR0`. The builder
//! asks for the next table address the moment it decides to descend, so the
//! allocation order is the depth-first discovery order of the tree.

use log::trace;

/// Hands out table addresses from a contiguous buffer at `TTBR0`.
///
/// A bump allocator: the `n`-th table requested lives at `base + n * table_size`.
/// Addresses are never reused, so the allocation order fully determines the
/// buffer layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAllocator {
    /// Address of the first table.
    base: u64,
    /// Size of every table, one granule.
    table_size: u64,
    /// Number of tables handed out so far.
    count: usize,
}

impl TableAllocator {
    #[must_use]
    pub const fn new(base: u64, table_size: u64) -> Self {
        Self {
            base,
            table_size,
            count: 0,
        }
    }

    /// Reserve the next table and return its address.
    pub fn allocate(&mut self) -> u64 {
        let address = self.base + self.count as u64 * self.table_size;
        trace!("table {} allocated at {address:#x}", self.count);
        self.count += 1;
        address
    }

    /// Tables allocated so far.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Bytes needed to hold every table allocated so far.
    #[must_use]
    pub const fn buffer_size(&self) -> u64 {
        self.count as u64 * self.table_size
    }
}
