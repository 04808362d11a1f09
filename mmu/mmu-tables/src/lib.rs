//! # `AArch64` Identity Map Tables
//!
//! Turns a declarative physical memory map into the complete set of stage 1
//! translation tables mapping every region 1:1.
//!
//! ```text
//!  memory map text ──parse──► [Region] ──validate──► RegionSet
//!                                                       │
//!                       Geometry + TemplateBank ──build─┤
//!                                                       ▼
//!                                              TranslationTables
//!                                     (tree, table addresses, buffer size)
//! ```
//!
//! ## Walk geometry
//!
//! A table holds one granule of 8-byte descriptors and the walk ends at level 3.
//! Depending on the granule and address space width, the root sits at level
//! 0, 1 or 2 (see [`Geometry`]).
//!
//! | Level | 4K chunk | 16K chunk | 64K chunk | Leaf form |
//! |:------|:---------|:----------|:----------|:----------|
//! | 0 | 512 GiB | 128 TiB | – | table only |
//! | 1 | 1 GiB | 64 GiB | 4 TiB | block with 4K, else table only |
//! | 2 | 2 MiB | 32 MiB | 512 MiB | block |
//! | 3 | 4 KiB | 16 KiB | 64 KiB | page |
//!
//! ## Determinism
//!
//! The same regions and configuration always yield the same tree, the same
//! table addresses and the same table count. Tables are laid out back to back
//! from `TTBR0` in depth-first order; the root is always first.

mod allocator;
mod builder;
mod geometry;
mod memory_map;
mod overlap;
mod region;
mod runs;
mod table;
mod template;

pub use crate::allocator::TableAllocator;
pub use crate::builder::{BuildError, TranslationTables};
pub use crate::geometry::{Geometry, GeometryError, LEAF_LEVEL, LevelSpec};
pub use crate::memory_map::{AlignmentPolicy, MemoryMapError, Record, RecordError, parse_memory_map};
pub use crate::overlap::{IntervalIndex, OverlapError, RegionSet};
pub use crate::region::{MemoryKind, Region, RegionError, UnknownMemoryKind};
pub use crate::runs::{EntryRun, compact};
pub use crate::table::{DESCRIPTOR_SIZE, Entry, Mapping, TableNode, Tables};
pub use crate::template::{DescriptorLeaf, DescriptorTemplate, TemplateBank};
use mmu_info::GeneratorConfig;

/// Any failure between reading a memory map and holding the finished tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    MemoryMap(#[from] MemoryMapError),
    #[error(transparent)]
    Overlap(#[from] OverlapError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Parse, validate and build in one go.
///
/// # Errors
/// The first error of any stage; nothing is produced on failure.
pub fn generate(
    memory_map: &str,
    config: &GeneratorConfig,
    policy: AlignmentPolicy,
) -> Result<TranslationTables, GenerateError> {
    let regions = parse_memory_map(memory_map, config, policy)?;
    let regions = RegionSet::validate(regions)?;
    Ok(TranslationTables::build(&regions, config)?)
}

#[allow(clippy::inline_always)]
#[inline(always)]
pub(crate) const fn align_down(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    x & !(a - 1)
}

#[allow(clippy::inline_always)]
#[inline(always)]
pub(crate) const fn align_up(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    (x + a - 1) & !(a - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x1C09_1000, 0x1_0000), 0x1C09_0000);
        assert_eq!(align_up(0x1C09_2000, 0x1_0000), 0x1C0A_0000);
        assert_eq!(align_up(0x1C0A_0000, 0x1_0000), 0x1C0A_0000);
    }
}
