//! # Translation Table Geometry
//!
//! Each level of a VMSAv8-64 walk resolves `page_bits - 3` bits of the input
//! address, since a table holds one granule of 8-byte descriptors:
//!
//! | Granule | Page offset | Bits per level | Entries per table |
//! |:--------|:------------|:---------------|:------------------|
//! | 4 KiB   | 12          | 9              | 512               |
//! | 16 KiB  | 14          | 11             | 2048              |
//! | 64 KiB  | 16          | 13             | 8192              |
//!
//! The walk always ends at level 3 and starts as late as the address space
//! allows. The starting table only resolves the bits that remain, so it may be
//! shorter than a full table.
//!
//! ```text
//!  4K granule, 32-bit address space:
//!
//! | 31‒30   | 29‒21   | 20‒12   | 11‒0   |
//! | level 1 | level 2 | level 3 | offset |
//! |  4 ent. | 512     | 512     |        |
//! ```

use mmu_info::{AddressSpaceBits, Granule};

/// The level whose entries are always pages.
pub const LEAF_LEVEL: u32 = 3;

/// Levels available in a VMSAv8-64 stage 1 walk (0..=3).
const MAX_LEVELS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("a {width}-bit address space needs {levels} levels with the {granule} granule (at most 4)")]
    TooManyLevels {
        granule: Granule,
        width: u32,
        levels: u32,
    },
    #[error("the 64K granule has no level 0 table ({width}-bit address space)")]
    NoLevelZeroFor64K { width: u32 },
}

/// Layout of one table level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    /// Lookup level, `0..=3`.
    pub level: u32,
    /// Number of input address bits resolved by this level.
    pub index_bits: u32,
    /// Number of entries in a table at this level.
    pub entries: usize,
    /// Whether an entry at this level may be a block descriptor.
    pub block_capable: bool,
    /// Bytes of address space mapped by one entry.
    pub chunk_size: u64,
}

impl LevelSpec {
    /// Whether an entry at this level is a page descriptor.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.level == LEAF_LEVEL
    }
}

/// Table layout for one granule / address-space combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    granule: Granule,
    address_space: AddressSpaceBits,
    levels: Vec<LevelSpec>,
}

impl Geometry {
    /// Derive the table layout.
    ///
    /// # Errors
    /// See [`GeometryError`]. Neither variant occurs for the address space
    /// widths of [`AddressSpaceBits`], but both are reported rather than assumed.
    pub fn resolve(granule: Granule, address_space: AddressSpaceBits) -> Result<Self, GeometryError> {
        let levels = resolve_levels(granule, address_space.bits())?;
        Ok(Self {
            granule,
            address_space,
            levels,
        })
    }

    #[must_use]
    pub const fn granule(&self) -> Granule {
        self.granule
    }

    #[must_use]
    pub const fn address_space(&self) -> AddressSpaceBits {
        self.address_space
    }

    /// Level of the root table (`TTBR0` points here).
    #[must_use]
    pub fn starting_level(&self) -> u32 {
        self.root().level
    }

    /// The root table's layout.
    #[must_use]
    pub fn root(&self) -> &LevelSpec {
        // `resolve_levels` never yields an empty walk.
        &self.levels[0]
    }

    /// All levels, root first.
    #[must_use]
    pub fn levels(&self) -> &[LevelSpec] {
        &self.levels
    }

    /// Layout of `level`, if the walk includes it.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&LevelSpec> {
        level
            .checked_sub(self.starting_level())
            .and_then(|i| self.levels.get(i as usize))
    }

    /// Entries in a full (non-root) table.
    #[must_use]
    pub const fn entries_per_table(&self) -> usize {
        1 << bits_per_level(self.granule)
    }

    /// Size in bytes of every table, root included.
    #[must_use]
    pub const fn table_size(&self) -> u64 {
        self.granule.bytes()
    }
}

const fn bits_per_level(granule: Granule) -> u32 {
    granule.shift() - 3
}

/// Compute the walk for an arbitrary width, root level first.
pub(crate) fn resolve_levels(granule: Granule, width: u32) -> Result<Vec<LevelSpec>, GeometryError> {
    let page_bits = granule.shift();
    let bpl = bits_per_level(granule);

    // Smallest L with L * bpl + page_bits >= width.
    let levels = width.saturating_sub(page_bits).div_ceil(bpl).max(1);
    if levels > MAX_LEVELS {
        return Err(GeometryError::TooManyLevels {
            granule,
            width,
            levels,
        });
    }

    let start = MAX_LEVELS - levels;
    if start == 0 && granule == Granule::Size64K {
        return Err(GeometryError::NoLevelZeroFor64K { width });
    }

    let root_bits = width
        .saturating_sub(page_bits + (levels - 1) * bpl)
        .min(bpl);

    Ok((start..MAX_LEVELS)
        .map(|level| {
            let index_bits = if level == start { root_bits } else { bpl };
            LevelSpec {
                level,
                index_bits,
                entries: 1 << index_bits,
                block_capable: level == 2 || (level == 1 && granule == Granule::Size4K),
                chunk_size: granule.bytes() << ((LEAF_LEVEL - level) * bpl),
            }
        })
        .collect())
}
