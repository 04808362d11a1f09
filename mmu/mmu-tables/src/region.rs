//! # Memory Regions
//!
//! A [`Region`] is one identity-mapped physical extent with a memory type and
//! a label. Construction through [`Region::new`] enforces the invariants the
//! table builder relies on:
//!
//! - `length > 0`;
//! - `base` and `base + length` are aligned to the granule;
//! - `base + length` does not exceed the configured address space.

use mmu_info::{GeneratorConfig, Granule};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Memory type of a region; selects the descriptor template.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryKind {
    /// Device-nGnRnE, execute-never, non-shareable.
    Device,
    /// Normal Write-Back RAWA, executable, inner-shareable.
    Normal,
}

impl MemoryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::Normal => "Normal",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown memory type token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown memory type '{0}' (expected DEVICE or NORMAL)")]
pub struct UnknownMemoryKind(pub String);

impl FromStr for MemoryKind {
    type Err = UnknownMemoryKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("DEVICE") {
            Ok(Self::Device)
        } else if token.eq_ignore_ascii_case("NORMAL") {
            Ok(Self::Normal)
        } else {
            Err(UnknownMemoryKind(token.to_owned()))
        }
    }
}

/// Violations of the region invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("region '{label}' is empty")]
    Empty { label: String },
    #[error(
        "region '{label}' ({base:#x}, length {length:#x}) is not aligned to the {granule} granule"
    )]
    Misaligned {
        label: String,
        base: u64,
        length: u64,
        granule: Granule,
    },
    #[error("region '{label}' ends at {end:#x}, beyond the {bits}-bit address space")]
    OutOfRange { label: String, end: u128, bits: u32 },
}

/// One physical memory extent, mapped 1:1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    base: u64,
    length: u64,
    kind: MemoryKind,
    label: Arc<str>,
    line: usize,
}

impl Region {
    /// Create a region, validating it against the configured granule and
    /// address space.
    ///
    /// # Errors
    /// See [`RegionError`].
    pub fn new(
        base: u64,
        length: u64,
        kind: MemoryKind,
        label: impl Into<Arc<str>>,
        config: &GeneratorConfig,
    ) -> Result<Self, RegionError> {
        let label = label.into();
        if length == 0 {
            return Err(RegionError::Empty {
                label: label.to_string(),
            });
        }

        let end = u128::from(base) + u128::from(length);
        let space = config.address_space();
        if end > u128::from(space.size()) {
            return Err(RegionError::OutOfRange {
                label: label.to_string(),
                end,
                bits: space.bits(),
            });
        }

        let granule = config.granule();
        if !base.is_multiple_of(granule.bytes()) || !length.is_multiple_of(granule.bytes()) {
            return Err(RegionError::Misaligned {
                label: label.to_string(),
                base,
                length,
                granule,
            });
        }

        Ok(Self {
            base,
            length,
            kind,
            label,
            line: 0,
        })
    }

    /// Attach the 1-based source line the region was parsed from.
    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }

    /// Exclusive end address. Cannot overflow: the address space is at most 48 bits.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.length
    }

    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shared handle to the label, cloned into every entry mapping this region.
    #[must_use]
    pub fn shared_label(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    /// 1-based source line, or `0` if the region was not parsed from a file.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Whether `[start, end)` and the region share at least one byte.
    #[must_use]
    pub const fn intersects(&self, start: u64, end: u64) -> bool {
        self.base < end && start < self.end()
    }

    /// Whether the region contains all of `[start, end)`.
    #[must_use]
    pub const fn covers(&self, start: u64, end: u64) -> bool {
        self.base <= start && end <= self.end()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region(line={}, label='{}', base={:#x}, length={:#x}, kind={})",
            self.line, self.label, self.base, self.length, self.kind
        )
    }
}
