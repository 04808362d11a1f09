//! # Translation Regime Configuration
//!
//! Shared configuration types for the page-table generator. Every other crate
//! in the workspace receives one immutable [`GeneratorConfig`] and derives all
//! of its constants (table geometry, register values, descriptor templates)
//! from it.
//!
//! ## Overview
//!
//! | Type | Choices | Meaning |
//! |:-----|:--------|:--------|
//! | [`Granule`] | 4K, 16K, 64K | Base page size; every table occupies one granule. |
//! | [`AddressSpaceBits`] | 32, 36, 40, 48 | Width of the input (and identical output) address space. |
//! | [`ExceptionLevel`] | EL1, EL2, EL3 | Which `*_ELx` system register set is programmed. |
//!
//! The exception level never changes the table geometry; it only selects the
//! register set and the execute-never bit used by descriptor templates.
//!
//! ```rust
//! # use mmu_info::*;
//! let config = GeneratorConfig::new(0x9000_0000, ExceptionLevel::El2, Granule::Size4K, AddressSpaceBits::Bits32)?;
//! assert_eq!(config.granule().bytes(), 4096);
//! assert_eq!(config.address_space().size(), 0x1_0000_0000);
//! # Ok::<(), ConfigError>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod config;

pub use crate::config::{AddressSpaceBits, ExceptionLevel, Granule};

/// Errors raised while assembling a [`GeneratorConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported translation granule (expected 4K, 16K or 64K)")]
    UnsupportedGranule,
    #[error("unsupported address space width {0} (expected 32, 36, 40 or 48)")]
    UnsupportedWidth(u32),
    #[error("unsupported exception level {0} (expected 1, 2 or 3)")]
    UnsupportedLevel(u32),
    #[error("translation table base {base:#x} is not aligned to the {granule} granule")]
    MisalignedTableBase { base: u64, granule: Granule },
    #[error("translation table base {base:#x} lies outside the {bits}-bit address space")]
    TableBaseOutOfRange { base: u64, bits: u32 },
}

/// The single immutable configuration of one generation run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    table_base: u64,
    exception_level: ExceptionLevel,
    granule: Granule,
    address_space: AddressSpaceBits,
}

impl GeneratorConfig {
    /// Default exception level used by the command line tool.
    pub const DEFAULT_EXCEPTION_LEVEL: ExceptionLevel = ExceptionLevel::El2;

    /// Default granule used by the command line tool.
    pub const DEFAULT_GRANULE: Granule = Granule::Size4K;

    /// Default address space width used by the command line tool.
    pub const DEFAULT_ADDRESS_SPACE: AddressSpaceBits = AddressSpaceBits::Bits32;

    /// Validates and bundles the configuration.
    ///
    /// # Errors
    /// - [`ConfigError::MisalignedTableBase`] if `table_base` is not granule aligned;
    ///   `TTBR0_ELx` requires the root table to be aligned to its size.
    /// - [`ConfigError::TableBaseOutOfRange`] if `table_base` cannot be reached
    ///   through the configured address space.
    pub const fn new(
        table_base: u64,
        exception_level: ExceptionLevel,
        granule: Granule,
        address_space: AddressSpaceBits,
    ) -> Result<Self, ConfigError> {
        if !table_base.is_multiple_of(granule.bytes()) {
            return Err(ConfigError::MisalignedTableBase {
                base: table_base,
                granule,
            });
        }
        if table_base >= address_space.size() {
            return Err(ConfigError::TableBaseOutOfRange {
                base: table_base,
                bits: address_space.bits(),
            });
        }
        Ok(Self {
            table_base,
            exception_level,
            granule,
            address_space,
        })
    }

    /// Physical address of the first (root) translation table.
    #[must_use]
    pub const fn table_base(&self) -> u64 {
        self.table_base
    }

    #[must_use]
    pub const fn exception_level(&self) -> ExceptionLevel {
        self.exception_level
    }

    #[must_use]
    pub const fn granule(&self) -> Granule {
        self.granule
    }

    #[must_use]
    pub const fn address_space(&self) -> AddressSpaceBits {
        self.address_space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_granule_aligned_base() {
        let cfg = GeneratorConfig::new(
            0x8_0000,
            ExceptionLevel::El1,
            Granule::Size64K,
            AddressSpaceBits::Bits36,
        )
        .unwrap();
        assert_eq!(cfg.table_base(), 0x8_0000);
        assert_eq!(cfg.exception_level(), ExceptionLevel::El1);
        assert_eq!(cfg.granule(), Granule::Size64K);
        assert_eq!(cfg.address_space(), AddressSpaceBits::Bits36);
    }

    #[test]
    fn rejects_misaligned_base() {
        let err = GeneratorConfig::new(
            0x1000,
            ExceptionLevel::El2,
            Granule::Size16K,
            AddressSpaceBits::Bits32,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MisalignedTableBase {
                base: 0x1000,
                granule: Granule::Size16K
            }
        );
    }

    #[test]
    fn rejects_base_beyond_address_space() {
        let err = GeneratorConfig::new(
            0x1_0000_0000,
            ExceptionLevel::El3,
            Granule::Size4K,
            AddressSpaceBits::Bits32,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::TableBaseOutOfRange {
                base: 0x1_0000_0000,
                bits: 32
            }
        );
    }
}
