//! # Typed `AArch64` MMU Registers
//!
//! Bit-level models of the system registers and descriptor formats involved
//! in enabling stage 1 translation for a single exception level:
//!
//! | Register | Model | Purpose |
//! |:---------|:------|:--------|
//! | `TTBR0_ELx` | raw `u64` | Base address of the root translation table. |
//! | `MAIR_ELx` | [`Mair`] | Memory attribute slots referenced by descriptors. |
//! | `TCR_ELx` | [`TcrEl1`], [`TcrEl23`] | Granule, address space size, walk attributes. |
//! | `SCTLR_ELx` | [`Sctlr`] | MMU and cache enable. |
//!
//! Descriptors are modelled by [`BlockPageDescriptor`] and [`TableDescriptor`].

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod descriptor;
pub mod mair;
mod sctlr;
pub mod tcr;

use core::fmt;

pub use crate::descriptor::{BlockPageDescriptor, TableDescriptor};
pub use crate::mair::Mair;
pub use crate::sctlr::Sctlr;
pub use crate::tcr::{TcrEl1, TcrEl23};
use mmu_info::{ExceptionLevel, GeneratorConfig};

/// The per-core system registers written when turning the MMU on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SystemRegister {
    Ttbr0,
    Mair,
    Tcr,
    Sctlr,
}

impl SystemRegister {
    /// All registers, in programming order.
    pub const ALL: [Self; 4] = [Self::Ttbr0, Self::Mair, Self::Tcr, Self::Sctlr];

    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Ttbr0 => "ttbr0",
            Self::Mair => "mair",
            Self::Tcr => "tcr",
            Self::Sctlr => "sctlr",
        }
    }

    /// Architectural register name at an exception level, e.g. `tcr_el2`.
    #[must_use]
    pub const fn at(self, el: ExceptionLevel) -> RegisterName {
        RegisterName { reg: self, el }
    }
}

/// Display adapter for `<register>_el<n>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterName {
    reg: SystemRegister,
    el: ExceptionLevel,
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.reg.stem(), self.el.suffix())
    }
}

/// Raw values of the per-core registers for one configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterValues {
    pub exception_level: ExceptionLevel,
    pub ttbr0: u64,
    pub mair: u64,
    pub tcr: u64,
    pub sctlr: u64,
}

impl RegisterValues {
    #[must_use]
    pub const fn for_config(config: &GeneratorConfig) -> Self {
        Self {
            exception_level: config.exception_level(),
            ttbr0: config.table_base(),
            mair: Mair::identity_map().into_bits(),
            tcr: tcr::translation_control(config),
            sctlr: Sctlr::enable_mmu(config.exception_level()).into_bits(),
        }
    }

    #[must_use]
    pub const fn get(&self, reg: SystemRegister) -> u64 {
        match reg {
            SystemRegister::Ttbr0 => self.ttbr0,
            SystemRegister::Mair => self.mair,
            SystemRegister::Tcr => self.tcr,
            SystemRegister::Sctlr => self.sctlr,
        }
    }
}
