//! # MMU Bootstrap Sequence
//!
//! An executable model of the code every core runs to turn on the MMU with a
//! shared set of translation tables:
//!
//! ```text
//!  mmu_on:
//!     acquire mmu_lock              (SEVL; WFE; LDAXR; STXR retry loop)
//!     if !mmu_init:
//!         zero table buffer
//!         write descriptors
//!         barrier
//!         mmu_init = 1
//!     release mmu_lock; SEV
//!     TTBR0, MAIR, TCR; ISB          (every core)
//!     TCR read back == TCR?  else halt
//!     SCTLR; ISB
//! ```
//!
//! Any number of cores may call [`BootState::mmu_on`] concurrently; the tables
//! are written exactly once and every core ends up with identical register
//! values.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod boot;
mod event;
mod lock;
mod memory;

pub use crate::boot::{
    BootError, BootImage, BootOutcome, BootState, SystemRegisters, program_core,
};
pub use crate::event::{EventRegister, SpinEvent};
pub use crate::lock::{MmuLock, MmuLockGuard};
pub use crate::memory::{TableBuffer, TableMemory};
