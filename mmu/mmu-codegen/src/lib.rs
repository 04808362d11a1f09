//! # Bootstrap Code Generation
//!
//! Emits a self-contained GNU assembly file with a global `mmu_on` function.
//! Every core calls `mmu_on`; the first one to take the lock zeroes the table
//! buffer and writes all descriptors, then every core programs its own
//! `TTBR0`, `MAIR`, `TCR` and finally `SCTLR`.
//!
//! The descriptors are not embedded as data. Each table is written by code:
//! a single store per next-level table pointer, and a loop per run of leaf
//! entries sharing a template (see [`mmu_tables::compact`]). Templates live in
//! `x2`..`x5` for the duration of the table programming.
//!
//! The file header carries a listing of the tree ([`listing::tree`]) and the
//! buffer size the caller must reserve ([`listing::usage`]).

mod asm;
pub mod listing;

pub use crate::asm::{COMMENT_COLUMN, assemble};

/// How the generator was invoked, echoed into the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Memory map file as given on the command line.
    pub input: &'a str,
}
