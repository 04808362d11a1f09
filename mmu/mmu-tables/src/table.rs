//! # Translation Table Tree
//!
//! The builder produces an owned tree: every [`TableNode`] is held by the
//! [`Entry::Table`] that points to it, the root by
//! [`TranslationTables`](crate::TranslationTables). Once built the tree is
//! read-only.

use crate::template::DescriptorTemplate;
use mmu_registers::TableDescriptor;
use std::sync::Arc;

/// Size of a single descriptor in bytes.
pub const DESCRIPTOR_SIZE: u64 = 8;

/// One slot of a translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Invalid descriptor (all zero); accesses fault.
    Empty,
    /// Leaf mapping one chunk: a block above level 3, a page at level 3.
    Block {
        output_address: u64,
        template: DescriptorTemplate,
        /// Label of the region this chunk belongs to.
        label: Arc<str>,
    },
    /// Pointer to a next-level table.
    Table(Box<TableNode>),
}

impl Entry {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&TableNode> {
        match self {
            Self::Table(node) => Some(node),
            Self::Empty | Self::Block { .. } => None,
        }
    }

    /// The 64-bit descriptor as written to memory.
    #[must_use]
    pub fn descriptor(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Block {
                output_address,
                template,
                ..
            } => template.descriptor(*output_address),
            Self::Table(node) => TableDescriptor::pointing_to(node.base_address()).into_bits(),
        }
    }
}

/// A single translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    level: u32,
    base_address: u64,
    va_base: u64,
    chunk_size: u64,
    entries: Vec<Entry>,
}

impl TableNode {
    pub(crate) fn new(level: u32, base_address: u64, va_base: u64, chunk_size: u64, entries: Vec<Entry>) -> Self {
        Self {
            level,
            base_address,
            va_base,
            chunk_size,
            entries,
        }
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Physical address of the table itself.
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.base_address
    }

    /// First address translated through entry 0.
    #[must_use]
    pub const fn va_base(&self) -> u64 {
        self.va_base
    }

    /// Bytes translated by one entry.
    #[must_use]
    pub const fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Address of the descriptor at `index`.
    #[must_use]
    pub const fn entry_address(&self, index: usize) -> u64 {
        self.base_address + index as u64 * DESCRIPTOR_SIZE
    }

    /// Start of the address range translated by entry `index`.
    #[must_use]
    pub const fn chunk_start(&self, index: usize) -> u64 {
        self.va_base + index as u64 * self.chunk_size
    }

    /// Non-empty entries with their indices.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_empty())
    }

    /// This table and all tables below it, depth first, in allocation order.
    #[must_use]
    pub fn tables(&self) -> Tables<'_> {
        Tables { stack: vec![self] }
    }

    /// Find the leaf entry translating `address`.
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<Mapping<'_>> {
        let offset = address.checked_sub(self.va_base)?;
        let index = usize::try_from(offset / self.chunk_size).ok()?;
        match self.entries.get(index)? {
            Entry::Empty => None,
            Entry::Table(next) => next.lookup(address),
            Entry::Block {
                output_address,
                template,
                label,
            } => Some(Mapping {
                level: self.level,
                index,
                table_address: self.base_address,
                output_address: *output_address,
                size: self.chunk_size,
                template: *template,
                label,
            }),
        }
    }
}

/// A resolved leaf translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping<'a> {
    pub level: u32,
    pub index: usize,
    pub table_address: u64,
    /// Output address of the block or page, not of the looked up address.
    pub output_address: u64,
    pub size: u64,
    pub template: DescriptorTemplate,
    pub label: &'a str,
}

/// Pre-order iterator over a table tree.
pub struct Tables<'a> {
    stack: Vec<&'a TableNode>,
}

impl<'a> Iterator for Tables<'a> {
    type Item = &'a TableNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.entries.iter().rev().filter_map(Entry::as_table));
        Some(node)
    }
}
