//! # Memory Map Files
//!
//! One region per line, four comma separated fields:
//!
//! ```text
//! 0x80000000, 2G,  NORMAL, DRAM
//! 0x1C090000, 4K,  DEVICE, UART0
//! ```
//!
//! - base: `0x`-prefixed hexadecimal or decimal;
//! - length: `0x`-prefixed hexadecimal, or decimal with an optional `K`/`M`/`G`/`T`
//!   suffix (powers of 1024);
//! - type: `DEVICE` or `NORMAL`;
//! - label: free text up to the end of the line.
//!
//! Blank lines and lines starting with `#` are ignored.

use crate::region::{MemoryKind, Region, RegionError, UnknownMemoryKind};
use crate::{align_down, align_up};
use log::{debug, warn};
use mmu_info::GeneratorConfig;

/// How records whose bounds are not granule aligned are treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AlignmentPolicy {
    /// Round the base down and the end up to the granule, logging the correction.
    #[default]
    Widen,
    /// Reject the record with [`RegionError::Misaligned`].
    Strict,
}

/// A field of a record that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected 4 comma separated fields, found {0}")]
    FieldCount(usize),
    #[error("bad base address '{0}'")]
    BaseAddress(String),
    #[error("bad length '{0}'")]
    Length(String),
    #[error(transparent)]
    MemoryType(#[from] UnknownMemoryKind),
    #[error("missing label")]
    EmptyLabel,
}

/// Errors raised while reading a memory map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryMapError {
    #[error("line {line}: {source}\n    {text}")]
    Format {
        line: usize,
        text: String,
        source: RecordError,
    },
    #[error("line {line}: {source}")]
    Region { line: usize, source: RegionError },
}

/// One syntactically valid record, before any alignment handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub base: u64,
    pub length: u64,
    pub kind: MemoryKind,
    pub label: &'a str,
}

impl<'a> Record<'a> {
    /// Parse a single record line.
    ///
    /// # Errors
    /// Returns the first field that fails to parse.
    pub fn parse(line: &'a str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.splitn(4, ',').map(str::trim).collect();
        let [base, length, kind, label] = fields.as_slice() else {
            return Err(RecordError::FieldCount(fields.len()));
        };

        let base = parse_address(base).ok_or_else(|| RecordError::BaseAddress((*base).to_owned()))?;
        let length = parse_length(length).ok_or_else(|| RecordError::Length((*length).to_owned()))?;
        let kind = kind.parse::<MemoryKind>()?;
        if label.is_empty() {
            return Err(RecordError::EmptyLabel);
        }

        Ok(Self {
            base,
            length,
            kind,
            label,
        })
    }
}

/// Parse a complete memory map into regions, in file order.
///
/// Overlap is *not* checked here; pass the result to
/// [`RegionSet::validate`](crate::RegionSet::validate).
///
/// # Errors
/// The first malformed record or invalid region aborts parsing.
pub fn parse_memory_map(
    text: &str,
    config: &GeneratorConfig,
    policy: AlignmentPolicy,
) -> Result<Vec<Region>, MemoryMapError> {
    let mut regions = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        debug!("parsing line {line}: {trimmed}");
        let record = Record::parse(trimmed).map_err(|source| MemoryMapError::Format {
            line,
            text: trimmed.to_owned(),
            source,
        })?;

        // Widening would turn an empty record into a whole granule.
        if record.length == 0 {
            return Err(MemoryMapError::Region {
                line,
                source: RegionError::Empty {
                    label: record.label.to_owned(),
                },
            });
        }

        let (base, length) = match policy {
            AlignmentPolicy::Strict => (record.base, record.length),
            AlignmentPolicy::Widen => widen(&record, config),
        };

        let region = Region::new(base, length, record.kind, record.label, config)
            .map_err(|source| MemoryMapError::Region { line, source })?
            .with_line(line);
        debug!("added {region}");
        regions.push(region);
    }

    Ok(regions)
}

/// Expand a record outwards to granule boundaries.
fn widen(record: &Record<'_>, config: &GeneratorConfig) -> (u64, u64) {
    let granule = config.granule().bytes();
    let Some(end) = record.base.checked_add(record.length) else {
        // Let region validation report the overflow.
        return (record.base, record.length);
    };

    let base = align_down(record.base, granule);
    let end = align_up(end.min(u64::MAX - granule), granule);
    if base != record.base || end - base != record.length {
        warn!(
            "region '{}' widened to {granule:#x} granule: {:#x}+{:#x} -> {base:#x}+{:#x}",
            record.label,
            record.base,
            record.length,
            end - base
        );
    }
    (base, end - base)
}

/// `0x`-prefixed hexadecimal or decimal.
fn parse_address(field: &str) -> Option<u64> {
    let field = field.replace('_', "");
    if let Some(hex) = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        field.parse::<u64>().ok()
    }
}

/// Like [`parse_address`], plus decimal quantities with a binary unit suffix.
fn parse_length(field: &str) -> Option<u64> {
    if field.starts_with("0x") || field.starts_with("0X") {
        return parse_address(field);
    }

    let (quantity, shift) = match field.char_indices().last()? {
        (i, 'K' | 'k') => (&field[..i], 10),
        (i, 'M' | 'm') => (&field[..i], 20),
        (i, 'G' | 'g') => (&field[..i], 30),
        (i, 'T' | 't') => (&field[..i], 40),
        _ => (field, 0),
    };
    let quantity = quantity.trim().parse::<u64>().ok()?;
    quantity.checked_mul(1 << shift)
}
