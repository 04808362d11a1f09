//! # Overlap Validation
//!
//! Regions are inserted into an ordered index of disjoint half-open intervals
//! keyed by their start address. Since the stored intervals never overlap,
//! only the last interval starting before the new end can intersect the new
//! one, so each insert is a single `O(log n)` range query.

use crate::region::Region;
use log::trace;
use std::collections::BTreeMap;

/// Ordered set of disjoint `[start, end)` intervals carrying a value.
#[derive(Debug, Clone)]
pub struct IntervalIndex<T> {
    intervals: BTreeMap<u64, (u64, T)>,
}

impl<T> Default for IntervalIndex<T> {
    fn default() -> Self {
        Self {
            intervals: BTreeMap::new(),
        }
    }
}

impl<T> IntervalIndex<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored interval sharing at least one address with `[start, end)`, if any.
    #[must_use]
    pub fn find_overlap(&self, start: u64, end: u64) -> Option<(u64, u64, &T)> {
        let (&s, (e, value)) = self.intervals.range(..end).next_back()?;
        (*e > start).then_some((s, *e, value))
    }

    /// Insert `[start, end)`, or return the value of the interval it overlaps.
    ///
    /// # Errors
    /// The existing overlapping interval's value; nothing is inserted.
    pub fn insert(&mut self, start: u64, end: u64, value: T) -> Result<(), &T> {
        if let Some(existing) = self.find_overlap(start, end).map(|(s, _, _)| s) {
            return Err(&self.intervals[&existing].1);
        }
        self.intervals.insert(start, (end, value));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Values in ascending start address order.
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.intervals.into_values().map(|(_, v)| v)
    }
}

/// Two regions sharing at least one address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("region '{first}' (line {first_line}) overlaps region '{second}' (line {second_line})")]
pub struct OverlapError {
    /// The region that was accepted first.
    pub first: String,
    pub first_line: usize,
    pub second: String,
    pub second_line: usize,
}

/// Regions proven pairwise disjoint, ordered by base address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    /// Check that no two regions overlap. Touching regions are fine.
    ///
    /// # Errors
    /// The first overlap found, in input order.
    pub fn validate(regions: impl IntoIterator<Item = Region>) -> Result<Self, OverlapError> {
        let mut index: IntervalIndex<Region> = IntervalIndex::new();
        for region in regions {
            if let Err(existing) = index.insert(region.base(), region.end(), region.clone()) {
                return Err(OverlapError {
                    first: existing.label().to_owned(),
                    first_line: existing.line(),
                    second: region.label().to_owned(),
                    second_line: region.line(),
                });
            }
            trace!("no overlap for {region}");
        }

        Ok(Self {
            regions: index.into_values().collect(),
        })
    }

    /// Regions sorted by base address.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemoryKind;
    use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};

    fn region(base: u64, length: u64, label: &str, line: usize) -> Region {
        let cfg = GeneratorConfig::new(0, ExceptionLevel::El2, Granule::Size4K, AddressSpaceBits::Bits32).unwrap();
        Region::new(base, length, MemoryKind::Device, label, &cfg)
            .unwrap()
            .with_line(line)
    }

    #[test]
    fn index_detects_overlap() {
        let mut index = IntervalIndex::new();
        assert!(index.insert(0x1000, 0x3000, 'a').is_ok());
        assert!(index.insert(0x3000, 0x4000, 'b').is_ok());
        assert_eq!(index.insert(0x2fff, 0x3001, 'c'), Err(&'b'));
        assert_eq!(index.insert(0x0, 0x1001, 'd'), Err(&'a'));
        assert!(index.insert(0x0, 0x1000, 'e').is_ok());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn contained_interval_is_found() {
        let mut index = IntervalIndex::new();
        index.insert(0x0, 0x10_0000, ()).unwrap();
        assert!(index.find_overlap(0x8000, 0x9000).is_some());
        assert!(index.find_overlap(0x10_0000, 0x20_0000).is_none());
    }

    #[test]
    fn touching_regions_validate() {
        let set = RegionSet::validate([region(0x2000, 0x1000, "B", 2), region(0x1000, 0x1000, "A", 1)]).unwrap();
        let labels: Vec<&str> = set.iter().map(Region::label).collect();
        assert_eq!(labels, ["A", "B"]);
    }

    #[test]
    fn overlap_names_both_regions() {
        let err = RegionSet::validate([region(0x1000, 0x2000, "A", 1), region(0x2000, 0x1000, "B", 2)])
            .unwrap_err();
        assert_eq!(
            err,
            OverlapError {
                first: "A".into(),
                first_line: 1,
                second: "B".into(),
                second_line: 2,
            }
        );
    }

    #[test]
    fn earlier_region_is_reported_first_regardless_of_address() {
        let err = RegionSet::validate([
            region(0x4000, 0x1000, "HIGH", 1),
            region(0x1000, 0x1000, "LOW", 2),
            region(0x3000, 0x2000, "MID", 3),
        ])
        .unwrap_err();
        assert_eq!((err.first.as_str(), err.first_line), ("HIGH", 1));
        assert_eq!((err.second.as_str(), err.second_line), ("MID", 3));
    }
}
