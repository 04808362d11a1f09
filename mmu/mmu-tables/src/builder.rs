//! # Table Builder
//!
//! Builds the tree top-down. For each table, only the entries touched by at
//! least one region are visited; for each such chunk:
//!
//! - one region covers the whole chunk and the level allows leaves → leaf entry;
//! - otherwise, above level 3 → allocate a next-level table and recurse with
//!   the regions intersecting the chunk;
//! - otherwise, at level 3 → the regions do not tile the granule, an error.
//!
//! Tables are allocated the moment the builder descends into them, so
//! addresses follow a depth-first, left-to-right walk of the tree.

use crate::allocator::TableAllocator;
use crate::geometry::{Geometry, GeometryError, LevelSpec};
use crate::overlap::RegionSet;
use crate::region::Region;
use crate::runs::{EntryRun, compact};
use crate::table::{Entry, Mapping, TableNode, Tables};
use crate::template::{DescriptorLeaf, TemplateBank};
use log::{debug, info, trace};
use mmu_info::GeneratorConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("range {start:#x}..{end:#x} at level 3 is not covered by exactly one region ({})", labels.join(", "))]
    CoverageInconsistency {
        start: u64,
        end: u64,
        labels: Vec<String>,
    },
    #[error("region '{label}' ends at {end:#x}, outside the {limit:#x} byte address space")]
    OutsideAddressSpace { label: String, end: u64, limit: u64 },
}

/// A complete translation table tree and its buffer requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTables {
    config: GeneratorConfig,
    geometry: Geometry,
    templates: TemplateBank,
    root: TableNode,
    /// The allocator after the walk; its count and buffer size are final.
    allocator: TableAllocator,
}

impl TranslationTables {
    /// Build the tables mapping every region in `regions` 1:1.
    ///
    /// # Errors
    /// See [`BuildError`].
    pub fn build(regions: &RegionSet, config: &GeneratorConfig) -> Result<Self, BuildError> {
        let geometry = Geometry::resolve(config.granule(), config.address_space())?;
        let limit = config.address_space().size();
        if let Some(region) = regions.iter().find(|r| r.end() > limit) {
            return Err(BuildError::OutsideAddressSpace {
                label: region.label().to_owned(),
                end: region.end(),
                limit,
            });
        }

        debug!(
            "building tables: {} granule, {}-bit address space, starting at level {}",
            config.granule(),
            config.address_space(),
            geometry.starting_level()
        );

        let mut builder = Builder {
            geometry: &geometry,
            templates: TemplateBank::new(config.exception_level()),
            allocator: TableAllocator::new(config.table_base(), geometry.table_size()),
        };
        let root = builder.table(0, 0, regions.regions())?;
        let Builder {
            templates,
            allocator,
            ..
        } = builder;

        info!(
            "{} regions mapped with {} tables, {:#x} bytes in total",
            regions.len(),
            allocator.count(),
            allocator.buffer_size()
        );

        Ok(Self {
            config: *config,
            geometry,
            templates,
            root,
            allocator,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub const fn templates(&self) -> &TemplateBank {
        &self.templates
    }

    /// The table `TTBR0` points to.
    #[must_use]
    pub const fn root(&self) -> &TableNode {
        &self.root
    }

    #[must_use]
    pub const fn table_count(&self) -> usize {
        self.allocator.count()
    }

    #[must_use]
    pub const fn table_size(&self) -> u64 {
        self.allocator.table_size()
    }

    /// Bytes the buffer at `TTBR0` must provide.
    #[must_use]
    pub const fn buffer_size(&self) -> u64 {
        self.allocator.buffer_size()
    }

    /// All tables in allocation (and address) order.
    #[must_use]
    pub fn tables(&self) -> Tables<'_> {
        self.root.tables()
    }

    /// The leaf translating `address`, if it is mapped.
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<Mapping<'_>> {
        self.root.lookup(address)
    }

    /// Leaf runs per table, in allocation order.
    #[must_use]
    pub fn runs(&self) -> Vec<(&TableNode, Vec<EntryRun>)> {
        self.tables().map(|t| (t, compact(t))).collect()
    }

    /// Every non-zero descriptor as `(address, value)`, in table then index order.
    ///
    /// Writing these into a zeroed buffer of [`buffer_size`](Self::buffer_size)
    /// bytes at `TTBR0` produces the complete tables.
    #[must_use]
    pub fn descriptor_writes(&self) -> Vec<(u64, u64)> {
        self.tables()
            .flat_map(|table| {
                table
                    .occupied()
                    .map(move |(index, entry)| (table.entry_address(index), entry.descriptor()))
            })
            .collect()
    }
}

struct Builder<'g> {
    geometry: &'g Geometry,
    templates: TemplateBank,
    allocator: TableAllocator,
}

impl Builder<'_> {
    /// Allocate and fill the table at `depth` (0 = root) starting at `va_base`.
    ///
    /// `regions` is sorted and disjoint and holds every region intersecting
    /// the table's range.
    fn table(&mut self, depth: usize, va_base: u64, regions: &[Region]) -> Result<TableNode, BuildError> {
        let spec = self.geometry.levels()[depth];
        let base_address = self.allocator.allocate();
        debug!(
            "level {} table @ {base_address:#x} for {va_base:#x}, {} regions",
            spec.level,
            regions.len()
        );

        let mut entries: Vec<Entry> = vec![Entry::Empty; spec.entries];
        let va_end = va_base + spec.entries as u64 * spec.chunk_size;

        for index in touched_chunks(regions, va_base, va_end, spec.chunk_size) {
            let start = va_base + index as u64 * spec.chunk_size;
            let end = start + spec.chunk_size;
            let lo = regions.partition_point(|r| r.end() <= start);
            let hi = regions.partition_point(|r| r.base() < end);
            let intersecting = &regions[lo..hi];

            entries[index] = self.entry(depth, &spec, start, end, intersecting)?;
        }

        Ok(TableNode::new(
            spec.level,
            base_address,
            va_base,
            spec.chunk_size,
            entries,
        ))
    }

    fn entry(
        &mut self,
        depth: usize,
        spec: &LevelSpec,
        start: u64,
        end: u64,
        intersecting: &[Region],
    ) -> Result<Entry, BuildError> {
        if let [region] = intersecting
            && region.covers(start, end)
            && (spec.block_capable || spec.is_leaf())
        {
            let leaf = if spec.is_leaf() {
                DescriptorLeaf::Page
            } else {
                DescriptorLeaf::Block
            };
            trace!(
                "level {} {} {start:#x}..{end:#x} -> {}",
                spec.level,
                leaf.as_str(),
                region.label()
            );
            return Ok(Entry::Block {
                output_address: start,
                template: self.templates.get(region.kind(), leaf),
                label: region.shared_label(),
            });
        }

        if spec.is_leaf() {
            return Err(BuildError::CoverageInconsistency {
                start,
                end,
                labels: intersecting.iter().map(|r| r.label().to_owned()).collect(),
            });
        }

        let child = self.table(depth + 1, start, intersecting)?;
        Ok(Entry::Table(Box::new(child)))
    }
}

/// Indices of the chunks of `[va_base, va_end)` touched by any region, ascending
/// and without duplicates.
fn touched_chunks(regions: &[Region], va_base: u64, va_end: u64, chunk: u64) -> Vec<usize> {
    let mut touched: Vec<usize> = Vec::new();
    for region in regions {
        let start = region.base().max(va_base);
        let end = region.end().min(va_end);
        if start >= end {
            continue;
        }

        #[allow(clippy::cast_possible_truncation)]
        let first = ((start - va_base) / chunk) as usize;
        #[allow(clippy::cast_possible_truncation)]
        let last = ((end - 1 - va_base) / chunk) as usize;
        let first = match touched.last() {
            Some(&prev) if prev >= first => prev + 1,
            _ => first,
        };
        touched.extend(first..=last);
    }
    touched
}
