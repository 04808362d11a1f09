//! # Entry Runs
//!
//! Leaf entries that differ only by their output address can be written by a
//! single loop. [`compact`] groups a finished table into such runs; it never
//! changes what the table maps.

use crate::table::{Entry, TableNode};
use crate::template::DescriptorTemplate;

/// Consecutive leaf entries that can be written by one loop: same template,
/// output address advancing by one chunk per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRun {
    pub start_index: usize,
    pub count: usize,
    pub first_output_address: u64,
    pub template: DescriptorTemplate,
}

impl EntryRun {
    /// Index of the last entry in the run.
    #[must_use]
    pub const fn last_index(&self) -> usize {
        self.start_index + self.count - 1
    }
}

/// Maximal leaf runs of `table`, in index order. Table pointers and empty
/// entries end a run.
#[must_use]
pub fn compact(table: &TableNode) -> Vec<EntryRun> {
    let chunk = table.chunk_size();
    let mut runs: Vec<EntryRun> = Vec::new();
    let mut open: Option<EntryRun> = None;

    for (index, entry) in table.entries().iter().enumerate() {
        let Entry::Block {
            output_address,
            template,
            ..
        } = entry
        else {
            runs.extend(open.take());
            continue;
        };

        if let Some(run) = open.as_mut() {
            let continues = run.template == *template
                && run.start_index + run.count == index
                && run.first_output_address + run.count as u64 * chunk == *output_address;
            if continues {
                run.count += 1;
                continue;
            }
        }

        runs.extend(open.replace(EntryRun {
            start_index: index,
            count: 1,
            first_output_address: *output_address,
            template: *template,
        }));
    }

    runs.extend(open);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemoryKind;
    use crate::template::{DescriptorLeaf, TemplateBank};
    use mmu_info::ExceptionLevel;

    fn block(address: u64, kind: MemoryKind, label: &str) -> Entry {
        Entry::Block {
            output_address: address,
            template: TemplateBank::new(ExceptionLevel::El2).get(kind, DescriptorLeaf::Block),
            label: label.into(),
        }
    }

    const MB2: u64 = 2 << 20;

    #[test]
    fn merges_across_labels_with_same_template() {
        let table = TableNode::new(
            2,
            0,
            0,
            MB2,
            vec![
                block(0, MemoryKind::Normal, "ROM"),
                block(MB2, MemoryKind::Normal, "RAM"),
                block(2 * MB2, MemoryKind::Device, "IO"),
                Entry::Empty,
                block(4 * MB2, MemoryKind::Device, "IO"),
                block(5 * MB2, MemoryKind::Device, "IO"),
            ],
        );
        let runs = compact(&table);
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].start_index, runs[0].count), (0, 2));
        assert_eq!((runs[1].start_index, runs[1].count), (2, 1));
        assert_eq!((runs[2].start_index, runs[2].last_index()), (4, 5));
        assert_eq!(runs[2].first_output_address, 4 * MB2);
    }

    #[test]
    fn table_pointer_splits_run() {
        let child = TableNode::new(3, 0x1000, MB2, 0x1000, Vec::new());
        let table = TableNode::new(
            2,
            0,
            0,
            MB2,
            vec![
                block(0, MemoryKind::Normal, "A"),
                Entry::Table(Box::new(child)),
                block(2 * MB2, MemoryKind::Normal, "A"),
            ],
        );
        let runs = compact(&table);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.count == 1));
    }

    #[test]
    fn empty_table_has_no_runs() {
        let table = TableNode::new(2, 0, 0, MB2, vec![Entry::Empty; 4]);
        assert!(compact(&table).is_empty());
    }
}
