//! Human readable rendering of a table tree.
//!
//! ```text
//!         level 2 table @ 0x90000000
//!         [#   0]-------------------\
//!                 level 3 table @ 0x90010000
//!                 [#7177] 0x00001c090000-0x00001c09ffff, Device, UART0
//!         [#   4] 0x000080000000-0x00009fffffff, Normal, DRAM
//! ```

use core::fmt::{self, Write};
use mmu_tables::{Entry, TableNode, TranslationTables};

/// Columns of indentation per level below the root.
const INDENT: usize = 8;

/// Render the tree, one line per table header and per occupied entry.
#[must_use]
pub fn tree(tables: &TranslationTables) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_table(&mut out, tables.root(), tables.geometry().starting_level());
    out
}

fn write_table(out: &mut String, table: &TableNode, root_level: u32) -> fmt::Result {
    let margin = " ".repeat((table.level() - root_level + 1) as usize * INDENT);
    writeln!(out, "{}", header(&margin, table))?;

    for (index, entry) in table.occupied() {
        match entry {
            Entry::Table(next) => {
                let slot = format!("{margin}[#{index:>4}]");
                let child_margin = margin.len() + INDENT;
                let child_header_len = child_margin + header("", next).len();
                let dashes = "-".repeat(child_header_len.saturating_sub(slot.len()));
                writeln!(out, "{slot}{dashes}\\")?;
                write_table(out, next, root_level)?;
            }
            Entry::Block {
                output_address,
                template,
                label,
            } => {
                let last = output_address + table.chunk_size() - 1;
                writeln!(
                    out,
                    "{margin}[#{index:>4}] 0x{output_address:012x}-0x{last:012x}, {}, {label}",
                    template.kind()
                )?;
            }
            Entry::Empty => {}
        }
    }
    Ok(())
}

fn header(margin: &str, table: &TableNode) -> String {
    format!(
        "{margin}level {} table @ {:#x}",
        table.level(),
        table.base_address()
    )
}

/// How much memory the caller must reserve at `TTBR0`.
#[must_use]
pub fn usage(tables: &TranslationTables) -> String {
    let count = tables.table_count();
    let granule = tables.geometry().granule();
    format!(
        "This memory map requires a total of {count} translation tables.\n\
         Each table occupies {granule} of memory ({:#x} bytes).\n\
         The buffer pointed to by {:#x} must therefore be {count}x {granule} = {:#x} bytes long.",
        tables.table_size(),
        tables.config().table_base(),
        tables.buffer_size(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};
    use mmu_tables::{AlignmentPolicy, generate};

    fn tables() -> TranslationTables {
        let cfg = GeneratorConfig::new(
            0x9000_0000,
            ExceptionLevel::El2,
            Granule::Size64K,
            AddressSpaceBits::Bits32,
        )
        .unwrap();
        generate(
            "0x80000000, 1G, NORMAL, DRAM\n0x1C090000, 64K, DEVICE, UART0",
            &cfg,
            AlignmentPolicy::Strict,
        )
        .unwrap()
    }

    #[test]
    fn renders_nested_tables() {
        let text = tree(&tables());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "        level 2 table @ 0x90000000");
        assert!(lines[1].starts_with("        [#   0]---"));
        assert!(lines[1].ends_with('\\'));
        assert_eq!(lines[2], "                level 3 table @ 0x90010000");
        assert_eq!(lines[1].len() - 1, lines[2].len());
        assert_eq!(
            lines[3],
            "                [#7177] 0x00001c090000-0x00001c09ffff, Device, UART0"
        );
        assert_eq!(
            lines[4],
            "        [#   4] 0x000080000000-0x00009fffffff, Normal, DRAM"
        );
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn usage_statement() {
        let text = usage(&tables());
        assert!(text.contains("a total of 2 translation tables"));
        assert!(text.contains("64K of memory (0x10000 bytes)"));
        assert!(text.ends_with("must therefore be 2x 64K = 0x20000 bytes long."));
    }
}
