use mmu_codegen::{COMMENT_COLUMN, Invocation, assemble};
use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};
use mmu_tables::{AlignmentPolicy, TranslationTables, generate};

const MAP: &str = "\
0x80000000, 2G, NORMAL, DRAM
0x1C090000, 4K, DEVICE, UART0
";

fn tables(el: ExceptionLevel) -> TranslationTables {
    let cfg = GeneratorConfig::new(0x9000_0000, el, Granule::Size64K, AddressSpaceBits::Bits32).unwrap();
    generate(MAP, &cfg, AlignmentPolicy::Widen).unwrap()
}

fn source(el: ExceptionLevel) -> String {
    assemble(&tables(el), &Invocation { input: "board.mmap" })
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing `{needle}`"))
}

#[test]
fn header_lists_tree_arguments_and_usage() {
    let src = source(ExceptionLevel::El2);
    assert!(src.starts_with("/*\n"));
    assert!(src.contains(" *         level 2 table @ 0x90000000\n"));
    assert!(src.contains("[#7177] 0x00001c090000-0x00001c09ffff, Device, UART0"));
    assert!(src.contains(" *      -i board.mmap\n"));
    assert!(src.contains(" *      -ttb 0x90000000\n"));
    assert!(src.contains(" *      -el 2\n"));
    assert!(src.contains(" *      -tg 64K\n"));
    assert!(src.contains(" *      -tsz 32\n"));
    assert!(src.contains("must therefore be 2x 64K = 0x20000 bytes long."));
}

#[test]
fn sequence_is_lock_init_release_program() {
    let src = source(ExceptionLevel::El2);
    let order = [
        "mmu_on:",
        "LDAXR   w2, [x0]",
        "STXR    w3, w1, [x0]",
        "CBNZ    w2, release_lock",
        "STP     q0, q0, [x2], #32",
        "load_descriptor_templates:",
        "program_table_0:",
        "program_table_1:",
        "init_done:",
        "DSB     ISH",
        "STR     w2, [x1]",
        "release_lock:",
        "STLR    wzr, [x0]",
        "    SEV ",
        "MSR     ttbr0_el2, x1",
        "MSR     mair_el2, x1",
        "MSR     tcr_el2, x1",
        "MRS     x2, tcr_el2",
        "B.NE    .",
        "MSR     sctlr_el2, x1",
        "RET",
    ];
    let positions: Vec<usize> = order.iter().map(|s| position(&src, s)).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
}

#[test]
fn tables_are_programmed_by_runs_and_pointers() {
    let src = source(ExceptionLevel::El2);

    // Root: pointer to the level 3 table at index 0, DRAM as one run of four blocks.
    assert!(src.contains("program_table_0_entry_0:"));
    assert!(src.contains("LDR     x11, =0x90010000"));
    assert!(src.contains("program_table_0_entry_4_to_7:"));
    assert!(src.contains("LDR     x12, =0x80000000"));
    assert!(src.contains("ORR     x13, x12, x4"));

    // Leaf: the UART page.
    assert!(src.contains("program_table_1_entry_7177:"));
    assert!(src.contains("LDR     x12, =0x1c090000"));
    assert!(src.contains("ORR     x13, x12, x3"));
    assert!(!src.contains("program_table_2"));
}

#[test]
fn templates_and_register_values() {
    let src = source(ExceptionLevel::El2);
    assert!(src.contains("LDR     x2, =0x40000000000405"));
    assert!(src.contains("LDR     x3, =0x40000000000407"));
    assert!(src.contains("LDR     x4, =0x701"));
    assert!(src.contains("LDR     x5, =0x703"));
    assert!(src.contains("LDR     x3, =0x20000"));
    assert!(src.contains("LDR     x1, =0xff "));
    assert!(src.contains("LDR     x1, =0x30c51835"));
}

#[test]
fn exception_level_selects_register_names() {
    let src = source(ExceptionLevel::El1);
    assert!(src.contains("MSR     tcr_el1, x1"));
    assert!(src.contains("MSR     sctlr_el1, x1"));
    assert!(!src.contains("_el2"));
    assert!(src.contains("LDR     x2, =0x20000000000405"));
}

#[test]
fn comments_are_aligned() {
    let src = source(ExceptionLevel::El3);
    for line in src.lines().filter(|l| !l.starts_with(" *") && !l.starts_with("/*")) {
        if let Some(col) = line.find("//") {
            let code = line[..col].trim_end();
            if code.len() < COMMENT_COLUMN {
                assert_eq!(col, COMMENT_COLUMN, "{line}");
            } else {
                assert_eq!(col, code.len(), "{line}");
            }
        }
    }
}

#[test]
fn output_is_deterministic() {
    assert_eq!(source(ExceptionLevel::El2), source(ExceptionLevel::El2));
}
