//! GNU assembly for the `mmu_on` routine.

use crate::Invocation;
use crate::listing;
use core::fmt::Write;
use log::debug;
use mmu_registers::{RegisterValues, SystemRegister};
use mmu_tables::{DescriptorLeaf, DescriptorTemplate, Entry, EntryRun, MemoryKind, TableNode, TranslationTables, compact};

/// Column at which `//` comments start.
pub const COMMENT_COLUMN: usize = 41;

/// Assembly text under construction.
struct Asm {
    out: String,
}

impl Asm {
    /// An instruction or directive with a trailing comment.
    fn op(&mut self, code: &str, comment: &str) {
        let code = format!("    {code}");
        let pad = COMMENT_COLUMN.saturating_sub(code.len());
        let _ = writeln!(self.out, "{code}{:pad$}// {comment}", "");
    }

    /// An instruction without comment.
    fn bare(&mut self, code: &str) {
        let _ = writeln!(self.out, "    {code}");
    }

    fn label(&mut self, name: &str) {
        let _ = writeln!(self.out, "\n{name}:\n");
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// Scratch register holding the template for `template`'s kind and form.
const fn template_register(template: &DescriptorTemplate) -> &'static str {
    match (template.kind(), template.leaf()) {
        (MemoryKind::Device, DescriptorLeaf::Block) => "x2",
        (MemoryKind::Device, DescriptorLeaf::Page) => "x3",
        (MemoryKind::Normal, DescriptorLeaf::Block) => "x4",
        (MemoryKind::Normal, DescriptorLeaf::Page) => "x5",
    }
}

fn template_comment(template: &DescriptorTemplate) -> String {
    let form = match template.leaf() {
        DescriptorLeaf::Block => "block",
        DescriptorLeaf::Page => "page",
    };
    format!("{} {form}", template.kind())
}

/// Render the complete source file.
#[must_use]
pub fn assemble(tables: &TranslationTables, invocation: &Invocation<'_>) -> String {
    let mut asm = Asm { out: String::new() };
    let registers = RegisterValues::for_config(tables.config());

    header(&mut asm, tables, invocation);
    data(&mut asm);
    acquire_lock(&mut asm);
    zero_tables(&mut asm, tables);
    load_templates(&mut asm, tables);
    for (n, table) in tables.tables().enumerate() {
        program_table(&mut asm, n, table);
    }
    release_lock(&mut asm);
    program_cpu(&mut asm, &registers);

    debug!("emitted {} lines of assembly", asm.out.lines().count());
    asm.out
}

fn header(asm: &mut Asm, tables: &TranslationTables, invocation: &Invocation<'_>) {
    let config = tables.config();
    asm.raw("/*");
    asm.raw(" * This file was generated by pgtable. Do not edit.");
    asm.raw(" *");
    asm.raw(" * It programs the following translation table structure:");
    asm.raw(" *");
    for line in listing::tree(tables).lines() {
        asm.raw(&format!(" * {line}"));
    }
    asm.raw(" *");
    asm.raw(" * Generated with:");
    asm.raw(" *");
    asm.raw(&format!(" *      -i {}", invocation.input));
    asm.raw(&format!(" *      -ttb {:#x}", config.table_base()));
    asm.raw(&format!(" *      -el {}", config.exception_level().number()));
    asm.raw(&format!(" *      -tg {}", config.granule()));
    asm.raw(&format!(" *      -tsz {}", config.address_space().bits()));
    asm.raw(" *");
    for line in listing::usage(tables).lines() {
        asm.raw(&format!(" * {line}"));
    }
    asm.raw(" * The caller must reserve this buffer and map it as NORMAL memory in");
    asm.raw(" * the memory map.");
    asm.raw(" */");
}

fn data(asm: &mut Asm) {
    asm.raw("");
    asm.bare(".section .data.mmu");
    asm.bare(".balign 4");
    asm.raw("");
    asm.op("mmu_lock: .4byte 0", "only one CPU initialises the tables");
    asm.bare("#define LOCKED 1");
    asm.raw("");
    asm.op("mmu_init: .4byte 0", "tables have been programmed");
    asm.bare("#define INITIALISED 1");
    asm.raw("");
    asm.bare(".section .text.mmu_on");
    asm.bare(".balign 4");
    asm.bare(".global mmu_on");
    asm.bare(".type mmu_on, @function");
}

fn acquire_lock(asm: &mut Asm) {
    asm.label("mmu_on");
    asm.op("ADRP    x0, mmu_lock", "4KB page containing mmu_lock");
    asm.op("ADD     x0, x0, :lo12:mmu_lock", "low 12 bits dropped by ADRP");
    asm.bare("MOV     w1, #LOCKED");
    asm.op("SEVL", "first WFE falls through");
    asm.raw("1:");
    asm.op("WFE", "sleep until the lock may be free");
    asm.op("LDAXR   w2, [x0]", "read mmu_lock");
    asm.op("CBNZ    w2, 1b", "taken, back to sleep");
    asm.op("STXR    w3, w1, [x0]", "try to take mmu_lock");
    asm.op("CBNZ    w3, 1b", "lost the race, back to sleep");

    asm.label("check_initialised");
    asm.op("ADRP    x1, mmu_init", "4KB page containing mmu_init");
    asm.op("ADD     x1, x1, :lo12:mmu_init", "low 12 bits dropped by ADRP");
    asm.op("LDR     w2, [x1]", "read mmu_init");
    asm.op("CBNZ    w2, release_lock", "already programmed by another CPU");
}

fn zero_tables(asm: &mut Asm, tables: &TranslationTables) {
    asm.label("zero_tables");
    asm.op(
        &format!("LDR     x2, ={:#x}", tables.config().table_base()),
        "first table",
    );
    asm.op(
        &format!("LDR     x3, ={:#x}", tables.buffer_size()),
        "size of all tables",
    );
    asm.op("LSR     x3, x3, #5", "32 bytes per STP");
    asm.op("FMOV    d0, xzr", "clear q0");
    asm.raw("1:");
    asm.op("STP     q0, q0, [x2], #32", "zero 4 entries");
    asm.bare("SUBS    x3, x3, #1");
    asm.bare("B.NE    1b");
}

fn load_templates(asm: &mut Asm, tables: &TranslationTables) {
    asm.label("load_descriptor_templates");
    for template in tables.templates().all() {
        asm.op(
            &format!(
                "LDR     {}, ={:#x}",
                template_register(&template),
                template.bits()
            ),
            &template_comment(&template),
        );
    }
}

/// One `STR` per table pointer, one loop per run of leaves.
fn program_table(asm: &mut Asm, n: usize, table: &TableNode) {
    asm.label(&format!("program_table_{n}"));
    asm.op(
        &format!("LDR     x8, ={:#x}", table.base_address()),
        &format!("level {} table", table.level()),
    );
    asm.op(
        &format!("LDR     x9, ={:#x}", table.chunk_size()),
        "bytes per entry",
    );

    let mut runs = compact(table).into_iter().peekable();
    for (index, entry) in table.occupied() {
        match entry {
            Entry::Table(next) => pointer(asm, n, index, next),
            Entry::Block { .. } => {
                if let Some(run) = runs.next_if(|r| r.start_index == index) {
                    leaf_run(asm, n, &run);
                }
            }
            Entry::Empty => {}
        }
    }
}

fn pointer(asm: &mut Asm, n: usize, index: usize, next: &TableNode) {
    asm.label(&format!("program_table_{n}_entry_{index}"));
    asm.op(&format!("LDR     x10, ={index}"), "index");
    asm.op(
        &format!("LDR     x11, ={:#x}", next.base_address()),
        &format!("level {} table", next.level()),
    );
    asm.op("ORR     x11, x11, #0x3", "table descriptor");
    asm.op("STR     x11, [x8, x10, lsl #3]", "write entry");
}

fn leaf_run(asm: &mut Asm, n: usize, run: &EntryRun) {
    let name = if run.count > 1 {
        format!(
            "program_table_{n}_entry_{}_to_{}",
            run.start_index,
            run.last_index()
        )
    } else {
        format!("program_table_{n}_entry_{}", run.start_index)
    };
    asm.label(&name);
    asm.op(&format!("LDR     x10, ={}", run.start_index), "first index");
    asm.op(&format!("LDR     x11, ={}", run.count), "number of entries");
    asm.op(
        &format!("LDR     x12, ={:#x}", run.first_output_address),
        "first output address",
    );
    asm.raw("1:");
    asm.op(
        &format!("ORR     x13, x12, {}", template_register(&run.template)),
        &template_comment(&run.template),
    );
    asm.op("STR     x13, [x8, x10, lsl #3]", "write entry");
    asm.op("ADD     x10, x10, #1", "next index");
    asm.op("ADD     x12, x12, x9", "next output address");
    asm.bare("SUBS    x11, x11, #1");
    asm.bare("B.NE    1b");
}

fn release_lock(asm: &mut Asm) {
    asm.label("init_done");
    asm.op("DSB     ISH", "tables visible before the flag");
    asm.bare("MOV     w2, #INITIALISED");
    asm.op("STR     w2, [x1]", "set mmu_init");

    asm.label("release_lock");
    asm.op("STLR    wzr, [x0]", "release mmu_lock");
    asm.op("SEV", "wake waiting CPUs");
}

fn program_cpu(asm: &mut Asm, registers: &RegisterValues) {
    let el = registers.exception_level;
    asm.label("program_cpu");
    for (reg, comment) in [
        (SystemRegister::Ttbr0, "root table"),
        (SystemRegister::Mair, "memory attributes"),
        (SystemRegister::Tcr, "translation control"),
    ] {
        asm.op(&format!("LDR     x1, ={:#x}", registers.get(reg)), comment);
        asm.bare(&format!("MSR     {}, x1", reg.at(el)));
    }
    asm.bare("ISB");
    asm.op(
        &format!("MRS     x2, {}", SystemRegister::Tcr.at(el)),
        "read back TCR",
    );
    asm.bare("CMP     x2, x1");
    asm.op("B.NE    .", "configuration not supported by this CPU");
    asm.op(
        &format!("LDR     x1, ={:#x}", registers.sctlr),
        "MMU and caches on",
    );
    asm.bare(&format!("MSR     {}, x1", SystemRegister::Sctlr.at(el)));
    asm.op("ISB", "synchronise context on this CPU");
    asm.bare("RET");
}
