use mmu_boot::{
    BootError, BootImage, BootOutcome, BootState, SpinEvent, SystemRegisters, TableBuffer, TableMemory,
};
use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};
use mmu_registers::{RegisterValues, SystemRegister};
use mmu_tables::{AlignmentPolicy, TranslationTables, generate};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const MAP: &str = "
0x00000000, 0x8000000, NORMAL, FLASH
0x09000000, 4K,        DEVICE, UART0
0x40000000, 1G,        NORMAL, DRAM
";

/// Registers of one simulated core. `tcr_implemented` masks the TCR bits the
/// core actually supports.
#[derive(Debug, Default)]
struct Core {
    values: [u64; 4],
    writes: Vec<SystemRegister>,
    tcr_implemented: Option<u64>,
    synchronized: usize,
}

const fn slot(reg: SystemRegister) -> usize {
    match reg {
        SystemRegister::Ttbr0 => 0,
        SystemRegister::Mair => 1,
        SystemRegister::Tcr => 2,
        SystemRegister::Sctlr => 3,
    }
}

impl SystemRegisters for Core {
    fn write(&mut self, reg: SystemRegister, value: u64) {
        self.writes.push(reg);
        self.values[slot(reg)] = match (reg, self.tcr_implemented) {
            (SystemRegister::Tcr, Some(mask)) => value & mask,
            _ => value,
        };
    }

    fn read(&self, reg: SystemRegister) -> u64 {
        self.values[slot(reg)]
    }

    fn synchronize(&mut self) {
        self.synchronized += 1;
    }
}

/// Counts how often the buffer is zeroed.
struct CountingMemory<'a> {
    inner: TableBuffer<'a>,
    zeroed: AtomicUsize,
}

impl TableMemory for CountingMemory<'_> {
    fn zero(&self, base: u64, len: u64) {
        self.zeroed.fetch_add(1, Ordering::SeqCst);
        self.inner.zero(base, len);
    }

    fn write_descriptor(&self, address: u64, value: u64) {
        self.inner.write_descriptor(address, value);
    }
}

fn tables() -> TranslationTables {
    let cfg = GeneratorConfig::new(
        0x8000_0000,
        ExceptionLevel::El2,
        Granule::Size4K,
        AddressSpaceBits::Bits32,
    )
    .unwrap();
    generate(MAP, &cfg, AlignmentPolicy::Strict).unwrap()
}

fn words(tables: &TranslationTables) -> Vec<AtomicU64> {
    // Pre-fill with garbage: zeroing must clear it.
    (0..tables.buffer_size() / 8)
        .map(|_| AtomicU64::new(0xDEAD_BEEF))
        .collect()
}

fn expected_registers(tables: &TranslationTables) -> [u64; 4] {
    let values = RegisterValues::for_config(tables.config());
    SystemRegister::ALL.map(|r| values.get(r))
}

#[test]
fn single_core_programs_tables_and_registers() {
    let tables = tables();
    let writes = tables.descriptor_writes();
    let image = BootImage {
        table_base: tables.config().table_base(),
        buffer_len: tables.buffer_size(),
        writes: &writes,
        registers: RegisterValues::for_config(tables.config()),
    };
    let words = words(&tables);
    let memory = TableBuffer::new(image.table_base, &words);
    let state = BootState::new();
    let mut core = Core::default();

    let outcome = state.mmu_on(&image, &mut core, &memory, &SpinEvent).unwrap();
    assert_eq!(outcome, BootOutcome::Initialised);
    assert!(state.is_initialised());

    for &(address, value) in &writes {
        assert_eq!(memory.read(address), Some(value));
    }
    let nonzero = words.iter().filter(|w| w.load(Ordering::Relaxed) != 0).count();
    assert_eq!(nonzero, writes.len());

    assert_eq!(core.values, expected_registers(&tables));
    assert_eq!(core.writes, SystemRegister::ALL);
    assert_eq!(core.synchronized, 2);
}

#[test]
fn second_call_skips_initialisation() {
    let tables = tables();
    let writes = tables.descriptor_writes();
    let image = BootImage {
        table_base: tables.config().table_base(),
        buffer_len: tables.buffer_size(),
        writes: &writes,
        registers: RegisterValues::for_config(tables.config()),
    };
    let words = words(&tables);
    let memory = TableBuffer::new(image.table_base, &words);
    let state = BootState::new();

    let first = state.mmu_on(&image, &mut Core::default(), &memory, &SpinEvent);
    assert_eq!(first, Ok(BootOutcome::Initialised));

    // A later writer to the table memory must not be undone by a late core.
    let marker = image.table_base + tables.buffer_size() - 8;
    memory.write_descriptor(marker, 0x1234);

    let mut late = Core::default();
    let second = state.mmu_on(&image, &mut late, &memory, &SpinEvent);
    assert_eq!(second, Ok(BootOutcome::AlreadyInitialised));
    assert_eq!(memory.read(marker), Some(0x1234));
    assert_eq!(late.values, expected_registers(&tables));
}

#[test]
fn concurrent_cores_initialise_exactly_once() {
    let threads = 8;

    let tables = tables();
    let writes: Arc<[(u64, u64)]> = tables.descriptor_writes().into();
    let registers = RegisterValues::for_config(tables.config());
    let table_base = tables.config().table_base();
    let buffer_len = tables.buffer_size();
    let words: Arc<[AtomicU64]> = words(&tables).into();

    let state = Arc::new(BootState::new());
    let start = Arc::new(Barrier::new(threads));
    let zeroed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let writes = Arc::clone(&writes);
        let words = Arc::clone(&words);
        let state = Arc::clone(&state);
        let start = Arc::clone(&start);
        let zeroed = Arc::clone(&zeroed);
        handles.push(thread::spawn(move || {
            let image = BootImage {
                table_base,
                buffer_len,
                writes: &writes,
                registers,
            };
            let memory = CountingMemory {
                inner: TableBuffer::new(table_base, &words),
                zeroed: AtomicUsize::new(0),
            };
            let mut core = Core::default();

            start.wait();
            let outcome = state.mmu_on(&image, &mut core, &memory, &SpinEvent).unwrap();
            zeroed.fetch_add(memory.zeroed.load(Ordering::SeqCst), Ordering::SeqCst);
            (outcome, core.values)
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let initialisers = results
        .iter()
        .filter(|(o, _)| *o == BootOutcome::Initialised)
        .count();
    assert_eq!(initialisers, 1);
    assert_eq!(zeroed.load(Ordering::SeqCst), 1);

    let expected = expected_registers(&tables);
    assert!(results.iter().all(|(_, values)| *values == expected));

    let memory = TableBuffer::new(table_base, &words);
    for &(address, value) in writes.iter() {
        assert_eq!(memory.read(address), Some(value));
    }
}

#[test]
fn unsupported_tcr_halts_before_sctlr() {
    let tables = tables();
    let registers = RegisterValues::for_config(tables.config());
    let image = BootImage {
        table_base: tables.config().table_base(),
        buffer_len: tables.buffer_size(),
        writes: &[],
        registers,
    };
    let words = words(&tables);
    let memory = TableBuffer::new(image.table_base, &words);
    let state = BootState::new();

    // A core without the RES1 bit 31 wired up.
    let mut core = Core {
        tcr_implemented: Some(!(1 << 31)),
        ..Core::default()
    };
    let err = state.mmu_on(&image, &mut core, &memory, &SpinEvent).unwrap_err();
    assert_eq!(
        err,
        BootError::TcrMismatch {
            expected: registers.tcr,
            actual: registers.tcr & !(1 << 31),
        }
    );
    assert!(!core.writes.contains(&SystemRegister::Sctlr));
    assert_eq!(core.values[slot(SystemRegister::Sctlr)], 0);

    // The lock was released and the tables stay initialised for other cores.
    assert!(state.is_initialised());
    let mut good = Core::default();
    assert_eq!(
        state.mmu_on(&image, &mut good, &memory, &SpinEvent),
        Ok(BootOutcome::AlreadyInitialised)
    );
}
