use crate::event::EventRegister;
use crate::lock::MmuLock;
use crate::memory::TableMemory;
use core::sync::atomic::{AtomicU32, Ordering, fence};
use log::{debug, trace};
use mmu_registers::{RegisterValues, SystemRegister};

const INITIALISED: u32 = 1;

/// Access to the calling core's translation control registers.
pub trait SystemRegisters {
    /// `MSR <reg>_ELx, value`.
    fn write(&mut self, reg: SystemRegister, value: u64);

    /// `MRS value, <reg>_ELx`. Bits the core does not implement read back as zero.
    fn read(&self, reg: SystemRegister) -> u64;

    /// `ISB`: make preceding register writes visible to this core.
    fn synchronize(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    /// The core does not support the requested translation configuration.
    #[error("TCR read back as {actual:#x}, expected {expected:#x}")]
    TcrMismatch { expected: u64, actual: u64 },
}

/// What a core did in [`BootState::mmu_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// This core zeroed and programmed the tables.
    Initialised,
    /// Another core had already done so.
    AlreadyInitialised,
}

/// Everything a core needs to bring up the MMU.
#[derive(Debug, Clone, Copy)]
pub struct BootImage<'a> {
    /// Address of the first table.
    pub table_base: u64,
    /// Bytes to zero before writing descriptors.
    pub buffer_len: u64,
    /// Non-zero descriptors as `(address, value)`.
    pub writes: &'a [(u64, u64)],
    pub registers: RegisterValues,
}

/// Shared state of the bootstrap sequence: the `mmu_lock` and `mmu_init` words.
#[derive(Default)]
pub struct BootState {
    lock: MmuLock,
    initialised: AtomicU32,
}

impl BootState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock: MmuLock::new(),
            initialised: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire) == INITIALISED
    }

    /// Run the bootstrap sequence on the calling core.
    ///
    /// The first core to take the lock zeroes the table buffer and writes all
    /// descriptors, then marks the tables initialised before releasing the
    /// lock. Every core, first or not, then programs its own registers.
    ///
    /// # Errors
    /// [`BootError::TcrMismatch`] if `TCR_ELx` does not read back as written;
    /// `SCTLR_ELx` is left untouched and the MMU stays off on this core.
    pub fn mmu_on<R, M, E>(
        &self,
        image: &BootImage<'_>,
        registers: &mut R,
        memory: &M,
        event: &E,
    ) -> Result<BootOutcome, BootError>
    where
        R: SystemRegisters,
        M: TableMemory,
        E: EventRegister,
    {
        let outcome = {
            let _guard = self.lock.acquire(event);
            if self.initialised.load(Ordering::Relaxed) == INITIALISED {
                BootOutcome::AlreadyInitialised
            } else {
                debug!(
                    "programming {} descriptors at {:#x}",
                    image.writes.len(),
                    image.table_base
                );
                memory.zero(image.table_base, image.buffer_len);
                for &(address, value) in image.writes {
                    memory.write_descriptor(address, value);
                }

                // Tables complete before the flag; flag before the lock release.
                fence(Ordering::SeqCst);
                self.initialised.store(INITIALISED, Ordering::Release);
                BootOutcome::Initialised
            }
        };

        program_core(&image.registers, registers)?;
        Ok(outcome)
    }
}

/// Per-core part: `TTBR0`, `MAIR`, `TCR`, verify, then `SCTLR`.
///
/// # Errors
/// [`BootError::TcrMismatch`], see [`BootState::mmu_on`].
pub fn program_core<R: SystemRegisters>(values: &RegisterValues, registers: &mut R) -> Result<(), BootError> {
    registers.write(SystemRegister::Ttbr0, values.ttbr0);
    registers.write(SystemRegister::Mair, values.mair);
    registers.write(SystemRegister::Tcr, values.tcr);
    registers.synchronize();

    let actual = registers.read(SystemRegister::Tcr);
    if actual != values.tcr {
        return Err(BootError::TcrMismatch {
            expected: values.tcr,
            actual,
        });
    }

    registers.write(SystemRegister::Sctlr, values.sctlr);
    registers.synchronize();
    trace!(
        "{} = {:#x}",
        SystemRegister::Sctlr.at(values.exception_level),
        values.sctlr
    );
    Ok(())
}
