use crate::event::EventRegister;
use core::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// The `mmu_lock` word: one core at a time zeroes and programs the tables.
///
/// Acquisition mirrors an `LDAXR`/`STXR` retry loop: read with acquire
/// semantics, go back to sleep if taken, otherwise try an exclusive store that
/// may fail spuriously.
pub struct MmuLock {
    /// * `0`: unlocked
    /// * `1`: locked
    word: AtomicU32,
}

impl Default for MmuLock {
    fn default() -> Self {
        Self::new()
    }
}

impl MmuLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(UNLOCKED),
        }
    }

    /// Sleep on `event` until the lock is taken by this core.
    pub fn acquire<'a, E: EventRegister>(&'a self, event: &'a E) -> MmuLockGuard<'a, E> {
        // First pass won't sleep.
        event.send_local();
        loop {
            event.wait();
            if self.word.load(Ordering::Acquire) != UNLOCKED {
                continue;
            }
            if self
                .word
                .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return MmuLockGuard { lock: self, event };
            }
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) == LOCKED
    }
}

/// Holds [`MmuLock`]; dropping it releases the lock and wakes waiting cores.
pub struct MmuLockGuard<'a, E: EventRegister> {
    lock: &'a MmuLock,
    event: &'a E,
}

impl<E: EventRegister> Drop for MmuLockGuard<'_, E> {
    fn drop(&mut self) {
        // `STLR wzr`: publishes everything written under the lock.
        self.lock.word.store(UNLOCKED, Ordering::Release);
        self.event.send();
    }
}
