use core::sync::atomic::{AtomicU64, Ordering};

/// The memory holding the translation tables, as seen by the initialising core.
pub trait TableMemory {
    /// Clear `len` bytes starting at `base`.
    fn zero(&self, base: u64, len: u64);

    /// Store one descriptor.
    fn write_descriptor(&self, address: u64, value: u64);
}

/// A table buffer backed by a word slice, addressed from `base`.
///
/// Addresses outside the slice are ignored; callers size the slice from the
/// reported buffer size.
pub struct TableBuffer<'a> {
    base: u64,
    words: &'a [AtomicU64],
}

impl<'a> TableBuffer<'a> {
    #[must_use]
    pub const fn new(base: u64, words: &'a [AtomicU64]) -> Self {
        Self { base, words }
    }

    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// The descriptor stored at `address`, if it lies inside the buffer.
    #[must_use]
    pub fn read(&self, address: u64) -> Option<u64> {
        self.slot(address).map(|w| w.load(Ordering::Relaxed))
    }

    fn slot(&self, address: u64) -> Option<&AtomicU64> {
        let offset = address.checked_sub(self.base)?;
        if !offset.is_multiple_of(8) {
            return None;
        }
        self.words.get(usize::try_from(offset / 8).ok()?)
    }
}

impl TableMemory for TableBuffer<'_> {
    fn zero(&self, base: u64, len: u64) {
        let mut address = base;
        while address < base + len {
            if let Some(w) = self.slot(address) {
                w.store(0, Ordering::Relaxed);
            }
            address += 8;
        }
    }

    fn write_descriptor(&self, address: u64, value: u64) {
        if let Some(w) = self.slot(address) {
            w.store(value, Ordering::Relaxed);
        }
    }
}
