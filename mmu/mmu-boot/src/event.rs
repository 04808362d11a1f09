use core::hint::spin_loop;

/// The `AArch64` event register, as used to park cores waiting on a lock.
///
/// `WFE` returns immediately if the local event register is set and clears it;
/// `SEVL` sets the local event register; `SEV` sets it on every core.
pub trait EventRegister {
    /// `SEVL`: make the next [`wait`](Self::wait) on this core fall through.
    fn send_local(&self);

    /// `WFE`: sleep until an event arrives.
    fn wait(&self);

    /// `SEV`: wake all cores sleeping in [`wait`](Self::wait).
    fn send(&self);
}

/// Host stand-in: waiting degrades to a spin hint, sending does nothing.
///
/// Correct because every `wait` is followed by a re-check of the lock word.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinEvent;

impl EventRegister for SpinEvent {
    #[inline]
    fn send_local(&self) {}

    #[inline]
    fn wait(&self) {
        spin_loop();
    }

    #[inline]
    fn send(&self) {}
}
