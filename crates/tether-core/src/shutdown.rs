use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// One-shot cooperative shutdown signal shared by every loop of an instance.
///
/// The flag starts cleared, is set at most once, and is never reset. Loops
/// read it after each receive timeout, so the worst-case latency between
/// [`ShutdownFlag::trigger`] and a loop exiting is one receive interval.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Builds a cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Later calls have no further effect.
    pub fn trigger(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Reports whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Returns a guard that sets the flag when dropped, including on unwind.
    #[must_use]
    pub const fn trigger_on_drop(&self) -> ShutdownGuard<'_> {
        ShutdownGuard { flag: self }
    }
}

/// Sets its [`ShutdownFlag`] when dropped.
#[derive(Debug)]
pub struct ShutdownGuard<'a> {
    flag: &'a ShutdownFlag,
}

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        self.flag.trigger();
    }
}
