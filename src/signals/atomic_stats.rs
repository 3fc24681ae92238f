/*!
 * Lock-Free Signal Statistics
 * Uses atomic counters so the dispatcher never contends with installers
 */

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use crate::signals::types::SignalStats;

/// Registry and dispatcher counters
///
/// Updated from installer threads and the dispatcher thread; relaxed
/// ordering, padded to its own cache line.
#[repr(C, align(64))]
pub struct AtomicSignalStats {
    installs: AtomicU64,
    deliveries: AtomicU64,
    callbacks_run: AtomicU64,
    callback_panics: AtomicU64,
    custom_handlers: AtomicUsize,
}

impl AtomicSignalStats {
    #[inline]
    pub const fn new() -> Self {
        Self {
            installs: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            callbacks_run: AtomicU64::new(0),
            callback_panics: AtomicU64::new(0),
            custom_handlers: AtomicUsize::new(0),
        }
    }

    #[inline(always)]
    pub fn inc_installs(&self) {
        self.installs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record deliveries drained from the pending table
    #[inline(always)]
    pub fn add_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_callbacks_run(&self) {
        self.callbacks_run.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_callback_panics(&self) {
        self.callback_panics.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_custom_handlers(&self) {
        self.custom_handlers.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn dec_custom_handlers(&self) {
        self.custom_handlers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Point-in-time copy; counters are read independently
    #[inline]
    pub fn snapshot(&self) -> SignalStats {
        SignalStats {
            installs: self.installs.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            callbacks_run: self.callbacks_run.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
            custom_handlers: self.custom_handlers.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicSignalStats {
    fn default() -> Self {
        Self::new()
    }
}
