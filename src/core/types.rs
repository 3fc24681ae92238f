/*!
 * Core Types
 * Common types shared by the primitives
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// OS process ID type (signed: negative values select process groups)
pub type Pid = i32;

/// Raw signal number
pub type SignalNumber = i32;

/// Cooperative cancellation flag shared between the runtime and blocking primitives
///
/// The runtime raises the flag (shutdown, thread kill); blocking primitives
/// check it before every retry of an interrupted call.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Withdraw a pending cancellation request
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
