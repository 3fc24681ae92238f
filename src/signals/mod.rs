/*!
 * Signals Module
 * Signal name translation and the process-wide watch registry
 */

mod atomic_stats;
mod dispatch;
mod registry;
pub mod types;

// Re-export public API
pub use registry::{watch, SignalWatchRegistry};
pub use types::{Disposition, HandlerAction, SignalCallback, SignalId, SignalStats};
