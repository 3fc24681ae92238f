/*!
 * VM Primitives Library
 * OS-facing and control-transfer primitives for a managed-language runtime
 */

pub mod control;
pub mod core;
pub mod host;
pub mod monitoring;
pub mod primitives;
pub mod process;
pub mod signals;

// Re-exports
pub use crate::core::{InterruptFlag, Pid, PrimitiveError, PrimitiveResult, PrimitivesConfig};
pub use control::{catch, catch_fresh, throw, Completion, Escape, Tag, Unwind};
pub use host::{cpu_times, epoch_seconds, user_home, CpuTimes};
pub use monitoring::init_tracing;
pub use primitives::Primitives;
pub use process::{wait_pid, wait_pid_async, WaitOutcome, WaitRequest};
pub use signals::{watch, Disposition, HandlerAction, SignalId, SignalWatchRegistry};
