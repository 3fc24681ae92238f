/*!
 * Process Module
 * Waiting on child processes and decoding their status
 */

pub mod status;
pub mod types;
mod wait;

// Re-export for convenience
pub use status::ChildStatus;
pub use types::{WaitOutcome, WaitRequest};
pub use wait::{wait_pid, wait_pid_async, HostWait, ProcessWaiter, RawWait, WaitSyscall};
