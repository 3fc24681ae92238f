/*!
 * Process Wait Primitive
 * Blocking waitpid with EINTR retry and status decoding
 */

use super::status::ChildStatus;
use super::types::{WaitOutcome, WaitRequest};
use crate::core::errors::{PrimitiveError, PrimitiveResult};
use crate::core::types::{InterruptFlag, Pid};
use nix::errno::Errno;
use nix::libc;
use nix::sys::wait::WaitPidFlag;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a single waitpid attempt, before any interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWait {
    /// A child changed state; `status` is the raw status word
    Changed { pid: Pid, status: i32 },
    /// WNOHANG was set and no child has changed state
    NotReady,
    /// The call returned -1
    Failed(Errno),
}

/// The waitpid system call
#[cfg_attr(test, mockall::automock)]
pub trait WaitSyscall: Send + Sync {
    fn waitpid(&self, pid: Pid, options: WaitPidFlag) -> RawWait;
}

/// waitpid(2) of the host OS
#[derive(Debug, Clone, Copy, Default)]
pub struct HostWait;

impl WaitSyscall for HostWait {
    fn waitpid(&self, pid: Pid, options: WaitPidFlag) -> RawWait {
        let mut status: libc::c_int = 0;
        // SAFETY: `status` outlives the call and is only written by the kernel
        let res = unsafe { libc::waitpid(pid, &mut status, options.bits()) };
        match res {
            -1 => RawWait::Failed(Errno::last()),
            0 => RawWait::NotReady,
            pid => RawWait::Changed { pid, status },
        }
    }
}

/// Waits on child processes on behalf of one runtime thread
pub struct ProcessWaiter<S: WaitSyscall = HostWait> {
    syscall: Arc<S>,
    interrupt: InterruptFlag,
}

impl<S: WaitSyscall> Clone for ProcessWaiter<S> {
    fn clone(&self) -> Self {
        Self {
            syscall: self.syscall.clone(),
            interrupt: self.interrupt.clone(),
        }
    }
}

impl ProcessWaiter<HostWait> {
    pub fn new(interrupt: InterruptFlag) -> Self {
        Self::with_syscall(HostWait, interrupt)
    }
}

impl<S: WaitSyscall> ProcessWaiter<S> {
    pub fn with_syscall(syscall: S, interrupt: InterruptFlag) -> Self {
        Self {
            syscall: Arc::new(syscall),
            interrupt,
        }
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Wait for a child state change
    ///
    /// Blocks the calling OS thread unless the request is non-blocking.
    /// EINTR is retried in place; the interrupt flag is checked before each
    /// retry and abandons the wait when raised.
    pub fn wait(&self, request: WaitRequest) -> PrimitiveResult<WaitOutcome> {
        let options = request.options();
        let mut retries: u32 = 0;

        loop {
            match self.syscall.waitpid(request.pid, options) {
                RawWait::Changed { pid, status } => {
                    let decoded = ChildStatus::decode(status).ok_or_else(|| {
                        PrimitiveError::Unsupported(format!(
                            "wait status {:#x} for pid {}",
                            status, pid
                        ))
                    })?;
                    debug!(pid, ?decoded, retries, "Child changed state");
                    return Ok(WaitOutcome::from_status(pid, decoded));
                }
                RawWait::NotReady => return Ok(WaitOutcome::NoStateChange),
                RawWait::Failed(Errno::ECHILD) => return Ok(WaitOutcome::NoChildAvailable),
                RawWait::Failed(Errno::EINTR) => {
                    if self.interrupt.is_raised() {
                        debug!(pid = request.pid, retries, "Wait abandoned on interrupt");
                        return Err(PrimitiveError::Interrupted);
                    }
                    retries += 1;
                    debug!(pid = request.pid, retries, "waitpid interrupted, retrying");
                }
                RawWait::Failed(errno) => {
                    warn!(pid = request.pid, %errno, "waitpid failed");
                    return Ok(WaitOutcome::OtherError { errno });
                }
            }
        }
    }
}

impl<S: WaitSyscall + 'static> ProcessWaiter<S> {
    /// Wait on the blocking pool so the async scheduler keeps running other tasks
    pub async fn wait_async(&self, request: WaitRequest) -> PrimitiveResult<WaitOutcome> {
        let waiter = self.clone();
        match tokio::task::spawn_blocking(move || waiter.wait(request)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PrimitiveError::Interrupted),
        }
    }
}

/// Wait on `pid` with the host syscall and no interrupt source
pub fn wait_pid(pid: Pid, non_blocking: bool) -> PrimitiveResult<WaitOutcome> {
    ProcessWaiter::new(InterruptFlag::new()).wait(WaitRequest::new(pid, non_blocking))
}

/// Async form of [`wait_pid`]
pub async fn wait_pid_async(pid: Pid, non_blocking: bool) -> PrimitiveResult<WaitOutcome> {
    ProcessWaiter::new(InterruptFlag::new())
        .wait_async(WaitRequest::new(pid, non_blocking))
        .await
}
