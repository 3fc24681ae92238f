/*!
 * Process Wait Types
 * Requests and decoded outcomes of the wait primitive
 */

use super::status::ChildStatus;
use crate::core::types::{Pid, SignalNumber};
use nix::errno::Errno;
use nix::sys::wait::WaitPidFlag;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One wait call: which child, and whether to block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitRequest {
    pub pid: Pid,
    pub non_blocking: bool,
    /// Also report children stopped by a signal (WUNTRACED)
    pub report_stopped: bool,
}

impl WaitRequest {
    pub fn new(pid: Pid, non_blocking: bool) -> Self {
        Self {
            pid,
            non_blocking,
            report_stopped: false,
        }
    }

    /// Wait for any child
    pub fn any_child(non_blocking: bool) -> Self {
        Self::new(-1, non_blocking)
    }

    pub fn with_stopped(mut self) -> Self {
        self.report_stopped = true;
        self
    }

    /// waitpid option bits for this request
    pub fn options(&self) -> WaitPidFlag {
        let mut options = WaitPidFlag::empty();
        if self.non_blocking {
            options |= WaitPidFlag::WNOHANG;
        }
        if self.report_stopped {
            options |= WaitPidFlag::WUNTRACED;
        }
        options
    }
}

/// Decoded result of one wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// Child exited normally with `code`
    Exited { pid: Pid, code: i32 },
    /// Child was terminated by `signal`
    Signaled { pid: Pid, signal: SignalNumber },
    /// Child was stopped by `signal`
    Stopped { pid: Pid, signal: SignalNumber },
    /// No child matched the request (ECHILD)
    NoChildAvailable,
    /// Non-blocking wait and the child has not changed state yet
    NoStateChange,
    /// waitpid failed with an errno other than ECHILD or EINTR
    OtherError {
        #[serde(serialize_with = "errno_ser", deserialize_with = "errno_de")]
        errno: Errno,
    },
}

impl WaitOutcome {
    pub fn from_status(pid: Pid, status: ChildStatus) -> Self {
        match status {
            ChildStatus::Exited(code) => WaitOutcome::Exited { pid, code },
            ChildStatus::Signaled(signal) => WaitOutcome::Signaled { pid, signal },
            ChildStatus::Stopped(signal) => WaitOutcome::Stopped { pid, signal },
        }
    }

    /// Pid of the child whose state changed, if any
    pub fn pid(&self) -> Option<Pid> {
        match *self {
            WaitOutcome::Exited { pid, .. }
            | WaitOutcome::Signaled { pid, .. }
            | WaitOutcome::Stopped { pid, .. } => Some(pid),
            _ => None,
        }
    }

    /// Whether a child was reaped or reported
    pub fn is_state_change(&self) -> bool {
        self.pid().is_some()
    }

    /// Language-level `[exit_code, term_signal, stop_signal, pid]` form
    ///
    /// `None` stands for the false/nil sentinel returned when no child
    /// changed state.
    pub fn into_tuple(self) -> Option<(Option<i32>, Option<i32>, Option<i32>, Pid)> {
        match self {
            WaitOutcome::Exited { pid, code } => Some((Some(code), None, None, pid)),
            WaitOutcome::Signaled { pid, signal } => Some((None, Some(signal), None, pid)),
            WaitOutcome::Stopped { pid, signal } => Some((None, None, Some(signal), pid)),
            _ => None,
        }
    }
}

fn errno_ser<S: Serializer>(errno: &Errno, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(*errno as i32)
}

fn errno_de<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Errno, D::Error> {
    i32::deserialize(deserializer).map(Errno::from_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_options() {
        assert_eq!(WaitRequest::new(10, false).options(), WaitPidFlag::empty());
        assert_eq!(WaitRequest::new(10, true).options(), WaitPidFlag::WNOHANG);
        assert_eq!(
            WaitRequest::any_child(true).with_stopped().options(),
            WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED
        );
    }

    #[test]
    fn test_tuple_form() {
        let exited = WaitOutcome::Exited { pid: 12, code: 3 };
        assert_eq!(exited.into_tuple(), Some((Some(3), None, None, 12)));

        let signaled = WaitOutcome::Signaled { pid: 12, signal: 9 };
        assert_eq!(signaled.into_tuple(), Some((None, Some(9), None, 12)));

        assert_eq!(WaitOutcome::NoChildAvailable.into_tuple(), None);
        assert_eq!(WaitOutcome::NoStateChange.into_tuple(), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = WaitOutcome::OtherError {
            errno: Errno::EINVAL,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, format!(r#"{{"outcome":"other_error","errno":{}}}"#, Errno::EINVAL as i32));

        let back: WaitOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
