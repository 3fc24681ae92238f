/*!
 * Signal Types
 * Signal name translation, handler actions and statistics
 */

use crate::core::errors::{PrimitiveError, PrimitiveResult};
use crate::core::types::SignalNumber;
use nix::sys::signal::{SigHandler, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Canonical OS signal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(Signal);

impl SignalId {
    /// Translate a signal name into an identifier
    ///
    /// Accepts "SIGUSR1", "USR1", the aliases CLD, IOT and POLL, and
    /// decimal signal numbers.
    pub fn from_name(name: &str) -> PrimitiveResult<Self> {
        let trimmed = name.trim();
        if let Ok(number) = trimmed.parse::<SignalNumber>() {
            return Self::from_number(number);
        }

        let bare = trimmed.strip_prefix("SIG").unwrap_or(trimmed);
        let canonical = match bare {
            "CLD" => "CHLD",
            "IOT" => "ABRT",
            "POLL" => "IO",
            other => other,
        };
        let full = format!("SIG{}", canonical);

        Signal::from_str(&full)
            .map(SignalId)
            .map_err(|_| PrimitiveError::InvalidSignal(format!("unsupported signal '{}'", full)))
    }

    /// Convert from signal number
    pub fn from_number(number: SignalNumber) -> PrimitiveResult<Self> {
        Signal::try_from(number)
            .map(SignalId)
            .map_err(|_| PrimitiveError::InvalidSignal(format!("invalid signal number ({})", number)))
    }

    /// Get signal number
    pub fn number(&self) -> SignalNumber {
        self.0 as SignalNumber
    }

    /// Full name, e.g. "SIGUSR1"
    pub fn name(&self) -> &'static str {
        self.0.as_str()
    }

    /// Name without the SIG prefix, e.g. "USR1"
    pub fn short_name(&self) -> &'static str {
        let name = self.name();
        name.strip_prefix("SIG").unwrap_or(name)
    }

    pub fn signal(&self) -> Signal {
        self.0
    }

    /// Check if signal can be caught/ignored
    pub fn can_catch(&self) -> bool {
        !matches!(self.0, Signal::SIGKILL | Signal::SIGSTOP)
    }

    /// Synchronous fault and runtime-owned signals that may not be watched
    ///
    /// A handler that returns from a hardware fault re-executes the faulting
    /// instruction; VTALRM drives the runtime's own timers.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self.0,
            Signal::SIGSEGV | Signal::SIGBUS | Signal::SIGILL | Signal::SIGFPE | Signal::SIGVTALRM
        )
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self.0 {
            Signal::SIGHUP => "Hangup",
            Signal::SIGINT => "Interrupt",
            Signal::SIGQUIT => "Quit",
            Signal::SIGILL => "Illegal instruction",
            Signal::SIGTRAP => "Trace/breakpoint trap",
            Signal::SIGABRT => "Aborted",
            Signal::SIGBUS => "Bus error",
            Signal::SIGFPE => "Floating point exception",
            Signal::SIGKILL => "Killed",
            Signal::SIGUSR1 => "User defined signal 1",
            Signal::SIGSEGV => "Segmentation fault",
            Signal::SIGUSR2 => "User defined signal 2",
            Signal::SIGPIPE => "Broken pipe",
            Signal::SIGALRM => "Alarm clock",
            Signal::SIGTERM => "Terminated",
            Signal::SIGCHLD => "Child status changed",
            Signal::SIGCONT => "Continued",
            Signal::SIGSTOP => "Stopped (signal)",
            Signal::SIGTSTP => "Stopped",
            Signal::SIGTTIN => "Stopped (tty input)",
            Signal::SIGTTOU => "Stopped (tty output)",
            Signal::SIGURG => "Urgent I/O condition",
            Signal::SIGXCPU => "CPU time limit exceeded",
            Signal::SIGXFSZ => "File size limit exceeded",
            Signal::SIGVTALRM => "Virtual timer expired",
            Signal::SIGPROF => "Profiling timer expired",
            Signal::SIGWINCH => "Window size changed",
            Signal::SIGIO => "I/O possible",
            Signal::SIGSYS => "Bad system call",
            _ => "Unknown signal",
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.number())
    }
}

impl FromStr for SignalId {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Language-level signal callback; takes no arguments, result unused
pub type SignalCallback = Arc<dyn Fn() + Send + Sync>;

/// Action to install for a signal
#[derive(Clone)]
pub enum HandlerAction {
    /// Restore the OS default disposition
    Default,
    /// Ignore the signal
    Ignore,
    /// Run the callback on the dispatcher thread after delivery
    Custom(SignalCallback),
}

impl HandlerAction {
    pub fn custom<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        HandlerAction::Custom(Arc::new(callback))
    }

    /// Parse a string action descriptor from the language layer
    pub fn from_descriptor(descriptor: &str) -> PrimitiveResult<Self> {
        match descriptor {
            "DEFAULT" | "SIG_DFL" | "SYSTEM_DEFAULT" => Ok(HandlerAction::Default),
            "IGNORE" | "SIG_IGN" | "" => Ok(HandlerAction::Ignore),
            other => Err(PrimitiveError::Unsupported(format!(
                "signal action '{}'",
                other
            ))),
        }
    }

    /// Get disposition from action
    pub fn disposition(&self) -> Disposition {
        match self {
            HandlerAction::Default => Disposition::Default,
            HandlerAction::Ignore => Disposition::Ignore,
            HandlerAction::Custom(_) => Disposition::Custom,
        }
    }
}

impl fmt::Debug for HandlerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerAction::Default => f.write_str("Default"),
            HandlerAction::Ignore => f.write_str("Ignore"),
            HandlerAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Installed disposition, as reported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Default,
    Ignore,
    /// Callback installed through the registry
    Custom,
    /// Handler installed outside the registry
    Foreign,
}

impl Disposition {
    pub(super) fn from_os(handler: SigHandler) -> Self {
        match handler {
            SigHandler::SigDfl => Disposition::Default,
            SigHandler::SigIgn => Disposition::Ignore,
            _ => Disposition::Foreign,
        }
    }
}

/// Signal registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub installs: u64,
    pub deliveries: u64,
    pub callbacks_run: u64,
    pub callback_panics: u64,
    pub custom_handlers: usize,
}
