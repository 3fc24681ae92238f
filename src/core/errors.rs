/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive-level errors surfaced to the calling language layer
///
/// Expected negative outcomes (no child, no state change) are never
/// represented here; they are values of the primitive's own result type.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PrimitiveError {
    #[error("{0}")]
    #[diagnostic(
        code(primitive::argument_error),
        help("Check the arguments passed to the primitive.")
    )]
    Argument(String),

    #[error("{0}")]
    #[diagnostic(
        code(primitive::invalid_signal),
        help("Use a signal name such as \"SIGUSR1\", \"USR1\" or a signal number.")
    )]
    InvalidSignal(String),

    #[error("Not supported: {0}")]
    #[diagnostic(
        code(primitive::not_supported),
        help("This code path is intentionally left unimplemented.")
    )]
    Unsupported(String),

    #[error("Interrupted while waiting for a child process")]
    #[diagnostic(
        code(primitive::interrupted),
        help("The runtime requested cancellation of the blocking call.")
    )]
    Interrupted,

    #[error("{op} failed: {errno}")]
    #[diagnostic(
        code(primitive::os_error),
        help("The operating system rejected the request. See errno for details.")
    )]
    Os { op: String, errno: String },
}

impl PrimitiveError {
    /// Build an OS error from a failed call name and its errno
    pub fn os(op: impl Into<String>, errno: Errno) -> Self {
        PrimitiveError::Os {
            op: op.into(),
            errno: errno.desc().to_string(),
        }
    }

    /// Whether the language layer should raise this as an ArgumentError
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            PrimitiveError::Argument(_) | PrimitiveError::InvalidSignal(_)
        )
    }
}

impl From<std::io::Error> for PrimitiveError {
    fn from(err: std::io::Error) -> Self {
        PrimitiveError::Os {
            op: "io".to_string(),
            errno: err.to_string(),
        }
    }
}

/// Result type for primitive operations
pub type PrimitiveResult<T> = std::result::Result<T, PrimitiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_error_serialization() {
        let error = PrimitiveError::Argument("user nobody-here does not exist".into());
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: PrimitiveError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_argument_classification() {
        assert!(PrimitiveError::InvalidSignal("bad".into()).is_argument_error());
        assert!(PrimitiveError::Argument("bad".into()).is_argument_error());
        assert!(!PrimitiveError::Interrupted.is_argument_error());
        assert!(!PrimitiveError::Unsupported("x".into()).is_argument_error());
    }

    #[test]
    fn test_os_error_display() {
        let error = PrimitiveError::os("sigaction", Errno::EINVAL);
        assert_eq!(error.to_string(), "sigaction failed: Invalid argument");
    }
}
