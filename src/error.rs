//! Error handling for scriptkit.
use thiserror::Error;

use crate::invocation::Expectation;

/// Defines all possible errors surfaced by the runtime services.
#[derive(Debug, Error)]
pub enum ScriptKitError {
    /// A severity name that is not one of the six known levels.
    #[error("invalid log level '{0}' (expected trace, debug, info, warn, error or fatal)")]
    InvalidLevel(String),

    /// Malformed or missing call arguments. Always surfaced immediately and
    /// never recorded as a check failure.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more accumulated checks failed and were reported.
    #[error("{count} check(s) failed")]
    ValidationFailed {
        /// Number of failures reported before the set was cleared.
        count: usize,
    },

    /// The current unit was invoked in a way its usage contract forbids.
    #[error("{source_id} {}", .expected.violation())]
    FatalPrecondition {
        /// Source identifier of the offending unit.
        source_id: String,
        /// The invocation style the unit required.
        expected: Expectation,
        /// Whether the root of the inclusion chain is an interactive shell.
        interactive: bool,
    },

    /// Error writing diagnostics or reading terminal input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptKitError {
    /// Process exit status a binary should use when this error ends the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed { .. } | Self::FatalPrecondition { .. } => 1,
            Self::InvalidLevel(_) | Self::InvalidArgument(_) => 2,
            Self::Io(_) => 74,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScriptKitError>;
