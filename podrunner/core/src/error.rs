use std::{fmt, time::Duration};

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error raised by an orchestrator transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Orchestrator call that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Inspect,
    FetchOutput,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Inspect => "inspect",
            Operation::FetchOutput => "fetch_output",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The inbound request is malformed.
    #[error("invalid execution request: {0}")]
    Validation(String),

    /// A control-plane call failed.
    #[error("orchestrator {operation} call for unit `{name}` failed: {source}")]
    Orchestrator {
        operation: Operation,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The unit vanished between calls.
    #[error("execution unit `{name}` not found during {operation}")]
    NotFound { operation: Operation, name: String },

    /// Polling used up its budget; the unit may still be running.
    #[error("execution unit `{name}` did not terminate within {timeout:?}")]
    DeadlineExceeded { name: String, timeout: Duration },

    #[error("execution of unit `{name}` was cancelled")]
    Cancelled { name: String },
}

impl Error {
    pub fn orchestrator(
        operation: Operation,
        name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Orchestrator {
            operation,
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn not_found(operation: Operation, name: impl Into<String>) -> Self {
        Error::NotFound {
            operation,
            name: name.into(),
        }
    }

    /// Stable label for the error class, used in API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Orchestrator { .. } => "orchestrator",
            Error::NotFound { .. } => "not_found",
            Error::DeadlineExceeded { .. } => "deadline_exceeded",
            Error::Cancelled { .. } => "cancelled",
        }
    }

    /// Name of the execution unit this error concerns, if any
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            Error::Validation(_) => None,
            Error::Orchestrator { name, .. }
            | Error::NotFound { name, .. }
            | Error::DeadlineExceeded { name, .. }
            | Error::Cancelled { name } => Some(name),
        }
    }
}
