use std::fmt;

use thiserror::Error;

/// Errors returned by every engine operation.
///
/// Each variant carries a human-readable description of the guard that
/// failed, suitable for showing to the person who attempted the action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Malformed or insufficient input (missing documents, grade out of range).
    #[error("validation error: {0}")]
    Validation(String),

    /// A transition guard was not met (wrong state, wrong actor).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Concurrent or out-of-order operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Organizational data needed to build an approval chain is missing or ambiguous.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Precondition(_) | WorkflowError::TaskNotFound(_) => {
                ErrorKind::Precondition
            }
            WorkflowError::Conflict(_) => ErrorKind::Conflict,
            WorkflowError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The bare guard description, without the category prefix.
    pub fn reason(&self) -> &str {
        match self {
            WorkflowError::Validation(msg)
            | WorkflowError::Precondition(msg)
            | WorkflowError::Conflict(msg)
            | WorkflowError::Configuration(msg)
            | WorkflowError::TaskNotFound(msg) => msg,
        }
    }
}

/// The four failure categories a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Validation,
    Precondition,
    Conflict,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::Precondition => write!(f, "PreconditionError"),
            ErrorKind::Conflict => write!(f, "ConflictError"),
            ErrorKind::Configuration => write!(f, "ConfigurationError"),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
