//! Error types for KyroLogic.
//!
//! Errors are strongly typed using thiserror. Note what is *not* an error:
//! a failed unification or an unprovable goal is an ordinary negative
//! result, threaded through the search as a value.

use thiserror::Error;

/// Validation errors raised when input does not have the required shape.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Fact '{fact}' is not ground: facts may not contain variables")]
    NonGroundFact {
        fact: String,
    },

    #[error("Malformed temporal fact '{fact}': {reason}")]
    MalformedTemporalFact {
        fact: String,
        reason: String,
    },

    #[error("Certainty value {value} is out of range [0.0, 1.0]")]
    CertaintyOutOfRange {
        value: f32,
    },

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid identifier '{name}'")]
    InvalidIdentifier {
        name: String,
    },

    #[error("Parse error at offset {offset} in '{input}': {reason}")]
    Parse {
        input: String,
        offset: usize,
        reason: String,
    },
}

/// Execution errors raised by the query runtime.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Query timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Queue full on {path} pool (capacity {capacity})")]
    QueueFull {
        path: String,
        capacity: usize,
    },

    #[error("Worker pool {path} disconnected")]
    Disconnected {
        path: String,
    },

    #[error("Failed to spawn worker '{name}': {reason}")]
    WorkerSpawn {
        name: String,
        reason: String,
    },
}

/// Top-level error type for KyroLogic.
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LogicError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::Timeout { .. } | ExecutionError::QueueFull { .. }
            ),
        }
    }
}

/// Result type alias for KyroLogic operations.
pub type LogicResult<T> = Result<T, LogicError>;
