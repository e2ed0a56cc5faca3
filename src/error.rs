//! Crate-level error type used by the driver and the binary.

use crate::sandbox::{FailureKind, ScriptError};
use thiserror::Error;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the driver
#[derive(Debug, Error)]
pub enum Error {
    /// The input record is malformed or incomplete
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Failure category for output records.
    ///
    /// Errors that happen before a script runs count as input validation
    /// failures.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Script(err) => err.kind(),
            Error::InputValidation(_) | Error::Io(_) | Error::Serialization(_) => {
                FailureKind::InputValidation
            }
        }
    }
}
