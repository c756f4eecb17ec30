//! Model-level error type.

use thiserror::Error;

/// Errors raised by the core data model (parsing and validation).
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid coordinate '{input}': {message}")]
    Coordinate { input: String, message: String },

    #[error("invalid version range '{input}': {message}")]
    Range { input: String, message: String },
}

impl Error {
    pub fn coordinate(input: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Coordinate {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn range(input: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Range {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for core model operations.
pub type Result<T> = std::result::Result<T, Error>;
