//! Transport error type and classification.

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification consumers branch on: a resource that is not there
/// is handled very differently from a transfer that broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Other,
}

/// Error type for transport operations.
#[derive(Error, Debug, Diagnostic)]
pub enum TransportError {
    /// The remote resource does not exist.
    #[error("resource not found: {resource}")]
    #[diagnostic(code(quarry::transport::not_found))]
    NotFound {
        /// Repository-relative resource path.
        resource: String,
    },

    /// A transfer listener cancelled the transfer.
    #[error("transfer cancelled: {resource}")]
    #[diagnostic(code(quarry::transport::cancelled))]
    Cancelled { resource: String },

    /// I/O failure while transferring.
    #[error("i/o {operation} failed for {resource}")]
    #[diagnostic(code(quarry::transport::io))]
    Io {
        resource: String,
        /// Operation that failed (e.g. "read", "write", "open")
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// The repository url uses a scheme this transporter does not speak.
    #[error("unsupported repository url '{url}'")]
    #[diagnostic(
        code(quarry::transport::unsupported),
        help("Only file:// repositories are served by the bundled transporter")
    )]
    Unsupported { url: String },

    /// The resource path escapes the repository root.
    #[error("illegal resource path '{resource}'")]
    #[diagnostic(code(quarry::transport::illegal_resource))]
    IllegalResource { resource: String },
}

impl TransportError {
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn cancelled(resource: impl Into<String>) -> Self {
        Self::Cancelled {
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn io(
        resource: impl Into<String>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            resource: resource.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Classify for consumers that only care about existence.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            TransportError::NotFound { .. } => ErrorClass::NotFound,
            TransportError::Io { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ErrorClass::NotFound
            }
            _ => ErrorClass::Other,
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
