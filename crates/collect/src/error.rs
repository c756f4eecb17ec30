//! Error types for dependency collection.

use miette::Diagnostic;
use thiserror::Error;

use quarry_core::{Coordinate, DescriptorError, VersionRangeError};

use crate::collector::CollectResult;

/// Terminal outcome of a collection call. Every variant that can occur
/// after traversal started carries the partial result.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The request named no root dependency at all.
    #[error("collect request contains no root dependencies")]
    #[diagnostic(
        code(quarry::collect::no_roots),
        help("Set a root dependency or a non-empty root list on the request")
    )]
    NoRoots,

    /// The session's cancel token fired mid-traversal.
    #[error("dependency collection cancelled")]
    #[diagnostic(code(quarry::collect::cancelled))]
    Cancelled {
        /// The graph collected up to the cancellation point.
        result: Box<CollectResult>,
    },

    /// Collection finished but recorded failures the session treats as
    /// fatal, or the root itself could not be processed.
    #[error("failed to collect dependencies ({} failure{})", result.errors.len(), if result.errors.len() == 1 { "" } else { "s" })]
    #[diagnostic(
        code(quarry::collect::failed),
        help("Inspect `result.errors` for the failed subtrees; the partial graph is attached")
    )]
    Collection { result: Box<CollectResult> },
}

impl Error {
    /// The partial result, when the traversal got far enough to have one.
    #[must_use]
    pub fn partial_result(&self) -> Option<&CollectResult> {
        match self {
            Error::NoRoots => None,
            Error::Cancelled { result } | Error::Collection { result } => Some(result),
        }
    }
}

/// A recoverable failure recorded on the result while the traversal
/// continued with the remaining siblings.
#[derive(Error, Debug, Clone)]
pub enum Failure {
    #[error("descriptor read failed")]
    Descriptor {
        #[source]
        source: DescriptorError,
    },

    #[error("version resolution failed for {coordinate}")]
    VersionRange {
        coordinate: Coordinate,
        #[source]
        source: VersionRangeError,
    },

    #[error("relocation loop at {coordinate} (chain of {})", chain.len())]
    RelocationLoop {
        coordinate: Coordinate,
        chain: Vec<Coordinate>,
    },
}

impl Failure {
    /// The coordinate the failure was recorded against.
    #[must_use]
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            Failure::Descriptor { source } => source.coordinate(),
            Failure::VersionRange { coordinate, .. } | Failure::RelocationLoop { coordinate, .. } => {
                coordinate
            }
        }
    }

    #[must_use]
    pub fn is_descriptor(&self) -> bool {
        matches!(self, Failure::Descriptor { .. })
    }
}

/// Result type alias for collection calls.
pub type Result<T> = std::result::Result<T, Error>;
