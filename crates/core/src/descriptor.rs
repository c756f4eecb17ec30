//! Artifact descriptors and the reader contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::dependency::Dependency;
use crate::repository::RemoteRepository;
use crate::session::Session;

/// The metadata document of one artifact: its dependencies, managed
/// dependencies, declared repositories and an optional relocation target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// The fully expanded coordinate the descriptor was read for. Readers
    /// echo the request coordinate here, preserving its properties.
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub managed_dependencies: Vec<Dependency>,
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,
    /// A single redirect hop; the collector follows chains step by step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relocation: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Descriptor {
    /// An empty descriptor for the given coordinate, as substituted for a
    /// missing one when the session allows it.
    #[must_use]
    pub fn empty(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
            ..Self::default()
        }
    }
}

/// Request to read one artifact's descriptor.
#[derive(Debug, Clone)]
pub struct DescriptorRequest {
    pub coordinate: Coordinate,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

impl DescriptorRequest {
    #[must_use]
    pub fn new(coordinate: Coordinate, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            coordinate,
            repositories,
            context: String::new(),
        }
    }
}

/// Failures while reading a descriptor.
///
/// I/O failures are worth retrying; a descriptor that exists but cannot be
/// parsed is not.
#[derive(Error, Debug, Clone)]
pub enum DescriptorError {
    #[error("no descriptor for {coordinate} in any of {repository_count} repositories")]
    Missing {
        coordinate: Coordinate,
        repository_count: usize,
    },

    #[error("invalid descriptor for {coordinate}: {message}")]
    Invalid {
        coordinate: Coordinate,
        message: String,
    },

    #[error("i/o failure reading descriptor for {coordinate}: {message}")]
    Io {
        coordinate: Coordinate,
        message: String,
    },
}

impl DescriptorError {
    #[must_use]
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            DescriptorError::Missing { coordinate, .. }
            | DescriptorError::Invalid { coordinate, .. }
            | DescriptorError::Io { coordinate, .. } => coordinate,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, DescriptorError::Io { .. })
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, DescriptorError::Missing { .. })
    }
}

/// Resolves a coordinate to its [`Descriptor`].
///
/// Must be idempotent for equal coordinates within one collection call; the
/// collector additionally caches results (and failures) per call.
pub trait DescriptorReader: Send + Sync {
    fn read(
        &self,
        session: &Session,
        request: &DescriptorRequest,
    ) -> Result<Descriptor, DescriptorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_descriptor_carries_coordinate() {
        let c: Coordinate = "gid:aid:1".parse().unwrap();
        let d = Descriptor::empty(c.clone());
        assert_eq!(d.coordinate, Some(c));
        assert!(d.dependencies.is_empty());
        assert!(d.relocation.is_none());
    }

    #[test]
    fn error_classification() {
        let c: Coordinate = "gid:aid:1".parse().unwrap();
        assert!(DescriptorError::Io {
            coordinate: c.clone(),
            message: "connection reset".into()
        }
        .is_retryable());
        assert!(!DescriptorError::Invalid {
            coordinate: c.clone(),
            message: "bad json".into()
        }
        .is_retryable());
        assert!(DescriptorError::Missing {
            coordinate: c,
            repository_count: 2
        }
        .is_missing());
    }
}
