//! Remote repositories and the path-wise repository merger.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A remote artifact repository.
///
/// `id` is the deduplication key during merging; `url` is a scheme-qualified
/// location understood by a transporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    /// Layout identifier; the standard layout is `default`.
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

fn default_layout() -> String {
    "default".to_string()
}

impl RemoteRepository {
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            layout: default_layout(),
            authentication: None,
        }
    }

    #[must_use]
    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Credentials attached to a repository. Settings from the request-supplied
/// repository win over descriptor-declared ones during merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Combines repository lists along the traversal path.
pub trait RepositoryMerger: Send + Sync {
    /// Merge `additions` into `base`, preserving first-seen order and
    /// deduplicating by repository id. On an id conflict the `base` entry
    /// wins wholesale, keeping its authentication.
    fn merge(
        &self,
        base: &[RemoteRepository],
        additions: &[RemoteRepository],
    ) -> Vec<RemoteRepository>;
}

/// The standard order-preserving merger.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRepositoryMerger;

impl RepositoryMerger for DefaultRepositoryMerger {
    fn merge(
        &self,
        base: &[RemoteRepository],
        additions: &[RemoteRepository],
    ) -> Vec<RemoteRepository> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut merged = Vec::with_capacity(base.len() + additions.len());
        for repository in base.iter().chain(additions) {
            if seen.insert(repository.id.as_str()) {
                merged.push(repository.clone());
            }
        }
        merged
    }
}
