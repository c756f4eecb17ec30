//! Version-range resolution over repository metadata.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use quarry_core::{
    RemoteRepository, Session, Version, VersionRange, VersionRangeError, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult,
};
use quarry_transport::{ErrorClass, GetTask, Transporter, TransporterFactory};

use crate::layout;

/// The `versions.json` listing an artifact's available versions in one
/// repository.
#[derive(Debug, Deserialize)]
struct VersionListing {
    #[serde(default)]
    versions: Vec<String>,
}

/// Expands version ranges against the `versions.json` listings of every
/// supplied repository. An exact version pins itself without any lookup;
/// for ranges the listings are unioned, each version remembering the first
/// repository that offered it, then filtered and ordered ascending.
pub struct MetadataVersionRangeResolver {
    transporters: Arc<dyn TransporterFactory>,
}

impl MetadataVersionRangeResolver {
    #[must_use]
    pub fn new(transporters: Arc<dyn TransporterFactory>) -> Self {
        Self { transporters }
    }

    fn listing(&self, repository: &RemoteRepository, resource: &str) -> Option<VersionListing> {
        let transporter = match self.transporters.transporter(repository) {
            Ok(transporter) => transporter,
            Err(error) => {
                warn!(repository = %repository, error = %error, "skipping repository");
                return None;
            }
        };
        let mut get = GetTask::memory(resource);
        match transporter.get(&mut get) {
            Ok(()) => serde_json::from_slice(get.data().unwrap_or_default())
                .map_err(|error| {
                    warn!(repository = %repository, error = %error, "unreadable version listing");
                })
                .ok(),
            Err(error) if transporter.classify(&error) == ErrorClass::NotFound => None,
            Err(error) => {
                warn!(repository = %repository, error = %error, "version listing fetch failed");
                None
            }
        }
    }
}

impl VersionRangeResolver for MetadataVersionRangeResolver {
    fn resolve(
        &self,
        _session: &Session,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, VersionRangeError> {
        let constraint = request.coordinate.version.clone();

        if !VersionRange::is_range_syntax(&constraint) {
            if constraint.is_empty() {
                return Err(VersionRangeError::InvalidConstraint {
                    coordinate: request.coordinate.clone(),
                    constraint,
                    message: "empty version".to_string(),
                });
            }
            return Ok(VersionRangeResult {
                versions: vec![constraint],
                repositories: HashMap::new(),
            });
        }

        let range: VersionRange =
            constraint
                .parse()
                .map_err(|e: quarry_core::Error| VersionRangeError::InvalidConstraint {
                    coordinate: request.coordinate.clone(),
                    constraint: constraint.clone(),
                    message: e.to_string(),
                })?;

        let resource = layout::versions_path(&request.coordinate);
        let mut hosting: HashMap<String, RemoteRepository> = HashMap::new();
        let mut all: Vec<String> = Vec::new();
        for repository in &request.repositories {
            let Some(listing) = self.listing(repository, &resource) else {
                continue;
            };
            for version in listing.versions {
                if !hosting.contains_key(&version) {
                    hosting.insert(version.clone(), repository.clone());
                    all.push(version);
                }
            }
        }

        let mut matching: Vec<String> = all
            .into_iter()
            .filter(|v| range.contains(&Version::new(v)))
            .collect();
        matching.sort_by(|a, b| Version::new(a).cmp(&Version::new(b)).then_with(|| a.cmp(b)));
        hosting.retain(|version, _| matching.contains(version));

        debug!(
            "resolved '{}' on {} to {} version(s)",
            constraint,
            request.coordinate,
            matching.len()
        );
        Ok(VersionRangeResult {
            versions: matching,
            repositories: hosting,
        })
    }
}
