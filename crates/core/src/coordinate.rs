//! Artifact coordinates.
//!
//! A [`Coordinate`] is the identity of an artifact inside a repository:
//! `groupId:artifactId:extension[:classifier]:version`. Identity is the five
//! tuple fields; the attached property map never participates in equality or
//! hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::Error;

/// Property key marking an artifact that only exists on the local
/// filesystem. Artifacts carrying it have no descriptor of their own and are
/// collected as leaf nodes.
pub const LOCAL_PATH: &str = "localPath";

/// Default extension assumed when a coordinate string omits one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Immutable artifact identity plus a free-form property map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Group identifier, e.g. `org.example`.
    pub group_id: String,
    /// Artifact identifier within the group.
    pub artifact_id: String,
    /// File extension, `jar` by default.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Classifier, empty by default.
    #[serde(default)]
    pub classifier: String,
    /// Version string; may be a range until resolved.
    pub version: String,
    /// Auxiliary properties; not part of identity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Coordinate {
    /// Create a coordinate with the default extension and no classifier.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            classifier: String::new(),
            version: version.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Replace the extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// Return a copy with a different version.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.version = version.into();
        copy
    }

    /// Return a copy with the given property set.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether the artifact is known only by a local filesystem path and
    /// therefore has no descriptor to read.
    #[must_use]
    pub fn has_local_path(&self) -> bool {
        self.properties.contains_key(LOCAL_PATH)
    }

    /// The identity tuple without the version, used for cycle detection and
    /// management matching.
    #[must_use]
    pub fn versionless(&self) -> VersionlessKey {
        VersionlessKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
        }
    }

    /// Whether group and artifact id match `other`. Relocations that keep
    /// both disable version management on re-entry.
    #[must_use]
    pub fn same_ga(&self, other: &Coordinate) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

// Identity ignores properties.
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.extension == other.extension
            && self.classifier == other.classifier
            && self.version == other.version
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.extension.hash(state);
        self.classifier.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    /// Parse `gid:aid[:ext[:classifier]]:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (group_id, artifact_id, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, DEFAULT_EXTENSION, "", *v),
            [g, a, e, v] => (*g, *a, *e, "", *v),
            [g, a, e, c, v] => (*g, *a, *e, *c, *v),
            _ => {
                return Err(Error::coordinate(s, "expected 3 to 5 colon-separated fields"));
            }
        };
        if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
            return Err(Error::coordinate(s, "group, artifact and version must be non-empty"));
        }
        Ok(Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            extension: extension.to_string(),
            classifier: classifier.to_string(),
            version: version.to_string(),
            properties: BTreeMap::new(),
        })
    }
}

/// Versionless coordinate: the cycle-detection and management key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionlessKey {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
}

impl fmt::Display for VersionlessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        Ok(())
    }
}
