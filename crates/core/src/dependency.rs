//! Dependencies and exclusions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coordinate::Coordinate;

/// A coordinate plus the collection-relevant attributes: scope, optionality
/// and exclusion patterns. The unit of collection input and output.
///
/// The empty scope is legal and distinct from any named scope; `optional` is
/// tri-state, `None` meaning the descriptor left it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    /// Create a dependency with no scope, unset optionality and no
    /// exclusions.
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            scope: String::new(),
            optional: None,
            exclusions: Vec::new(),
        }
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Set the optional flag.
    #[must_use]
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    /// Add an exclusion pattern.
    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    /// Effective optionality: unset counts as non-optional.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional == Some(true)
    }

    /// Copy with a different coordinate, keeping scope, optionality and
    /// exclusions. This is the relocation rule: the requester's attributes
    /// survive the redirect.
    #[must_use]
    pub fn with_coordinate(&self, coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            scope: self.scope.clone(),
            optional: self.optional,
            exclusions: self.exclusions.clone(),
        }
    }

    /// Copy with the version replaced on the coordinate.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.coordinate.version = version.into();
        copy
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            write!(f, "{}", self.coordinate)
        } else {
            write!(f, "{} ({})", self.coordinate, self.scope)
        }
    }
}

/// An exclusion pattern. Each field may be the wildcard `*`; a coordinate
/// matches when every non-wildcard field equals the coordinate's field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "wildcard")]
    pub extension: String,
    #[serde(default = "wildcard")]
    pub classifier: String,
}

/// The wildcard field value.
pub const WILDCARD: &str = "*";

fn wildcard() -> String {
    WILDCARD.to_string()
}

impl Exclusion {
    /// Exclusion on group and artifact id, wildcarding extension and
    /// classifier.
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: wildcard(),
            classifier: wildcard(),
        }
    }

    /// Exclusion matching every coordinate.
    #[must_use]
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// Whether this pattern matches the coordinate.
    #[must_use]
    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        field_matches(&self.group_id, &coordinate.group_id)
            && field_matches(&self.artifact_id, &coordinate.artifact_id)
            && field_matches(&self.extension, &coordinate.extension)
            && field_matches(&self.classifier, &coordinate.classifier)
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.extension, self.classifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(s: &str) -> Coordinate {
        s.parse().unwrap()
    }

    #[test]
    fn exclusion_matches_exact_fields() {
        let e = Exclusion {
            group_id: "gid".into(),
            artifact_id: "aid".into(),
            extension: "jar".into(),
            classifier: String::new(),
        };
        assert!(e.matches(&coord("gid:aid:jar:1")));
        assert!(!e.matches(&coord("gid:aid:zip:1")));
        assert!(!e.matches(&coord("gid:other:jar:1")));
    }

    #[test]
    fn wildcard_fields_match_anything() {
        let e = Exclusion::new("gid", "aid");
        assert!(e.matches(&coord("gid:aid:jar:1")));
        assert!(e.matches(&coord("gid:aid:zip:sources:9")));

        assert!(Exclusion::any().matches(&coord("x:y:war:3")));
    }

    #[test]
    fn unset_optional_is_not_optional() {
        let d = Dependency::new(coord("gid:aid:1"));
        assert_eq!(d.optional, None);
        assert!(!d.is_optional());
        assert!(d.with_optional(true).is_optional());
    }

    #[test]
    fn relocation_copy_preserves_requester_attributes() {
        let d = Dependency::new(coord("gid:aid:1"))
            .with_scope("runtime")
            .with_optional(false)
            .with_exclusion(Exclusion::new("x", "y"));
        let moved = d.with_coordinate(coord("new.gid:aid:1"));

        assert_eq!(moved.coordinate.group_id, "new.gid");
        assert_eq!(moved.scope, "runtime");
        assert_eq!(moved.optional, Some(false));
        assert_eq!(moved.exclusions, d.exclusions);
    }
}
