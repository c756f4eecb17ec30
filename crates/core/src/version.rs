//! Version ordering, ranges and the range-resolver contract.
//!
//! The engine never interprets versions beyond what this module provides:
//! resolvers return an ordered list and the collector trusts it, selecting
//! the highest entry.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::error::Error as ParseError;
use crate::repository::RemoteRepository;
use crate::session::Session;

/// A parsed version, ordered segment-wise.
///
/// Segments are split on `.`, `-` and `_`. Two numeric segments compare
/// numerically, two qualifiers lexicographically, and a numeric segment
/// orders above a qualifier at the same position, so `1.0-alpha < 1.0 <
/// 1.0.1`. Missing segments count as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Qualifier(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Qualifier(_) => 0,
            Segment::Number(_) => 1,
        }
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Parse a version string. Never fails; an empty string is the zero
    /// version.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split(['.', '-', '_'])
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<u64>() {
                Ok(n) => Segment::Number(n),
                Err(_) => Segment::Qualifier(s.to_ascii_lowercase()),
            })
            .collect();
        Self { raw, segments }
    }

    /// The original string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let zero = Segment::Number(0);
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A version constraint: either an exact pin or a bounded range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// A plain version string pins that exact version.
    Exact(Version),
    /// A bracketed range with optional bounds.
    Range {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
}

/// One end of a range and whether it is included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Whether the raw string denotes a range rather than an exact version.
    #[must_use]
    pub fn is_range_syntax(s: &str) -> bool {
        s.starts_with('[') || s.starts_with('(')
    }

    /// Whether the given version satisfies this constraint.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(pinned) => pinned == version,
            VersionRange::Range { lower, upper } => {
                if let Some(bound) = lower {
                    match version.cmp(&bound.version) {
                        Ordering::Less => return false,
                        Ordering::Equal if !bound.inclusive => return false,
                        _ => {}
                    }
                }
                if let Some(bound) = upper {
                    match version.cmp(&bound.version) {
                        Ordering::Greater => return false,
                        Ordering::Equal if !bound.inclusive => return false,
                        _ => {}
                    }
                }
                true
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = ParseError;

    /// Parse `[a,b]`, `[a,b)`, `(a,b]`, `(a,b)` with either end omitted, or
    /// a bare version as an exact pin.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_range_syntax(s) {
            if s.is_empty() {
                return Err(ParseError::range(s, "empty version"));
            }
            return Ok(VersionRange::Exact(Version::new(s)));
        }

        let lower_inclusive = match s.as_bytes().first() {
            Some(b'[') => true,
            Some(b'(') => false,
            _ => return Err(ParseError::range(s, "range must open with '[' or '('")),
        };
        let upper_inclusive = match s.as_bytes().last() {
            Some(b']') => true,
            Some(b')') => false,
            _ => return Err(ParseError::range(s, "range must close with ']' or ')'")),
        };

        let inner = &s[1..s.len() - 1];
        let Some((low, high)) = inner.split_once(',') else {
            return Err(ParseError::range(s, "range must contain a ','"));
        };
        let low = low.trim();
        let high = high.trim();

        let lower = (!low.is_empty()).then(|| Bound {
            version: Version::new(low),
            inclusive: lower_inclusive,
        });
        let upper = (!high.is_empty()).then(|| Bound {
            version: Version::new(high),
            inclusive: upper_inclusive,
        });
        if lower.is_none() && upper.is_none() {
            return Err(ParseError::range(s, "range must bound at least one end"));
        }
        Ok(VersionRange::Range { lower, upper })
    }
}

/// Request for expanding a dependency's version constraint.
#[derive(Debug, Clone)]
pub struct VersionRangeRequest {
    pub coordinate: Coordinate,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

impl VersionRangeRequest {
    #[must_use]
    pub fn new(coordinate: Coordinate, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            coordinate,
            repositories,
            context: String::new(),
        }
    }
}

/// Result of a range expansion: matching versions in ascending order and,
/// where known, the repository that hosts each version.
#[derive(Debug, Clone, Default)]
pub struct VersionRangeResult {
    pub versions: Vec<String>,
    pub repositories: HashMap<String, RemoteRepository>,
}

impl VersionRangeResult {
    /// The version the collector selects: the highest in the resolver's
    /// ordering.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }

    /// The repository hosting a given version, when the resolver knows it.
    #[must_use]
    pub fn repository(&self, version: &str) -> Option<&RemoteRepository> {
        self.repositories.get(version)
    }
}

/// Failures while expanding a version constraint.
#[derive(Error, Debug, Clone)]
pub enum VersionRangeError {
    #[error("invalid version constraint '{constraint}' on {coordinate}: {message}")]
    InvalidConstraint {
        coordinate: Coordinate,
        constraint: String,
        message: String,
    },

    #[error("no versions of {coordinate} satisfy '{constraint}'")]
    NoVersions {
        coordinate: Coordinate,
        constraint: String,
    },

    #[error("version lookup for {coordinate} failed: {message}")]
    Backend {
        coordinate: Coordinate,
        message: String,
    },
}

/// Expands a version constraint to concrete versions against a repository
/// list. Implementations must consult every supplied repository, not only
/// the first that responds.
pub trait VersionRangeResolver: Send + Sync {
    fn resolve(
        &self,
        session: &Session,
        request: &VersionRangeRequest,
    ) -> std::result::Result<VersionRangeResult, VersionRangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s)
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("1") < v("2"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn qualifiers_order_below_releases() {
        assert!(v("1.0-alpha") < v("1.0"));
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0") < v("1.0-1"));
    }

    #[test]
    fn trailing_zeros_are_insignificant() {
        assert_eq!(v("1.0").cmp(&v("1")), Ordering::Equal);
        assert_eq!(v("1.0.0").cmp(&v("1")), Ordering::Equal);
    }

    #[test]
    fn exact_range_pins_one_version() {
        let r: VersionRange = "1.2".parse().unwrap();
        assert!(r.contains(&v("1.2")));
        assert!(!r.contains(&v("1.2.1")));
    }

    #[test]
    fn bracket_ranges() {
        let r: VersionRange = "[1,2)".parse().unwrap();
        assert!(r.contains(&v("1")));
        assert!(r.contains(&v("1.9")));
        assert!(!r.contains(&v("2")));

        let r: VersionRange = "(1,2]".parse().unwrap();
        assert!(!r.contains(&v("1")));
        assert!(r.contains(&v("2")));
    }

    #[test]
    fn half_open_ranges() {
        let r: VersionRange = "[1.5,)".parse().unwrap();
        assert!(r.contains(&v("1.5")));
        assert!(r.contains(&v("99")));
        assert!(!r.contains(&v("1.4")));

        let r: VersionRange = "(,2]".parse().unwrap();
        assert!(r.contains(&v("0.1")));
        assert!(!r.contains(&v("2.1")));
    }

    #[test]
    fn parse_rejects_malformed_ranges() {
        assert!("[1 2]".parse::<VersionRange>().is_err());
        assert!("[,)".parse::<VersionRange>().is_err());
        assert!("".parse::<VersionRange>().is_err());
    }

    #[test]
    fn result_selects_highest() {
        let result = VersionRangeResult {
            versions: vec!["1".into(), "2".into(), "3".into()],
            repositories: HashMap::new(),
        };
        assert_eq!(result.selected(), Some("3"));
        assert_eq!(VersionRangeResult::default().selected(), None);
    }
}
