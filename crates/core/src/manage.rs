//! The dependency-management capability.
//!
//! A manager is a pure, path-contextual policy: [`manage`] decides which
//! aspects of a dependency to override at the current position, and
//! [`derive_child`] folds a descriptor's managed-dependency list into the
//! policy for the node's children. Implementations live with the collector;
//! this module only fixes the contract the traversal drives.
//!
//! [`manage`]: DependencyManager::manage
//! [`derive_child`]: DependencyManager::derive_child

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dependency::{Dependency, Exclusion};

/// The aspects a manager decided to override, each `None` when untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub properties: Option<BTreeMap<String, String>>,
    pub exclusions: Option<Vec<Exclusion>>,
}

impl DependencyManagement {
    /// Whether no aspect is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.version.is_none()
            && self.scope.is_none()
            && self.optional.is_none()
            && self.properties.is_none()
            && self.exclusions.is_none()
    }
}

/// Context for deriving a child manager when descending into a node's
/// descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ManagementContext<'a> {
    /// The dependency being descended into; `None` at the artificial root.
    pub dependency: Option<&'a Dependency>,
    /// The managed-dependency list discovered in the node's descriptor (or
    /// supplied with the request, at the root).
    pub managed_dependencies: &'a [Dependency],
}

/// Path-contextual dependency management. Must be pure and side-effect
/// free; the collector derives a fresh manager per path segment, so sibling
/// subtrees never observe each other's state.
pub trait DependencyManager: Send + Sync {
    /// Management to apply to `dependency` at the current path position, or
    /// `None` when nothing applies.
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    /// The manager governing the children of the node described by
    /// `context`.
    fn derive_child(&self, context: &ManagementContext<'_>) -> Arc<dyn DependencyManager>;
}
