//! The collected dependency graph.
//!
//! Nodes live in an arena owned by the graph and are addressed by
//! [`NodeId`]; children are ordered by visit order, which equals descriptor
//! declaration order. The graph is a tree: cycles are truncated during
//! collection, and the same dependency may legitimately appear under several
//! parents. Deduplication is a later conflict-resolution concern, not ours.

use std::collections::BTreeMap;
use std::ops::{BitOr, BitOrAssign};

use quarry_core::{Coordinate, Dependency, Exclusion, RemoteRepository};

/// Handle to a node inside its [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Bitset over the aspects a dependency manager overrode on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagedFields(u8);

impl ManagedFields {
    pub const VERSION: Self = Self(1 << 0);
    pub const SCOPE: Self = Self(1 << 1);
    pub const OPTIONAL: Self = Self(1 << 2);
    pub const PROPERTIES: Self = Self(1 << 3);
    pub const EXCLUSIONS: Self = Self(1 << 4);

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for ManagedFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ManagedFields {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The values a dependency held before management overrode them. Attached
/// to nodes only when the session runs in verbose mode; each field is
/// populated exactly when the matching [`ManagedFields`] bit is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Premanaged {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<Option<bool>>,
    pub properties: Option<BTreeMap<String, String>>,
    pub exclusions: Option<Vec<Exclusion>>,
}

/// One node of the collected graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    dependency: Option<Dependency>,
    children: Vec<NodeId>,
    versions: Vec<String>,
    repositories: Vec<RemoteRepository>,
    relocations: Vec<Coordinate>,
    managed_fields: ManagedFields,
    premanaged: Option<Premanaged>,
}

impl Node {
    pub(crate) fn new(dependency: Option<Dependency>) -> Self {
        Self {
            dependency,
            children: Vec::new(),
            versions: Vec::new(),
            repositories: Vec::new(),
            relocations: Vec::new(),
            managed_fields: ManagedFields::default(),
            premanaged: None,
        }
    }

    pub(crate) fn with_versions(mut self, versions: Vec<String>) -> Self {
        self.versions = versions;
        self
    }

    pub(crate) fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub(crate) fn with_relocations(mut self, relocations: Vec<Coordinate>) -> Self {
        self.relocations = relocations;
        self
    }

    pub(crate) fn with_management(
        mut self,
        managed_fields: ManagedFields,
        premanaged: Option<Premanaged>,
    ) -> Self {
        self.managed_fields = managed_fields;
        self.premanaged = premanaged;
        self
    }

    /// The node's dependency; `None` only on an artificial root.
    #[must_use]
    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    /// Children in visit order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The versions the range resolver matched, ascending; the node's
    /// dependency carries the selected (highest) one.
    #[must_use]
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// The repository hosting the selected version when known, otherwise
    /// the repositories in effect at this path position.
    #[must_use]
    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    /// Coordinates this node was relocated from, outermost first.
    #[must_use]
    pub fn relocations(&self) -> &[Coordinate] {
        &self.relocations
    }

    #[must_use]
    pub fn managed_fields(&self) -> ManagedFields {
        self.managed_fields
    }

    /// Premanaged values, present only for verbose-mode collections.
    #[must_use]
    pub fn premanaged(&self) -> Option<&Premanaged> {
        self.premanaged.as_ref()
    }
}

/// Arena-backed dependency tree with a single root.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DependencyGraph {
    pub(crate) fn new(root: Node) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node. Panics when `id` belongs to another graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Walk child indices from the root, e.g. `&[0, 1]` for the second
    /// child of the first child.
    #[must_use]
    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for &index in path {
            current = *self.node(current).children().get(index)?;
        }
        Some(current)
    }

    /// The dependency at a child index path, for assertions and display.
    #[must_use]
    pub fn dependency_at(&self, path: &[usize]) -> Option<&Dependency> {
        self.node_at(path).and_then(|id| self.node(id).dependency())
    }
}
