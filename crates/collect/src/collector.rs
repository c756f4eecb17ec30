//! The dependency collector.
//!
//! [`Collector::collect`] walks the transitive dependency graph of one or
//! more root dependencies: for every child it manages, cycle-checks,
//! filters, resolves the version constraint, reads the descriptor and
//! recurses, depth-first with an explicit work stack. Descriptor and
//! version-range lookups are cached per call; the collector itself holds no
//! state between calls and a single instance may serve concurrent calls.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use quarry_core::{
    Coordinate, DefaultRepositoryMerger, Dependency, DependencyManager, Descriptor,
    DescriptorError, DescriptorReader, DescriptorRequest, ErrorPolicy, Exclusion,
    ManagementContext, RemoteRepository, RepositoryMerger, Session, VersionRangeError,
    VersionRangeRequest, VersionRangeResolver, VersionRangeResult, VersionlessKey,
};

use crate::error::{Error, Failure, Result};
use crate::graph::{DependencyGraph, ManagedFields, Node, NodeId, Premanaged};

/// Longest relocation chain followed before the subtree is abandoned.
const MAX_RELOCATION_HOPS: usize = 20;

/// Input to a collection call: one root dependency or a list of root
/// dependencies, an optional externally supplied managed list, and the
/// repositories to resolve against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectRequest {
    pub root: Option<Dependency>,
    /// Declared roots when `root` is `None`; the result then gets an
    /// artificial root node with these as its children, and each root node
    /// also carries every other declared root as a direct child (the roots
    /// are co-required, so each sees the others as direct dependencies).
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

impl CollectRequest {
    /// Request for a single root dependency.
    #[must_use]
    pub fn root(dependency: Dependency, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            root: Some(dependency),
            repositories,
            ..Self::default()
        }
    }

    /// Request for a set of co-required root dependencies.
    #[must_use]
    pub fn roots(dependencies: Vec<Dependency>, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            dependencies,
            repositories,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// A truncated cycle: the path from the root to the node whose versionless
/// coordinate was re-encountered, and the re-encountered coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub path: Vec<Coordinate>,
    pub repeated: Coordinate,
}

/// Output of a collection call.
#[derive(Debug)]
pub struct CollectResult {
    pub request: CollectRequest,
    pub graph: DependencyGraph,
    /// Recoverable failures, in the order they were encountered.
    pub errors: Vec<Failure>,
    /// Cycles truncated during the traversal. Cycles are not errors.
    pub cycles: Vec<Cycle>,
}

/// The traversal driver. Construction wires the external collaborators;
/// see the crate docs for the traversal contract.
pub struct Collector {
    descriptor_reader: Arc<dyn DescriptorReader>,
    version_range_resolver: Arc<dyn VersionRangeResolver>,
    repository_merger: Arc<dyn RepositoryMerger>,
}

impl Collector {
    #[must_use]
    pub fn new(
        descriptor_reader: Arc<dyn DescriptorReader>,
        version_range_resolver: Arc<dyn VersionRangeResolver>,
    ) -> Self {
        Self {
            descriptor_reader,
            version_range_resolver,
            repository_merger: Arc::new(DefaultRepositoryMerger),
        }
    }

    #[must_use]
    pub fn with_repository_merger(mut self, merger: Arc<dyn RepositoryMerger>) -> Self {
        self.repository_merger = merger;
        self
    }

    /// Collect the transitive dependency graph for `request`.
    ///
    /// # Errors
    ///
    /// [`Error::NoRoots`] when the request names no root at all;
    /// [`Error::Cancelled`] when the session token fires mid-traversal;
    /// [`Error::Collection`] when the root itself cannot be processed or
    /// when failures were recorded and the session policy is
    /// [`ErrorPolicy::Fail`]. The latter two carry the partial result.
    pub fn collect(&self, session: &Session, request: CollectRequest) -> Result<CollectResult> {
        if request.root.is_none() && request.dependencies.is_empty() {
            return Err(Error::NoRoots);
        }
        debug!(
            roots = request.root.as_ref().map_or(request.dependencies.len(), |_| 1),
            repositories = request.repositories.len(),
            "collecting dependencies"
        );

        let mut traversal = Traversal {
            collector: self,
            session,
            context: request.context.clone(),
            errors: Vec::new(),
            cycles: Vec::new(),
            descriptors: HashMap::new(),
            ranges: HashMap::new(),
            cancelled: false,
        };

        let repositories = Arc::new(request.repositories.clone());
        let manager = session.dependency_manager().cloned();
        let mut stack: Vec<Frame> = Vec::new();
        let mut root_failed = false;

        let mut graph = match &request.root {
            Some(root) => {
                match traversal.expand_root(root, &repositories) {
                    RootExpansion::Expanded {
                        node,
                        dependency,
                        descriptor,
                        repositories: child_repositories,
                    } => {
                        let graph = DependencyGraph::new(node);
                        if !descriptor.dependencies.is_empty() {
                            let mut managed = request.managed_dependencies.clone();
                            managed.extend(descriptor.managed_dependencies.iter().cloned());
                            let child_manager = manager.as_ref().map(|m| {
                                m.derive_child(&ManagementContext {
                                    dependency: Some(&dependency),
                                    managed_dependencies: &managed,
                                })
                            });
                            stack.push(Frame {
                                parent: graph.root(),
                                children: descriptor.dependencies.clone().into_iter(),
                                manager: child_manager,
                                repositories: child_repositories,
                                exclusions: Arc::new(dependency.exclusions.clone()),
                                path: Arc::new(PathState::root(&dependency.coordinate)),
                                depth: 1,
                                scope_filtering: true,
                                cross_links: None,
                            });
                        }
                        graph
                    }
                    RootExpansion::Failed { node } => {
                        root_failed = true;
                        DependencyGraph::new(node)
                    }
                }
            }
            None => {
                let graph = DependencyGraph::new(Node::new(None));
                let child_manager = manager.as_ref().map(|m| {
                    m.derive_child(&ManagementContext {
                        dependency: None,
                        managed_dependencies: &request.managed_dependencies,
                    })
                });
                stack.push(Frame {
                    parent: graph.root(),
                    children: request.dependencies.clone().into_iter(),
                    manager: child_manager,
                    repositories: Arc::clone(&repositories),
                    exclusions: Arc::new(Vec::new()),
                    path: Arc::new(PathState::empty()),
                    depth: 1,
                    scope_filtering: false,
                    cross_links: (request.dependencies.len() > 1)
                        .then(|| Arc::new(request.dependencies.clone())),
                });
                graph
            }
        };

        traversal.run(&mut graph, &mut stack);

        let cancelled = traversal.cancelled;
        let result = CollectResult {
            graph,
            errors: traversal.errors,
            cycles: traversal.cycles,
            request,
        };

        if cancelled {
            return Err(Error::Cancelled {
                result: Box::new(result),
            });
        }
        if root_failed
            || (!result.errors.is_empty() && session.error_policy() == ErrorPolicy::Fail)
        {
            return Err(Error::Collection {
                result: Box::new(result),
            });
        }
        Ok(result)
    }
}

/// Versionless coordinates on the path from the root to the current frame,
/// plus the concrete path for cycle reporting.
#[derive(Debug, Clone)]
struct PathState {
    keys: HashSet<VersionlessKey>,
    coordinates: Vec<Coordinate>,
}

impl PathState {
    fn empty() -> Self {
        Self {
            keys: HashSet::new(),
            coordinates: Vec::new(),
        }
    }

    fn root(coordinate: &Coordinate) -> Self {
        let mut state = Self::empty();
        state.keys.insert(coordinate.versionless());
        state.coordinates.push(coordinate.clone());
        state
    }

    fn contains(&self, key: &VersionlessKey) -> bool {
        self.keys.contains(key)
    }

    fn child(&self, coordinate: &Coordinate) -> Self {
        let mut state = self.clone();
        state.keys.insert(coordinate.versionless());
        state.coordinates.push(coordinate.clone());
        state
    }
}

/// One level of the explicit work stack: a parent node and the children
/// still to visit, with the path context they are visited under.
struct Frame {
    parent: NodeId,
    children: std::vec::IntoIter<Dependency>,
    manager: Option<Arc<dyn DependencyManager>>,
    repositories: Arc<Vec<RemoteRepository>>,
    exclusions: Arc<Vec<Exclusion>>,
    path: Arc<PathState>,
    depth: usize,
    /// Scope filtering switches on once the path crossed a node with a
    /// non-null dependency, so declared roots are never scope-filtered.
    scope_filtering: bool,
    /// Set on the artificial-root frame only: the declared roots, each of
    /// which is attached as a direct child of every *other* root expanded
    /// from this frame.
    cross_links: Option<Arc<Vec<Dependency>>>,
}

impl Frame {
    fn context(&self) -> FrameContext {
        FrameContext {
            parent: self.parent,
            manager: self.manager.clone(),
            repositories: Arc::clone(&self.repositories),
            exclusions: Arc::clone(&self.exclusions),
            path: Arc::clone(&self.path),
            depth: self.depth,
            scope_filtering: self.scope_filtering,
            cross_links: self.cross_links.clone(),
        }
    }
}

/// The cheaply clonable part of a frame, detached so processing a child can
/// push new frames onto the stack.
struct FrameContext {
    parent: NodeId,
    manager: Option<Arc<dyn DependencyManager>>,
    repositories: Arc<Vec<RemoteRepository>>,
    exclusions: Arc<Vec<Exclusion>>,
    path: Arc<PathState>,
    depth: usize,
    scope_filtering: bool,
    cross_links: Option<Arc<Vec<Dependency>>>,
}

enum RootExpansion {
    Expanded {
        node: Node,
        dependency: Dependency,
        descriptor: Arc<Descriptor>,
        repositories: Arc<Vec<RemoteRepository>>,
    },
    Failed {
        node: Node,
    },
}

/// Dependency after management, with the record of what management did.
struct Managed {
    dependency: Dependency,
    fields: ManagedFields,
    premanaged: Option<Premanaged>,
}

/// Per-call traversal state: caches, accumulated failures and cycles.
struct Traversal<'a> {
    collector: &'a Collector,
    session: &'a Session,
    context: String,
    errors: Vec<Failure>,
    cycles: Vec<Cycle>,
    descriptors: HashMap<Coordinate, std::result::Result<Arc<Descriptor>, DescriptorError>>,
    ranges: HashMap<(Coordinate, Vec<String>), (Arc<VersionRangeResult>, String)>,
    cancelled: bool,
}

impl Traversal<'_> {
    fn run(&mut self, graph: &mut DependencyGraph, stack: &mut Vec<Frame>) {
        loop {
            if self.session.cancel_token().is_cancelled() {
                self.cancelled = true;
                return;
            }
            let Some(frame) = stack.last_mut() else {
                return;
            };
            let Some(dependency) = frame.children.next() else {
                stack.pop();
                continue;
            };
            let context = frame.context();
            self.process(graph, stack, &context, dependency);
        }
    }

    /// Run one declared child through the pipeline: manage, cycle check,
    /// exclusion and optional/scope filters, version resolution, descriptor
    /// read, node insertion, recursion. Relocations re-enter the pipeline
    /// with the target coordinate.
    fn process(
        &mut self,
        graph: &mut DependencyGraph,
        stack: &mut Vec<Frame>,
        context: &FrameContext,
        declared: Dependency,
    ) {
        // under a cross-linking frame, remember which declared root this is
        // so it does not link to itself
        let self_link = context.cross_links.is_some().then(|| declared.clone());
        let mut dependency = declared;
        let mut relocations: Vec<Coordinate> = Vec::new();
        let mut relocation_keys: HashSet<VersionlessKey> = HashSet::new();
        let mut disable_version_management = false;

        loop {
            let Managed {
                dependency: managed,
                fields,
                premanaged,
            } = self.premanage(context.manager.as_deref(), &dependency, disable_version_management);

            // cycle: make a childless node and move on, without error
            let key = managed.coordinate.versionless();
            if context.path.contains(&key) {
                debug!("cycle truncated at {}", managed.coordinate);
                self.cycles.push(Cycle {
                    path: context.path.coordinates.clone(),
                    repeated: managed.coordinate.clone(),
                });
                let node = Node::new(Some(managed))
                    .with_repositories((*context.repositories).clone())
                    .with_relocations(relocations)
                    .with_management(fields, premanaged);
                graph.add_child(context.parent, node);
                return;
            }

            // exclusions inherited from ancestors prune silently
            if context.exclusions.iter().any(|e| e.matches(&managed.coordinate)) {
                return;
            }

            // optional and ignored-scope dependencies prune at transitive
            // positions only
            if context.depth >= 2 && managed.is_optional() {
                return;
            }
            if context.scope_filtering && self.session.ignores_scope(&managed.scope) {
                return;
            }

            let (range, version) = match self.resolve_versions(&managed, &context.repositories) {
                Ok(resolution) => resolution,
                Err(failure) => {
                    self.record(failure);
                    return;
                }
            };
            let mut resolved = managed.with_version(version.as_str());

            // local-only artifacts have no descriptor to read
            if resolved.coordinate.has_local_path() {
                let node = Node::new(Some(resolved))
                    .with_versions(range.versions.clone())
                    .with_repositories(self.node_repositories(&range, &version, context))
                    .with_relocations(relocations)
                    .with_management(fields, premanaged);
                graph.add_child(context.parent, node);
                return;
            }

            let Some(descriptor) = self.read_descriptor(&resolved.coordinate, &context.repositories)
            else {
                // failure recorded; subtree pruned
                return;
            };

            if let Some(target) = &descriptor.relocation {
                relocations.push(resolved.coordinate.clone());
                relocation_keys.insert(resolved.coordinate.versionless());
                if relocation_keys.contains(&target.versionless())
                    || relocations.len() >= MAX_RELOCATION_HOPS
                {
                    warn!(
                        coordinate = %target,
                        hops = relocations.len(),
                        "relocation chain loops or is too long"
                    );
                    self.record(Failure::RelocationLoop {
                        coordinate: target.clone(),
                        chain: relocations,
                    });
                    return;
                }
                debug!("following relocation {} -> {}", resolved.coordinate, target);
                disable_version_management = resolved.coordinate.same_ga(target);
                dependency = resolved.with_coordinate(target.clone());
                continue;
            }

            // adopt the reader's fully expanded coordinate
            if let Some(expanded) = &descriptor.coordinate {
                resolved.coordinate = expanded.clone();
            }

            let node = Node::new(Some(resolved.clone()))
                .with_versions(range.versions.clone())
                .with_repositories(self.node_repositories(&range, &version, context))
                .with_relocations(relocations)
                .with_management(fields, premanaged);
            let id = graph.add_child(context.parent, node);

            // a declared root's children are its descriptor's dependencies
            // plus every co-declared root, the descriptor declaration
            // winning on a versionless collision
            let mut children = descriptor.dependencies.clone();
            if let Some(links) = &context.cross_links {
                for link in links.iter() {
                    if Some(link) == self_link.as_ref() {
                        continue;
                    }
                    let key = link.coordinate.versionless();
                    if !children.iter().any(|c| c.coordinate.versionless() == key) {
                        children.push(link.clone());
                    }
                }
            }

            if !children.is_empty() {
                let child_manager = context.manager.as_ref().map(|m| {
                    m.derive_child(&ManagementContext {
                        dependency: Some(&resolved),
                        managed_dependencies: &descriptor.managed_dependencies,
                    })
                });
                let child_repositories = self.child_repositories(&context.repositories, &descriptor);
                let child_exclusions = if resolved.exclusions.is_empty() {
                    Arc::clone(&context.exclusions)
                } else {
                    let mut accumulated = (*context.exclusions).clone();
                    accumulated.extend(resolved.exclusions.iter().cloned());
                    Arc::new(accumulated)
                };
                stack.push(Frame {
                    parent: id,
                    children: children.into_iter(),
                    manager: child_manager,
                    repositories: child_repositories,
                    exclusions: child_exclusions,
                    path: Arc::new(context.path.child(&resolved.coordinate)),
                    depth: context.depth + 1,
                    scope_filtering: true,
                    cross_links: None,
                });
            }
            return;
        }
    }

    /// Resolve the root dependency's version and descriptor, following
    /// relocations. Root failures are recorded and leave a childless root
    /// node; the caller turns them into a terminal error.
    fn expand_root(
        &mut self,
        root: &Dependency,
        repositories: &Arc<Vec<RemoteRepository>>,
    ) -> RootExpansion {
        let (range, version) = match self.resolve_versions(root, repositories) {
            Ok(resolution) => resolution,
            Err(failure) => {
                self.record(failure);
                return RootExpansion::Failed {
                    node: Node::new(Some(root.clone())),
                };
            }
        };
        let mut resolved = root.with_version(version.as_str());

        let mut relocations: Vec<Coordinate> = Vec::new();
        let mut relocation_keys: HashSet<VersionlessKey> = HashSet::new();
        let descriptor = loop {
            let Some(descriptor) = self.read_descriptor(&resolved.coordinate, repositories) else {
                return RootExpansion::Failed {
                    node: Node::new(Some(resolved)),
                };
            };
            let Some(target) = &descriptor.relocation else {
                break descriptor;
            };
            relocations.push(resolved.coordinate.clone());
            relocation_keys.insert(resolved.coordinate.versionless());
            if relocation_keys.contains(&target.versionless())
                || relocations.len() >= MAX_RELOCATION_HOPS
            {
                self.record(Failure::RelocationLoop {
                    coordinate: target.clone(),
                    chain: relocations,
                });
                return RootExpansion::Failed {
                    node: Node::new(Some(resolved)),
                };
            }
            resolved = resolved.with_coordinate(target.clone());
        };

        if let Some(expanded) = &descriptor.coordinate {
            resolved.coordinate = expanded.clone();
        }
        let node = Node::new(Some(resolved.clone()))
            .with_versions(range.versions.clone())
            .with_repositories(
                range
                    .repository(&version)
                    .map_or_else(|| (**repositories).clone(), |r| vec![r.clone()]),
            )
            .with_relocations(relocations);
        let child_repositories = self.child_repositories(repositories, &descriptor);
        RootExpansion::Expanded {
            node,
            dependency: resolved,
            descriptor,
            repositories: child_repositories,
        }
    }

    /// Apply the path manager to a dependency, recording which aspects it
    /// overrode and, in verbose sessions, the premanaged values.
    fn premanage(
        &self,
        manager: Option<&dyn DependencyManager>,
        dependency: &Dependency,
        disable_version_management: bool,
    ) -> Managed {
        let management = manager.and_then(|m| m.manage(dependency));
        let Some(management) = management else {
            return Managed {
                dependency: dependency.clone(),
                fields: ManagedFields::default(),
                premanaged: None,
            };
        };

        let verbose = self.session.verbose();
        let mut managed = dependency.clone();
        let mut fields = ManagedFields::default();
        let mut premanaged = Premanaged::default();

        if let Some(version) = management.version {
            if !disable_version_management {
                premanaged.version = Some(managed.coordinate.version.clone());
                managed.coordinate.version = version;
                fields |= ManagedFields::VERSION;
            }
        }
        if let Some(scope) = management.scope {
            premanaged.scope = Some(managed.scope.clone());
            managed.scope = scope;
            fields |= ManagedFields::SCOPE;
        }
        if let Some(optional) = management.optional {
            premanaged.optional = Some(managed.optional);
            managed.optional = Some(optional);
            fields |= ManagedFields::OPTIONAL;
        }
        if let Some(properties) = management.properties {
            premanaged.properties = Some(managed.coordinate.properties.clone());
            managed.coordinate.properties = properties;
            fields |= ManagedFields::PROPERTIES;
        }
        if let Some(exclusions) = management.exclusions {
            premanaged.exclusions = Some(managed.exclusions.clone());
            managed.exclusions = exclusions;
            fields |= ManagedFields::EXCLUSIONS;
        }

        Managed {
            dependency: managed,
            fields,
            premanaged: (verbose && !fields.is_empty()).then_some(premanaged),
        }
    }

    /// Expand the dependency's version constraint, cached per coordinate
    /// and repository list. An empty expansion is a failure, so a
    /// successful resolution always carries the selected (highest) version.
    fn resolve_versions(
        &mut self,
        dependency: &Dependency,
        repositories: &Arc<Vec<RemoteRepository>>,
    ) -> std::result::Result<(Arc<VersionRangeResult>, String), Failure> {
        let repository_ids: Vec<String> =
            repositories.iter().map(|r| r.id.clone()).collect();
        let key = (dependency.coordinate.clone(), repository_ids);
        if let Some(cached) = self.ranges.get(&key) {
            return Ok(cached.clone());
        }

        let request = VersionRangeRequest {
            coordinate: dependency.coordinate.clone(),
            repositories: (**repositories).clone(),
            context: self.context.clone(),
        };
        match self.collector.version_range_resolver.resolve(self.session, &request) {
            Ok(result) => {
                let Some(version) = result.selected().map(ToString::to_string) else {
                    return Err(Failure::VersionRange {
                        coordinate: dependency.coordinate.clone(),
                        source: VersionRangeError::NoVersions {
                            coordinate: dependency.coordinate.clone(),
                            constraint: dependency.coordinate.version.clone(),
                        },
                    });
                };
                let resolution = (Arc::new(result), version);
                self.ranges.insert(key, resolution.clone());
                Ok(resolution)
            }
            Err(source) => Err(Failure::VersionRange {
                coordinate: dependency.coordinate.clone(),
                source,
            }),
        }
    }

    /// Read a descriptor through the per-call cache. Failures are cached
    /// too, so each distinct coordinate contributes at most one recorded
    /// error; `None` means the failure is (or already was) recorded.
    fn read_descriptor(
        &mut self,
        coordinate: &Coordinate,
        repositories: &Arc<Vec<RemoteRepository>>,
    ) -> Option<Arc<Descriptor>> {
        if let Some(cached) = self.descriptors.get(coordinate) {
            return cached.as_ref().ok().map(Arc::clone);
        }

        let request = DescriptorRequest {
            coordinate: coordinate.clone(),
            repositories: (**repositories).clone(),
            context: self.context.clone(),
        };
        match self.collector.descriptor_reader.read(self.session, &request) {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                self.descriptors
                    .insert(coordinate.clone(), Ok(Arc::clone(&descriptor)));
                Some(descriptor)
            }
            Err(error) if error.is_missing() && self.session.missing_descriptors_as_empty() => {
                let descriptor = Arc::new(Descriptor::empty(coordinate.clone()));
                self.descriptors
                    .insert(coordinate.clone(), Ok(Arc::clone(&descriptor)));
                Some(descriptor)
            }
            Err(error) => {
                warn!(coordinate = %coordinate, error = %error, "descriptor read failed");
                self.record(Failure::Descriptor {
                    source: error.clone(),
                });
                self.descriptors.insert(coordinate.clone(), Err(error));
                None
            }
        }
    }

    /// Repositories recorded on a node: the one hosting the selected
    /// version when the resolver reported it, else everything in effect.
    fn node_repositories(
        &self,
        range: &VersionRangeResult,
        version: &str,
        context: &FrameContext,
    ) -> Vec<RemoteRepository> {
        range
            .repository(version)
            .map_or_else(|| (*context.repositories).clone(), |r| vec![r.clone()])
    }

    /// Repositories for descendant reads: everything accumulated so far
    /// plus the descriptor's declarations, never restricted to the
    /// repository that hosted the selected version.
    fn child_repositories(
        &self,
        current: &Arc<Vec<RemoteRepository>>,
        descriptor: &Descriptor,
    ) -> Arc<Vec<RemoteRepository>> {
        if descriptor.repositories.is_empty() || !self.session.use_descriptor_repositories() {
            return Arc::clone(current);
        }
        Arc::new(
            self.collector
                .repository_merger
                .merge(current, &descriptor.repositories),
        )
    }

    fn record(&mut self, failure: Failure) {
        if self.errors.len() < self.session.max_errors() {
            self.errors.push(failure);
        }
    }
}
