//! Shared fixtures: an in-memory descriptor reader and a canned version
//! range resolver, in the shape the collector's collaborators take.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use quarry_core::{
    Coordinate, Dependency, Descriptor, DescriptorError, DescriptorReader, DescriptorRequest,
    RemoteRepository, Session, Version, VersionRange, VersionRangeError, VersionRangeRequest,
    VersionRangeResolver, VersionRangeResult, VersionlessKey,
};

pub fn coord(s: &str) -> Coordinate {
    s.parse().unwrap()
}

pub fn dep(s: &str) -> Dependency {
    Dependency::new(coord(s))
}

pub fn dep_scoped(s: &str, scope: &str) -> Dependency {
    dep(s).with_scope(scope)
}

pub fn repository(id: &str) -> RemoteRepository {
    RemoteRepository::new(id, format!("file:///{id}"))
}

/// In-memory descriptor store keyed by coordinate, recording every request
/// it serves.
#[derive(Default)]
pub struct StaticDescriptorReader {
    descriptors: HashMap<Coordinate, Descriptor>,
    requests: Mutex<Vec<DescriptorRequest>>,
}

impl StaticDescriptorReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its own coordinate.
    pub fn put(mut self, descriptor: Descriptor) -> Self {
        let coordinate = descriptor
            .coordinate
            .clone()
            .expect("fixture descriptor needs a coordinate");
        self.descriptors.insert(coordinate, descriptor);
        self
    }

    /// Register an empty descriptor (an artifact without dependencies).
    pub fn put_empty(self, coordinate: &str) -> Self {
        self.put(Descriptor::empty(coord(coordinate)))
    }

    /// The requests served so far, in order.
    pub fn requests(&self) -> Vec<DescriptorRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DescriptorReader for StaticDescriptorReader {
    fn read(
        &self,
        _session: &Session,
        request: &DescriptorRequest,
    ) -> Result<Descriptor, DescriptorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.descriptors
            .get(&request.coordinate)
            .cloned()
            .ok_or_else(|| DescriptorError::Missing {
                coordinate: request.coordinate.clone(),
                repository_count: request.repositories.len(),
            })
    }
}

/// Descriptor reader backed by a function, for synthetic graphs and
/// failure injection.
pub struct FnDescriptorReader<F>(pub F);

impl<F> DescriptorReader for FnDescriptorReader<F>
where
    F: Fn(&DescriptorRequest) -> Result<Descriptor, DescriptorError> + Send + Sync,
{
    fn read(
        &self,
        _session: &Session,
        request: &DescriptorRequest,
    ) -> Result<Descriptor, DescriptorError> {
        (self.0)(request)
    }
}

/// Builder shorthand for fixture descriptors.
pub fn descriptor(coordinate: &str) -> Descriptor {
    Descriptor::empty(coord(coordinate))
}

pub trait DescriptorExt {
    fn with_dependency(self, dependency: Dependency) -> Descriptor;
    fn with_managed(self, dependency: Dependency) -> Descriptor;
    fn with_repository(self, repository: RemoteRepository) -> Descriptor;
    fn with_relocation(self, target: &str) -> Descriptor;
}

impl DescriptorExt for Descriptor {
    fn with_dependency(mut self, dependency: Dependency) -> Descriptor {
        self.dependencies.push(dependency);
        self
    }

    fn with_managed(mut self, dependency: Dependency) -> Descriptor {
        self.managed_dependencies.push(dependency);
        self
    }

    fn with_repository(mut self, repository: RemoteRepository) -> Descriptor {
        self.repositories.push(repository);
        self
    }

    fn with_relocation(mut self, target: &str) -> Descriptor {
        self.relocation = Some(coord(target));
        self
    }
}

/// Range resolver over canned version listings: exact versions resolve to
/// themselves, ranges filter the registered listing for the artifact.
#[derive(Default)]
pub struct StubVersionRangeResolver {
    listings: HashMap<VersionlessKey, Vec<(String, Option<RemoteRepository>)>>,
}

impl StubVersionRangeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, coordinate: &str, versions: &[&str]) -> Self {
        self.listings.insert(
            coord(&format!("{coordinate}:0")).versionless(),
            versions.iter().map(|v| ((*v).to_string(), None)).collect(),
        );
        self
    }

    pub fn with_hosted_version(
        mut self,
        coordinate: &str,
        version: &str,
        repository: RemoteRepository,
    ) -> Self {
        self.listings
            .entry(coord(&format!("{coordinate}:0")).versionless())
            .or_default()
            .push((version.to_string(), Some(repository)));
        self
    }
}

impl VersionRangeResolver for StubVersionRangeResolver {
    fn resolve(
        &self,
        _session: &Session,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, VersionRangeError> {
        let constraint = &request.coordinate.version;
        if !VersionRange::is_range_syntax(constraint) {
            return Ok(VersionRangeResult {
                versions: vec![constraint.clone()],
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

        let mut versions: Vec<(String, Option<RemoteRepository>)> = self
            .listings
            .get(&request.coordinate.versionless())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|(v, _)| range.contains(&Version::new(v)))
            .collect();
        versions.sort_by(|(a, _), (b, _)| Version::new(a).cmp(&Version::new(b)));

        let repositories = versions
            .iter()
            .filter_map(|(v, r)| r.clone().map(|r| (v.clone(), r)))
            .collect();
        Ok(VersionRangeResult {
            versions: versions.into_iter().map(|(v, _)| v).collect(),
            repositories,
        })
    }
}
