//! Standard dependency-manager implementations.
//!
//! One capability, two knobs: `derive_until` bounds the depth up to which
//! descriptor-declared management is folded into the path state, and
//! `apply_from` bounds the depth from which version/scope/optional/property
//! overrides take effect. The classic variant stops collecting below depth
//! two, which is what keeps transitive managed versions from exploding
//! across deep graphs; the transitive variant keeps collecting all the way
//! down. Exclusion union is not depth-gated.
//!
//! Path state is a stack of immutable layers keyed by versionless
//! coordinate. Deriving a child manager pushes a layer; lookups walk from
//! the outermost (shallowest) layer inward, so the shallowest declaration
//! wins per aspect and siblings never observe each other's layers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use quarry_core::{
    Dependency, DependencyManagement, DependencyManager, Exclusion, ManagementContext,
    VersionlessKey,
};

#[derive(Debug, Clone, Default)]
struct Entry {
    version: Option<String>,
    scope: Option<String>,
    optional: Option<bool>,
    properties: Option<BTreeMap<String, String>>,
    exclusions: Vec<Exclusion>,
}

#[derive(Debug, Default)]
struct Layer {
    entries: HashMap<VersionlessKey, Entry>,
}

impl Layer {
    fn from_managed(managed: &[Dependency]) -> Self {
        let mut entries: HashMap<VersionlessKey, Entry> = HashMap::new();
        for dependency in managed {
            let entry = entries.entry(dependency.coordinate.versionless()).or_default();
            if entry.version.is_none() && !dependency.coordinate.version.is_empty() {
                entry.version = Some(dependency.coordinate.version.clone());
            }
            if entry.scope.is_none() && !dependency.scope.is_empty() {
                entry.scope = Some(dependency.scope.clone());
            }
            if entry.optional.is_none() {
                entry.optional = dependency.optional;
            }
            if entry.properties.is_none() && !dependency.coordinate.properties.is_empty() {
                entry.properties = Some(dependency.coordinate.properties.clone());
            }
            entry.exclusions.extend(dependency.exclusions.iter().cloned());
        }
        Self { entries }
    }
}

/// Layered manager; the standard variants are its constructors.
#[derive(Clone)]
pub struct LayeredDependencyManager {
    depth: usize,
    derive_until: usize,
    apply_from: usize,
    layers: Vec<Arc<Layer>>,
}

impl LayeredDependencyManager {
    /// The classic per-depth manager: management from the request and from
    /// depth-zero/one descriptors governs the whole subtree; deeper
    /// managed-dependency declarations are not folded in.
    #[must_use]
    pub fn classic() -> Self {
        Self {
            depth: 0,
            derive_until: 2,
            apply_from: 2,
            layers: Vec::new(),
        }
    }

    /// Folds managed dependencies from every depth, still applying
    /// overrides only below the direct-dependency level.
    #[must_use]
    pub fn transitive() -> Self {
        Self {
            depth: 0,
            derive_until: usize::MAX,
            apply_from: 2,
            layers: Vec::new(),
        }
    }

    fn lookup<'a>(&'a self, key: &'a VersionlessKey) -> impl Iterator<Item = &'a Entry> + 'a {
        self.layers.iter().filter_map(move |layer| layer.entries.get(key))
    }
}

impl DependencyManager for LayeredDependencyManager {
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        let key = dependency.coordinate.versionless();
        let mut management = DependencyManagement::default();

        if self.depth >= self.apply_from {
            // outermost layer first: the shallowest declaration wins
            for entry in self.lookup(&key) {
                if management.version.is_none() {
                    management.version = entry.version.clone();
                }
                if management.scope.is_none() {
                    management.scope = entry.scope.clone();
                }
                if management.optional.is_none() {
                    management.optional = entry.optional;
                }
                if let Some(properties) = &entry.properties {
                    let merged = management.properties.get_or_insert_with(BTreeMap::new);
                    for (k, v) in properties {
                        merged.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
            }
        }

        let mut managed_exclusions: Vec<Exclusion> = Vec::new();
        for entry in self.lookup(&key) {
            for exclusion in &entry.exclusions {
                if !managed_exclusions.contains(exclusion) {
                    managed_exclusions.push(exclusion.clone());
                }
            }
        }
        if !managed_exclusions.is_empty() {
            let mut union = dependency.exclusions.clone();
            for exclusion in managed_exclusions {
                if !union.contains(&exclusion) {
                    union.push(exclusion);
                }
            }
            management.exclusions = Some(union);
        }

        (!management.is_empty()).then_some(management)
    }

    fn derive_child(&self, context: &ManagementContext<'_>) -> Arc<dyn DependencyManager> {
        let mut layers = self.layers.clone();
        if self.depth < self.derive_until && !context.managed_dependencies.is_empty() {
            layers.push(Arc::new(Layer::from_managed(context.managed_dependencies)));
        }
        Arc::new(Self {
            depth: self.depth + 1,
            derive_until: self.derive_until,
            apply_from: self.apply_from,
            layers,
        })
    }
}

/// Manages nothing and derives itself; the explicit opt-out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDependencyManager;

impl DependencyManager for DisabledDependencyManager {
    fn manage(&self, _dependency: &Dependency) -> Option<DependencyManagement> {
        None
    }

    fn derive_child(&self, _context: &ManagementContext<'_>) -> Arc<dyn DependencyManager> {
        Arc::new(Self)
    }
}
