//! Collection sessions.
//!
//! A [`Session`] bundles the policy knobs one collection call runs under.
//! Sessions are cheap to clone and hold no per-call state; the same session
//! may drive concurrent calls.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::manage::DependencyManager;

/// What to do with descriptor errors accumulated during a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Finish the traversal, then fail the call if any error was recorded.
    #[default]
    Fail,
    /// Return normally with the errors attached to the result.
    Accumulate,
}

/// Cooperative cancellation flag checked between descriptor fetches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The running call stops at its next check and
    /// returns the partial graph.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Policy environment for collection calls.
#[derive(Clone)]
pub struct Session {
    dependency_manager: Option<Arc<dyn DependencyManager>>,
    verbose: bool,
    error_policy: ErrorPolicy,
    missing_descriptors_as_empty: bool,
    use_descriptor_repositories: bool,
    ignored_scopes: HashSet<String>,
    max_errors: usize,
    cancel: CancelToken,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            dependency_manager: None,
            verbose: false,
            error_policy: ErrorPolicy::default(),
            missing_descriptors_as_empty: false,
            use_descriptor_repositories: true,
            ignored_scopes: ["test", "provided"].iter().map(ToString::to_string).collect(),
            max_errors: 50,
            cancel: CancelToken::new(),
        }
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a dependency manager; without one, no management happens.
    pub fn set_dependency_manager(&mut self, manager: Arc<dyn DependencyManager>) -> &mut Self {
        self.dependency_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn dependency_manager(&self) -> Option<&Arc<dyn DependencyManager>> {
        self.dependency_manager.as_ref()
    }

    /// Record premanaged values and managed bits on nodes.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_error_policy(&mut self, policy: ErrorPolicy) -> &mut Self {
        self.error_policy = policy;
        self
    }

    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Treat a missing descriptor as an empty one instead of an error.
    pub fn set_missing_descriptors_as_empty(&mut self, enabled: bool) -> &mut Self {
        self.missing_descriptors_as_empty = enabled;
        self
    }

    #[must_use]
    pub fn missing_descriptors_as_empty(&self) -> bool {
        self.missing_descriptors_as_empty
    }

    /// Whether repositories declared in descriptors join the repository
    /// list for descendant reads.
    pub fn set_use_descriptor_repositories(&mut self, enabled: bool) -> &mut Self {
        self.use_descriptor_repositories = enabled;
        self
    }

    #[must_use]
    pub fn use_descriptor_repositories(&self) -> bool {
        self.use_descriptor_repositories
    }

    /// Scopes pruned from transitive positions. Defaults to `test` and
    /// `provided`.
    pub fn set_ignored_scopes<I, S>(&mut self, scopes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn ignores_scope(&self, scope: &str) -> bool {
        self.ignored_scopes.contains(scope)
    }

    /// Cap on recorded per-subtree failures.
    pub fn set_max_errors(&mut self, max: usize) -> &mut Self {
        self.max_errors = max;
        self
    }

    #[must_use]
    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) -> &mut Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("managed", &self.dependency_manager.is_some())
            .field("verbose", &self.verbose)
            .field("error_policy", &self.error_policy)
            .field("missing_descriptors_as_empty", &self.missing_descriptors_as_empty)
            .field("use_descriptor_repositories", &self.use_descriptor_repositories)
            .field("ignored_scopes", &self.ignored_scopes)
            .field("max_errors", &self.max_errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies() {
        let session = Session::default();
        assert!(session.dependency_manager().is_none());
        assert!(!session.verbose());
        assert_eq!(session.error_policy(), ErrorPolicy::Fail);
        assert!(session.ignores_scope("test"));
        assert!(session.ignores_scope("provided"));
        assert!(!session.ignores_scope("compile"));
        assert!(session.use_descriptor_repositories());
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
