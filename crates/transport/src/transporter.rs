//! The transporter contract.

use std::sync::Arc;

use quarry_core::RemoteRepository;

use crate::error::{ErrorClass, Result, TransportError};
use crate::task::{GetTask, PeekTask, PutTask};

/// Moves bytes for one repository. Implementations never interpret the
/// resources they carry; layout and metadata semantics live above.
pub trait Transporter: Send + Sync {
    /// Check that a resource exists without transferring it.
    fn peek(&self, task: &PeekTask) -> Result<()>;

    /// Download a resource into the task's target.
    fn get(&self, task: &mut GetTask) -> Result<()>;

    /// Upload the task's source to a resource.
    fn put(&self, task: &PutTask) -> Result<()>;

    /// Classify an error from this transporter.
    fn classify(&self, error: &TransportError) -> ErrorClass {
        error.class()
    }
}

/// Creates transporters for repositories, by url scheme.
pub trait TransporterFactory: Send + Sync {
    /// A transporter serving `repository`, or `Unsupported` when its url
    /// scheme is not handled.
    fn transporter(&self, repository: &RemoteRepository) -> Result<Arc<dyn Transporter>>;
}
