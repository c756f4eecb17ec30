//! Transfer task descriptions.
//!
//! Tasks name a repository-relative resource and, for data-moving tasks,
//! where the bytes come from or go to. Targets and sources are either
//! in-memory buffers or files.

use std::path::PathBuf;

use crate::listener::TransferListener;

/// Existence check; transfers nothing.
#[derive(Debug, Clone)]
pub struct PeekTask {
    pub resource: String,
}

impl PeekTask {
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

/// Where downloaded bytes land.
#[derive(Debug)]
pub enum GetTarget {
    /// Collect into memory; read it back with [`GetTask::data`].
    Memory(Vec<u8>),
    /// Stream into a file, created (with parents) as needed.
    File(PathBuf),
}

/// A download task, optionally resuming from a byte offset and reporting
/// progress through a listener.
pub struct GetTask {
    pub resource: String,
    pub target: GetTarget,
    pub resume_offset: u64,
    pub listener: Option<Box<dyn TransferListener>>,
}

impl GetTask {
    /// Download into memory.
    #[must_use]
    pub fn memory(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            target: GetTarget::Memory(Vec::new()),
            resume_offset: 0,
            listener: None,
        }
    }

    /// Download into a file.
    #[must_use]
    pub fn file(resource: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            resource: resource.into(),
            target: GetTarget::File(path.into()),
            resume_offset: 0,
            listener: None,
        }
    }

    /// Skip the first `offset` bytes of the remote resource.
    #[must_use]
    pub fn with_resume_offset(mut self, offset: u64) -> Self {
        self.resume_offset = offset;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Box<dyn TransferListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The downloaded bytes, for memory-targeted tasks after a successful
    /// get.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match &self.target {
            GetTarget::Memory(data) => Some(data),
            GetTarget::File(_) => None,
        }
    }
}

impl std::fmt::Debug for GetTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetTask")
            .field("resource", &self.resource)
            .field("target", &self.target)
            .field("resume_offset", &self.resume_offset)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Where uploaded bytes come from.
#[derive(Debug, Clone)]
pub enum PutSource {
    Memory(Vec<u8>),
    File(PathBuf),
}

/// An upload task.
pub struct PutTask {
    pub resource: String,
    pub source: PutSource,
    pub listener: Option<Box<dyn TransferListener>>,
}

impl PutTask {
    /// Upload from memory.
    #[must_use]
    pub fn memory(resource: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            resource: resource.into(),
            source: PutSource::Memory(data),
            listener: None,
        }
    }

    /// Upload a file.
    #[must_use]
    pub fn file(resource: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            resource: resource.into(),
            source: PutSource::File(path.into()),
            listener: None,
        }
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Box<dyn TransferListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl std::fmt::Debug for PutTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutTask")
            .field("resource", &self.resource)
            .field("source", &self.source)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
