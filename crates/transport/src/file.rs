//! Transporter for `file://` repositories.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use quarry_core::RemoteRepository;

use crate::error::{Result, TransportError};
use crate::listener::{TransferFlow, TransferListener};
use crate::task::{GetTarget, GetTask, PeekTask, PutSource, PutTask};
use crate::transporter::{Transporter, TransporterFactory};

const CHUNK_SIZE: usize = 32 * 1024;

/// Serves a rooted directory tree as a repository.
#[derive(Debug, Clone)]
pub struct FileTransporter {
    base: PathBuf,
}

impl FileTransporter {
    /// Transporter rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Transporter for a `file://` repository.
    ///
    /// # Errors
    ///
    /// `Unsupported` when the repository url has another scheme.
    pub fn for_repository(repository: &RemoteRepository) -> Result<Self> {
        let Some(path) = repository.url.strip_prefix("file://") else {
            return Err(TransportError::Unsupported {
                url: repository.url.clone(),
            });
        };
        Ok(Self::new(path))
    }

    fn resolve(&self, resource: &str) -> Result<PathBuf> {
        let relative = Path::new(resource);
        let sane = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if resource.is_empty() || !sane {
            return Err(TransportError::IllegalResource {
                resource: resource.to_string(),
            });
        }
        Ok(self.base.join(relative))
    }
}

impl Transporter for FileTransporter {
    fn peek(&self, task: &PeekTask) -> Result<()> {
        let path = self.resolve(&task.resource)?;
        if path.is_file() {
            Ok(())
        } else {
            Err(TransportError::not_found(&task.resource))
        }
    }

    fn get(&self, task: &mut GetTask) -> Result<()> {
        let path = self.resolve(&task.resource)?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransportError::not_found(&task.resource));
            }
            Err(e) => return Err(TransportError::io(&task.resource, "open", e)),
        };

        let total = file
            .metadata()
            .map_err(|e| TransportError::io(&task.resource, "stat", e))?
            .len();
        let remaining = total.saturating_sub(task.resume_offset);
        if task.resume_offset > 0 {
            file.seek(SeekFrom::Start(task.resume_offset))
                .map_err(|e| TransportError::io(&task.resource, "seek", e))?;
        }

        if let Some(listener) = task.listener.as_mut() {
            if listener.started(&task.resource, Some(remaining)) == TransferFlow::Cancel {
                return Err(TransportError::cancelled(&task.resource));
            }
        }

        let mut file_sink: Option<File> = match &task.target {
            GetTarget::Memory(_) => None,
            GetTarget::File(target) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| TransportError::io(&task.resource, "mkdir", e))?;
                }
                Some(
                    File::create(target)
                        .map_err(|e| TransportError::io(&task.resource, "create", e))?,
                )
            }
        };
        // memory targets buffer locally and swap in at the end, so a
        // cancelled get leaves the task's previous data intact
        let mut buffered: Vec<u8> = Vec::new();

        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut transferred: u64 = 0;
        loop {
            let read = file
                .read(&mut chunk)
                .map_err(|e| TransportError::io(&task.resource, "read", e))?;
            if read == 0 {
                break;
            }
            transferred += read as u64;
            match file_sink.as_mut() {
                Some(sink) => sink
                    .write_all(&chunk[..read])
                    .map_err(|e| TransportError::io(&task.resource, "write", e))?,
                None => buffered.extend_from_slice(&chunk[..read]),
            }
            if let Some(listener) = task.listener.as_mut() {
                if listener.progressed(&task.resource, &chunk[..read], transferred)
                    == TransferFlow::Cancel
                {
                    return Err(TransportError::cancelled(&task.resource));
                }
            }
        }

        if file_sink.is_none() {
            task.target = GetTarget::Memory(buffered);
        }
        debug!("got {} ({transferred} bytes)", task.resource);
        Ok(())
    }

    fn put(&self, task: &PutTask) -> Result<()> {
        let path = self.resolve(&task.resource)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TransportError::io(&task.resource, "mkdir", e))?;
        }
        match &task.source {
            PutSource::Memory(data) => {
                fs::write(&path, data)
                    .map_err(|e| TransportError::io(&task.resource, "write", e))?;
            }
            PutSource::File(source) => {
                fs::copy(source, &path)
                    .map_err(|e| TransportError::io(&task.resource, "copy", e))?;
            }
        }
        debug!("put {}", task.resource);
        Ok(())
    }
}

/// Factory serving `file://` repositories only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransporterFactory;

impl TransporterFactory for FileTransporterFactory {
    fn transporter(&self, repository: &RemoteRepository) -> Result<Arc<dyn Transporter>> {
        Ok(Arc::new(FileTransporter::for_repository(repository)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use tempfile::TempDir;

    fn repo_dir() -> (TempDir, FileTransporter) {
        let dir = TempDir::new().unwrap();
        let transporter = FileTransporter::new(dir.path());
        (dir, transporter)
    }

    #[test]
    fn put_then_get_memory_round_trip() {
        let (_dir, transporter) = repo_dir();
        transporter
            .put(&PutTask::memory("a/b/data.bin", b"payload".to_vec()))
            .unwrap();

        let mut get = GetTask::memory("a/b/data.bin");
        transporter.get(&mut get).unwrap();
        assert_eq!(get.data(), Some(&b"payload"[..]));
    }

    #[test]
    fn get_into_file_creates_parents() {
        let (dir, transporter) = repo_dir();
        transporter
            .put(&PutTask::memory("data.bin", b"abc".to_vec()))
            .unwrap();

        let target = dir.path().join("out/nested/copy.bin");
        let mut get = GetTask::file("data.bin", &target);
        transporter.get(&mut get).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"abc");
    }

    #[test]
    fn peek_and_classify_missing_resources() {
        let (_dir, transporter) = repo_dir();
        let error = transporter.peek(&PeekTask::new("no/such/file")).unwrap_err();
        assert_eq!(transporter.classify(&error), ErrorClass::NotFound);

        let mut get = GetTask::memory("no/such/file");
        let error = transporter.get(&mut get).unwrap_err();
        assert_eq!(transporter.classify(&error), ErrorClass::NotFound);
    }

    #[test]
    fn resume_offset_skips_leading_bytes() {
        let (_dir, transporter) = repo_dir();
        transporter
            .put(&PutTask::memory("data.bin", b"0123456789".to_vec()))
            .unwrap();

        let mut get = GetTask::memory("data.bin").with_resume_offset(4);
        transporter.get(&mut get).unwrap();
        assert_eq!(get.data(), Some(&b"456789"[..]));
    }

    #[test]
    fn rejects_escaping_resources() {
        let (_dir, transporter) = repo_dir();
        for resource in ["../outside", "a/../../b", ""] {
            let error = transporter.peek(&PeekTask::new(resource)).unwrap_err();
            assert!(matches!(error, TransportError::IllegalResource { .. }));
        }
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let repository = RemoteRepository::new("r", "https://example.test/repo");
        assert!(matches!(
            FileTransporter::for_repository(&repository),
            Err(TransportError::Unsupported { .. })
        ));
    }

    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        announced_length: AtomicU64,
        chunks: AtomicUsize,
        transferred: AtomicU64,
    }

    struct Recording {
        counters: Arc<Counters>,
        cancel_after: Option<usize>,
    }

    impl TransferListener for Recording {
        fn started(&mut self, _resource: &str, length: Option<u64>) -> TransferFlow {
            self.counters
                .announced_length
                .store(length.unwrap_or(0), Ordering::Relaxed);
            TransferFlow::Continue
        }

        fn progressed(&mut self, _resource: &str, _chunk: &[u8], transferred: u64) -> TransferFlow {
            let chunks = self.counters.chunks.fetch_add(1, Ordering::Relaxed) + 1;
            self.counters.transferred.store(transferred, Ordering::Relaxed);
            match self.cancel_after {
                Some(limit) if chunks >= limit => TransferFlow::Cancel,
                _ => TransferFlow::Continue,
            }
        }
    }

    #[test]
    fn listener_observes_progress() {
        let (_dir, transporter) = repo_dir();
        let payload = vec![7u8; CHUNK_SIZE * 2 + 17];
        transporter
            .put(&PutTask::memory("big.bin", payload.clone()))
            .unwrap();

        let counters = Arc::new(Counters::default());
        let mut get = GetTask::memory("big.bin").with_listener(Box::new(Recording {
            counters: Arc::clone(&counters),
            cancel_after: None,
        }));
        transporter.get(&mut get).unwrap();

        assert_eq!(get.data().map(<[u8]>::len), Some(payload.len()));
        assert_eq!(counters.announced_length.load(Ordering::Relaxed), payload.len() as u64);
        assert_eq!(counters.chunks.load(Ordering::Relaxed), 3);
        assert_eq!(counters.transferred.load(Ordering::Relaxed), payload.len() as u64);
    }

    #[test]
    fn listener_cancellation_fails_the_transfer() {
        let (_dir, transporter) = repo_dir();
        transporter
            .put(&PutTask::memory("big.bin", vec![1u8; CHUNK_SIZE * 3]))
            .unwrap();

        let counters = Arc::new(Counters::default());
        let mut get = GetTask::memory("big.bin").with_listener(Box::new(Recording {
            counters: Arc::clone(&counters),
            cancel_after: Some(1),
        }));
        let error = transporter.get(&mut get).unwrap_err();

        assert!(matches!(error, TransportError::Cancelled { .. }));
        assert_eq!(counters.chunks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn factory_serves_file_repositories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x"), b"1").unwrap();
        let repository =
            RemoteRepository::new("local", format!("file://{}", dir.path().display()));
        let transporter = FileTransporterFactory.transporter(&repository).unwrap();
        transporter.peek(&PeekTask::new("x")).unwrap();
    }
}
