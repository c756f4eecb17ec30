//! Descriptor reader over the transport layer.

use std::sync::Arc;

use tracing::{debug, warn};

use quarry_core::{
    Descriptor, DescriptorError, DescriptorReader, DescriptorRequest, Session,
};
use quarry_transport::{ErrorClass, GetTask, Transporter, TransporterFactory};

use crate::layout;

/// Reads JSON descriptor documents from the request's repositories, in
/// order, first hit winning. Repositories whose url scheme the factory
/// cannot serve are skipped.
pub struct JsonDescriptorReader {
    transporters: Arc<dyn TransporterFactory>,
}

impl JsonDescriptorReader {
    #[must_use]
    pub fn new(transporters: Arc<dyn TransporterFactory>) -> Self {
        Self { transporters }
    }
}

impl DescriptorReader for JsonDescriptorReader {
    fn read(
        &self,
        _session: &Session,
        request: &DescriptorRequest,
    ) -> Result<Descriptor, DescriptorError> {
        let resource = layout::descriptor_path(&request.coordinate);
        let mut io_failure: Option<String> = None;

        for repository in &request.repositories {
            let transporter = match self.transporters.transporter(repository) {
                Ok(transporter) => transporter,
                Err(error) => {
                    warn!(repository = %repository, error = %error, "skipping repository");
                    continue;
                }
            };
            let mut get = GetTask::memory(&resource);
            match transporter.get(&mut get) {
                Ok(()) => {
                    let data = get.data().unwrap_or_default();
                    let mut descriptor: Descriptor =
                        serde_json::from_slice(data).map_err(|e| DescriptorError::Invalid {
                            coordinate: request.coordinate.clone(),
                            message: e.to_string(),
                        })?;
                    // the request coordinate is authoritative, properties included
                    descriptor.coordinate = Some(request.coordinate.clone());
                    debug!("read descriptor for {} from '{}'", request.coordinate, repository.id);
                    return Ok(descriptor);
                }
                Err(error) if transporter.classify(&error) == ErrorClass::NotFound => {
                    continue;
                }
                Err(error) => {
                    io_failure.get_or_insert_with(|| error.to_string());
                }
            }
        }

        match io_failure {
            Some(message) => Err(DescriptorError::Io {
                coordinate: request.coordinate.clone(),
                message,
            }),
            None => Err(DescriptorError::Missing {
                coordinate: request.coordinate.clone(),
                repository_count: request.repositories.len(),
            }),
        }
    }
}
