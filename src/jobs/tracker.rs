use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store::JobStore;
use crate::error::{JobError, ProcessError, ValidationError};
use crate::model::{FileFormat, ModelMetadata, ProcessingJob, SourceFile};
use crate::processor::{Checkpoint, FileProcessor, ProcessingOutput};

/// Terminal job state together with what the run produced.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub job: ProcessingJob,
    pub output: ProcessingOutput,
}

/// Owns the job lifecycle: creation, processing runs and status queries.
///
/// Only the invocation holding a job's in-flight slot writes progress for
/// it; a second concurrent run for the same id is rejected as busy.
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    processor: Arc<FileProcessor>,
    in_flight: DashMap<String, ()>,
}

impl JobTracker {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, processor: Arc<FileProcessor>) -> Self {
        Self {
            store,
            processor,
            in_flight: DashMap::new(),
        }
    }

    #[must_use]
    pub fn processor(&self) -> &Arc<FileProcessor> {
        &self.processor
    }

    /// Register an uploaded file as a new job at progress 0. The format
    /// is taken from the extension unless given.
    pub fn create_job(
        &self,
        project_id: &str,
        path: &Path,
        format: Option<FileFormat>,
    ) -> Result<ProcessingJob, ProcessError> {
        let format = match format {
            Some(format) => format,
            None => FileProcessor::detect_format(path)?,
        };
        if !path.exists() {
            return Err(ValidationError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let size = std::fs::metadata(path)
            .map_err(|source| ValidationError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let file = SourceFile {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
            size,
            format,
        };
        let job = ProcessingJob::new(Uuid::new_v4().to_string(), project_id.to_string(), file);
        self.store.put(job.clone());

        info!(model_id = %job.model_id, %format, "created job for {}", path.display());
        Ok(job)
    }

    pub fn status(&self, model_id: &str) -> Result<ProcessingJob, JobError> {
        self.store
            .get(model_id)
            .ok_or_else(|| JobError::NotFound(model_id.to_string()))
    }

    /// Run (or re-run) processing for a job to a terminal state.
    ///
    /// Failures, panics included, leave the job in `error` with progress
    /// frozen at the last checkpoint reached.
    pub fn process(&self, model_id: &str) -> Result<ProcessingOutcome, ProcessError> {
        let _slot = InFlight::acquire(&self.in_flight, model_id)?;

        let job = self.store.update(model_id, &mut |job| job.begin())?;
        info!(model_id, "processing {}", job.file.name);

        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            self.processor.process_with(
                &job.file.path,
                model_id,
                job.file.format,
                |checkpoint| self.record(model_id, checkpoint),
            )
        }));
        let result = run.unwrap_or_else(|payload| {
            Err(ProcessError::Internal {
                message: panic_message(payload.as_ref()),
            })
        });

        match result {
            Ok(output) => {
                let metadata = ModelMetadata {
                    software_version: Some(output.software_version.clone()),
                    project_info: output.project_info.clone(),
                    element_count: output.elements.len(),
                };
                let mut completion = Some((metadata, output.warnings.clone()));
                let job = self.store.update(model_id, &mut |job| {
                    if let Some((metadata, warnings)) = completion.take() {
                        job.complete(metadata, warnings);
                    }
                })?;

                info!(model_id, elements = job.elements_processed, "job ready");
                Ok(ProcessingOutcome { job, output })
            }
            Err(e) => {
                error!(model_id, "processing failed: {e}");
                let message = e.to_string();
                self.store.update(model_id, &mut |job| job.fail(message.clone()))?;
                Err(e)
            }
        }
    }

    fn record(&self, model_id: &str, checkpoint: Checkpoint) {
        let update = self.store.update(model_id, &mut |job| {
            job.advance(checkpoint.progress());
            if let Checkpoint::Extracted { elements } = checkpoint {
                job.elements_processed = elements;
            }
        });
        if let Err(e) = update {
            warn!(model_id, "could not record progress: {e}");
        }
    }
}

/// Single-writer slot for one model id, released on drop.
struct InFlight<'a> {
    slots: &'a DashMap<String, ()>,
    model_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(slots: &'a DashMap<String, ()>, model_id: &str) -> Result<Self, JobError> {
        match slots.entry(model_id.to_string()) {
            Entry::Occupied(_) => Err(JobError::Busy(model_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    slots,
                    model_id: model_id.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.slots.remove(&self.model_id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::InMemoryJobStore;

    fn tracker() -> JobTracker {
        let processor = FileProcessor::new(Arc::default(), Default::default());
        JobTracker::new(Arc::new(InMemoryJobStore::new()), Arc::new(processor))
    }

    #[test]
    fn in_flight_slot_is_exclusive() {
        let slots = DashMap::new();
        let first = InFlight::acquire(&slots, "m1").unwrap();
        assert_eq!(
            InFlight::acquire(&slots, "m1").err(),
            Some(JobError::Busy("m1".into()))
        );
        assert!(InFlight::acquire(&slots, "m2").is_ok());

        drop(first);
        assert!(InFlight::acquire(&slots, "m1").is_ok());
    }

    #[test]
    fn unknown_job() {
        let tracker = tracker();
        assert_eq!(
            tracker.status("missing").unwrap_err(),
            JobError::NotFound("missing".into())
        );
        assert!(matches!(
            tracker.process("missing"),
            Err(ProcessError::Job(JobError::NotFound(_)))
        ));
    }

    #[test]
    fn create_job_requires_existing_file() {
        let tracker = tracker();
        let err = tracker
            .create_job("p1", Path::new("/nonexistent/model.ifc"), None)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Validation(ValidationError::NotFound { .. })));

        let err = tracker
            .create_job("p1", Path::new("drawing.dwg"), None)
            .unwrap_err();
        assert!(matches!(err, ProcessError::UnsupportedFormat { .. }));
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
