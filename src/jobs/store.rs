use dashmap::DashMap;

use crate::error::JobError;
use crate::model::ProcessingJob;

/// Keyed storage for processing jobs.
///
/// `update` applies its closure while holding the entry, so concurrent
/// updates of one job never interleave. Different keys never block each
/// other.
pub trait JobStore: Send + Sync {
    fn get(&self, model_id: &str) -> Option<ProcessingJob>;

    fn put(&self, job: ProcessingJob);

    /// Mutate a stored job in place and return the new state.
    fn update(
        &self,
        model_id: &str,
        apply: &mut dyn FnMut(&mut ProcessingJob),
    ) -> Result<ProcessingJob, JobError>;

    /// Every stored job, in no particular order.
    fn list(&self) -> Vec<ProcessingJob>;
}

/// Process-local job store on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<String, ProcessingJob>,
}

impl InMemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, model_id: &str) -> Option<ProcessingJob> {
        self.jobs.get(model_id).map(|job| job.value().clone())
    }

    fn put(&self, job: ProcessingJob) {
        self.jobs.insert(job.model_id.clone(), job);
    }

    fn update(
        &self,
        model_id: &str,
        apply: &mut dyn FnMut(&mut ProcessingJob),
    ) -> Result<ProcessingJob, JobError> {
        let mut job = self
            .jobs
            .get_mut(model_id)
            .ok_or_else(|| JobError::NotFound(model_id.to_string()))?;
        apply(job.value_mut());
        Ok(job.value().clone())
    }

    fn list(&self) -> Vec<ProcessingJob> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }
}
