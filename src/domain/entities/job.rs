//! Job definition: what runs, independent of when.

use crate::domain::entities::keys::JobKey;
use crate::domain::value_objects::data_map::JobDataMap;

/// A stored job definition. The executable behavior itself lives behind a
/// [`crate::domain::job_execution::JobFactory`] lookup keyed by
/// `job_class`; the store only ever holds this descriptive record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    pub key: JobKey,
    pub description: Option<String>,
    /// Identifier resolved against a `JobFactory` at fire time.
    pub job_class: String,
    pub job_data_map: JobDataMap,
    /// Survives a scheduler restart if the store is itself durable.
    pub durable: bool,
    /// Whether a crash mid-execution should requeue this job on restart.
    pub requests_recovery: bool,
    /// Whether two instances of this job may run concurrently.
    pub disallow_concurrent_execution: bool,
    /// Whether mutations the job makes to its `job_data_map` during
    /// execution are written back to the store afterward.
    pub persist_data_after_execution: bool,
}

impl JobDetail {
    pub fn new(key: JobKey, job_class: impl Into<String>) -> Self {
        Self {
            key,
            description: None,
            job_class: job_class.into(),
            job_data_map: JobDataMap::new(),
            durable: false,
            requests_recovery: false,
            disallow_concurrent_execution: false,
            persist_data_after_execution: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_has_conservative_defaults() {
        let job = JobDetail::new(JobKey::new("nightly-rollup"), "rollup::Job");
        assert!(!job.durable);
        assert!(!job.disallow_concurrent_execution);
        assert!(!job.requests_recovery);
    }
}
