//! The executable side of a job: what the engine actually calls when a
//! trigger fires, kept separate from `JobDetail` so the store never has to
//! serialize behavior, only the description of it.

use crate::domain::entities::job::JobDetail;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::error::JobExecutionError;
use crate::domain::value_objects::data_map::JobDataMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Everything a running job instance can see about why it was fired.
#[derive(Debug, Clone)]
pub struct JobExecutionContext {
    pub job_key: JobKey,
    pub trigger_key: TriggerKey,
    pub fire_instance_id: String,
    pub scheduled_fire_time: DateTime<Utc>,
    pub fire_time: DateTime<Utc>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub job_data_map: JobDataMap,
    pub recovering: bool,
}

/// User job code, resolved from a `JobDetail.job_class` at fire time.
#[async_trait]
pub trait ExecutableJob: Send + Sync {
    async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), JobExecutionError>;
}

/// Resolves a `job_class` identifier to a runnable instance.
pub trait JobFactory: Send + Sync {
    fn new_job(&self, job_detail: &JobDetail) -> Result<Arc<dyn ExecutableJob>, JobExecutionError>;
}

/// A `JobFactory` backed by a fixed registry of constructors, keyed by
/// `job_class`. Sufficient for embedding jobs defined at compile time; a
/// plugin-loading factory would implement `JobFactory` directly.
pub struct RegistryJobFactory {
    constructors: std::collections::HashMap<String, Arc<dyn Fn() -> Arc<dyn ExecutableJob> + Send + Sync>>,
}

impl Default for RegistryJobFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryJobFactory {
    pub fn new() -> Self {
        Self { constructors: std::collections::HashMap::new() }
    }

    pub fn register(
        &mut self,
        job_class: impl Into<String>,
        ctor: impl Fn() -> Arc<dyn ExecutableJob> + Send + Sync + 'static,
    ) {
        self.constructors.insert(job_class.into(), Arc::new(ctor));
    }
}

impl JobFactory for RegistryJobFactory {
    fn new_job(&self, job_detail: &JobDetail) -> Result<Arc<dyn ExecutableJob>, JobExecutionError> {
        self.constructors
            .get(&job_detail.job_class)
            .map(|ctor| ctor())
            .ok_or_else(|| JobExecutionError::new(format!("no job class registered for '{}'", job_detail.job_class)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopJob;

    #[async_trait]
    impl ExecutableJob for NoopJob {
        async fn execute(&self, _ctx: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
            Ok(())
        }
    }

    #[test]
    fn registry_resolves_registered_class() {
        let mut factory = RegistryJobFactory::new();
        factory.register("noop", || Arc::new(NoopJob));
        let job = JobDetail::new(JobKey::new("j1"), "noop");
        assert!(factory.new_job(&job).is_ok());
    }

    #[test]
    fn registry_rejects_unknown_class() {
        let factory = RegistryJobFactory::new();
        let job = JobDetail::new(JobKey::new("j1"), "missing");
        assert!(factory.new_job(&job).is_err());
    }
}
