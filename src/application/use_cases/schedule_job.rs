//! Schedules a job together with its first trigger.

use crate::domain::entities::calendar::Calendar;
use crate::domain::entities::job::JobDetail;
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::{SchedulerError, SchedulerResult};
use crate::domain::repositories::job_store::JobStore;
use std::sync::Arc;

pub struct ScheduleJob;

impl ScheduleJob {
    pub async fn execute(
        store: &dyn JobStore,
        job: JobDetail,
        mut trigger: Trigger,
        calendar: Option<&Arc<dyn Calendar>>,
    ) -> SchedulerResult<Trigger> {
        if trigger.job_key != job.key {
            return Err(SchedulerError::SchedulerConfiguration(format!(
                "trigger {} names job {} but is being scheduled with job {}",
                trigger.key, trigger.job_key, job.key
            )));
        }
        store.store_job(job, false).await?;
        trigger.compute_first_fire_time(calendar.map(|c| c.as_ref()));
        if trigger.next_fire_time.is_none() {
            return Err(SchedulerError::SchedulerConfiguration(format!(
                "trigger {} has no fire times within its schedule",
                trigger.key
            )));
        }
        store.store_trigger(trigger.clone(), false).await?;
        Ok(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::keys::{JobKey, TriggerKey};
    use crate::domain::entities::trigger::{SimpleSchedule, TriggerSchedule};
    use crate::infrastructure::repositories::InMemoryJobStore;

    #[tokio::test]
    async fn schedules_job_and_computes_first_fire_time() {
        let store = InMemoryJobStore::new();
        let job = JobDetail::new(JobKey::new("j1"), "demo::Job");
        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(1_000, 3)),
        );
        let result = ScheduleJob::execute(&store, job, trigger, None).await.unwrap();
        assert_eq!(result.next_fire_time, Some(start));
    }

    #[tokio::test]
    async fn rejects_mismatched_job_key() {
        let store = InMemoryJobStore::new();
        let job = JobDetail::new(JobKey::new("j1"), "demo::Job");
        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("other"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(1_000, 0)),
        );
        assert!(ScheduleJob::execute(&store, job, trigger, None).await.is_err());
    }
}
