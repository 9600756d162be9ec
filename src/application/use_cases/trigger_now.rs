//! Fires a job immediately via a disposable one-shot trigger, independent
//! of any regularly scheduled trigger on the same job.

use crate::domain::clock::Clock;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::entities::trigger::{SimpleSchedule, Trigger, TriggerSchedule};
use crate::domain::error::{SchedulerError, SchedulerResult};
use crate::domain::repositories::job_store::JobStore;
use crate::domain::value_objects::data_map::JobDataMap;

pub struct TriggerNow;

impl TriggerNow {
    pub async fn execute(
        store: &dyn JobStore,
        clock: &dyn Clock,
        job_key: &JobKey,
        optional_data: Option<JobDataMap>,
    ) -> SchedulerResult<Trigger> {
        if store.retrieve_job(job_key).await?.is_none() {
            return Err(SchedulerError::not_found(format!("job {job_key}")));
        }
        let now = clock.now();
        let trigger_key = TriggerKey::with_group(
            format!("{}-manual-{}", job_key.name, now.timestamp_millis()),
            "MANUAL_TRIGGERS",
        );
        let mut trigger = Trigger::new(trigger_key, job_key.clone(), now, TriggerSchedule::Simple(SimpleSchedule::new(0, 0)));
        if let Some(data) = optional_data {
            trigger.job_data_map = data;
        }
        trigger.next_fire_time = Some(now);
        store.store_trigger(trigger.clone(), false).await?;
        Ok(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::SystemClock;
    use crate::domain::entities::job::JobDetail;
    use crate::infrastructure::repositories::InMemoryJobStore;

    #[tokio::test]
    async fn creates_an_immediately_firing_trigger() {
        let store = InMemoryJobStore::new();
        store.store_job(JobDetail::new(JobKey::new("j1"), "demo::Job"), false).await.unwrap();
        let trigger = TriggerNow::execute(&store, &SystemClock, &JobKey::new("j1"), None).await.unwrap();
        assert!(trigger.next_fire_time.is_some());
    }

    #[tokio::test]
    async fn rejects_unknown_job() {
        let store = InMemoryJobStore::new();
        assert!(TriggerNow::execute(&store, &SystemClock, &JobKey::new("missing"), None).await.is_err());
    }

    #[tokio::test]
    async fn optional_data_overlays_the_one_shot_trigger() {
        let store = InMemoryJobStore::new();
        store.store_job(JobDetail::new(JobKey::new("j1"), "demo::Job"), false).await.unwrap();
        let mut data = JobDataMap::new();
        data.put("reason", "manual-kick");
        let trigger = TriggerNow::execute(&store, &SystemClock, &JobKey::new("j1"), Some(data)).await.unwrap();
        assert_eq!(trigger.job_data_map.get_string("reason"), Some("manual-kick"));
    }
}
