//! Removes a trigger. Cascading to a non-durable job whose last trigger
//! just went away is the store's job (`JobStore::remove_trigger` does it
//! atomically under its own lock); this use case is a thin public-API
//! wrapper around that one call.

use crate::domain::entities::keys::TriggerKey;
use crate::domain::error::SchedulerResult;
use crate::domain::repositories::job_store::JobStore;

pub struct UnscheduleTrigger;

impl UnscheduleTrigger {
    pub async fn execute(store: &dyn JobStore, trigger_key: &TriggerKey) -> SchedulerResult<bool> {
        store.remove_trigger(trigger_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::job::JobDetail;
    use crate::domain::entities::keys::JobKey;
    use crate::domain::entities::trigger::{SimpleSchedule, Trigger, TriggerSchedule};
    use crate::infrastructure::repositories::InMemoryJobStore;

    #[tokio::test]
    async fn removes_non_durable_job_once_its_last_trigger_is_gone() {
        let store = InMemoryJobStore::new();
        store.store_job(JobDetail::new(JobKey::new("j1"), "demo::Job"), false).await.unwrap();
        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(1_000, 0)),
        );
        store.store_trigger(trigger, false).await.unwrap();

        assert!(UnscheduleTrigger::execute(&store, &TriggerKey::new("t1")).await.unwrap());
        assert!(store.retrieve_job(&JobKey::new("j1")).await.unwrap().is_none());
    }
}
