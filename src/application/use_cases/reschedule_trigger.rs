//! Replaces an existing trigger with a new one, recomputing its fire
//! schedule. The new trigger is stored before the old key is removed so
//! that, when both share a job, the store's non-durable-job cascade never
//! sees a momentary zero-trigger window and deletes the job out from
//! under the replacement.

use crate::domain::entities::calendar::Calendar;
use crate::domain::entities::keys::TriggerKey;
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::SchedulerResult;
use crate::domain::repositories::job_store::JobStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct RescheduleTrigger;

impl RescheduleTrigger {
    pub async fn execute(
        store: &dyn JobStore,
        trigger_key: &TriggerKey,
        mut new_trigger: Trigger,
        calendar: Option<&Arc<dyn Calendar>>,
    ) -> SchedulerResult<Option<DateTime<Utc>>> {
        if store.retrieve_trigger(trigger_key).await?.is_none() {
            return Ok(None);
        }
        new_trigger.compute_first_fire_time(calendar.map(|c| c.as_ref()));
        store.store_trigger(new_trigger.clone(), true).await?;
        if trigger_key != &new_trigger.key {
            store.remove_trigger(trigger_key).await?;
        }
        Ok(new_trigger.next_fire_time)
    }
}
