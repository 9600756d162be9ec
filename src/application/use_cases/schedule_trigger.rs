//! Attaches a new trigger to a job that must already be scheduled.

use crate::domain::entities::calendar::Calendar;
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::{SchedulerError, SchedulerResult};
use crate::domain::repositories::job_store::JobStore;
use std::sync::Arc;

pub struct ScheduleTrigger;

impl ScheduleTrigger {
    pub async fn execute(
        store: &dyn JobStore,
        mut trigger: Trigger,
        calendar: Option<&Arc<dyn Calendar>>,
    ) -> SchedulerResult<Trigger> {
        if store.retrieve_job(&trigger.job_key).await?.is_none() {
            return Err(SchedulerError::not_found(format!("job {} for trigger {}", trigger.job_key, trigger.key)));
        }
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
