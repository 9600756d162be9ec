//! Console-facing summary of a demonstration scheduler run.

use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::value_objects::trigger_state::TriggerState;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TriggerSummary {
    pub trigger_key: String,
    pub job_key: String,
    pub state: String,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub times_triggered: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SchedulerRunSummary {
    pub jobs_scheduled: usize,
    pub fires_observed: usize,
    pub triggers: Vec<TriggerSummary>,
}

impl SchedulerRunSummary {
    pub fn push_trigger(
        &mut self,
        trigger_key: &TriggerKey,
        job_key: &JobKey,
        state: TriggerState,
        next_fire_time: Option<DateTime<Utc>>,
        times_triggered: u64,
    ) {
        self.triggers.push(TriggerSummary {
            trigger_key: trigger_key.to_string(),
            job_key: job_key.to_string(),
            state: format!("{state:?}"),
            next_fire_time,
            times_triggered,
        });
    }
}
