//! The job store contract: the durability and concurrency boundary between
//! the engine and wherever jobs/triggers actually live.
//!
//! Every method that can race with another scheduler instance (or another
//! worker in this one) is documented as a single transactional step. An
//! implementation backed by a shared database is expected to take whatever
//! row/advisory locks are needed to make each method atomic; the in-memory
//! implementation gets this for free from a single mutex.

use crate::domain::entities::job::JobDetail;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::SchedulerResult;
use crate::domain::value_objects::matcher::Matcher;
use crate::domain::value_objects::misfire::CompletionInstruction;
use crate::domain::value_objects::trigger_state::TriggerState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// A trigger paired with the job it fired, handed back by `triggers_fired`
/// once the store has moved the trigger into `Executing`.
#[derive(Debug, Clone)]
pub struct FiredTrigger {
    pub trigger: Trigger,
    pub job_detail: JobDetail,
    /// Set when this fire represents recovery of a job that was executing
    /// when the scheduler last went down, for a job with `requests_recovery`.
    pub recovering: bool,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn store_job(&self, job: JobDetail, replace_existing: bool) -> SchedulerResult<()>;
    async fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> SchedulerResult<()>;

    /// Removes a job and cascades to every trigger that points at it.
    async fn remove_job(&self, key: &JobKey) -> SchedulerResult<bool>;
    async fn remove_trigger(&self, key: &TriggerKey) -> SchedulerResult<bool>;

    async fn retrieve_job(&self, key: &JobKey) -> SchedulerResult<Option<JobDetail>>;
    async fn retrieve_trigger(&self, key: &TriggerKey) -> SchedulerResult<Option<Trigger>>;
    async fn get_triggers_for_job(&self, key: &JobKey) -> SchedulerResult<Vec<Trigger>>;

    async fn get_job_keys(&self, matcher: &Matcher) -> SchedulerResult<Vec<JobKey>>;
    async fn get_trigger_keys(&self, matcher: &Matcher) -> SchedulerResult<Vec<TriggerKey>>;

    async fn pause_trigger(&self, key: &TriggerKey) -> SchedulerResult<()>;
    /// Pauses every trigger matched and returns the distinct group names
    /// touched, so a later matching `resume_triggers` call can be symmetric.
    async fn pause_triggers(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>>;
    async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()>;
    async fn pause_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>>;
    async fn pause_all(&self) -> SchedulerResult<()>;

    async fn resume_trigger(&self, key: &TriggerKey) -> SchedulerResult<()>;
    async fn resume_triggers(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>>;
    async fn resume_job(&self, key: &JobKey) -> SchedulerResult<()>;
    async fn resume_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>>;
    async fn resume_all(&self) -> SchedulerResult<()>;

    async fn get_paused_trigger_groups(&self) -> SchedulerResult<HashSet<String>>;
    async fn get_trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState>;

    /// Atomically claims up to `max_count` triggers whose `next_fire_time`
    /// falls at or before `no_later_than + time_window`, ordered by fire
    /// time then priority then key, skipping any job with
    /// `disallow_concurrent_execution` that already has a trigger
    /// `Acquired`/`Executing`. Claimed triggers move to `Acquired`.
    async fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
    ) -> SchedulerResult<Vec<Trigger>>;

    /// Releases a trigger the engine acquired but decided not to fire,
    /// returning it to `Waiting`.
    async fn release_acquired_trigger(&self, key: &TriggerKey) -> SchedulerResult<()>;

    /// Moves each acquired trigger to `Executing` and returns its paired job,
    /// skipping (and releasing) any trigger no longer present or whose job
    /// vanished underneath it.
    async fn triggers_fired(&self, keys: &[TriggerKey]) -> SchedulerResult<Vec<FiredTrigger>>;

    /// Applies the post-execution instruction. `updated_trigger` is the
    /// engine's recomputed version of the fired trigger (calendar-aware
    /// `next_fire_time` already advanced, or `None` if its schedule is
    /// exhausted) and is what gets written back for the ordinary case;
    /// `DeleteTrigger`/`SetAllJobTriggersComplete`/`SetAllJobTriggersError`
    /// override it for the trigger(s) they target.
    async fn triggered_job_complete(
        &self,
        trigger_key: &TriggerKey,
        job_key: &JobKey,
        instruction: CompletionInstruction,
        updated_trigger: Option<Trigger>,
    ) -> SchedulerResult<()>;
}
