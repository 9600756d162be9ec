//! In-process `JobStore`: a single `tokio::sync::Mutex` guarding plain
//! collections. Every public method takes the lock for its own duration,
//! which is what makes each one the atomic step the trait documents.

use crate::domain::entities::job::JobDetail;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::{SchedulerError, SchedulerResult};
use crate::domain::repositories::job_store::{FiredTrigger, JobStore};
use crate::domain::value_objects::matcher::Matcher;
use crate::domain::value_objects::misfire::CompletionInstruction;
use crate::domain::value_objects::trigger_state::TriggerState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    jobs: HashMap<JobKey, JobDetail>,
    triggers: HashMap<TriggerKey, Trigger>,
    trigger_states: HashMap<TriggerKey, TriggerState>,
    paused_job_groups: HashSet<String>,
    paused_trigger_groups: HashSet<String>,
    /// Jobs with a trigger currently `Acquired` or `Executing`; consulted
    /// for `disallow_concurrent_execution`.
    running_jobs: HashSet<JobKey>,
}

impl State {
    fn triggers_for_job_mut(&mut self, job_key: &JobKey) -> Vec<TriggerKey> {
        self.triggers
            .values()
            .filter(|t| &t.job_key == job_key)
            .map(|t| t.key.clone())
            .collect()
    }

    fn state_of(&self, key: &TriggerKey) -> TriggerState {
        self.trigger_states.get(key).copied().unwrap_or(TriggerState::None)
    }

    fn group_paused(&self, job: &JobKey, trigger: &TriggerKey) -> bool {
        self.paused_job_groups.contains(&job.group) || self.paused_trigger_groups.contains(&trigger.group)
    }
}

pub struct InMemoryJobStore {
    state: Mutex<State>,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn store_job(&self, job: JobDetail, replace_existing: bool) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        if !replace_existing && state.jobs.contains_key(&job.key) {
            return Err(SchedulerError::already_exists(format!("job {}", job.key)));
        }
        state.jobs.insert(job.key.clone(), job);
        Ok(())
    }

    async fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        if !replace_existing && state.triggers.contains_key(&trigger.key) {
            return Err(SchedulerError::already_exists(format!("trigger {}", trigger.key)));
        }
        if !state.jobs.contains_key(&trigger.job_key) {
            return Err(SchedulerError::not_found(format!("job {} for trigger {}", trigger.job_key, trigger.key)));
        }
        let initial_state = if state.group_paused(&trigger.job_key, &trigger.key) {
            TriggerState::Paused
        } else {
            TriggerState::Waiting
        };
        state.trigger_states.insert(trigger.key.clone(), initial_state);
        state.triggers.insert(trigger.key.clone(), trigger);
        Ok(())
    }

    async fn remove_job(&self, key: &JobKey) -> SchedulerResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.jobs.remove(key).is_some();
        for trigger_key in state.triggers_for_job_mut(key) {
            state.triggers.remove(&trigger_key);
            state.trigger_states.remove(&trigger_key);
        }
        state.running_jobs.remove(key);
        Ok(removed)
    }

    async fn remove_trigger(&self, key: &TriggerKey) -> SchedulerResult<bool> {
        let mut state = self.state.lock().await;
        let Some(trigger) = state.triggers.remove(key) else {
            return Ok(false);
        };
        state.trigger_states.remove(key);

        let job_key = trigger.job_key;
        let still_has_triggers = state.triggers.values().any(|t| t.job_key == job_key);
        if !still_has_triggers {
            let non_durable = state.jobs.get(&job_key).is_some_and(|j| !j.durable);
            if non_durable {
                state.jobs.remove(&job_key);
                state.running_jobs.remove(&job_key);
            }
        }
        Ok(true)
    }

    async fn retrieve_job(&self, key: &JobKey) -> SchedulerResult<Option<JobDetail>> {
        Ok(self.state.lock().await.jobs.get(key).cloned())
    }

    async fn retrieve_trigger(&self, key: &TriggerKey) -> SchedulerResult<Option<Trigger>> {
        Ok(self.state.lock().await.triggers.get(key).cloned())
    }

    async fn get_triggers_for_job(&self, key: &JobKey) -> SchedulerResult<Vec<Trigger>> {
        let state = self.state.lock().await;
        Ok(state.triggers.values().filter(|t| &t.job_key == key).cloned().collect())
    }

    async fn get_job_keys(&self, matcher: &Matcher) -> SchedulerResult<Vec<JobKey>> {
        let state = self.state.lock().await;
        Ok(state.jobs.keys().filter(|k| matcher.matches_job(k)).cloned().collect())
    }

    async fn get_trigger_keys(&self, matcher: &Matcher) -> SchedulerResult<Vec<TriggerKey>> {
        let state = self.state.lock().await;
        Ok(state.triggers.keys().filter(|k| matcher.matches_trigger(k)).cloned().collect())
    }

    async fn pause_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let current = state.state_of(key);
        state.trigger_states.insert(key.clone(), current.paused());
        Ok(())
    }

    async fn pause_triggers(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let keys: Vec<TriggerKey> = state.triggers.keys().filter(|k| matcher.matches_trigger(k)).cloned().collect();
        let mut groups = HashSet::new();
        for key in &keys {
            let current = state.state_of(key);
            state.trigger_states.insert(key.clone(), current.paused());
            groups.insert(key.group.clone());
        }
        Ok(groups.into_iter().collect())
    }

    async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let triggers = state.triggers_for_job_mut(key);
        for trigger_key in triggers {
            let current = state.state_of(&trigger_key);
            state.trigger_states.insert(trigger_key, current.paused());
        }
        Ok(())
    }

    async fn pause_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let job_keys: Vec<JobKey> = state.jobs.keys().filter(|k| matcher.matches_job(k)).cloned().collect();
        let mut groups = HashSet::new();
        for job_key in &job_keys {
            groups.insert(job_key.group.clone());
            let triggers = state.triggers_for_job_mut(job_key);
            for trigger_key in triggers {
                let current = state.state_of(&trigger_key);
                state.trigger_states.insert(trigger_key, current.paused());
            }
        }
        Ok(groups.into_iter().collect())
    }

    async fn pause_all(&self) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let keys: Vec<TriggerKey> = state.triggers.keys().cloned().collect();
        for key in keys {
            let current = state.state_of(&key);
            state.trigger_states.insert(key, current.paused());
        }
        let groups: HashSet<String> = state.triggers.keys().map(|k| k.group.clone()).collect();
        state.paused_trigger_groups.extend(groups);
        Ok(())
    }

    async fn resume_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let current = state.state_of(key);
        state.trigger_states.insert(key.clone(), current.resumed());
        Ok(())
    }

    async fn resume_triggers(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let keys: Vec<TriggerKey> = state.triggers.keys().filter(|k| matcher.matches_trigger(k)).cloned().collect();
        let mut groups = HashSet::new();
        for key in &keys {
            let current = state.state_of(key);
            state.trigger_states.insert(key.clone(), current.resumed());
            groups.insert(key.group.clone());
        }
        state.paused_trigger_groups.retain(|g| !groups.contains(g));
        Ok(groups.into_iter().collect())
    }

    async fn resume_job(&self, key: &JobKey) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let triggers = state.triggers_for_job_mut(key);
        for trigger_key in triggers {
            let current = state.state_of(&trigger_key);
            state.trigger_states.insert(trigger_key, current.resumed());
        }
        Ok(())
    }

    async fn resume_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let job_keys: Vec<JobKey> = state.jobs.keys().filter(|k| matcher.matches_job(k)).cloned().collect();
        let mut groups = HashSet::new();
        for job_key in &job_keys {
            groups.insert(job_key.group.clone());
            let triggers = state.triggers_for_job_mut(job_key);
            for trigger_key in triggers {
                let current = state.state_of(&trigger_key);
                state.trigger_states.insert(trigger_key, current.resumed());
            }
        }
        state.paused_job_groups.retain(|g| !groups.contains(g));
        Ok(groups.into_iter().collect())
    }

    async fn resume_all(&self) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        let keys: Vec<TriggerKey> = state.triggers.keys().cloned().collect();
        for key in keys {
            let current = state.state_of(&key);
            state.trigger_states.insert(key, current.resumed());
        }
        state.paused_trigger_groups.clear();
        state.paused_job_groups.clear();
        Ok(())
    }

    async fn get_paused_trigger_groups(&self) -> SchedulerResult<HashSet<String>> {
        Ok(self.state.lock().await.paused_trigger_groups.clone())
    }

    async fn get_trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState> {
        Ok(self.state.lock().await.state_of(key))
    }

    async fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
    ) -> SchedulerResult<Vec<Trigger>> {
        let mut state = self.state.lock().await;
        let cutoff = no_later_than + time_window;

        let mut candidates: Vec<TriggerKey> = state
            .triggers
            .values()
            .filter(|t| {
                state.state_of(&t.key) == TriggerState::Waiting
                    && t.next_fire_time.is_some_and(|ft| ft <= cutoff)
            })
            .map(|t| t.key.clone())
            .collect();

        candidates.sort_by(|a, b| {
            let ta = &state.triggers[a];
            let tb = &state.triggers[b];
            ta.next_fire_time
                .cmp(&tb.next_fire_time)
                .then(tb.priority.cmp(&ta.priority))
                .then(ta.key.cmp(&tb.key))
        });

        let mut acquired = Vec::new();
        let mut newly_running = HashSet::new();
        for key in candidates {
            if acquired.len() >= max_count {
                break;
            }
            let job_key = state.triggers[&key].job_key.clone();
            let disallow_concurrent = state.jobs.get(&job_key).map(|j| j.disallow_concurrent_execution).unwrap_or(false);
            if disallow_concurrent && (state.running_jobs.contains(&job_key) || newly_running.contains(&job_key)) {
                state.trigger_states.insert(key, TriggerState::Blocked);
                continue;
            }
            state.trigger_states.insert(key.clone(), TriggerState::Acquired);
            newly_running.insert(job_key);
            acquired.push(state.triggers[&key].clone());
        }
        Ok(acquired)
    }

    async fn release_acquired_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        if state.state_of(key) == TriggerState::Acquired {
            state.trigger_states.insert(key.clone(), TriggerState::Waiting);
        }
        Ok(())
    }

    async fn triggers_fired(&self, keys: &[TriggerKey]) -> SchedulerResult<Vec<FiredTrigger>> {
        let mut state = self.state.lock().await;
        let mut fired = Vec::new();
        for key in keys {
            let Some(trigger) = state.triggers.get(key).cloned() else { continue };
            let Some(job_detail) = state.jobs.get(&trigger.job_key).cloned() else {
                state.trigger_states.remove(key);
                continue;
            };
            state.trigger_states.insert(key.clone(), TriggerState::Executing);
            state.running_jobs.insert(trigger.job_key.clone());
            let recovering = job_detail.requests_recovery;
            fired.push(FiredTrigger { trigger, job_detail, recovering });
        }
        Ok(fired)
    }

    async fn triggered_job_complete(
        &self,
        trigger_key: &TriggerKey,
        job_key: &JobKey,
        instruction: CompletionInstruction,
        updated_trigger: Option<Trigger>,
    ) -> SchedulerResult<()> {
        let mut state = self.state.lock().await;
        state.running_jobs.remove(job_key);
        for key in state.triggers_for_job_mut(job_key) {
            if state.state_of(&key) == TriggerState::Blocked {
                state.trigger_states.insert(key, TriggerState::Waiting);
            }
        }

        match instruction {
            CompletionInstruction::Noop | CompletionInstruction::ReExecuteJob => {
                apply_update(&mut state, trigger_key, updated_trigger);
            }
            CompletionInstruction::SetTriggerComplete => {
                state.trigger_states.insert(trigger_key.clone(), TriggerState::Complete);
            }
            CompletionInstruction::DeleteTrigger => {
                state.triggers.remove(trigger_key);
                state.trigger_states.remove(trigger_key);
            }
            CompletionInstruction::SetTriggerError => {
                state.trigger_states.insert(trigger_key.clone(), TriggerState::Error);
            }
            CompletionInstruction::SetAllJobTriggersComplete => {
                for key in state.triggers_for_job_mut(job_key) {
                    state.trigger_states.insert(key, TriggerState::Complete);
                }
            }
            CompletionInstruction::SetAllJobTriggersError => {
                for key in state.triggers_for_job_mut(job_key) {
                    state.trigger_states.insert(key, TriggerState::Error);
                }
            }
        }
        Ok(())
    }
}

fn apply_update(state: &mut State, trigger_key: &TriggerKey, updated: Option<Trigger>) {
    match updated {
        Some(trigger) => {
            state.trigger_states.insert(trigger_key.clone(), TriggerState::Waiting);
            state.triggers.insert(trigger_key.clone(), trigger);
        }
        None => {
            state.trigger_states.insert(trigger_key.clone(), TriggerState::Complete);
        }
    }
}
