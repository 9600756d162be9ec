//! The scheduler engine: main loop, worker pool, and the public surface the
//! rest of the crate drives it through.

use crate::application::engine::config::SchedulerConfig;
use crate::application::services::misfire::has_misfired;
use crate::application::services::ListenerManager;
use crate::application::use_cases::{RescheduleTrigger, ScheduleJob, ScheduleTrigger, TriggerNow, UnscheduleTrigger};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::entities::calendar::Calendar;
use crate::domain::entities::job::JobDetail;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::entities::trigger::Trigger;
use crate::domain::error::SchedulerResult;
use crate::domain::job_execution::{JobExecutionContext, JobFactory};
use crate::domain::repositories::job_store::{FiredTrigger, JobStore};
use crate::domain::value_objects::data_map::JobDataMap;
use crate::domain::value_objects::matcher::Matcher;
use crate::domain::value_objects::misfire::{CompletionInstruction, MisfireInstruction};
use crate::domain::value_objects::trigger_state::TriggerState;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock, Semaphore};
use tracing::{debug, error, info, warn};

pub struct Scheduler {
    store: Arc<dyn JobStore>,
    job_factory: Arc<dyn JobFactory>,
    pub listeners: Arc<ListenerManager>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    calendars: RwLock<HashMap<String, Arc<dyn Calendar>>>,
    wake: Notify,
    shutdown: Notify,
    running: AtomicBool,
    standby: AtomicBool,
    worker_permits: Arc<Semaphore>,
    fire_seq: AtomicU64,
    main_loop: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn JobStore>, job_factory: Arc<dyn JobFactory>, config: SchedulerConfig) -> Arc<Self> {
        Self::with_clock(store, job_factory, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn JobStore>,
        job_factory: Arc<dyn JobFactory>,
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let permits = config.thread_pool_size.max(1);
        Arc::new(Self {
            store,
            job_factory,
            listeners: Arc::new(ListenerManager::new()),
            clock,
            config,
            calendars: RwLock::new(HashMap::new()),
            wake: Notify::new(),
            shutdown: Notify::new(),
            running: AtomicBool::new(false),
            standby: AtomicBool::new(false),
            worker_permits: Arc::new(Semaphore::new(permits)),
            fire_seq: AtomicU64::new(0),
            main_loop: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub async fn add_calendar(&self, name: impl Into<String>, calendar: Arc<dyn Calendar>) {
        self.calendars.write().await.insert(name.into(), calendar);
    }

    async fn calendar_for(&self, trigger: &Trigger) -> Option<Arc<dyn Calendar>> {
        let name = trigger.calendar_name.as_ref()?;
        self.calendars.read().await.get(name).cloned()
    }

    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let me = self.clone();
        let handle = tokio::spawn(async move { me.run().await });
        *self.main_loop.lock().await = Some(handle);
        self.listeners.notify_started().await;
        info!(instance = %self.config.instance_name, "scheduler started");
    }

    pub fn standby(&self) {
        self.standby.store(true, Ordering::SeqCst);
    }

    pub fn resume_standby(&self) {
        self.standby.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub async fn shutdown(&self, wait_for_jobs_to_complete: bool) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if let Some(handle) = self.main_loop.lock().await.take() {
            let _ = handle.await;
        }
        if wait_for_jobs_to_complete {
            let total = self.config.thread_pool_size.max(1);
            if let Ok(permits) = self.worker_permits.clone().acquire_many_owned(total as u32).await {
                drop(permits);
            }
        }
        self.listeners.notify_shutdown().await;
        info!("scheduler shut down");
    }

    pub async fn schedule_job(self: &Arc<Self>, job: JobDetail, trigger: Trigger) -> SchedulerResult<Trigger> {
        let calendar = self.calendar_for(&trigger).await;
        let job_key = job.key.clone();
        let stored = ScheduleJob::execute(self.store.as_ref(), job, trigger, calendar.as_ref()).await?;
        self.listeners.notify_job_scheduled(&job_key).await;
        self.wake.notify_one();
        Ok(stored)
    }

    pub async fn schedule_trigger(self: &Arc<Self>, trigger: Trigger) -> SchedulerResult<Trigger> {
        let calendar = self.calendar_for(&trigger).await;
        let stored = ScheduleTrigger::execute(self.store.as_ref(), trigger, calendar.as_ref()).await?;
        self.wake.notify_one();
        Ok(stored)
    }

    pub async fn reschedule_trigger(
        self: &Arc<Self>,
        trigger_key: &TriggerKey,
        new_trigger: Trigger,
    ) -> SchedulerResult<Option<DateTime<Utc>>> {
        let calendar = self.calendar_for(&new_trigger).await;
        let next_fire_time =
            RescheduleTrigger::execute(self.store.as_ref(), trigger_key, new_trigger, calendar.as_ref()).await?;
        self.wake.notify_one();
        Ok(next_fire_time)
    }

    pub async fn unschedule_trigger(&self, key: &TriggerKey) -> SchedulerResult<bool> {
        UnscheduleTrigger::execute(self.store.as_ref(), key).await
    }

    pub async fn delete_job(&self, key: &JobKey) -> SchedulerResult<bool> {
        let removed = self.store.remove_job(key).await?;
        if removed {
            self.listeners.notify_job_unscheduled(key).await;
        }
        Ok(removed)
    }

    pub async fn trigger_now(self: &Arc<Self>, job_key: &JobKey, optional_data: Option<JobDataMap>) -> SchedulerResult<Trigger> {
        let trigger = TriggerNow::execute(self.store.as_ref(), self.clock.as_ref(), job_key, optional_data).await?;
        self.wake.notify_one();
        Ok(trigger)
    }

    pub async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.store.pause_job(key).await
    }

    pub async fn resume_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.store.resume_job(key).await?;
        self.wake.notify_one();
        Ok(())
    }

    pub async fn pause_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        self.store.pause_trigger(key).await
    }

    pub async fn resume_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        self.store.resume_trigger(key).await?;
        self.wake.notify_one();
        Ok(())
    }

    pub async fn pause_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        self.store.pause_jobs(matcher).await
    }

    pub async fn resume_jobs(&self, matcher: &Matcher) -> SchedulerResult<Vec<String>> {
        let groups = self.store.resume_jobs(matcher).await?;
        self.wake.notify_one();
        Ok(groups)
    }

    pub async fn get_trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState> {
        self.store.get_trigger_state(key).await
    }

    pub async fn get_triggers_of_job(&self, key: &JobKey) -> SchedulerResult<Vec<Trigger>> {
        self.store.get_triggers_for_job(key).await
    }

    pub async fn get_paused_trigger_groups(&self) -> SchedulerResult<HashSet<String>> {
        self.store.get_paused_trigger_groups().await
    }

    async fn run(self: Arc<Self>) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }
            if self.standby.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = self.wake.notified() => continue,
                    _ = self.shutdown.notified() => return,
                }
            }

            let now = self.clock.now();
            let batch = match self
                .store
                .acquire_next_triggers(now, self.config.max_batch_size, Duration::milliseconds(self.config.batch_time_window_ms))
                .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    error!(%err, "failed to acquire next triggers");
                    Vec::new()
                }
            };

            if batch.is_empty() {
                let idle = tokio::time::Duration::from_millis(self.config.idle_wait_ms);
                tokio::select! {
                    _ = tokio::time::sleep(idle) => {}
                    _ = self.wake.notified() => {}
                    _ = self.shutdown.notified() => return,
                }
                continue;
            }

            for trigger in batch {
                self.dispatch(trigger).await;
            }
        }
    }

    async fn dispatch(self: &Arc<Self>, trigger: Trigger) {
        let now = self.clock.now();
        let Some(next_fire_time) = trigger.next_fire_time else {
            let _ = self.store.release_acquired_trigger(&trigger.key).await;
            return;
        };

        if trigger.misfire_instruction != MisfireInstruction::IgnoreMisfirePolicy
            && has_misfired(next_fire_time, now, self.config.misfire_threshold_ms)
        {
            self.listeners.notify_trigger_misfired(&trigger.key).await;
            let calendar = self.calendar_for(&trigger).await;
            let mut misfired = trigger.clone();
            misfired.apply_misfire(now, calendar.as_deref());
            if misfired.next_fire_time.is_some() {
                let _ = self.store.store_trigger(misfired, true).await;
            } else {
                let _ = self.store.remove_trigger(&trigger.key).await;
            }
            self.wake.notify_one();
            return;
        }

        let fired = match self.store.triggers_fired(&[trigger.key.clone()]).await {
            Ok(fired) => fired,
            Err(err) => {
                error!(%err, trigger = %trigger.key, "failed to mark trigger fired");
                return;
            }
        };
        let Some(FiredTrigger { trigger, job_detail, recovering }) = fired.into_iter().next() else {
            return;
        };

        let mut job_data_map = job_detail.job_data_map.clone();
        job_data_map.merge(&trigger.job_data_map);
        let mut ctx = JobExecutionContext {
            job_key: trigger.job_key.clone(),
            trigger_key: trigger.key.clone(),
            fire_instance_id: format!("{}-{}", self.config.instance_id, self.fire_seq.fetch_add(1, Ordering::SeqCst)),
            scheduled_fire_time: next_fire_time,
            fire_time: now,
            previous_fire_time: trigger.previous_fire_time,
            next_fire_time: None,
            job_data_map,
            recovering,
        };

        self.listeners.notify_job_to_be_executed(&ctx).await;
        if self.listeners.notify_trigger_fired(&ctx).await {
            self.listeners.notify_job_execution_vetoed(&ctx).await;
            self.finish(trigger, CompletionInstruction::Noop, None).await;
            return;
        }

        let Ok(permit) = self.worker_permits.clone().acquire_owned().await else {
            return;
        };
        let scheduler = self.clone();
        let job_factory = self.job_factory.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = match job_factory.new_job(&job_detail) {
                Ok(job) => job.execute(&mut ctx).await,
                Err(err) => Err(err),
            };
            scheduler.complete_execution(trigger, job_detail, ctx, outcome).await;
        });
    }

    async fn complete_execution(
        self: Arc<Self>,
        trigger: Trigger,
        job_detail: JobDetail,
        ctx: JobExecutionContext,
        outcome: Result<(), crate::domain::error::JobExecutionError>,
    ) {
        self.listeners.notify_job_was_executed(&ctx, outcome.as_ref().err()).await;

        if job_detail.persist_data_after_execution {
            let mut updated_job = job_detail.clone();
            updated_job.job_data_map = ctx.job_data_map.clone();
            if let Err(err) = self.store.store_job(updated_job, true).await {
                error!(%err, job = %job_detail.key, "failed to persist job data after execution");
            }
        }

        let calendar = self.calendar_for(&trigger).await;
        let now = self.clock.now();
        let (instruction, updated) = match &outcome {
            Ok(()) => self.advance_after_success(&trigger, calendar.as_deref()),
            Err(job_err) => self.resolve_job_error(&trigger, job_err, now, calendar.as_deref()),
        };

        if let Err(err) = self
            .store
            .triggered_job_complete(&trigger.key, &trigger.job_key, instruction, updated)
            .await
        {
            error!(%err, trigger = %trigger.key, "failed to complete fired trigger");
        }
        self.listeners.notify_trigger_complete(&trigger.key).await;
        self.wake.notify_one();
    }

    fn advance_after_success(
        &self,
        trigger: &Trigger,
        calendar: Option<&dyn Calendar>,
    ) -> (CompletionInstruction, Option<Trigger>) {
        let mut advanced = trigger.clone();
        let next = advanced.triggered(calendar);
        (CompletionInstruction::Noop, next.map(|_| advanced))
    }

    fn resolve_job_error(
        &self,
        trigger: &Trigger,
        job_err: &crate::domain::error::JobExecutionError,
        now: chrono::DateTime<chrono::Utc>,
        calendar: Option<&dyn Calendar>,
    ) -> (CompletionInstruction, Option<Trigger>) {
        if job_err.unschedule_all {
            return (CompletionInstruction::SetAllJobTriggersError, None);
        }
        if job_err.unschedule_this {
            return (CompletionInstruction::SetTriggerError, None);
        }
        if job_err.refire {
            let mut refired = trigger.clone();
            refired.next_fire_time = Some(now);
            return (CompletionInstruction::ReExecuteJob, Some(refired));
        }
        let mut advanced = trigger.clone();
        let next = advanced.triggered(calendar);
        (CompletionInstruction::Noop, next.map(|_| advanced))
    }

    async fn finish(&self, trigger: Trigger, instruction: CompletionInstruction, updated: Option<Trigger>) {
        if let Err(err) = self.store.triggered_job_complete(&trigger.key, &trigger.job_key, instruction, updated).await {
            warn!(%err, trigger = %trigger.key, "failed to finalize vetoed trigger");
        }
        self.listeners.notify_trigger_complete(&trigger.key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::VirtualClock;
    use crate::domain::entities::trigger::{SimpleSchedule, TriggerSchedule};
    use crate::domain::job_execution::{ExecutableJob, RegistryJobFactory};
    use crate::infrastructure::repositories::InMemoryJobStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{sleep, Duration as TokioDuration};

    struct CountingJob(Arc<AtomicUsize>);

    #[async_trait]
    impl ExecutableJob for CountingJob {
        async fn execute(&self, _ctx: &mut JobExecutionContext) -> Result<(), crate::domain::error::JobExecutionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn simple_trigger_fires_through_the_main_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut factory = RegistryJobFactory::new();
        let counted = count.clone();
        factory.register("counting", move || Arc::new(CountingJob(counted.clone())) as Arc<dyn ExecutableJob>);

        let start = chrono::Utc::now();
        let clock = Arc::new(VirtualClock::at(start));
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let scheduler = Scheduler::with_clock(store, Arc::new(factory), SchedulerConfig::default(), clock);

        let job = JobDetail::new(JobKey::new("j1"), "counting");
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
        );
        scheduler.schedule_job(job, trigger).await.unwrap();
        scheduler.start().await;

        for _ in 0..50 {
            if count.load(Ordering::SeqCst) > 0 {
                break;
            }
            sleep(TokioDuration::from_millis(20)).await;
        }
        scheduler.shutdown(true).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn schedule_trigger_attaches_to_an_already_scheduled_job() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let scheduler = Scheduler::new(store.clone(), Arc::new(RegistryJobFactory::new()), SchedulerConfig::default());
        store.store_job(JobDetail::new(JobKey::new("j1"), "counting"), false).await.unwrap();

        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
        );
        let stored = scheduler.schedule_trigger(trigger).await.unwrap();
        assert_eq!(stored.next_fire_time, Some(start));
    }

    #[tokio::test]
    async fn ignore_misfire_policy_fires_the_stale_instant_instead_of_skipping_it() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut factory = RegistryJobFactory::new();
        let counted = count.clone();
        factory.register("counting", move || Arc::new(CountingJob(counted.clone())) as Arc<dyn ExecutableJob>);

        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let clock = Arc::new(VirtualClock::at(start));
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let scheduler = Scheduler::with_clock(store, Arc::new(factory), SchedulerConfig::default(), clock.clone());

        let job = JobDetail::new(JobKey::new("j1"), "counting");
        let mut trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
        );
        trigger.misfire_instruction = crate::domain::value_objects::misfire::MisfireInstruction::IgnoreMisfirePolicy;
        scheduler.schedule_job(job, trigger).await.unwrap();

        // Past the default 60s misfire threshold; a policy-aware trigger
        // would normally get rewritten and skipped instead of firing.
        clock.advance(chrono::Duration::milliseconds(120_000));
        scheduler.start().await;

        for _ in 0..50 {
            if count.load(Ordering::SeqCst) > 0 {
                break;
            }
            sleep(TokioDuration::from_millis(20)).await;
        }
        scheduler.shutdown(true).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    struct DataMutatingJob;

    #[async_trait]
    impl ExecutableJob for DataMutatingJob {
        async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), crate::domain::error::JobExecutionError> {
            ctx.job_data_map.put("last_run", ctx.fire_time.to_rfc3339());
            Ok(())
        }
    }

    #[tokio::test]
    async fn persist_data_after_execution_writes_mutated_job_data_back_to_the_store() {
        let mut factory = RegistryJobFactory::new();
        factory.register("mutating", || Arc::new(DataMutatingJob) as Arc<dyn ExecutableJob>);

        let start: chrono::DateTime<chrono::Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let clock = Arc::new(VirtualClock::at(start));
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let scheduler = Scheduler::with_clock(store.clone(), Arc::new(factory), SchedulerConfig::default(), clock);

        let mut job = JobDetail::new(JobKey::new("j1"), "mutating");
        job.persist_data_after_execution = true;
        let trigger = Trigger::new(
            TriggerKey::new("t1"),
            JobKey::new("j1"),
            start,
            TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
        );
        scheduler.schedule_job(job, trigger).await.unwrap();
        scheduler.start().await;

        let mut persisted = false;
        for _ in 0..50 {
            if let Some(j) = store.retrieve_job(&JobKey::new("j1")).await.unwrap() {
                if j.job_data_map.contains_key("last_run") {
                    persisted = true;
                    break;
                }
            }
            sleep(TokioDuration::from_millis(20)).await;
        }
        scheduler.shutdown(true).await;
        assert!(persisted);
    }
}
