//! End-to-end scheduling scenarios driven through the public `Scheduler`
//! surface, exercising the main loop, worker pool, and store together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tempo::application::engine::SchedulerConfig;
use tempo::domain::clock::VirtualClock;
use tempo::domain::entities::job::JobDetail;
use tempo::domain::entities::keys::{JobKey, TriggerKey};
use tempo::domain::entities::trigger::{REPEAT_INDEFINITELY, SimpleSchedule, Trigger, TriggerSchedule};
use tempo::domain::job_execution::{ExecutableJob, JobExecutionContext, RegistryJobFactory};
use tempo::domain::value_objects::trigger_state::TriggerState;
use tempo::{InMemoryJobStore, JobStore, Scheduler};
use async_trait::async_trait;

fn quick_config() -> SchedulerConfig {
    SchedulerConfig {
        idle_wait_ms: 15,
        ..SchedulerConfig::default()
    }
}

async fn poll_until(mut check: impl FnMut() -> bool, attempts: u32) -> bool {
    for _ in 0..attempts {
        if check() {
            return true;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    check()
}

struct CountingJob(Arc<AtomicUsize>);

#[async_trait]
impl ExecutableJob for CountingJob {
    async fn execute(&self, _ctx: &mut JobExecutionContext) -> Result<(), tempo::domain::error::JobExecutionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counting_factory(count: Arc<AtomicUsize>) -> RegistryJobFactory {
    let mut factory = RegistryJobFactory::new();
    factory.register("counting", move || Arc::new(CountingJob(count.clone())) as Arc<dyn ExecutableJob>);
    factory
}

/// Scenario 1: simple repeat fires start + 2 repeats, then completes.
#[tokio::test]
async fn simple_repeat_fires_exactly_repeat_count_plus_one_times() {
    let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(VirtualClock::at(start));
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let scheduler = Scheduler::with_clock(store.clone(), Arc::new(counting_factory(count.clone())), quick_config(), clock.clone());

    let job_key = JobKey::new("j1");
    let trigger_key = TriggerKey::new("t1");
    scheduler
        .schedule_job(
            JobDetail::new(job_key.clone(), "counting"),
            Trigger::new(trigger_key.clone(), job_key, start, TriggerSchedule::Simple(SimpleSchedule::new(1_000, 2))),
        )
        .await
        .unwrap();
    scheduler.start().await;

    for _ in 0..3 {
        assert!(poll_until(|| count.load(Ordering::SeqCst) > 0, 50).await);
        let fired = count.load(Ordering::SeqCst);
        clock.advance(chrono::Duration::milliseconds(1_000));
        poll_until(|| count.load(Ordering::SeqCst) > fired || fired == 3, 10).await;
    }

    scheduler.shutdown(true).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.get_trigger_state(&TriggerKey::new("t1")).await.unwrap(), TriggerState::Complete);
}

/// Scenario 4: a job marked `disallow_concurrent_execution` never runs two
/// triggers at once; the second is blocked until the first completes.
#[tokio::test]
async fn disallow_concurrent_execution_blocks_the_second_trigger() {
    let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(VirtualClock::at(start));
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let mut cfg = quick_config();
    cfg.max_batch_size = 10; // both same-instant triggers must land in one batch
    let scheduler = Scheduler::with_clock(store.clone(), Arc::new(counting_factory(count.clone())), cfg, clock.clone());

    let job_key = JobKey::new("j1");
    let mut job = JobDetail::new(job_key.clone(), "counting");
    job.disallow_concurrent_execution = true;
    scheduler
        .schedule_job(
            job,
            Trigger::new(TriggerKey::new("t1"), job_key.clone(), start, TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0))),
        )
        .await
        .unwrap();

    // Second trigger for the same job, same fire time.
    store
        .store_trigger(
            {
                let mut t = Trigger::new(
                    TriggerKey::new("t2"),
                    job_key.clone(),
                    start,
                    TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
                );
                t.next_fire_time = Some(start);
                t
            },
            false,
        )
        .await
        .unwrap();

    scheduler.start().await;
    assert!(poll_until(|| count.load(Ordering::SeqCst) > 0, 50).await);
    scheduler.shutdown(true).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    let t1_state = scheduler.get_trigger_state(&TriggerKey::new("t1")).await.unwrap();
    let t2_state = scheduler.get_trigger_state(&TriggerKey::new("t2")).await.unwrap();
    let states = [t1_state, t2_state];
    assert!(states.contains(&TriggerState::Complete));
    assert!(states.iter().any(|s| *s == TriggerState::Waiting || *s == TriggerState::Blocked));
}

/// Scenario 5: rescheduling a trigger to an earlier fire time wakes the
/// main loop rather than waiting out the original deadline.
#[tokio::test]
async fn reschedule_wakes_the_main_loop_before_the_original_deadline() {
    let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let clock = Arc::new(VirtualClock::at(start));
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let mut config = quick_config();
    config.idle_wait_ms = 60_000; // deliberately long; only a wake should unblock it
    let scheduler = Scheduler::with_clock(store.clone(), Arc::new(counting_factory(count.clone())), config, clock.clone());

    let job_key = JobKey::new("j1");
    scheduler
        .schedule_job(
            JobDetail::new(job_key.clone(), "counting"),
            Trigger::new(
                TriggerKey::new("t1"),
                job_key,
                start,
                TriggerSchedule::Simple(SimpleSchedule::new(60_000, 0)),
            ),
        )
        .await
        .unwrap();

    // Push the trigger's fire time out, then start the loop, then bring it
    // back in via a reschedule — the loop must not be sleeping on the stale
    // far-future deadline.
    let mut far = store.retrieve_trigger(&TriggerKey::new("t1")).await.unwrap().unwrap();
    far.next_fire_time = Some(start + chrono::Duration::seconds(3600));
    store.store_trigger(far, true).await.unwrap();

    scheduler.start().await;
    tokio::time::sleep(StdDuration::from_millis(30)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    let mut soon = store.retrieve_trigger(&TriggerKey::new("t1")).await.unwrap().unwrap();
    soon.next_fire_time = Some(start);
    scheduler.reschedule_trigger(&TriggerKey::new("t1"), soon).await.unwrap();

    assert!(poll_until(|| count.load(Ordering::SeqCst) > 0, 50).await);
    scheduler.shutdown(true).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// Scenario 6: a weekly calendar excluding Sunday, paired with a 12h simple
/// repeat starting Saturday 18:00, skips both Sunday instants in one jump.
#[test]
fn calendar_exclusion_skips_the_excluded_weekday() {
    use tempo::domain::entities::calendar::{Calendar, WeeklyCalendar};
    use chrono::Weekday;

    let saturday_evening: DateTime<Utc> = "2026-01-03T18:00:00Z".parse().unwrap(); // a Saturday
    let calendar: Arc<dyn Calendar> = Arc::new(WeeklyCalendar::excluding(vec![Weekday::Sun]));

    let mut trigger = Trigger::new(
        TriggerKey::new("t1"),
        JobKey::new("j1"),
        saturday_evening,
        TriggerSchedule::Simple(SimpleSchedule::new(12 * 60 * 60 * 1_000, REPEAT_INDEFINITELY)),
    );
    assert_eq!(trigger.compute_first_fire_time(Some(calendar.as_ref())), Some(saturday_evening));

    let next = trigger.triggered(Some(calendar.as_ref()));
    let expected_monday: DateTime<Utc> = "2026-01-05T06:00:00Z".parse().unwrap();
    assert_eq!(next, Some(expected_monday));
}
