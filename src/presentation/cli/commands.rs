//! CLI command implementations: a demonstration run of the scheduling
//! engine, exercising the public `Scheduler` surface end to end.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::application::engine::{Scheduler, SchedulerConfig};
use crate::domain::entities::job::JobDetail;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::entities::trigger::{REPEAT_INDEFINITELY, SimpleSchedule, Trigger, TriggerSchedule};
use crate::domain::error::JobExecutionError;
use crate::domain::job_execution::{ExecutableJob, JobExecutionContext, RegistryJobFactory};
use crate::domain::repositories::job_store::JobStore;
use crate::domain::value_objects::matcher::Matcher;
use crate::infrastructure::repositories::InMemoryJobStore;
use crate::presentation::dto::SchedulerRunSummary;

struct LoggingJob {
    fire_count: Arc<AtomicUsize>,
}

#[async_trait]
impl ExecutableJob for LoggingJob {
    async fn execute(&self, ctx: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        let n = self.fire_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(job = %ctx.job_key, trigger = %ctx.trigger_key, fire = n, "demo job fired");
        Ok(())
    }
}

pub struct RunDemoCommand;

impl RunDemoCommand {
    pub async fn execute(duration_secs: u64, job_count: u32) -> Result<()> {
        info!("starting demo schedule of {} job(s) for {}s", job_count, duration_secs);

        let fire_count = Arc::new(AtomicUsize::new(0));
        let mut factory = RegistryJobFactory::new();
        let counted = fire_count.clone();
        factory.register("tempo::demo::LoggingJob", move || {
            Arc::new(LoggingJob { fire_count: counted.clone() }) as Arc<dyn ExecutableJob>
        });

        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let scheduler = Scheduler::new(store, Arc::new(factory), SchedulerConfig::default());

        for i in 0..job_count {
            let job_key = JobKey::with_group(format!("demo-job-{i}"), "DEMO");
            let job = JobDetail::new(job_key.clone(), "tempo::demo::LoggingJob");
            let trigger = Trigger::new(
                TriggerKey::with_group(format!("demo-trigger-{i}"), "DEMO"),
                job_key,
                chrono::Utc::now(),
                TriggerSchedule::Simple(SimpleSchedule::new(1_000, REPEAT_INDEFINITELY)),
            );
            scheduler.schedule_job(job, trigger).await?;
        }

        scheduler.start().await;
        tokio::time::sleep(std::time::Duration::from_secs(duration_secs)).await;
        scheduler.shutdown(true).await;

        let mut summary = SchedulerRunSummary {
            jobs_scheduled: job_count as usize,
            fires_observed: fire_count.load(Ordering::SeqCst),
            triggers: Vec::new(),
        };
        for key in scheduler.store().get_trigger_keys(&Matcher::group_equals("DEMO")).await? {
            if let Some(trigger) = scheduler.store().retrieve_trigger(&key).await? {
                let state = scheduler.get_trigger_state(&key).await?;
                summary.push_trigger(&key, &trigger.job_key, state, trigger.next_fire_time, trigger.times_triggered);
            }
        }

        Self::print_summary(&summary);
        Ok(())
    }

    fn print_summary(summary: &SchedulerRunSummary) {
        println!("\n{}", "=".repeat(72));
        println!("TEMPO SCHEDULER DEMO RUN SUMMARY");
        println!("{}", "=".repeat(72));
        println!("  Jobs scheduled:   {}", summary.jobs_scheduled);
        println!("  Fires observed:   {}", summary.fires_observed);
        println!("\n  Trigger states:");
        for t in &summary.triggers {
            println!(
                "    {} -> job {} | state {} | fired {}x | next {:?}",
                t.trigger_key, t.job_key, t.state, t.times_triggered, t.next_fire_time
            );
        }
        println!("{}", "=".repeat(72));
    }
}
