//! Listener fan-out: ordered listener lists, each gated by a matcher set
//! combined with OR, mutation-safe while a fire is in progress (listeners
//! are snapshotted with `Arc` before each notification round).

use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::error::JobExecutionError;
use crate::domain::job_execution::JobExecutionContext;
use crate::domain::value_objects::matcher::Matcher;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

/// Runs a listener call on its own task so a panic inside it unwinds there
/// instead of taking down the main loop. Logs and returns `None` on panic.
async fn guarded<F, Fut, T>(listener: &str, hook: &str, make_future: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(make_future()).await {
        Ok(value) => Some(value),
        Err(join_err) => {
            error!(listener, hook, error = %join_err, "listener panicked");
            None
        }
    }
}

#[async_trait]
pub trait JobListener: Send + Sync {
    fn name(&self) -> &str;
    async fn job_to_be_executed(&self, ctx: &JobExecutionContext) {
        let _ = ctx;
    }
    async fn job_execution_vetoed(&self, ctx: &JobExecutionContext) {
        let _ = ctx;
    }
    async fn job_was_executed(&self, ctx: &JobExecutionContext, error: Option<&JobExecutionError>) {
        let _ = (ctx, error);
    }
}

#[async_trait]
pub trait TriggerListener: Send + Sync {
    fn name(&self) -> &str;
    /// Returning `true` vetoes the fire; the engine treats this like a
    /// `job_execution_vetoed` notification and skips the job entirely.
    async fn vetoes_execution(&self, _ctx: &JobExecutionContext) -> bool {
        false
    }
    async fn trigger_fired(&self, ctx: &JobExecutionContext) {
        let _ = ctx;
    }
    async fn trigger_misfired(&self, trigger_key: &TriggerKey) {
        let _ = trigger_key;
    }
    async fn trigger_complete(&self, trigger_key: &TriggerKey) {
        let _ = trigger_key;
    }
}

#[async_trait]
pub trait SchedulerListener: Send + Sync {
    fn name(&self) -> &str;
    async fn job_scheduled(&self, job_key: &JobKey) {
        let _ = job_key;
    }
    async fn job_unscheduled(&self, job_key: &JobKey) {
        let _ = job_key;
    }
    async fn scheduler_started(&self) {}
    async fn scheduler_shutdown(&self) {}
}

struct Registered<L: ?Sized> {
    matchers: Vec<Matcher>,
    listener: Arc<L>,
}

fn job_matches(matchers: &[Matcher], key: &JobKey) -> bool {
    matchers.is_empty() || matchers.iter().any(|m| m.matches_job(key))
}

fn trigger_matches(matchers: &[Matcher], key: &TriggerKey) -> bool {
    matchers.is_empty() || matchers.iter().any(|m| m.matches_trigger(key))
}

#[derive(Default)]
pub struct ListenerManager {
    job_listeners: RwLock<Vec<Registered<dyn JobListener>>>,
    trigger_listeners: RwLock<Vec<Registered<dyn TriggerListener>>>,
    scheduler_listeners: RwLock<Vec<Arc<dyn SchedulerListener>>>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_job_listener(&self, listener: Arc<dyn JobListener>, matchers: Vec<Matcher>) {
        self.job_listeners.write().await.push(Registered { matchers, listener });
    }

    pub async fn add_trigger_listener(&self, listener: Arc<dyn TriggerListener>, matchers: Vec<Matcher>) {
        self.trigger_listeners.write().await.push(Registered { matchers, listener });
    }

    pub async fn add_scheduler_listener(&self, listener: Arc<dyn SchedulerListener>) {
        self.scheduler_listeners.write().await.push(listener);
    }

    /// Returns `true` if any trigger listener vetoes this fire.
    pub async fn notify_trigger_fired(&self, ctx: &JobExecutionContext) -> bool {
        let listeners: Vec<_> = self
            .trigger_listeners
            .read()
            .await
            .iter()
            .filter(|r| trigger_matches(&r.matchers, &ctx.trigger_key))
            .map(|r| r.listener.clone())
            .collect();
        let mut vetoed = false;
        for listener in &listeners {
            let name = listener.name().to_string();
            let l = listener.clone();
            let c = ctx.clone();
            let this_vetoes = guarded(&name, "vetoes_execution", move || async move { l.vetoes_execution(&c).await })
                .await
                .unwrap_or(false);
            if this_vetoes {
                vetoed = true;
            } else {
                let l = listener.clone();
                let c = ctx.clone();
                guarded(&name, "trigger_fired", move || async move { l.trigger_fired(&c).await }).await;
            }
        }
        vetoed
    }

    pub async fn notify_trigger_misfired(&self, key: &TriggerKey) {
        for r in self.trigger_listeners.read().await.iter().filter(|r| trigger_matches(&r.matchers, key)) {
            let l = r.listener.clone();
            let k = key.clone();
            guarded(r.listener.name(), "trigger_misfired", move || async move { l.trigger_misfired(&k).await }).await;
        }
    }

    pub async fn notify_trigger_complete(&self, key: &TriggerKey) {
        for r in self.trigger_listeners.read().await.iter().filter(|r| trigger_matches(&r.matchers, key)) {
            let l = r.listener.clone();
            let k = key.clone();
            guarded(r.listener.name(), "trigger_complete", move || async move { l.trigger_complete(&k).await }).await;
        }
    }

    pub async fn notify_job_to_be_executed(&self, ctx: &JobExecutionContext) {
        for r in self.job_listeners.read().await.iter().filter(|r| job_matches(&r.matchers, &ctx.job_key)) {
            let l = r.listener.clone();
            let c = ctx.clone();
            guarded(r.listener.name(), "job_to_be_executed", move || async move { l.job_to_be_executed(&c).await }).await;
        }
    }

    pub async fn notify_job_execution_vetoed(&self, ctx: &JobExecutionContext) {
        for r in self.job_listeners.read().await.iter().filter(|r| job_matches(&r.matchers, &ctx.job_key)) {
            let l = r.listener.clone();
            let c = ctx.clone();
            guarded(r.listener.name(), "job_execution_vetoed", move || async move { l.job_execution_vetoed(&c).await })
                .await;
        }
    }

    pub async fn notify_job_was_executed(&self, ctx: &JobExecutionContext, error: Option<&JobExecutionError>) {
        for r in self.job_listeners.read().await.iter().filter(|r| job_matches(&r.matchers, &ctx.job_key)) {
            let l = r.listener.clone();
            let c = ctx.clone();
            let e = error.cloned();
            guarded(r.listener.name(), "job_was_executed", move || async move { l.job_was_executed(&c, e.as_ref()).await })
                .await;
        }
    }

    pub async fn notify_job_scheduled(&self, key: &JobKey) {
        for listener in self.scheduler_listeners.read().await.iter() {
            let l = listener.clone();
            let k = key.clone();
            guarded(listener.name(), "job_scheduled", move || async move { l.job_scheduled(&k).await }).await;
        }
    }

    pub async fn notify_job_unscheduled(&self, key: &JobKey) {
        for listener in self.scheduler_listeners.read().await.iter() {
            let l = listener.clone();
            let k = key.clone();
            guarded(listener.name(), "job_unscheduled", move || async move { l.job_unscheduled(&k).await }).await;
        }
    }

    pub async fn notify_started(&self) {
        for listener in self.scheduler_listeners.read().await.iter() {
            let l = listener.clone();
            guarded(listener.name(), "scheduler_started", move || async move { l.scheduler_started().await }).await;
        }
    }

    pub async fn notify_shutdown(&self) {
        for listener in self.scheduler_listeners.read().await.iter() {
            let l = listener.clone();
            guarded(listener.name(), "scheduler_shutdown", move || async move { l.scheduler_shutdown().await }).await;
        }
    }
}
