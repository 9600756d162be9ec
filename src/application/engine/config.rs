//! Scheduler tuning knobs, overridable via environment for the CLI
//! demonstrator (see `presentation::cli`).

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub instance_name: String,
    pub instance_id: String,
    /// Upper bound on concurrently executing jobs.
    pub thread_pool_size: usize,
    /// How far past `no_later_than` the store may look when batching an
    /// acquire, so nearly-simultaneous triggers can be claimed together.
    pub batch_time_window_ms: i64,
    pub max_batch_size: usize,
    /// A trigger whose `next_fire_time` is older than this when acquired
    /// counts as misfired.
    pub misfire_threshold_ms: i64,
    /// How long the main loop sleeps when the store has nothing due,
    /// absent an earlier wake from a reschedule.
    pub idle_wait_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instance_name: "tempo-scheduler".to_string(),
            instance_id: "NON_CLUSTERED".to_string(),
            thread_pool_size: 10,
            batch_time_window_ms: 0,
            max_batch_size: 1,
            misfire_threshold_ms: 60_000,
            idle_wait_ms: 30_000,
        }
    }
}
