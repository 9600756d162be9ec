//! Error taxonomy.
//!
//! User-job failures (`JobExecutionError`) never stop the main loop; they
//! are captured by the worker, reported to listeners, and translated into a
//! [`crate::domain::value_objects::misfire::CompletionInstruction`]. Every
//! other variant here is something a caller of the public API or the store
//! contract can legitimately hit.

use crate::domain::entities::keys::{JobKey, TriggerKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression at field {field} (position {position}): {reason}")]
    InvalidCronExpression {
        field: String,
        position: usize,
        reason: String,
    },

    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("job {job_key} failed during execution: {message}")]
    JobExecution {
        job_key: JobKey,
        message: String,
        #[source]
        source: Option<JobExecutionError>,
    },

    #[error("unable to interrupt job for trigger {trigger_key}")]
    UnableToInterruptJob { trigger_key: TriggerKey },

    #[error("invalid scheduler configuration: {0}")]
    SchedulerConfiguration(String),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] anyhow::Error),
}

impl SchedulerError {
    pub fn already_exists(what: impl Into<String>) -> Self {
        SchedulerError::ObjectAlreadyExists(what.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SchedulerError::ObjectNotFound(what.into())
    }
}

/// Raised by user job code. The three flags are mutually exclusive in
/// effect: `refire` dominates `unschedule_this` and `unschedule_all`.
#[derive(Debug, Clone, Default, Error)]
#[error("job execution failed (refire={refire}, unschedule_this={unschedule_this}, unschedule_all={unschedule_all}): {message}")]
pub struct JobExecutionError {
    pub message: String,
    pub refire: bool,
    pub unschedule_this: bool,
    pub unschedule_all: bool,
}

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn refire(mut self) -> Self {
        self.refire = true;
        self
    }

    pub fn unschedule_this(mut self) -> Self {
        self.unschedule_this = true;
        self
    }

    pub fn unschedule_all(mut self) -> Self {
        self.unschedule_all = true;
        self
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
