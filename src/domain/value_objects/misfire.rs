//! Misfire instructions and the post-execution completion instructions a
//! worker hands back to the engine.

use serde::{Deserialize, Serialize};

/// Misfire instruction, variant-scoped. `SmartPolicy` and
/// `IgnoreMisfirePolicy` apply to every trigger variant; the rest are
/// variant-specific. Applying one to the wrong kind of trigger isn't
/// rejected — it silently falls through to that variant's catch-all
/// handling (cron/calendar-interval/daily-time-interval treat it like
/// `DoNothing`; simple treats it as a no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MisfireInstruction {
    SmartPolicy,
    IgnoreMisfirePolicy,

    // Simple trigger only.
    FireNow,
    RescheduleNowWithExistingRepeatCount,
    RescheduleNowWithRemainingRepeatCount,
    RescheduleNextWithRemainingCount,
    RescheduleNextWithExistingCount,

    // Cron / calendar-interval / daily-time-interval triggers.
    FireOnceNow,
    DoNothing,
}

impl Default for MisfireInstruction {
    fn default() -> Self {
        MisfireInstruction::SmartPolicy
    }
}

/// What the worker asks the engine to do once a job execution has
/// finished, folding in the job's `JobExecutionError` (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionInstruction {
    Noop,
    ReExecuteJob,
    SetTriggerComplete,
    DeleteTrigger,
    SetAllJobTriggersComplete,
    SetTriggerError,
    SetAllJobTriggersError,
}
