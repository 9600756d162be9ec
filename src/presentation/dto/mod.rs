pub mod scheduler_run_summary;

pub use scheduler_run_summary::{SchedulerRunSummary, TriggerSummary};
