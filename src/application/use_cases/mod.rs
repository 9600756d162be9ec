pub mod reschedule_trigger;
pub mod schedule_job;
pub mod schedule_trigger;
pub mod trigger_now;
pub mod unschedule_trigger;

pub use reschedule_trigger::RescheduleTrigger;
pub use schedule_job::ScheduleJob;
pub use schedule_trigger::ScheduleTrigger;
pub use trigger_now::TriggerNow;
pub use unschedule_trigger::UnscheduleTrigger;
