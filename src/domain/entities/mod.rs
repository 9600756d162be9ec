pub mod calendar;
pub mod job;
pub mod keys;
pub mod trigger;

pub use job::JobDetail;
pub use keys::{JobKey, TriggerKey, DEFAULT_GROUP};
pub use trigger::{Trigger, TriggerSchedule};
