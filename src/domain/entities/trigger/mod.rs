//! The trigger family: a common header plus one of four schedule variants.

pub mod calendar_interval;
pub mod cron;
pub mod daily_time_interval;
pub mod simple;

pub use calendar_interval::{CalendarIntervalSchedule, IntervalUnit as CalendarIntervalUnit};
pub use cron::CronSchedule;
pub use daily_time_interval::{DailyTimeIntervalSchedule, IntervalUnit as DailyIntervalUnit};
pub use simple::{SimpleSchedule, REPEAT_INDEFINITELY};

use crate::domain::entities::calendar::Calendar;
use crate::domain::entities::keys::{JobKey, TriggerKey};
use crate::domain::value_objects::data_map::JobDataMap;
use crate::domain::value_objects::misfire::MisfireInstruction;
use chrono::{DateTime, Utc};

/// Default trigger priority; higher values win ties at the same fire time.
pub const DEFAULT_PRIORITY: i32 = 5;

/// The variant-specific schedule a trigger carries.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerSchedule {
    Simple(SimpleSchedule),
    Cron(CronSchedule),
    CalendarInterval(CalendarIntervalSchedule),
    DailyTimeInterval(DailyTimeIntervalSchedule),
}

/// A schedule bound to a job: common header fields plus a variant payload.
///
/// `next_fire_time`/`previous_fire_time`/`times_triggered`/`fire_instance_id`
/// are mutated by the engine as the trigger fires; everything else is set at
/// creation and only changes through an explicit reschedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub description: Option<String>,
    pub calendar_name: Option<String>,
    pub priority: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub misfire_instruction: MisfireInstruction,
    pub job_data_map: JobDataMap,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub fire_instance_id: Option<String>,
    pub times_triggered: u64,
    pub schedule: TriggerSchedule,
}

impl Trigger {
    pub fn new(key: TriggerKey, job_key: JobKey, start_time: DateTime<Utc>, schedule: TriggerSchedule) -> Self {
        Self {
            key,
            job_key,
            description: None,
            calendar_name: None,
            priority: DEFAULT_PRIORITY,
            start_time,
            end_time: None,
            misfire_instruction: MisfireInstruction::SmartPolicy,
            job_data_map: JobDataMap::new(),
            next_fire_time: None,
            previous_fire_time: None,
            fire_instance_id: None,
            times_triggered: 0,
            schedule,
        }
    }

    /// Computes and stores the first fire time, honoring `start_time` and an
    /// associated calendar.
    pub fn compute_first_fire_time(&mut self, calendar: Option<&dyn Calendar>) -> Option<DateTime<Utc>> {
        let first = match &self.schedule {
            TriggerSchedule::Simple(s) => s.compute_first_fire_time(self.start_time, self.end_time, calendar),
            TriggerSchedule::Cron(s) => s.compute_first_fire_time(self.start_time, self.end_time, calendar),
            TriggerSchedule::CalendarInterval(s) => s.compute_first_fire_time(self.start_time, self.end_time, calendar),
            TriggerSchedule::DailyTimeInterval(s) => s.compute_first_fire_time(self.start_time, self.end_time, calendar),
        };
        self.next_fire_time = first;
        first
    }

    /// Advances the trigger past its current `next_fire_time`: records
    /// `previous_fire_time`, bumps `times_triggered`, and recomputes
    /// `next_fire_time` (`None` once the schedule is exhausted).
    pub fn triggered(&mut self, calendar: Option<&dyn Calendar>) -> Option<DateTime<Utc>> {
        let Some(current) = self.next_fire_time else { return None };
        self.previous_fire_time = Some(current);
        self.times_triggered += 1;
        let next = match &mut self.schedule {
            TriggerSchedule::Simple(s) => s.triggered(current, calendar),
            TriggerSchedule::Cron(s) => s.triggered(current, self.end_time, calendar),
            TriggerSchedule::CalendarInterval(s) => s.triggered(current, self.end_time, calendar),
            TriggerSchedule::DailyTimeInterval(s) => s.triggered(current, self.end_time, calendar),
        };
        self.next_fire_time = next;
        next
    }

    pub fn may_fire_again(&self) -> bool {
        match &self.schedule {
            TriggerSchedule::Simple(s) => s.may_fire_again(),
            TriggerSchedule::Cron(s) => s.may_fire_again(),
            TriggerSchedule::CalendarInterval(s) => s.may_fire_again(),
            TriggerSchedule::DailyTimeInterval(s) => s.may_fire_again(),
        }
    }

    pub fn final_fire_time(&self) -> Option<DateTime<Utc>> {
        match &self.schedule {
            TriggerSchedule::Simple(s) => s.final_fire_time(self.start_time),
            TriggerSchedule::Cron(s) => s.final_fire_time(self.end_time),
            TriggerSchedule::CalendarInterval(s) => s.final_fire_time(self.end_time),
            TriggerSchedule::DailyTimeInterval(s) => s.final_fire_time(self.end_time),
        }
    }

    pub fn default_smart_policy(&self) -> MisfireInstruction {
        match &self.schedule {
            TriggerSchedule::Simple(s) => s.default_smart_policy(self.times_triggered),
            TriggerSchedule::Cron(s) => s.default_smart_policy(),
            TriggerSchedule::CalendarInterval(s) => s.default_smart_policy(),
            TriggerSchedule::DailyTimeInterval(s) => s.default_smart_policy(),
        }
    }

    /// Resolves this trigger's current `next_fire_time` in light of a
    /// detected misfire, applying `misfire_instruction` (resolving
    /// `SmartPolicy` per the variant's own table).
    pub fn apply_misfire(&mut self, now: DateTime<Utc>, calendar: Option<&dyn Calendar>) {
        let instruction = self.misfire_instruction;
        let current = self.next_fire_time.unwrap_or(now);
        let times_triggered = self.times_triggered;
        let start_time = self.start_time;
        let end_time = self.end_time;
        let next = match &mut self.schedule {
            TriggerSchedule::Simple(s) => {
                s.apply_misfire(instruction, current, now, start_time, end_time, times_triggered, calendar)
            }
            TriggerSchedule::Cron(s) => s.apply_misfire(instruction, current, now, start_time, end_time, calendar),
            TriggerSchedule::CalendarInterval(s) => s.apply_misfire(instruction, current, now, end_time, calendar),
            TriggerSchedule::DailyTimeInterval(s) => s.apply_misfire(instruction, current, now, end_time, calendar),
        };
        self.next_fire_time = next;
    }
}
