//! Daily time-interval trigger: repeats within a daily time-of-day window,
//! restricted to a configurable set of weekdays.

use crate::domain::entities::calendar::Calendar;
use crate::domain::value_objects::misfire::MisfireInstruction;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
}

impl IntervalUnit {
    fn to_duration(self, interval: i64) -> Duration {
        match self {
            IntervalUnit::Second => Duration::seconds(interval),
            IntervalUnit::Minute => Duration::minutes(interval),
            IntervalUnit::Hour => Duration::hours(interval),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTimeIntervalSchedule {
    pub interval: i64,
    pub unit: IntervalUnit,
    pub zone: Tz,
    pub start_time_of_day: NaiveTime,
    pub end_time_of_day: NaiveTime,
    pub days_of_week: HashSet<Weekday>,
    pub repeat_count: i32,
    pub times_repeated: i32,
}

pub const REPEAT_INDEFINITELY: i32 = -1;

impl DailyTimeIntervalSchedule {
    pub fn new(
        interval: i64,
        unit: IntervalUnit,
        zone: Tz,
        start_time_of_day: NaiveTime,
        end_time_of_day: NaiveTime,
        days_of_week: HashSet<Weekday>,
    ) -> Self {
        Self {
            interval,
            unit,
            zone,
            start_time_of_day,
            end_time_of_day,
            days_of_week,
            repeat_count: REPEAT_INDEFINITELY,
            times_repeated: 0,
        }
    }

    pub fn may_fire_again(&self) -> bool {
        self.repeat_count == REPEAT_INDEFINITELY || self.times_repeated < self.repeat_count
    }

    pub fn final_fire_time(&self, _end_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        None
    }

    pub fn default_smart_policy(&self) -> MisfireInstruction {
        MisfireInstruction::FireOnceNow
    }

    pub fn compute_first_fire_time(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        self.fire_time_after(start_time - Duration::seconds(1), end_time, calendar)
    }

    /// Advances past `after` by one interval, rolling into the next
    /// eligible day's window when the current day's window is exhausted or
    /// the weekday is excluded.
    pub fn fire_time_after(
        &self,
        after: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        if self.days_of_week.is_empty() {
            return None;
        }
        let local_after = after.with_timezone(&self.zone);
        let mut day = local_after.date_naive();
        let window_start_today = self.zone.from_local_datetime(&day.and_time(self.start_time_of_day)).single();

        let mut candidate_local = if local_after.time() < self.start_time_of_day || !self.days_of_week.contains(&local_after.weekday())
        {
            window_start_today
        } else {
            let stepped = local_after + self.unit.to_duration(self.interval);
            Some(stepped)
        };

        for _ in 0..400 {
            let Some(cand) = candidate_local else {
                day = day.succ_opt()?;
                candidate_local = self.zone.from_local_datetime(&day.and_time(self.start_time_of_day)).single();
                continue;
            };
            if !self.days_of_week.contains(&cand.weekday()) || cand.time() > self.end_time_of_day {
                day = cand.date_naive().succ_opt()?;
                candidate_local = self.zone.from_local_datetime(&day.and_time(self.start_time_of_day)).single();
                continue;
            }
            if cand.time() < self.start_time_of_day {
                candidate_local = self.zone.from_local_datetime(&cand.date_naive().and_time(self.start_time_of_day)).single();
                continue;
            }
            let candidate_utc = cand.with_timezone(&Utc);
            if let Some(cal) = calendar {
                if !cal.is_time_included(candidate_utc) {
                    candidate_local = Some(cand + self.unit.to_duration(self.interval));
                    continue;
                }
            }
            return within_end(candidate_utc, end_time);
        }
        None
    }

    pub fn triggered(
        &mut self,
        current: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        self.times_repeated += 1;
        if !self.may_fire_again() {
            return None;
        }
        self.fire_time_after(current, end_time, calendar)
    }

    /// `current` is the trigger's own (stale) `next_fire_time` before this
    /// misfire was detected; `IgnoreMisfirePolicy` returns it unchanged so
    /// the engine fires it as-is and lets the ordinary post-fire advance
    /// step through each missed instant in turn.
    pub fn apply_misfire(
        &mut self,
        instruction: MisfireInstruction,
        current: DateTime<Utc>,
        now: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        let resolved = match instruction {
            MisfireInstruction::SmartPolicy => self.default_smart_policy(),
            other => other,
        };
        match resolved {
            MisfireInstruction::IgnoreMisfirePolicy => Some(current),
            MisfireInstruction::FireOnceNow => Some(now),
            MisfireInstruction::DoNothing => self.fire_time_after(now, end_time, calendar),
            _ => self.fire_time_after(now, end_time, calendar),
        }
    }
}

fn within_end(candidate: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match end_time {
        Some(end) if candidate > end => None,
        _ => Some(candidate),
    }
}
