//! Calendar-interval trigger: fires every N calendar units (seconds through
//! years), zone-aware for the day-and-larger units.

use crate::domain::entities::calendar::Calendar;
use crate::domain::value_objects::misfire::MisfireInstruction;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarIntervalSchedule {
    pub interval: i64,
    pub unit: IntervalUnit,
    pub zone: Tz,
    pub preserve_hour_across_dst: bool,
    pub skip_day_if_hour_missing: bool,
}

impl CalendarIntervalSchedule {
    pub fn new(interval: i64, unit: IntervalUnit, zone: Tz) -> Self {
        Self {
            interval,
            unit,
            zone,
            preserve_hour_across_dst: false,
            skip_day_if_hour_missing: false,
        }
    }

    pub fn compute_first_fire_time(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        let candidate = match calendar {
            Some(cal) => cal.next_included_time(start_time),
            None => start_time,
        };
        within_end(candidate, end_time)
    }

    pub fn fire_time_after(
        &self,
        after: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        let mut candidate = self.advance_once(after)?;
        if let Some(cal) = calendar {
            for _ in 0..1000 {
                if cal.is_time_included(candidate) {
                    break;
                }
                candidate = self.advance_once(candidate)?;
            }
        }
        within_end(candidate, end_time)
    }

    pub fn triggered(&self, current: DateTime<Utc>, end_time: Option<DateTime<Utc>>, calendar: Option<&dyn Calendar>) -> Option<DateTime<Utc>> {
        self.fire_time_after(current, end_time, calendar)
    }

    pub fn may_fire_again(&self) -> bool {
        true
    }

    pub fn final_fire_time(&self, end_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        end_time
    }

    pub fn default_smart_policy(&self) -> MisfireInstruction {
        MisfireInstruction::FireOnceNow
    }

    /// `current` is the trigger's own (stale) `next_fire_time` before this
    /// misfire was detected; `IgnoreMisfirePolicy` returns it unchanged so
    /// the engine fires it as-is and lets the ordinary post-fire advance
    /// step through each missed instant in turn.
    pub fn apply_misfire(
        &self,
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

    /// One interval forward from `after`: exact arithmetic for
    /// second/minute/hour; zone-aware calendar-field arithmetic for
    /// day/week/month/year, with DST correction when configured.
    fn advance_once(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.unit {
            IntervalUnit::Second => Some(after + Duration::seconds(self.interval)),
            IntervalUnit::Minute => Some(after + Duration::minutes(self.interval)),
            IntervalUnit::Hour => Some(after + Duration::hours(self.interval)),
            IntervalUnit::Day if !self.preserve_hour_across_dst => {
                Some(after + Duration::days(self.interval))
            }
            IntervalUnit::Week if !self.preserve_hour_across_dst => {
                Some(after + Duration::weeks(self.interval))
            }
            IntervalUnit::Day => self.advance_zoned_field(after, |d| d + Duration::days(self.interval)),
            IntervalUnit::Week => self.advance_zoned_field(after, |d| d + Duration::weeks(self.interval)),
            IntervalUnit::Month => self.advance_zoned_field(after, |d| {
                add_months(d, self.interval as i32)
            }),
            IntervalUnit::Year => self.advance_zoned_field(after, |d| {
                add_months(d, self.interval as i32 * 12)
            }),
        }
    }

    /// Advances the local wall-clock date via `step`, preserving
    /// hour/minute/second, then resolves back to a zoned instant. If the
    /// resulting wall-clock hour doesn't exist that day (DST gap) and
    /// `skip_day_if_hour_missing` is set, advances one additional interval;
    /// otherwise resolves to the first representable instant that day.
    fn advance_zoned_field(
        &self,
        after: DateTime<Utc>,
        step: impl Fn(NaiveDateTime) -> NaiveDateTime,
    ) -> Option<DateTime<Utc>> {
        let local = self.zone.from_utc_datetime(&after.naive_utc()).naive_local();
        let mut candidate = step(local);
        for _ in 0..8 {
            match self.zone.from_local_datetime(&candidate) {
                LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
                LocalResult::None => {
                    if self.skip_day_if_hour_missing {
                        candidate = step(candidate);
                    } else {
                        candidate += Duration::hours(1);
                    }
                }
            }
        }
        None
    }
}

fn within_end(candidate: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match end_time {
        Some(end) if candidate > end => None,
        _ => Some(candidate),
    }
}

/// Adds whole months, clamping the day-of-month into range (Jan 31 + 1
/// month -> Feb 28/29).
fn add_months(dt: NaiveDateTime, months: i32) -> NaiveDateTime {
    let total = dt.year() * 12 + dt.month() as i32 - 1 + months;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = dt.day().min(days_in_month(year, month));
    dt.with_day(1)
        .unwrap()
        .with_year(year)
        .unwrap()
        .with_month(month)
        .unwrap()
        .with_day(day)
        .unwrap()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid month");
    let first = chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    (next - first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::US::Eastern;
    use chrono_tz::UTC;

    #[test]
    fn month_interval_clamps_into_shorter_months() {
        let sched = CalendarIntervalSchedule::new(1, IntervalUnit::Month, UTC);
        let jan31: DateTime<Utc> = "2026-01-31T00:00:00Z".parse().unwrap();
        let feb = sched.fire_time_after(jan31, None, None).unwrap();
        assert_eq!(feb.date_naive(), "2026-02-28".parse().unwrap());
        let mar = sched.fire_time_after(feb, None, None).unwrap();
        assert_eq!(mar.date_naive(), "2026-03-31".parse().unwrap());
        let apr = sched.fire_time_after(mar, None, None).unwrap();
        assert_eq!(apr.date_naive(), "2026-04-30".parse().unwrap());
    }

    #[test]
    fn preserve_hour_across_spring_forward() {
        let mut sched = CalendarIntervalSchedule::new(1, IntervalUnit::Day, Eastern);
        sched.preserve_hour_across_dst = true;
        // 2026-03-08 is the US spring-forward date (2am -> 3am).
        let before: DateTime<Utc> = Eastern
            .with_ymd_and_hms(2026, 3, 7, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let next = sched.fire_time_after(before, None, None).unwrap();
        let local = next.with_timezone(&Eastern);
        assert_eq!(local.hour(), 9);
        assert_eq!(local.date_naive(), "2026-03-08".parse().unwrap());
    }

    #[test]
    fn ignore_misfire_policy_returns_the_stale_fire_time_unchanged() {
        let sched = CalendarIntervalSchedule::new(1, IntervalUnit::Day, UTC);
        let stale: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let now: DateTime<Utc> = "2026-01-05T00:00:00Z".parse().unwrap();
        let next = sched.apply_misfire(MisfireInstruction::IgnoreMisfirePolicy, stale, now, None, None);
        assert_eq!(next, Some(stale));
    }
}
