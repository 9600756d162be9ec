//! Cron trigger: schedule driven by a parsed cron expression in a fixed zone.

use crate::domain::entities::calendar::Calendar;
use crate::domain::value_objects::misfire::MisfireInstruction;
use crate::infrastructure::parsers::cron_expression::CronExpression;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq)]
pub struct CronSchedule {
    pub expression: CronExpression,
    pub zone: Tz,
}

impl CronSchedule {
    pub fn new(expression: CronExpression, zone: Tz) -> Self {
        Self { expression, zone }
    }

    fn raw_next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = self.zone.from_utc_datetime(&after.naive_utc());
        self.expression.next_valid_after(local, self.zone).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn compute_first_fire_time(
        &self,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        self.fire_time_after(start_time - chrono::Duration::seconds(1), start_time, end_time, calendar)
    }

    pub fn fire_time_after(
        &self,
        after: DateTime<Utc>,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        let floor = after.max(start_time - chrono::Duration::seconds(1));
        let mut candidate = self.raw_next_after(floor)?;
        if let Some(cal) = calendar {
            for _ in 0..1000 {
                if cal.is_time_included(candidate) {
                    break;
                }
                candidate = self.raw_next_after(candidate)?;
            }
        }
        match end_time {
            Some(end) if candidate > end => None,
            _ => Some(candidate),
        }
    }

    pub fn triggered(
        &self,
        current: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        self.fire_time_after(current, current, end_time, calendar)
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

    /// Resolves `SmartPolicy` first, then applies the instruction.
    ///
    /// `current` is the trigger's own (stale) `next_fire_time` before this
    /// misfire was detected; `IgnoreMisfirePolicy` returns it unchanged so
    /// the engine fires it as-is and lets the ordinary post-fire advance
    /// step through each missed instant in turn.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_misfire(
        &self,
        instruction: MisfireInstruction,
        current: DateTime<Utc>,
        now: DateTime<Utc>,
        start_time: DateTime<Utc>,
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
            MisfireInstruction::DoNothing => self.fire_time_after(now, start_time, end_time, calendar),
            _ => self.fire_time_after(now, start_time, end_time, calendar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    #[test]
    fn first_fire_time_skips_to_next_boundary() {
        let expr = CronExpression::parse("0 0 9 ? * MON-FRI").unwrap();
        let sched = CronSchedule::new(expr, UTC);
        let start: DateTime<Utc> = "2026-01-02T08:59:50Z".parse().unwrap();
        let first = sched.compute_first_fire_time(start, None, None).unwrap();
        assert_eq!(first, "2026-01-02T09:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn do_nothing_misfire_skips_missed_instants() {
        let expr = CronExpression::parse("*/5 * * * * ?").unwrap();
        let sched = CronSchedule::new(expr, UTC);
        let missed: DateTime<Utc> = "2026-01-02T09:00:00Z".parse().unwrap();
        let resumed_at: DateTime<Utc> = "2026-01-02T09:00:31Z".parse().unwrap();
        let next = sched
            .apply_misfire(MisfireInstruction::DoNothing, missed, resumed_at, missed, None, None)
            .unwrap();
        assert_eq!(next, "2026-01-02T09:00:35Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn ignore_misfire_policy_returns_the_stale_fire_time_unchanged() {
        let expr = CronExpression::parse("*/5 * * * * ?").unwrap();
        let sched = CronSchedule::new(expr, UTC);
        let missed: DateTime<Utc> = "2026-01-02T09:00:00Z".parse().unwrap();
        let resumed_at: DateTime<Utc> = "2026-01-02T09:00:31Z".parse().unwrap();
        let next = sched.apply_misfire(MisfireInstruction::IgnoreMisfirePolicy, missed, resumed_at, missed, None, None);
        assert_eq!(next, Some(missed));
    }
}
