//! Simple trigger: fixed repeat interval, finite or indefinite repeat count.

use crate::domain::entities::calendar::Calendar;
use crate::domain::value_objects::misfire::MisfireInstruction;
use chrono::{DateTime, Duration, Utc};

/// `-1` means fire indefinitely.
pub const REPEAT_INDEFINITELY: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSchedule {
    pub repeat_interval_ms: i64,
    pub repeat_count: i32,
    /// How many times this trigger has already repeated (distinct from the
    /// trigger-wide `times_triggered`, which also counts the first fire).
    pub times_repeated: i32,
}

impl SimpleSchedule {
    pub fn new(repeat_interval_ms: i64, repeat_count: i32) -> Self {
        Self { repeat_interval_ms, repeat_count, times_repeated: 0 }
    }

    pub fn may_fire_again(&self) -> bool {
        self.repeat_count == REPEAT_INDEFINITELY || self.times_repeated < self.repeat_count
    }

    pub fn final_fire_time(&self, start_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.repeat_count == REPEAT_INDEFINITELY {
            return None;
        }
        Some(start_time + Duration::milliseconds(self.repeat_interval_ms * self.repeat_count as i64))
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

    /// Advance past `after` by whole repeat intervals.
    pub fn fire_time_after(
        &self,
        after: DateTime<Utc>,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        times_triggered: u64,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        if self.repeat_count != REPEAT_INDEFINITELY && times_triggered as i64 > self.repeat_count as i64 {
            return None;
        }
        if self.repeat_interval_ms <= 0 {
            return None;
        }
        let elapsed = (after - start_time).num_milliseconds().max(0);
        let intervals_elapsed = elapsed / self.repeat_interval_ms + 1;
        let candidate = start_time + Duration::milliseconds(intervals_elapsed * self.repeat_interval_ms);
        let candidate = match calendar {
            Some(cal) => cal.next_included_time(candidate),
            None => candidate,
        };
        within_end(candidate, end_time)
    }

    /// Advances past any calendar-excluded instants, consumes one repeat.
    pub fn triggered(&mut self, current: DateTime<Utc>, calendar: Option<&dyn Calendar>) -> Option<DateTime<Utc>> {
        self.times_repeated += 1;
        if !self.may_fire_again() {
            return None;
        }
        let candidate = current + Duration::milliseconds(self.repeat_interval_ms);
        Some(match calendar {
            Some(cal) => cal.next_included_time(candidate),
            None => candidate,
        })
    }

    pub fn default_smart_policy(&self, times_triggered: u64) -> MisfireInstruction {
        if self.repeat_count == 0 {
            return MisfireInstruction::FireNow;
        }
        if self.repeat_count == REPEAT_INDEFINITELY || self.remaining(times_triggered) > 0 {
            if times_triggered == 0 {
                MisfireInstruction::FireNow
            } else {
                MisfireInstruction::RescheduleNowWithExistingRepeatCount
            }
        } else {
            MisfireInstruction::RescheduleNextWithRemainingCount
        }
    }

    pub fn remaining(&self, times_triggered: u64) -> i32 {
        if self.repeat_count == REPEAT_INDEFINITELY {
            REPEAT_INDEFINITELY
        } else {
            (self.repeat_count + 1 - times_triggered as i32).max(0)
        }
    }

    /// Resolves `SmartPolicy` first, then applies the instruction.
    ///
    /// `current` is the trigger's own (stale) `next_fire_time` before this
    /// misfire was detected; `IgnoreMisfirePolicy` returns it unchanged so
    /// the engine fires it as-is and lets the ordinary post-fire advance
    /// step through each missed instant in turn.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_misfire(
        &mut self,
        instruction: MisfireInstruction,
        current: DateTime<Utc>,
        now: DateTime<Utc>,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        times_triggered: u64,
        calendar: Option<&dyn Calendar>,
    ) -> Option<DateTime<Utc>> {
        let resolved = match instruction {
            MisfireInstruction::SmartPolicy => self.default_smart_policy(times_triggered),
            other => other,
        };
        match resolved {
            MisfireInstruction::IgnoreMisfirePolicy => Some(current),
            MisfireInstruction::FireNow => Some(now),
            MisfireInstruction::RescheduleNowWithExistingRepeatCount => Some(now),
            MisfireInstruction::RescheduleNowWithRemainingRepeatCount => {
                self.repeat_count = self.remaining(times_triggered);
                self.times_repeated = 0;
                Some(now)
            }
            MisfireInstruction::RescheduleNextWithRemainingCount => {
                self.repeat_count = self.remaining(times_triggered);
                self.times_repeated = 0;
                self.fire_time_after(now, start_time, end_time, times_triggered, calendar)
            }
            MisfireInstruction::RescheduleNextWithExistingCount => {
                self.fire_time_after(now, start_time, end_time, times_triggered, calendar)
            }
            _ => None,
        }
    }
}

fn within_end(candidate: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match end_time {
        Some(end) if candidate > end => None,
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_count_bounds_total_firings() {
        let mut s = SimpleSchedule::new(1_000, 2);
        assert!(s.may_fire_again());
        let t0: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        assert!(s.triggered(t0, None).is_some()); // 1st repeat
        assert!(s.triggered(t0 + Duration::seconds(1), None).is_some()); // 2nd repeat
        assert!(!s.may_fire_again());
        assert!(s.triggered(t0 + Duration::seconds(2), None).is_none());
    }

    #[test]
    fn indefinite_repeat_never_exhausts() {
        let s = SimpleSchedule::new(1_000, REPEAT_INDEFINITELY);
        assert!(s.may_fire_again());
        assert!(s.final_fire_time("2026-01-01T00:00:00Z".parse().unwrap()).is_none());
    }

    #[test]
    fn ignore_misfire_policy_returns_the_stale_fire_time_unchanged() {
        let mut s = SimpleSchedule::new(1_000, REPEAT_INDEFINITELY);
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let stale = start + Duration::seconds(5);
        let now = start + Duration::seconds(120);
        let next = s.apply_misfire(MisfireInstruction::IgnoreMisfirePolicy, stale, now, start, None, 5, None);
        assert_eq!(next, Some(stale));
    }

    #[test]
    fn reschedule_next_with_remaining_count_advances_to_a_future_instant() {
        let mut s = SimpleSchedule::new(1_000, 10);
        let expected_remaining = s.remaining(5);
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let stale = start + Duration::seconds(5);
        let now = start + Duration::seconds(5) + Duration::milliseconds(500);
        let next = s.apply_misfire(
            MisfireInstruction::RescheduleNextWithRemainingCount,
            stale,
            now,
            start,
            None,
            5,
            None,
        );
        assert!(next.is_some_and(|t| t > now));
        assert_eq!(s.repeat_count, expected_remaining);
        assert_eq!(s.times_repeated, 0);
    }
}
