//! Calendar family: composable time-inclusion filters.
//!
//! Every variant carries an optional base calendar; the externally visible
//! predicate is the conjunction `self ∧ base`. A trigger holds a
//! `calendar_name` string, never a calendar pointer — the store is the sole
//! owner of `Arc<dyn Calendar>` values, looked up by name.

mod annual;
mod cron_calendar;
mod daily;
mod holiday;
mod monthly;
mod weekly;

pub use annual::AnnualCalendar;
pub use cron_calendar::CronCalendar;
pub use daily::DailyCalendar;
pub use holiday::HolidayCalendar;
pub use monthly::MonthlyCalendar;
pub use weekly::WeeklyCalendar;

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Bound on conjunction search iterations with a base calendar, so a
/// pathological combination (every candidate excluded by the other side)
/// terminates instead of looping forever.
const BASE_CONJUNCTION_BOUND: u32 = 2_000;

/// A time-inclusion predicate, optionally narrowed by a base calendar.
pub trait Calendar: Send + Sync + std::fmt::Debug {
    /// Whether `t` is included by this variant alone (ignoring `base`).
    fn self_is_included(&self, t: DateTime<Utc>) -> bool;

    /// Smallest `t' >= t` included by this variant alone (ignoring `base`).
    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc>;

    fn base(&self) -> Option<&Arc<dyn Calendar>> {
        None
    }

    /// `self ∧ base`.
    fn is_time_included(&self, t: DateTime<Utc>) -> bool {
        self.self_is_included(t) && self.base().map_or(true, |b| b.is_time_included(t))
    }

    /// Smallest `t' >= t` satisfying `self ∧ base`.
    fn next_included_time(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = self.self_next_included(t);
        if let Some(base) = self.base() {
            for _ in 0..BASE_CONJUNCTION_BOUND {
                if base.is_time_included(candidate) {
                    return candidate;
                }
                let base_candidate = base.next_included_time(candidate);
                let self_candidate = self.self_next_included(base_candidate);
                if self_candidate == candidate {
                    // Neither side can advance further; avoid spinning.
                    return self_candidate;
                }
                candidate = self_candidate;
            }
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn conjunction_of_two_calendars_excludes_either_sides_exclusions() {
        let base: Arc<dyn Calendar> = Arc::new(WeeklyCalendar::excluding(vec![chrono::Weekday::Sun]));
        let holiday = HolidayCalendar::with_base(vec![], Some(base));
        let sunday = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        assert!(!holiday.is_time_included(sunday));
    }
}
