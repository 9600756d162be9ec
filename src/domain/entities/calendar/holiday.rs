use super::Calendar;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Excludes a fixed set of specific calendar days.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    excluded: HashSet<NaiveDate>,
    base: Option<Arc<dyn Calendar>>,
}

impl HolidayCalendar {
    pub fn excluding(days: Vec<NaiveDate>) -> Self {
        Self { excluded: days.into_iter().collect(), base: None }
    }

    pub fn with_base(days: Vec<NaiveDate>, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { excluded: days.into_iter().collect(), base }
    }
}

impl Calendar for HolidayCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        !self.excluded.contains(&t.date_naive())
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = t;
        for _ in 0..(self.excluded.len() as u32 + 2) {
            if self.self_is_included(candidate) {
                return candidate;
            }
            candidate += Duration::days(1);
        }
        candidate
    }

    fn base(&self) -> Option<&Arc<dyn Calendar>> {
        self.base.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn specific_holiday_excluded() {
        let christmas = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        let cal = HolidayCalendar::excluding(vec![christmas]);
        let t = Utc.with_ymd_and_hms(2026, 12, 25, 9, 0, 0).unwrap();
        assert!(!cal.is_time_included(t));
        assert_eq!(cal.next_included_time(t).date_naive().day(), 26);
    }
}
