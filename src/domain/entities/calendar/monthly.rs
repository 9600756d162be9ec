use super::Calendar;
use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Excludes a fixed set of days-of-month (1-31). A day number beyond a
/// given month's length simply never excludes anything that month.
#[derive(Debug, Clone)]
pub struct MonthlyCalendar {
    excluded: HashSet<u32>,
    base: Option<Arc<dyn Calendar>>,
}

impl MonthlyCalendar {
    pub fn excluding(days: Vec<u32>) -> Self {
        Self { excluded: days.into_iter().collect(), base: None }
    }

    pub fn with_base(days: Vec<u32>, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { excluded: days.into_iter().collect(), base }
    }
}

impl Calendar for MonthlyCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        !self.excluded.contains(&t.day())
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = t;
        for _ in 0..32 {
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
