use super::Calendar;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use std::collections::HashSet;
use std::sync::Arc;

/// Excludes a fixed set of weekdays.
#[derive(Debug, Clone)]
pub struct WeeklyCalendar {
    excluded: HashSet<Weekday>,
    base: Option<Arc<dyn Calendar>>,
}

impl WeeklyCalendar {
    pub fn excluding(days: Vec<Weekday>) -> Self {
        Self { excluded: days.into_iter().collect(), base: None }
    }

    pub fn with_base(days: Vec<Weekday>, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { excluded: days.into_iter().collect(), base }
    }
}

impl Calendar for WeeklyCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        !self.excluded.contains(&t.weekday())
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = t;
        for _ in 0..8 {
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
