use super::Calendar;
use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Excludes a fixed set of (month, day) pairs, recurring every year.
#[derive(Debug, Clone)]
pub struct AnnualCalendar {
    excluded: HashSet<(u32, u32)>,
    base: Option<Arc<dyn Calendar>>,
}

impl AnnualCalendar {
    pub fn excluding(days: Vec<(u32, u32)>) -> Self {
        Self { excluded: days.into_iter().collect(), base: None }
    }

    pub fn with_base(days: Vec<(u32, u32)>, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { excluded: days.into_iter().collect(), base }
    }
}

impl Calendar for AnnualCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        !self.excluded.contains(&(t.month(), t.day()))
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let mut candidate = t;
        for _ in 0..370 {
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
