use super::Calendar;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use std::sync::Arc;

/// Inclusion window within a single day, evaluated against UTC wall-clock
/// time; zone-correctness of the fire time itself is the trigger's
/// responsibility.
#[derive(Debug, Clone)]
pub struct DailyCalendar {
    start: NaiveTime,
    end: NaiveTime,
    base: Option<Arc<dyn Calendar>>,
}

impl DailyCalendar {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end, base: None }
    }

    pub fn with_base(start: NaiveTime, end: NaiveTime, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { start, end, base }
    }
}

impl Calendar for DailyCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        let tod = t.time();
        if self.start <= self.end {
            tod >= self.start && tod <= self.end
        } else {
            // Window wraps past midnight.
            tod >= self.start || tod <= self.end
        }
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if self.self_is_included(t) {
            return t;
        }
        let day_start = t.date_naive().and_time(self.start);
        let candidate = Utc.from_utc_datetime(&day_start);
        if candidate >= t {
            candidate
        } else {
            Utc.from_utc_datetime(&(t.date_naive() + Duration::days(1)).and_time(self.start))
        }
    }

    fn base(&self) -> Option<&Arc<dyn Calendar>> {
        self.base.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_excludes_outside_hours() {
        let cal = DailyCalendar::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        let morning = Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        assert!(!cal.is_time_included(morning));
        assert!(cal.is_time_included(noon));
    }

    #[test]
    fn next_included_rolls_to_window_start() {
        let cal = DailyCalendar::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        let late = Utc.with_ymd_and_hms(2026, 1, 5, 19, 0, 0).unwrap();
        let next = cal.next_included_time(late);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 6, 8, 0, 0).unwrap());
    }
}
