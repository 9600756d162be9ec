use super::Calendar;
use crate::infrastructure::parsers::cron_expression::CronExpression;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// A cron expression defines the included instants directly: `t` is
/// included iff it matches the expression at second resolution in `zone`.
#[derive(Debug, Clone)]
pub struct CronCalendar {
    expression: CronExpression,
    zone: Tz,
    base: Option<Arc<dyn Calendar>>,
}

impl CronCalendar {
    pub fn new(expression: CronExpression, zone: Tz) -> Self {
        Self { expression, zone, base: None }
    }

    pub fn with_base(expression: CronExpression, zone: Tz, base: Option<Arc<dyn Calendar>>) -> Self {
        Self { expression, zone, base }
    }
}

impl Calendar for CronCalendar {
    fn self_is_included(&self, t: DateTime<Utc>) -> bool {
        let local = self.zone.from_utc_datetime(&t.naive_utc());
        self.expression.matches_naive(local.naive_local())
    }

    fn self_next_included(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if self.self_is_included(t) {
            return t;
        }
        let local = self.zone.from_utc_datetime(&t.naive_utc()) - chrono::Duration::seconds(1);
        match self.expression.next_valid_after(local, self.zone) {
            Some(next) => next.with_timezone(&Utc),
            None => t,
        }
    }

    fn base(&self) -> Option<&Arc<dyn Calendar>> {
        self.base.as_ref()
    }
}
