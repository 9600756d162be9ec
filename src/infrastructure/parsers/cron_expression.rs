//! Cron expression parsing and fire-time computation.
//!
//! A 6 or 7 field expression: `second minute hour day-of-month month
//! day-of-week [year]`. Parsing builds a small structured representation
//! per field; [`CronExpression::next_valid_after`] advances field-by-field
//! from the most-significant mismatch (year → month → day → hour → minute
//! → second) rather than scanning second-by-second, so a query over a gap
//! of decades costs a handful of field bumps, not one iteration per second.

use crate::domain::error::SchedulerError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Weekday};
use chrono_tz::Tz;
use std::fmt;

/// Highest year `next_valid_after` will search into before giving up.
pub const MAX_YEAR: i32 = 2099;
const MIN_YEAR: i32 = 1970;
/// Guards against an unbounded loop if a field combination can never be
/// satisfied within a single year (e.g. `L-35` in day-of-month).
const SAFETY_ITERATIONS: u32 = 10_000;

const MONTH_NAMES: [(&str, u32); 12] = [
    ("JAN", 1), ("FEB", 2), ("MAR", 3), ("APR", 4), ("MAY", 5), ("JUN", 6),
    ("JUL", 7), ("AUG", 8), ("SEP", 9), ("OCT", 10), ("NOV", 11), ("DEC", 12),
];

/// 1 = Sunday.
const DOW_NAMES: [(&str, u32); 7] = [
    ("SUN", 1), ("MON", 2), ("TUE", 3), ("WED", 4), ("THU", 5), ("FRI", 6), ("SAT", 7),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct NumericField {
    /// Sorted, deduplicated allowed values within the field's domain.
    values: Vec<u32>,
}

impl NumericField {
    fn any(min: u32, max: u32) -> Self {
        NumericField { values: (min..=max).collect() }
    }

    fn contains(&self, v: u32) -> bool {
        self.values.binary_search(&v).is_ok()
    }

    /// Smallest allowed value >= `from`, if any.
    fn next_at_or_after(&self, from: u32) -> Option<u32> {
        self.values.iter().copied().find(|&v| v >= from)
    }

    fn min(&self) -> Option<u32> {
        self.values.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct DayOfMonthSpec {
    /// Plain days, ranges, and steps, expanded and unioned.
    days: Vec<u32>,
    last_day: bool,
    /// `L-k`: kth-to-last day of month.
    last_minus: Option<u32>,
    /// `LW`: last weekday of month.
    last_weekday: bool,
    /// `nW`: weekday nearest to day n.
    nearest_weekday: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct DayOfWeekSpec {
    /// Plain weekdays (1=Sun..7=Sat), ranges, and steps, expanded and unioned.
    weekdays: Vec<u32>,
    /// `n#k`: kth occurrence of weekday n in the month.
    nth: Vec<(u32, u32)>,
    /// `nL`: last occurrence of weekday n in the month.
    last: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DaySpec {
    /// `?` on this field: no constraint from this side.
    Unspecified,
    DayOfMonth(DayOfMonthSpec),
    DayOfWeek(DayOfWeekSpec),
}

/// A parsed cron expression. Retains the normalized source text so
/// `to_string` round-trips cheaply, modulo whitespace and case on keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    seconds: NumericField,
    minutes: NumericField,
    hours: NumericField,
    day: DaySpec,
    months: NumericField,
    years: Option<NumericField>,
    normalized: String,
}

impl CronExpression {
    pub fn parse(source: &str) -> Result<Self, SchedulerError> {
        let normalized = source.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let fields: Vec<&str> = normalized.split(' ').collect();
        if fields.len() != 6 && fields.len() != 7 {
            return Err(invalid("expression", 0, format!(
                "expected 6 or 7 whitespace-separated fields, got {}", fields.len()
            )));
        }

        let seconds = parse_numeric_field("second", fields[0], 0, 59, 0, None)?;
        let minutes = parse_numeric_field("minute", fields[1], 0, 59, 1, None)?;
        let hours = parse_numeric_field("hour", fields[2], 0, 23, 2, None)?;
        let dom_text = fields[3];
        let months = parse_numeric_field("month", fields[4], 1, 12, 4, Some(&MONTH_NAMES))?;
        let dow_text = fields[5];
        let years = if fields.len() == 7 {
            Some(parse_numeric_field("year", fields[6], MIN_YEAR as u32, MAX_YEAR as u32, 6, None)?)
        } else {
            None
        };

        let dom_is_q = dom_text == "?";
        let dow_is_q = dow_text == "?";
        if dom_is_q == dow_is_q {
            return Err(invalid(
                "day-of-month/day-of-week", 3,
                "exactly one of day-of-month or day-of-week must be '?'".to_string(),
            ));
        }
        let day = if dom_is_q {
            DaySpec::DayOfWeek(parse_day_of_week_field(dow_text)?)
        } else {
            DaySpec::DayOfMonth(parse_day_of_month_field(dom_text)?)
        };

        Ok(CronExpression { seconds, minutes, hours, day, months, years, normalized })
    }

    /// Smallest instant strictly after `after`, in `zone`, matching this
    /// expression; `None` if no such instant exists at or before
    /// [`MAX_YEAR`]. A wall-clock instant that does not exist in `zone`
    /// (a DST spring-forward gap) is never returned; an instant that
    /// occurs twice (a DST fall-back overlap) is returned at its first
    /// occurrence.
    pub fn next_valid_after(&self, after: DateTime<Tz>, zone: Tz) -> Option<DateTime<Tz>> {
        let mut floor = after.naive_local() + chrono::Duration::seconds(1);
        loop {
            let candidate = self.search_from(floor)?;
            match zone.from_local_datetime(&candidate) {
                chrono::LocalResult::Single(dt) => return Some(dt),
                chrono::LocalResult::Ambiguous(earliest, _) => return Some(earliest),
                chrono::LocalResult::None => {
                    floor = candidate + chrono::Duration::seconds(1);
                }
            }
        }
    }

    fn search_from(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut year = start.year();
        let mut month = start.month();
        let mut day = start.day();
        let mut hour = start.hour();
        let mut minute = start.minute();
        let mut second = start.second();

        for _ in 0..SAFETY_ITERATIONS {
            if year > MAX_YEAR {
                return None;
            }
            if let Some(ref years) = self.years {
                if !years.contains(year as u32) {
                    match years.next_at_or_after(year as u32 + 1) {
                        Some(y) => {
                            (year, month, day, hour, minute, second) = (y as i32, 1, 1, 0, 0, 0);
                        }
                        None => return None,
                    }
                    continue;
                }
            }

            if !self.months.contains(month) {
                match self.months.next_at_or_after(month + 1) {
                    Some(m) => {
                        (month, day, hour, minute, second) = (m, 1, 0, 0, 0);
                    }
                    None => {
                        year += 1;
                        (month, day, hour, minute, second) = (self.months.min().unwrap_or(1), 1, 0, 0, 0);
                    }
                }
                continue;
            }

            let dim = days_in_month(year, month);
            if day > dim {
                bump_month(&mut year, &mut month, &mut day, &mut hour, &mut minute, &mut second);
                continue;
            }
            if !self.day_matches(year, month, day, dim) {
                day += 1;
                hour = 0;
                minute = 0;
                second = 0;
                continue;
            }

            if !self.hours.contains(hour) {
                match self.hours.next_at_or_after(hour + 1) {
                    Some(h) => {
                        hour = h;
                        minute = 0;
                        second = 0;
                    }
                    None => {
                        day += 1;
                        hour = 0;
                        minute = 0;
                        second = 0;
                    }
                }
                continue;
            }

            if !self.minutes.contains(minute) {
                match self.minutes.next_at_or_after(minute + 1) {
                    Some(m) => {
                        minute = m;
                        second = 0;
                    }
                    None => {
                        hour += 1;
                        minute = 0;
                        second = 0;
                    }
                }
                continue;
            }

            if !self.seconds.contains(second) {
                match self.seconds.next_at_or_after(second + 1) {
                    Some(s) => second = s,
                    None => {
                        minute += 1;
                        second = 0;
                    }
                }
                continue;
            }

            return NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second);
        }
        None
    }

    /// Whether `dt` (a naive local wall-clock instant) itself satisfies
    /// every field of this expression. Used by [`crate::domain::entities::calendar::CronCalendar`],
    /// which treats the expression as an inclusion predicate rather than a
    /// fire-time generator.
    pub fn matches_naive(&self, dt: NaiveDateTime) -> bool {
        let (year, month, day, hour, minute, second) =
            (dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute(), dt.second());
        if let Some(ref years) = self.years {
            if !years.contains(year as u32) {
                return false;
            }
        }
        self.months.contains(month)
            && self.day_matches(year, month, day, days_in_month(year, month))
            && self.hours.contains(hour)
            && self.minutes.contains(minute)
            && self.seconds.contains(second)
    }

    fn day_matches(&self, year: i32, month: u32, day: u32, days_in_month: u32) -> bool {
        match &self.day {
            DaySpec::Unspecified => true,
            DaySpec::DayOfMonth(spec) => dom_matches(spec, year, month, day, days_in_month),
            DaySpec::DayOfWeek(spec) => dow_matches(spec, year, month, day, days_in_month),
        }
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

fn bump_month(year: &mut i32, month: &mut u32, day: &mut u32, hour: &mut u32, minute: &mut u32, second: &mut u32) {
    if *month == 12 {
        *month = 1;
        *year += 1;
    } else {
        *month += 1;
    }
    *day = 1;
    *hour = 0;
    *minute = 0;
    *second = 0;
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar month");
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month");
    (next - first).num_days() as u32
}

fn weekday_number(year: i32, month: u32, day: u32) -> u32 {
    // 1 = Sunday .. 7 = Saturday
    let wd = NaiveDate::from_ymd_opt(year, month, day).expect("valid day").weekday();
    match wd {
        Weekday::Sun => 1,
        Weekday::Mon => 2,
        Weekday::Tue => 3,
        Weekday::Wed => 4,
        Weekday::Thu => 5,
        Weekday::Fri => 6,
        Weekday::Sat => 7,
    }
}

fn dom_matches(spec: &DayOfMonthSpec, year: i32, month: u32, day: u32, dim: u32) -> bool {
    if spec.days.contains(&day) {
        return true;
    }
    if spec.last_day && day == dim {
        return true;
    }
    if let Some(k) = spec.last_minus {
        if k < dim && day == dim - k {
            return true;
        }
    }
    if spec.last_weekday && day == last_weekday_of_month(year, month, dim) {
        return true;
    }
    if let Some(n) = spec.nearest_weekday {
        if n >= 1 && n <= dim && day == nearest_weekday(year, month, n, dim) {
            return true;
        }
    }
    false
}

fn dow_matches(spec: &DayOfWeekSpec, year: i32, month: u32, day: u32, dim: u32) -> bool {
    let wd = weekday_number(year, month, day);
    if spec.weekdays.contains(&wd) {
        return true;
    }
    let occurrence = (day - 1) / 7 + 1;
    for &(w, n) in &spec.nth {
        if w == wd && occurrence == n {
            return true;
        }
    }
    for &w in &spec.last {
        if w == wd && day + 7 > dim {
            return true;
        }
    }
    false
}

/// The last weekday (Mon-Fri) of the month, per the `LW` token.
fn last_weekday_of_month(year: i32, month: u32, dim: u32) -> u32 {
    match weekday_number(year, month, dim) {
        7 => dim - 1, // Saturday -> Friday
        1 => dim - 2, // Sunday -> Friday
        _ => dim,
    }
}

/// The weekday nearest to day `n`, never crossing a month boundary.
fn nearest_weekday(year: i32, month: u32, n: u32, dim: u32) -> u32 {
    match weekday_number(year, month, n) {
        7 => if n == 1 { n + 2 } else { n - 1 },      // Saturday
        1 => if n == dim { n.saturating_sub(2) } else { n + 1 }, // Sunday
        _ => n,
    }
}

fn invalid(field: &str, position: usize, reason: String) -> SchedulerError {
    SchedulerError::InvalidCronExpression { field: field.to_string(), position, reason }
}

fn parse_numeric_field(
    name: &str,
    text: &str,
    min: u32,
    max: u32,
    position: usize,
    names: Option<&[(&str, u32)]>,
) -> Result<NumericField, SchedulerError> {
    if text == "*" {
        return Ok(NumericField::any(min, max));
    }
    let mut values = Vec::new();
    for token in text.split(',') {
        values.extend(parse_token(name, token, min, max, position, names)?);
    }
    if values.is_empty() {
        return Err(invalid(name, position, "field has no valid values".to_string()));
    }
    values.sort_unstable();
    values.dedup();
    Ok(NumericField { values })
}

fn resolve_name(name: &str, token: &str, names: Option<&[(&str, u32)]>, min: u32, max: u32, position: usize) -> Result<u32, SchedulerError> {
    if let Ok(n) = token.parse::<u32>() {
        if n < min || n > max {
            return Err(invalid(name, position, format!("{n} out of range [{min}, {max}]")));
        }
        return Ok(n);
    }
    if let Some(names) = names {
        if let Some((_, v)) = names.iter().find(|(n, _)| *n == token) {
            return Ok(*v);
        }
    }
    Err(invalid(name, position, format!("'{token}' is not a valid value")))
}

fn parse_token(
    name: &str,
    token: &str,
    min: u32,
    max: u32,
    position: usize,
    names: Option<&[(&str, u32)]>,
) -> Result<Vec<u32>, SchedulerError> {
    // a/n or */n : step
    if let Some((base, step)) = token.split_once('/') {
        let step: u32 = step.parse().map_err(|_| invalid(name, position, format!("invalid step '{step}'")))?;
        if step == 0 {
            return Err(invalid(name, position, "step cannot be zero".to_string()));
        }
        let (start, end) = if base == "*" {
            (min, max)
        } else if let Some((a, b)) = base.split_once('-') {
            (
                resolve_name(name, a, names, min, max, position)?,
                resolve_name(name, b, names, min, max, position)?,
            )
        } else {
            (resolve_name(name, base, names, min, max, position)?, max)
        };
        let mut out = Vec::new();
        let mut v = start;
        while v <= end {
            out.push(v);
            v += step;
        }
        return Ok(out);
    }
    // a-b : range
    if let Some((a, b)) = token.split_once('-') {
        let start = resolve_name(name, a, names, min, max, position)?;
        let end = resolve_name(name, b, names, min, max, position)?;
        if start <= end {
            return Ok((start..=end).collect());
        }
        // wrap-around range, e.g. FRI-MON
        let mut out: Vec<u32> = (start..=max).collect();
        out.extend(min..=end);
        return Ok(out);
    }
    Ok(vec![resolve_name(name, token, names, min, max, position)?])
}

fn parse_day_of_month_field(text: &str) -> Result<DayOfMonthSpec, SchedulerError> {
    if text == "*" {
        return Ok(DayOfMonthSpec { days: (1..=31).collect(), ..Default::default() });
    }
    let mut spec = DayOfMonthSpec::default();
    for token in text.split(',') {
        if token == "L" {
            spec.last_day = true;
        } else if token == "LW" {
            spec.last_weekday = true;
        } else if let Some(k) = token.strip_prefix("L-") {
            let k: u32 = k.parse().map_err(|_| invalid("day-of-month", 3, format!("invalid L-k offset '{k}'")))?;
            spec.last_minus = Some(k);
        } else if let Some(n) = token.strip_suffix('W') {
            let n: u32 = n.parse().map_err(|_| invalid("day-of-month", 3, format!("invalid nW day '{n}'")))?;
            if n < 1 || n > 31 {
                return Err(invalid("day-of-month", 3, format!("{n} out of range [1, 31]")));
            }
            spec.nearest_weekday = Some(n);
        } else {
            spec.days.extend(parse_token("day-of-month", token, 1, 31, 3, None)?);
        }
    }
    spec.days.sort_unstable();
    spec.days.dedup();
    Ok(spec)
}

fn parse_day_of_week_field(text: &str) -> Result<DayOfWeekSpec, SchedulerError> {
    if text == "*" {
        return Ok(DayOfWeekSpec { weekdays: (1..=7).collect(), ..Default::default() });
    }
    let mut spec = DayOfWeekSpec::default();
    for token in text.split(',') {
        if let Some((wd, n)) = token.split_once('#') {
            let weekday = resolve_name("day-of-week", wd, Some(&DOW_NAMES), 1, 7, 5)?;
            let n: u32 = n.parse().map_err(|_| invalid("day-of-week", 5, format!("invalid occurrence '{n}'")))?;
            if n < 1 || n > 5 {
                return Err(invalid("day-of-week", 5, format!("occurrence {n} out of range [1, 5]")));
            }
            spec.nth.push((weekday, n));
        } else if let Some(wd) = token.strip_suffix('L') {
            let weekday = resolve_name("day-of-week", wd, Some(&DOW_NAMES), 1, 7, 5)?;
            spec.last.push(weekday);
        } else {
            spec.weekdays.extend(parse_token("day-of-week", token, 1, 7, 5, Some(&DOW_NAMES))?);
        }
    }
    spec.weekdays.sort_unstable();
    spec.weekdays.dedup();
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    fn at(s: &str) -> DateTime<Tz> {
        UTC.from_utc_datetime(&s.parse::<NaiveDateTime>().unwrap())
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronExpression::parse("* * *").is_err());
    }

    #[test]
    fn requires_exactly_one_question_mark() {
        assert!(CronExpression::parse("0 0 0 * * *").is_err());
        assert!(CronExpression::parse("0 0 0 ? * ?").is_err());
        assert!(CronExpression::parse("0 0 0 ? * MON").is_ok());
    }

    #[test]
    fn every_five_seconds() {
        let cron = CronExpression::parse("*/5 * * * * ?").unwrap();
        let next = cron.next_valid_after(at("2026-01-01T00:00:00"), UTC).unwrap();
        assert_eq!(next.naive_local(), "2026-01-01T00:00:05".parse().unwrap());
    }

    #[test]
    fn daily_nine_am_weekdays() {
        let cron = CronExpression::parse("0 0 9 ? * MON-FRI").unwrap();
        // Friday 08:59:50 -> Friday 09:00:00
        let first = cron.next_valid_after(at("2026-01-02T08:59:50"), UTC).unwrap();
        assert_eq!(first.naive_local(), "2026-01-02T09:00:00".parse().unwrap());
        // from Friday 09:00:00 -> next Monday 09:00:00
        let second = cron.next_valid_after(first, UTC).unwrap();
        assert_eq!(second.naive_local(), "2026-01-05T09:00:00".parse().unwrap());
    }

    #[test]
    fn feb_31_never_matches() {
        let cron = CronExpression::parse("0 0 0 31 2 ?").unwrap();
        assert!(cron.next_valid_after(at("2026-01-01T00:00:00"), UTC).is_none());
    }

    #[test]
    fn third_friday_of_month() {
        let cron = CronExpression::parse("0 0 12 ? * 6#3").unwrap();
        let next = cron.next_valid_after(at("2026-01-01T00:00:00"), UTC).unwrap();
        // Third Friday of January 2026 is Jan 16.
        assert_eq!(next.naive_local().date(), NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
    }

    #[test]
    fn last_day_of_month() {
        let cron = CronExpression::parse("0 0 0 L * ?").unwrap();
        let next = cron.next_valid_after(at("2026-02-01T00:00:00"), UTC).unwrap();
        assert_eq!(next.naive_local().date(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn last_weekday_of_february_leap_year() {
        let cron = CronExpression::parse("0 0 0 LW * ?").unwrap();
        let next = cron.next_valid_after(at("2028-02-01T00:00:00"), UTC).unwrap();
        // 2028 is a leap year; Feb 29 2028 is a Tuesday, so LW == 29.
        assert_eq!(next.naive_local().date(), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn nearest_weekday_never_crosses_month_boundary() {
        // 1W when the 1st is a Sunday must move forward into the month, not back.
        let cron = CronExpression::parse("0 0 0 1W * ?").unwrap();
        // Feb 1 2026 is a Sunday.
        let next = cron.next_valid_after(at("2026-01-15T00:00:00"), UTC).unwrap();
        assert_eq!(next.naive_local().date(), NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
    }

    #[test]
    fn to_string_round_trips_modulo_case_and_whitespace() {
        let src = "*/5  * *  * * ?";
        let cron = CronExpression::parse(src).unwrap();
        assert_eq!(cron.to_string(), "*/5 * * * * ?");
        let reparsed = CronExpression::parse(&cron.to_string()).unwrap();
        assert_eq!(cron, reparsed);
    }

    proptest::proptest! {
        #[test]
        fn numeric_and_named_month_ranges_are_equivalent(start in 1u32..=12, len in 0u32..11) {
            let end = start + len.min(12 - start);
            let numeric = format!("0 0 0 ? {start}-{end} ?");
            let month_name = |m: u32| MONTH_NAMES.iter().find(|(_, v)| *v == m).unwrap().0;
            let named = format!("0 0 0 ? {}-{} ?", month_name(start), month_name(end));
            let a = CronExpression::parse(&numeric).unwrap();
            let b = CronExpression::parse(&named).unwrap();
            let start_point = at("2026-01-01T00:00:00");
            let next_a = a.next_valid_after(start_point, UTC);
            let next_b = b.next_valid_after(start_point, UTC);
            prop_assert_eq!(next_a, next_b);
        }
    }
}
