//! Misfire detection: a trigger has misfired if its `next_fire_time` is
//! older than `now - misfire_threshold`, meaning the main loop couldn't
//! acquire and dispatch it in time (engine was down, starved, or the worker
//! pool was saturated).

use chrono::{DateTime, Duration, Utc};

pub fn has_misfired(next_fire_time: DateTime<Utc>, now: DateTime<Utc>, misfire_threshold_ms: i64) -> bool {
    now - next_fire_time > Duration::milliseconds(misfire_threshold_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_threshold_is_not_a_misfire() {
        let next: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let now = next + Duration::milliseconds(30_000);
        assert!(!has_misfired(next, now, 60_000));
    }

    #[test]
    fn past_threshold_is_a_misfire() {
        let next: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let now = next + Duration::milliseconds(90_000);
        assert!(has_misfired(next, now, 60_000));
    }
}
