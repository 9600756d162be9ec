//! Typed attribute map carried by jobs and triggers ("job data map").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A string-keyed bag of JSON-representable values.
///
/// Jobs and triggers each carry one. The map travels with the job/trigger
/// through store round-trips and, for jobs with
/// `persist_data_after_execution`, is written back after each firing so a
/// job can accumulate state across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDataMap {
    values: HashMap<String, serde_json::Value>,
}

impl JobDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_i64())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }

    /// Merges `other` into `self`, `other` winning on key conflicts.
    pub fn merge(&mut self, other: &JobDataMap) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

impl From<HashMap<String, serde_json::Value>> for JobDataMap {
    fn from(values: HashMap<String, serde_json::Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_roundtrip() {
        let mut m = JobDataMap::new();
        m.put("retries", 3);
        m.put("label", "nightly");
        assert_eq!(m.get_i64("retries"), Some(3));
        assert_eq!(m.get_string("label"), Some("nightly"));
    }

    #[test]
    fn merge_overwrites_on_conflict() {
        let mut a = JobDataMap::new();
        a.put("x", 1);
        let mut b = JobDataMap::new();
        b.put("x", 2);
        a.merge(&b);
        assert_eq!(a.get_i64("x"), Some(2));
    }
}
