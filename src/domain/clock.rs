//! Time as an injectable capability. Production code uses [`SystemClock`];
//! tests supply [`VirtualClock`] for deterministic misfire and ordering
//! scenarios.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value only moves when told to. Shareable across threads
/// via `Clone` (backed by an `Arc<Mutex<_>>`).
#[derive(Debug, Clone)]
pub struct VirtualClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl VirtualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.lock().expect("virtual clock poisoned");
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.inner.lock().expect("virtual clock poisoned");
        *guard = at;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("virtual clock poisoned")
    }
}
