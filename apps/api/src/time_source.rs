#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
use chrono::Duration;
use chrono::{DateTime, Utc};

/// Abstracts wall-clock time so cache expiry and market windows are testable.
pub trait SystemTimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSourceDefault;

impl SystemTimeSource for SystemTimeSourceDefault {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeSystemTimeSource {
    t: Arc<Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl FakeSystemTimeSource {
    pub fn new_set(t: DateTime<Utc>) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
        }
    }

    pub fn advance(&self, time_quantum: Duration) {
        let mut t = self.t.lock().unwrap_or_else(|e| e.into_inner());
        *t += time_quantum;
    }
}

#[cfg(test)]
impl SystemTimeSource for FakeSystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.t.lock().unwrap_or_else(|e| e.into_inner())
    }
}
