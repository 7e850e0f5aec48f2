//! Wall-clock access.
//!
//! Everything that reads "now" goes through a [`TimeSource`] so tests can
//! drive time by hand and hosts can plug in a trusted server clock.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug)]
pub struct ManualTime {
    now: Mutex<DateTime<Utc>>,
}

impl ManualTime {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at a fixed, readable instant (2024-01-01T00:00:00Z)
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual time lock poisoned");
        *now += by;
    }

    /// Jump to an arbitrary instant, including backwards
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().expect("manual time lock poisoned") = to;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual time lock poisoned")
    }
}
