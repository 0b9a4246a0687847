//! Host clock adapter.
//!
//! Provides monotonic and wall-clock time queries for the runtime loop.
//!
//! - Monotonic time comes from `std::time::Instant` and drives frame
//!   pacing, the alarm cadence and scheduler ticks.
//! - Wall-clock time comes from `chrono` and drives record timestamps,
//!   local dates and quiet hours.

use std::time::Instant;

use chrono::{Local, NaiveDate, Timelike, Utc};

/// Wall-clock readings before this are treated as unsynced.
const EPOCH_2020_MS: i64 = 1_577_836_800_000;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since the clock was created (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// Milliseconds since the clock was created (monotonic).
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Unix epoch milliseconds.
    pub fn now_epoch_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }

    /// Current local hour-of-day (0–23).  `None` if the wall clock is
    /// obviously unsynced.
    pub fn current_hour(&self) -> Option<u8> {
        let now = Local::now();
        if now.timestamp_millis() < EPOCH_2020_MS {
            return None;
        }
        u8::try_from(now.hour()).ok()
    }

    /// Today's local date.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
