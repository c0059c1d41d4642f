// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Watermarks, cache entries, and deadline windows are all expressed in Unix
//! epoch seconds; `now()` is only used for measuring run durations.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_secs(&self) -> i64;

    /// Current wall-clock time as a UTC datetime.
    fn utc_now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.epoch_secs(), 0).single().unwrap_or_default()
    }
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_secs(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    epoch_secs: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at_epoch(1_700_000_000)
    }

    /// Start the clock at the given epoch second.
    pub fn at_epoch(secs: i64) -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            epoch_secs: Arc::new(Mutex::new(secs)),
        }
    }

    /// Start the clock at the given UTC datetime.
    pub fn at(datetime: DateTime<Utc>) -> Self {
        Self::at_epoch(datetime.timestamp())
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.epoch_secs.lock() += duration.as_secs() as i64;
    }

    /// Set the wall-clock value in epoch seconds
    pub fn set_epoch_secs(&self, secs: i64) {
        *self.epoch_secs.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn epoch_secs(&self) -> i64 {
        *self.epoch_secs.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
