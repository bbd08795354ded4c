// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The supervisor's restart throttle counts spawn instants inside a
//! rolling window; tests drive it with [`FakeClock`] instead of sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic time, used for throttle windows and tick pacing.
    fn now(&self) -> Instant;
    /// Wall-clock time, used for file mtime comparison and adoption.
    fn system_now(&self) -> SystemTime;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    wall: Arc<Mutex<SystemTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            wall: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))),
        }
    }

    /// Advance both clocks by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.wall.lock() += duration;
    }

    /// Set the wall clock to a specific time.
    pub fn set_wall(&self, time: SystemTime) {
        *self.wall.lock() = time;
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

    fn system_now(&self) -> SystemTime {
        *self.wall.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
