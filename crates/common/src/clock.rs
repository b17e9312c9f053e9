//! Clock and pacing utilities for a bridge run.
//!
//! Every run is anchored to a monotonic epoch taken when the run starts.
//! This module provides:
//! - The run clock (real, or manually advanced for tests)
//! - A rate controller that throttles progress renders
//! - An inactivity watchdog that detects a stalled run

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic run clock reporting nanoseconds since the run epoch.
#[derive(Debug, Clone)]
pub struct RunClock {
    source: ClockSource,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

#[derive(Debug, Clone)]
enum ClockSource {
    Monotonic(Instant),
    Manual(Arc<AtomicU64>),
}

/// Handle that advances a manual [`RunClock`].
#[derive(Debug, Clone)]
pub struct ManualTime {
    now_ns: Arc<AtomicU64>,
}

impl RunClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            source: ClockSource::Monotonic(Instant::now()),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a clock that only moves when the returned handle advances it.
    pub fn manual() -> (Self, ManualTime) {
        let now_ns = Arc::new(AtomicU64::new(0));
        let clock = Self {
            source: ClockSource::Manual(now_ns.clone()),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        };
        (clock, ManualTime { now_ns })
    }

    /// Nanoseconds elapsed since the run epoch.
    pub fn now_ns(&self) -> u64 {
        match &self.source {
            ClockSource::Monotonic(epoch) => epoch.elapsed().as_nanos() as u64,
            ClockSource::Manual(now) => now.load(Ordering::SeqCst),
        }
    }

    /// Seconds elapsed since the run epoch.
    pub fn elapsed_secs(&self) -> f64 {
        ns_to_secs(self.now_ns())
    }

    /// Wall-clock time at the run epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl ManualTime {
    /// Move the clock forward.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ns.fetch_add(ms * 1_000_000, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1_000);
    }
}

/// Convert nanoseconds to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Throttle for repeated events (progress renders).
#[derive(Debug)]
pub struct RateController {
    min_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller allowing at most one tick per `min_interval_ms`.
    pub fn from_interval_ms(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ns: min_interval_ms * 1_000_000,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.min_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Record a tick that bypassed the throttle.
    pub fn force_tick(&mut self, current_ns: u64) {
        self.last_tick_ns = Some(current_ns);
    }
}

/// Detects runs that stopped making forward progress.
#[derive(Debug)]
pub struct IdleWatchdog {
    budget_ns: u64,
    last_activity_ns: u64,
}

impl IdleWatchdog {
    pub fn new(budget_secs: u64, now_ns: u64) -> Self {
        Self {
            budget_ns: budget_secs * 1_000_000_000,
            last_activity_ns: now_ns,
        }
    }

    /// Record forward progress.
    pub fn touch(&mut self, now_ns: u64) {
        self.last_activity_ns = now_ns;
    }

    /// Nanoseconds since the last recorded activity.
    pub fn idle_ns(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.last_activity_ns)
    }

    /// Whether the idle time is strictly longer than the budget.
    pub fn is_expired(&self, now_ns: u64) -> bool {
        self.idle_ns(now_ns) > self.budget_ns
    }

    pub fn budget_secs(&self) -> u64 {
        self.budget_ns / 1_000_000_000
    }

    pub fn last_activity_ns(&self) -> u64 {
        self.last_activity_ns
    }
}
