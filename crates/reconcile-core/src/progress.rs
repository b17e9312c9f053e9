//! Run context: phase, percentage, cancellation and inactivity timeout.
//!
//! One `RunContext` is created per invocation and threaded through every
//! reconciliation call. Cancellation and timeout are cooperative: they are
//! only observed at [`RunContext::checkpoint`], which the orchestrator calls
//! between composition-level and item-level steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aebridge_common::clock::{ns_to_secs, IdleWatchdog, RateController, RunClock};
use aebridge_common::config::RunSettings;
use aebridge_common::error::{BridgeError, BridgeResult};
use serde::Serialize;

/// Lifecycle of a run. The last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    TimedOut,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Idle | RunState::Running)
    }
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub phase: String,
    /// 0..=100.
    pub percent: f64,
    /// Seconds since the run started.
    pub elapsed_secs: f64,
}

/// Receives progress renders.
pub trait ProgressSink: Send {
    fn render(&mut self, update: &ProgressUpdate);

    /// Called exactly once when the run reaches a terminal state.
    fn close(&mut self, _state: RunState) {}
}

/// Sink that reports through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn render(&mut self, update: &ProgressUpdate) {
        tracing::info!(
            phase = %update.phase,
            percent = format_args!("{:.0}", update.percent),
            "Progress"
        );
    }

    fn close(&mut self, state: RunState) {
        tracing::debug!(?state, "Progress closed");
    }
}

/// Progress, cancel flag and watchdog for one run.
pub struct RunContext {
    state: RunState,
    phase: String,
    percent: f64,
    cancel: Arc<AtomicBool>,
    clock: RunClock,
    watchdog: IdleWatchdog,
    throttle: RateController,
    sink: Box<dyn ProgressSink>,
    renders: u64,
    closed: bool,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("percent", &self.percent)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl RunContext {
    pub fn new(settings: &RunSettings, clock: RunClock) -> Self {
        let now = clock.now_ns();
        Self {
            state: RunState::Idle,
            phase: String::new(),
            percent: 0.0,
            cancel: Arc::new(AtomicBool::new(false)),
            watchdog: IdleWatchdog::new(settings.inactivity_timeout_secs, now),
            throttle: RateController::from_interval_ms(settings.progress_interval_ms),
            clock,
            sink: Box::new(TracingSink),
            renders: 0,
            closed: false,
        }
    }

    /// Replace the default tracing sink.
    pub fn with_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use an externally owned cancel flag (e.g. flipped by a signal handler).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Shared cancel flag; setting it requests cancellation.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Number of updates that reached the sink.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    /// Reset progress and enter `Running`.
    pub fn start(&mut self, phase: &str) {
        self.state = RunState::Running;
        self.closed = false;
        self.percent = 0.0;
        self.watchdog.touch(self.clock.now_ns());
        self.update_forced(phase, 0.0);
    }

    /// Record progress; the sink only sees it if the throttle allows.
    pub fn update(&mut self, phase: &str, percent: f64) {
        let now = self.record(phase, percent);
        if self.throttle.should_tick(now) {
            self.emit(now);
        }
    }

    /// Record progress and render it regardless of the throttle.
    pub fn update_forced(&mut self, phase: &str, percent: f64) {
        let now = self.record(phase, percent);
        self.throttle.force_tick(now);
        self.emit(now);
    }

    fn record(&mut self, phase: &str, percent: f64) -> u64 {
        let now = self.clock.now_ns();
        if self.phase != phase {
            self.phase = phase.to_string();
        }
        self.percent = percent.clamp(0.0, 100.0);
        self.watchdog.touch(now);
        now
    }

    fn emit(&mut self, now: u64) {
        let update = ProgressUpdate {
            phase: self.phase.clone(),
            percent: self.percent,
            elapsed_secs: ns_to_secs(now),
        };
        self.sink.render(&update);
        self.renders += 1;
    }

    /// Cooperative cancel/timeout check.
    pub fn checkpoint(&mut self) -> BridgeResult<()> {
        if self.is_cancelled() {
            self.state = RunState::Cancelled;
            return Err(BridgeError::Cancelled);
        }
        let now = self.clock.now_ns();
        if self.watchdog.is_expired(now) {
            self.state = RunState::TimedOut;
            return Err(BridgeError::TimedOut {
                idle_secs: ns_to_secs(self.watchdog.idle_ns(now)) as u64,
            });
        }
        Ok(())
    }

    /// Enter the terminal state matching `result` and close the sink.
    ///
    /// Only the first call has an effect.
    pub fn finish<T>(&mut self, result: &BridgeResult<T>) -> RunState {
        if self.closed {
            return self.state;
        }
        self.state = match result {
            Ok(_) => RunState::Completed,
            Err(BridgeError::Cancelled) => RunState::Cancelled,
            Err(BridgeError::TimedOut { .. }) => RunState::TimedOut,
            Err(_) => RunState::Failed,
        };
        self.closed = true;
        self.sink.close(self.state);
        self.state
    }
}
