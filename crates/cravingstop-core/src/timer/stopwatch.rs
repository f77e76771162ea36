//! Single-button stopwatch.
//!
//! No internal threads or timers: the caller passes the current time (ms) to
//! every operation and calls `tick()` periodically. Scheduled work (the
//! pending start after the disarm window, the 10 ms counter) is settled from
//! those timestamps, which keeps the machine deterministic under test.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --click--> Idle(armed) --250ms, no click--> Running --click--> Idle
//!                 Idle(armed) --click <250ms--> Idle (elapsed reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut sw = Stopwatch::new();
//! sw.click(now_ms(), &mut coordinator);
//! // In a loop:
//! sw.tick(now_ms());
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Window after a first click in which a second click means "reset".
pub const DISARM_WINDOW_MS: u64 = 250;
/// Counter resolution while running.
pub const TICK_QUANTUM_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
}

/// Receives the durations a stopped run produces.
pub trait DurationSink {
    fn record_duration(&mut self, duration_ms: u64);
}

impl DurationSink for Vec<u64> {
    fn record_duration(&mut self, duration_ms: u64) {
        self.push(duration_ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    state: TimerState,
    elapsed_ms: u64,
    /// When the armed start fires (ms). Set only while idle and armed.
    #[serde(default)]
    start_due_ms: Option<u64>,
    /// When the current run began (ms). Set only while running.
    #[serde(default)]
    run_started_ms: Option<u64>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_ms: 0,
            start_due_ms: None,
            run_started_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Idle with a start pending.
    pub fn is_armed(&self) -> bool {
        self.start_due_ms.is_some()
    }

    pub fn start_due_ms(&self) -> Option<u64> {
        self.start_due_ms
    }

    /// Elapsed time as of the last `tick()`/`click()`, in whole quanta.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn snapshot(&self) -> Event {
        Event::StopwatchSnapshot {
            state: self.state,
            armed: self.is_armed(),
            elapsed_ms: self.elapsed_ms,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Handle a button press at `now_ms`.
    ///
    /// A pending start that is due at `now_ms` fires first, so a second click
    /// at or after the disarm window stops a run that just began instead of
    /// resetting. A stopped run with elapsed time goes to `sink`.
    pub fn click(&mut self, now_ms: u64, sink: &mut impl DurationSink) -> Vec<Event> {
        let mut events: Vec<Event> = self.settle(now_ms).into_iter().collect();

        match self.state {
            TimerState::Running => {
                self.flush_elapsed(now_ms);
                self.state = TimerState::Idle;
                self.run_started_ms = None;
                let elapsed_ms = self.elapsed_ms;
                let logged = elapsed_ms > 0;
                if logged {
                    sink.record_duration(elapsed_ms);
                }
                events.push(Event::StopwatchStopped {
                    elapsed_ms,
                    logged,
                    at: Utc::now(),
                });
            }
            TimerState::Idle => {
                if self.start_due_ms.take().is_some() {
                    self.elapsed_ms = 0;
                    events.push(Event::StopwatchReset { at: Utc::now() });
                } else {
                    let start_due_ms = now_ms.saturating_add(DISARM_WINDOW_MS);
                    self.start_due_ms = Some(start_due_ms);
                    events.push(Event::StopwatchArmed {
                        start_due_ms,
                        at: Utc::now(),
                    });
                }
            }
        }
        events
    }

    /// Call periodically. Returns `Some(Event::StopwatchStarted)` when the
    /// armed start fires.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        let started = self.settle(now_ms);
        if self.state == TimerState::Running {
            self.flush_elapsed(now_ms);
        }
        started
    }

    /// Drop any pending start and running counter without emitting.
    pub fn cancel(&mut self) {
        self.start_due_ms = None;
        self.run_started_ms = None;
        self.state = TimerState::Idle;
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Fire the pending start if its deadline has passed.
    fn settle(&mut self, now_ms: u64) -> Option<Event> {
        let due = self.start_due_ms?;
        if now_ms < due {
            return None;
        }
        self.start_due_ms = None;
        self.state = TimerState::Running;
        self.elapsed_ms = 0;
        self.run_started_ms = Some(due);
        Some(Event::StopwatchStarted { at: Utc::now() })
    }

    fn flush_elapsed(&mut self, now_ms: u64) {
        if let Some(started) = self.run_started_ms {
            let raw = now_ms.saturating_sub(started);
            self.elapsed_ms = raw - raw % TICK_QUANTUM_MS;
        }
    }
}
