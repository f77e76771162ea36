use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every stopwatch transition produces an Event.
/// Hosts print or log them; the coordinator only sees durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// First click: the run starts at `start_due_ms` unless clicked again.
    StopwatchArmed {
        start_due_ms: u64,
        at: DateTime<Utc>,
    },
    /// Second click inside the disarm window.
    StopwatchReset {
        at: DateTime<Utc>,
    },
    StopwatchStarted {
        at: DateTime<Utc>,
    },
    /// `logged` is false when the run had no elapsed time.
    StopwatchStopped {
        elapsed_ms: u64,
        logged: bool,
        at: DateTime<Utc>,
    },
    StopwatchSnapshot {
        state: TimerState,
        armed: bool,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
}
