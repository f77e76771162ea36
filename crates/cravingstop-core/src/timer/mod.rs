mod stopwatch;

pub use stopwatch::{DurationSink, Stopwatch, TimerState, DISARM_WINDOW_MS, TICK_QUANTUM_MS};
