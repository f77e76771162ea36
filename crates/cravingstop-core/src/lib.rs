//! # Craving Stopper Core Library
//!
//! Core logic for Craving Stopper: a one-button stopwatch for timing how long
//! a craving was resisted, plus a log of those durations kept in sync with a
//! remote per-user collection and a device-local fallback slot. The CLI is a
//! thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Stopwatch**: A caller-clocked state machine. Hosts pass the current
//!   time to `click()` and call `tick()` periodically
//! - **Records**: Tolerant validation of raw stored entries into [`LogRecord`]s
//! - **Sync**: [`SyncCoordinator`] decides whether the remote or the local
//!   store is authoritative and publishes the record set to observers
//! - **Storage**: SQLite key-value persistence and TOML configuration
//! - **Stats**: Totals and per-day aggregates over the record set
//!
//! ## Key Components
//!
//! - [`Stopwatch`]: Idle / armed / running state machine
//! - [`SyncCoordinator`]: Authority selection, appends, and observers
//! - [`RemoteStore`] / [`LocalStore`]: Persistence seams
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod record;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod timer;

pub use clock::{now_ms, Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, DatabaseError, IdentityError, LocalStoreError, RemoteError,
};
pub use events::Event;
pub use record::{validate, validate_all, LogRecord};
pub use stats::{daily_totals, month_totals, summarize, DayTotal, Intensity, Summary};
pub use storage::{Config, Database, KvLocalStore, LocalStore, MemoryLocalStore};
pub use sync::{
    AppendOutcome, Authority, DirRemoteStore, Identity, MemoryRemoteStore, NoticeKind,
    RemoteStore, SyncCoordinator, SyncNotice, SyncStatus, SyncView, Unsubscribe,
};
pub use timer::{DurationSink, Stopwatch, TimerState};
