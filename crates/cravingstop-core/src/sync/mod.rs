//! Record synchronization between the remote authoritative collection and
//! the device-local fallback slot.
//!
//! [`SyncCoordinator`] is the only writer of the observable record set. The
//! remote side is pluggable through [`RemoteStore`]; two stores ship with the
//! crate: an in-process one and a directory-backed one.

pub mod coordinator;
pub mod dir_remote;
pub mod identity;
pub mod memory_remote;
mod observers;
pub mod remote;
pub mod types;

pub use coordinator::SyncCoordinator;
pub use dir_remote::DirRemoteStore;
pub use identity::{get_or_create_identity, get_or_create_identity_at};
pub use memory_remote::MemoryRemoteStore;
pub use observers::Unsubscribe;
pub use remote::{NewEntry, RemoteEvent, RemoteStore, RemoteSubscription, SnapshotSink};
pub use types::{AppendOutcome, Authority, Identity, NoticeKind, SyncNotice, SyncStatus, SyncView};
