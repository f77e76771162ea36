//! In-process remote collection with failure injection.
//!
//! Clones share one store, so a test can keep a handle after giving the
//! coordinator its own and flip failures mid-session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use super::remote::{NewEntry, RemoteStore, RemoteSubscription, SnapshotSink, Subscribers};
use super::types::Identity;
use crate::clock::{Clock, SystemClock};
use crate::error::RemoteError;

#[derive(Default)]
struct State {
    collections: HashMap<Identity, Vec<Value>>,
    next_doc: u64,
    last_stamp: Option<DateTime<Utc>>,
    subscribe_error: Option<RemoteError>,
    write_error: Option<RemoteError>,
    writes: usize,
}

#[derive(Clone)]
pub struct MemoryRemoteStore {
    state: Rc<RefCell<State>>,
    subscribers: Subscribers,
    clock: Rc<dyn Clock>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_clock(Rc::new(SystemClock))
    }

    /// Server timestamps come from `clock`.
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            subscribers: Subscribers::default(),
            clock,
        }
    }

    /// Make every following subscribe fail with `err`.
    pub fn fail_subscribe(&self, err: RemoteError) {
        self.state.borrow_mut().subscribe_error = Some(err);
    }

    /// Make every following write fail with `err`.
    pub fn fail_writes(&self, err: RemoteError) {
        self.state.borrow_mut().write_error = Some(err);
    }

    /// Clear injected failures.
    pub fn heal(&self) {
        let mut state = self.state.borrow_mut();
        state.subscribe_error = None;
        state.write_error = None;
    }

    /// Break every open subscription on `identity`'s collection.
    pub fn push_error(&self, identity: &Identity, err: RemoteError) {
        self.subscribers.fail(identity, &err);
    }

    /// Insert a raw document as-is, as another client would, and notify.
    pub fn insert_raw(&self, identity: &Identity, doc: Value) {
        let items = {
            let mut state = self.state.borrow_mut();
            let coll = state.collections.entry(identity.clone()).or_default();
            coll.push(doc);
            coll.clone()
        };
        self.subscribers.publish(identity, &items);
    }

    pub fn collection(&self, identity: &Identity) -> Vec<Value> {
        self.state
            .borrow()
            .collections
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn subscribe(
        &self,
        identity: &Identity,
        sink: SnapshotSink,
    ) -> Result<RemoteSubscription, RemoteError> {
        if let Some(err) = self.state.borrow().subscribe_error.clone() {
            return Err(err);
        }
        sink.snapshot(self.collection(identity));
        Ok(self.subscribers.add(identity, sink))
    }

    fn write(&self, identity: &Identity, entry: &NewEntry) -> Result<(), RemoteError> {
        let items = {
            let mut state = self.state.borrow_mut();
            if let Some(err) = state.write_error.clone() {
                return Err(err);
            }

            // Server time is strictly increasing per store.
            let now = self.clock.now();
            let stamp = match state.last_stamp {
                Some(last) if now <= last => last + Duration::milliseconds(1),
                _ => now,
            };
            state.last_stamp = Some(stamp);
            state.next_doc += 1;
            state.writes += 1;

            let doc = json!({
                "id": format!("doc-{}", state.next_doc),
                "durationMs": entry.duration_ms,
                "occurredAt": {
                    "seconds": stamp.timestamp(),
                    "nanoseconds": stamp.timestamp_subsec_nanos(),
                },
            });
            let coll = state.collections.entry(identity.clone()).or_default();
            coll.push(doc);
            coll.clone()
        };
        self.subscribers.publish(identity, &items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sync::remote::RemoteEvent;
    use chrono::TimeZone;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn subscribe_delivers_current_snapshot_then_updates() {
        let remote = MemoryRemoteStore::new();
        let me = Identity::new("me");
        let (tx, mut rx) = unbounded_channel();
        let _sub = remote.subscribe(&me, SnapshotSink::new(1, tx)).unwrap();

        assert_eq!(rx.try_recv().unwrap().1, RemoteEvent::Snapshot(vec![]));

        remote.write(&me, &NewEntry { duration_ms: 1200 }).unwrap();
        match rx.try_recv().unwrap().1 {
            RemoteEvent::Snapshot(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["durationMs"], 1200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn server_stamps_are_monotonic() {
        let clock = Rc::new(ManualClock::new(Utc.timestamp_millis_opt(5_000).unwrap()));
        let remote = MemoryRemoteStore::with_clock(clock);
        let me = Identity::new("me");
        remote.write(&me, &NewEntry { duration_ms: 1 }).unwrap();
        remote.write(&me, &NewEntry { duration_ms: 2 }).unwrap();

        let docs = remote.collection(&me);
        let first = crate::record::validate(&docs[0]).unwrap();
        let second = crate::record::validate(&docs[1]).unwrap();
        assert!(second.occurred_at > first.occurred_at);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn injected_failures_and_heal() {
        let remote = MemoryRemoteStore::new();
        let me = Identity::new("me");
        remote.fail_writes(RemoteError::Unreachable("offline".into()));
        assert!(remote.write(&me, &NewEntry { duration_ms: 1 }).is_err());
        remote.fail_subscribe(RemoteError::Rejected("denied".into()));
        let (tx, _rx) = unbounded_channel();
        assert!(remote.subscribe(&me, SnapshotSink::new(1, tx)).is_err());

        remote.heal();
        assert!(remote.write(&me, &NewEntry { duration_ms: 1 }).is_ok());
        assert_eq!(remote.write_count(), 1);
    }

    #[test]
    fn clones_share_state() {
        let remote = MemoryRemoteStore::new();
        let handle = remote.clone();
        let me = Identity::new("me");
        remote.write(&me, &NewEntry { duration_ms: 9 }).unwrap();
        assert_eq!(handle.collection(&me).len(), 1);
    }
}
