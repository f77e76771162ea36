//! Remote store adapter seam.
//!
//! A remote is an append-only collection per identity that pushes its full
//! current contents on subscribe and after every mutation. Deliveries go
//! through a [`SnapshotSink`] into the coordinator's queue; the coordinator
//! drains that queue on its own thread of control.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use super::types::Identity;
use crate::error::RemoteError;

/// A delivery from a remote subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Full replacement of the collection, raw and unvalidated.
    Snapshot(Vec<Value>),
    /// The subscription broke; no more snapshots will follow.
    Failed(RemoteError),
}

/// A new record for the remote. The store assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEntry {
    pub duration_ms: u64,
}

/// Sending half handed to a remote on subscribe. Each delivery is tagged with
/// the subscription generation it belongs to.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    generation: u64,
    tx: UnboundedSender<(u64, RemoteEvent)>,
}

impl SnapshotSink {
    pub fn new(generation: u64, tx: UnboundedSender<(u64, RemoteEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Returns false once the receiving side is gone.
    pub fn snapshot(&self, items: Vec<Value>) -> bool {
        self.tx
            .send((self.generation, RemoteEvent::Snapshot(items)))
            .is_ok()
    }

    pub fn error(&self, err: RemoteError) -> bool {
        self.tx
            .send((self.generation, RemoteEvent::Failed(err)))
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Disposer for a remote subscription. Cancels on [`cancel`](Self::cancel)
/// or when dropped.
pub struct RemoteSubscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl RemoteSubscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for RemoteSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

pub trait RemoteStore {
    /// Open a subscription on `identity`'s collection. The current snapshot
    /// is delivered to `sink` at least once, then again after every mutation.
    fn subscribe(
        &self,
        identity: &Identity,
        sink: SnapshotSink,
    ) -> Result<RemoteSubscription, RemoteError>;

    /// Append one record; the store stamps it with its own time.
    fn write(&self, identity: &Identity, entry: &NewEntry) -> Result<(), RemoteError>;

    /// Give the store a chance to notice outside changes. Called by the
    /// coordinator before it drains deliveries.
    fn poll(&self) {}
}

impl<R: RemoteStore + ?Sized> RemoteStore for Rc<R> {
    fn subscribe(
        &self,
        identity: &Identity,
        sink: SnapshotSink,
    ) -> Result<RemoteSubscription, RemoteError> {
        (**self).subscribe(identity, sink)
    }

    fn write(&self, identity: &Identity, entry: &NewEntry) -> Result<(), RemoteError> {
        (**self).write(identity, entry)
    }

    fn poll(&self) {
        (**self).poll()
    }
}

struct Subscriber {
    id: u64,
    identity: Identity,
    sink: SnapshotSink,
}

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    entries: Vec<Subscriber>,
}

/// Subscriber bookkeeping shared by the bundled remotes.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    inner: Rc<RefCell<SubscriberList>>,
}

impl Subscribers {
    pub(crate) fn add(&self, identity: &Identity, sink: SnapshotSink) -> RemoteSubscription {
        let id = {
            let mut list = self.inner.borrow_mut();
            list.next_id += 1;
            let id = list.next_id;
            list.entries.push(Subscriber {
                id,
                identity: identity.clone(),
                sink,
            });
            id
        };
        let weak: Weak<RefCell<SubscriberList>> = Rc::downgrade(&self.inner);
        RemoteSubscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().entries.retain(|s| s.id != id);
            }
        })
    }

    /// Push a snapshot to every live subscriber of `identity`.
    pub(crate) fn publish(&self, identity: &Identity, items: &[Value]) {
        let mut list = self.inner.borrow_mut();
        list.entries.retain(|s| !s.sink.is_closed());
        for sub in list.entries.iter().filter(|s| &s.identity == identity) {
            sub.sink.snapshot(items.to_vec());
        }
    }

    pub(crate) fn fail(&self, identity: &Identity, err: &RemoteError) {
        let list = self.inner.borrow();
        for sub in list.entries.iter().filter(|s| &s.identity == identity) {
            sub.sink.error(err.clone());
        }
    }

    pub(crate) fn identities(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = Vec::new();
        for sub in &self.inner.borrow().entries {
            if !ids.contains(&sub.identity) {
                ids.push(sub.identity.clone());
            }
        }
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}
