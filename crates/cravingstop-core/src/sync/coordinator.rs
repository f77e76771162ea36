//! Sync coordinator: owns the observable record set and decides which store
//! backs it.
//!
//! ## Authority
//!
//! ```text
//! Local --identity available, subscribe ok--> Remote
//! Remote --subscribe error | write error--> Local (notice set)
//! any --identity unavailable--> Local
//! ```
//!
//! Exactly one store backs `records` at a time. Switching authority replaces
//! the whole set; remote and local records are never interleaved.
//!
//! Like the stopwatch, the coordinator has no thread of its own. Remote
//! deliveries queue up until [`SyncCoordinator::pump`] drains them; every
//! public operation pumps, and the host loop should pump on each turn.

use chrono::SubsecRound;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::observers::{Observers, Unsubscribe};
use super::remote::{NewEntry, RemoteEvent, RemoteStore, RemoteSubscription, SnapshotSink};
use super::types::{
    AppendOutcome, Authority, Identity, NoticeKind, SyncNotice, SyncStatus, SyncView,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{LocalStoreError, RemoteError};
use crate::record::{validate_all, LogRecord};
use crate::storage::LocalStore;
use crate::timer::DurationSink;

pub struct SyncCoordinator {
    local: Box<dyn LocalStore>,
    remote: Option<Box<dyn RemoteStore>>,
    clock: Box<dyn Clock>,

    identity: Option<Identity>,
    authority: Authority,
    records: Vec<LogRecord>,
    notice: Option<SyncNotice>,

    subscription: Option<RemoteSubscription>,
    generation: u64,
    events_tx: UnboundedSender<(u64, RemoteEvent)>,
    events_rx: UnboundedReceiver<(u64, RemoteEvent)>,

    observers: Observers,
}

impl SyncCoordinator {
    /// Local-only coordinator. Starts with an empty record set until an
    /// identity transition (or [`reload_local`](Self::reload_local)) loads one.
    pub fn new(local: impl LocalStore + 'static) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            local: Box::new(local),
            remote: None,
            clock: Box::new(SystemClock),
            identity: None,
            authority: Authority::Local,
            records: Vec::new(),
            notice: None,
            subscription: None,
            generation: 0,
            events_tx,
            events_rx,
            observers: Observers::default(),
        }
    }

    pub fn with_remote(mut self, remote: impl RemoteStore + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    /// Clock for device-assigned timestamps on local records.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Observable records, newest first.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn notice(&self) -> Option<&SyncNotice> {
        self.notice.as_ref()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            authority: self.authority,
            identity: self.identity.clone(),
            record_count: self.records.len(),
            notice: self.notice.clone(),
        }
    }

    // ── Identity transitions ─────────────────────────────────────────

    /// Switch to the remote collection of `identity`.
    ///
    /// Falls back to local data if no remote is configured or the
    /// subscription cannot be opened. A successful subscribe clears any
    /// earlier degraded notice.
    pub fn on_identity_available(&mut self, identity: Identity) {
        self.drop_subscription();
        self.identity = Some(identity);

        let subscribed = match (&self.remote, &self.identity) {
            (Some(remote), Some(identity)) => {
                let sink = SnapshotSink::new(self.generation, self.events_tx.clone());
                Some(remote.subscribe(identity, sink))
            }
            _ => None,
        };

        match subscribed {
            None => {
                debug!("no remote configured, staying on local data");
                self.notice = None;
                self.use_local();
            }
            Some(Ok(subscription)) => {
                info!(identity = ?self.identity, "subscribed to remote collection");
                self.subscription = Some(subscription);
                self.authority = Authority::Remote;
                self.notice = None;
                // Nothing from the previous authority stays visible.
                self.records.clear();
                if !self.pump() {
                    self.publish();
                }
            }
            Some(Err(err)) => self.fall_back(NoticeKind::SubscribeFailed, err),
        }
    }

    /// Identity is absent (never issued, signed out, offline). Serve local data.
    pub fn on_identity_unavailable(&mut self) {
        self.drop_subscription();
        self.identity = None;
        self.notice = None;
        self.use_local();
    }

    /// Re-run the identity transition for the current identity, e.g. after a
    /// degraded session. Without an identity this reloads local data.
    pub fn reconnect(&mut self) {
        match self.identity.clone() {
            Some(identity) => self.on_identity_available(identity),
            None => self.on_identity_unavailable(),
        }
    }

    /// Cancel the remote subscription. Records stay as they are.
    pub fn shutdown(&mut self) {
        self.drop_subscription();
    }

    // ── Appends ──────────────────────────────────────────────────────

    /// Log a resisted duration.
    ///
    /// Non-positive durations are ignored. With remote authority the write
    /// goes to the remote and shows up with its next snapshot; a failed
    /// remote write lands locally and degrades the session to local data
    /// without retrying.
    pub fn append(&mut self, duration_ms: i64) -> AppendOutcome {
        self.pump();

        if duration_ms <= 0 {
            debug!(duration_ms, "ignoring non-positive duration");
            return AppendOutcome::Ignored;
        }
        let entry = NewEntry {
            duration_ms: duration_ms.unsigned_abs(),
        };

        let remote_write = match (&self.remote, &self.identity, self.authority) {
            (Some(remote), Some(identity), Authority::Remote) => {
                Some(remote.write(identity, &entry))
            }
            _ => None,
        };

        match remote_write {
            Some(Ok(())) => {
                self.pump();
                AppendOutcome::Remote
            }
            Some(Err(err)) => {
                self.degrade(NoticeKind::WriteFailed, &err);
                match self.append_local(entry.duration_ms) {
                    Ok(record) => AppendOutcome::FellBack { record },
                    Err(err) => {
                        warn!(error = %err, "local fallback write failed, record dropped");
                        self.load_local();
                        self.publish();
                        AppendOutcome::Dropped
                    }
                }
            }
            None => match self.append_local(entry.duration_ms) {
                Ok(record) => AppendOutcome::Local { record },
                Err(err) => {
                    warn!(error = %err, "local write failed, record dropped");
                    AppendOutcome::Dropped
                }
            },
        }
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Register `observer`. It is called right away with the current view and
    /// again on every change, until the returned handle is used to unsubscribe.
    pub fn subscribe<F>(&mut self, observer: F) -> Unsubscribe
    where
        F: FnMut(&SyncView<'_>) + 'static,
    {
        let handle = self.observers.add(Box::new(observer));
        let view = SyncView {
            records: &self.records,
            authority: self.authority,
            notice: self.notice.as_ref(),
        };
        self.observers.deliver_to(&handle, &view);
        handle
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ── Event processing ─────────────────────────────────────────────

    /// Drain pending remote deliveries. Returns whether observers were notified.
    pub fn pump(&mut self) -> bool {
        if let Some(remote) = &self.remote {
            remote.poll();
        }

        let mut published = false;
        while let Ok((generation, event)) = self.events_rx.try_recv() {
            if generation != self.generation || self.authority != Authority::Remote {
                debug!(generation, current = self.generation, "discarding stale remote delivery");
                continue;
            }
            match event {
                RemoteEvent::Snapshot(items) => {
                    self.records = validate_all(&items);
                    debug!(count = self.records.len(), "applied remote snapshot");
                    self.publish();
                }
                RemoteEvent::Failed(err) => self.fall_back(NoticeKind::SubscribeFailed, err),
            }
            published = true;
        }
        published
    }

    /// Reload the local slot and publish it, if local data is authoritative.
    pub fn reload_local(&mut self) {
        if self.authority == Authority::Local {
            self.load_local();
            self.publish();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fall_back(&mut self, kind: NoticeKind, err: RemoteError) {
        self.degrade(kind, &err);
        self.load_local();
        self.publish();
    }

    /// Leave remote authority and record why. Does not touch `records`.
    fn degrade(&mut self, kind: NoticeKind, err: &RemoteError) {
        warn!(?kind, error = %err, "remote sync degraded, falling back to local data");
        self.drop_subscription();
        self.authority = Authority::Local;
        self.notice = Some(SyncNotice {
            kind,
            message: err.to_string(),
            at: self.clock.now(),
        });
    }

    fn use_local(&mut self) {
        if self.authority != Authority::Local {
            info!("switching to local data");
        }
        self.authority = Authority::Local;
        self.load_local();
        self.publish();
    }

    fn load_local(&mut self) {
        self.records = validate_all(&self.read_local());
    }

    /// Read the local slot; failures read as empty.
    fn read_local(&self) -> Vec<Value> {
        self.local.read_all().unwrap_or_else(|err| {
            warn!(error = %err, "local store unreadable, treating as empty");
            Vec::new()
        })
    }

    /// Read-prepend-write of the local slot. A slot that cannot be read is
    /// left alone rather than overwritten.
    fn append_local(&mut self, duration_ms: u64) -> Result<LogRecord, LocalStoreError> {
        let mut items = self.local.read_all()?;
        let record = LogRecord {
            id: Uuid::new_v4().to_string(),
            duration_ms,
            occurred_at: self.clock.now().trunc_subsecs(3),
        };
        items.insert(0, record.to_raw());
        self.local.write_all(&items)?;

        debug!(id = %record.id, duration_ms, "logged record locally");
        self.records = validate_all(&items);
        self.publish();
        Ok(record)
    }

    fn drop_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        // Anything still queued belongs to the old subscription.
        self.generation += 1;
    }

    fn publish(&mut self) {
        let view = SyncView {
            records: &self.records,
            authority: self.authority,
            notice: self.notice.as_ref(),
        };
        self.observers.notify(&view);
    }
}

impl DurationSink for SyncCoordinator {
    fn record_duration(&mut self, duration_ms: u64) {
        let outcome = self.append(i64::try_from(duration_ms).unwrap_or(i64::MAX));
        debug!(?outcome, "stopwatch duration handed to coordinator");
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.drop_subscription();
    }
}
