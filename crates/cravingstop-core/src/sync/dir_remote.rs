//! Directory-backed remote.
//!
//! Each identity's collection is one JSON array at
//! `<root>/artifacts/<app_id>/users/<identity>/cravings.json`, so any synced
//! or network folder can act as the shared store. The store assigns ids and
//! timestamps at write time. Changes made by other processes are noticed in
//! [`RemoteStore::poll`] by comparing file metadata.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use chrono::{SecondsFormat, SubsecRound};
use serde_json::{json, Value};
use uuid::Uuid;

use super::remote::{NewEntry, RemoteStore, RemoteSubscription, SnapshotSink, Subscribers};
use super::types::Identity;
use crate::clock::{Clock, SystemClock};
use crate::error::RemoteError;

const COLLECTION_FILE: &str = "cravings.json";

type Fingerprint = Option<(SystemTime, u64)>;

#[derive(Clone)]
pub struct DirRemoteStore {
    root: PathBuf,
    app_id: String,
    subscribers: Subscribers,
    seen: Rc<RefCell<HashMap<Identity, Fingerprint>>>,
    clock: Rc<dyn Clock>,
}

impl DirRemoteStore {
    pub fn new(root: impl Into<PathBuf>, app_id: impl Into<String>) -> Self {
        Self::with_clock(root, app_id, Rc::new(SystemClock))
    }

    pub fn with_clock(
        root: impl Into<PathBuf>,
        app_id: impl Into<String>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            root: root.into(),
            app_id: app_id.into(),
            subscribers: Subscribers::default(),
            seen: Rc::new(RefCell::new(HashMap::new())),
            clock,
        }
    }

    /// Path of `identity`'s collection file.
    pub fn collection_path(&self, identity: &Identity) -> Result<PathBuf, RemoteError> {
        let token = identity.as_str();
        let safe = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(RemoteError::Rejected(format!(
                "identity '{token}' is not a valid collection name"
            )));
        }
        Ok(self
            .root
            .join("artifacts")
            .join(&self.app_id)
            .join("users")
            .join(token)
            .join(COLLECTION_FILE))
    }

    fn ensure_reachable(&self) -> Result<(), RemoteError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(RemoteError::Unreachable(format!(
                "{} is not an accessible directory",
                self.root.display()
            )))
        }
    }

    fn read_collection(&self, path: &Path) -> Result<Vec<Value>, RemoteError> {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Array(items) => Ok(items),
                _ => Err(RemoteError::Json(format!(
                    "{} does not hold an array",
                    path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn remember(&self, identity: &Identity, path: &Path) {
        self.seen
            .borrow_mut()
            .insert(identity.clone(), fingerprint(path));
    }
}

impl RemoteStore for DirRemoteStore {
    fn subscribe(
        &self,
        identity: &Identity,
        sink: SnapshotSink,
    ) -> Result<RemoteSubscription, RemoteError> {
        self.ensure_reachable()?;
        let path = self.collection_path(identity)?;
        let items = self.read_collection(&path)?;
        self.remember(identity, &path);
        sink.snapshot(items);
        Ok(self.subscribers.add(identity, sink))
    }

    fn write(&self, identity: &Identity, entry: &NewEntry) -> Result<(), RemoteError> {
        self.ensure_reachable()?;
        let path = self.collection_path(identity)?;
        let mut items = self.read_collection(&path)?;

        let stamp = self.clock.now().trunc_subsecs(3);
        items.push(json!({
            "id": Uuid::new_v4().to_string(),
            "durationMs": entry.duration_ms,
            "occurredAt": stamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&items)?)?;
        fs::rename(&tmp, &path)?;

        self.remember(identity, &path);
        self.subscribers.publish(identity, &items);
        Ok(())
    }

    fn poll(&self) {
        for identity in self.subscribers.identities() {
            if let Err(err) = self.ensure_reachable() {
                self.subscribers.fail(&identity, &err);
                continue;
            }
            let Ok(path) = self.collection_path(&identity) else {
                continue;
            };
            let current = fingerprint(&path);
            let previous = self.seen.borrow().get(&identity).copied();
            if previous == Some(current) {
                continue;
            }
            self.seen.borrow_mut().insert(identity.clone(), current);
            // A collection never shrinks to nothing.
            if matches!(previous, Some(Some(_))) && current.is_none() {
                let err = RemoteError::Io(format!("{} disappeared", path.display()));
                self.subscribers.fail(&identity, &err);
                continue;
            }
            match self.read_collection(&path) {
                Ok(items) => self.subscribers.publish(&identity, &items),
                Err(err) => self.subscribers.fail(&identity, &err),
            }
        }
    }
}

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}
