//! Local store adapter: the whole record collection as one JSON array under
//! one fixed key.
//!
//! Reads and writes are synchronous and full-collection. The fallback append
//! path does read-prepend-write and assumes a single writer.

use std::cell::RefCell;

use serde_json::Value;

use super::database::Database;
use crate::error::LocalStoreError;

/// Default slot key, kept compatible with data written by earlier builds.
pub const DEFAULT_LOCAL_KEY: &str = "cravingLogs";

pub trait LocalStore {
    /// Read every stored raw item. An absent slot reads as empty.
    fn read_all(&self) -> Result<Vec<Value>, LocalStoreError>;

    /// Replace the stored collection.
    fn write_all(&self, items: &[Value]) -> Result<(), LocalStoreError>;
}

/// Slot in the SQLite `kv` table.
pub struct KvLocalStore {
    db: Database,
    key: String,
}

impl KvLocalStore {
    pub fn new(db: Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

impl LocalStore for KvLocalStore {
    fn read_all(&self) -> Result<Vec<Value>, LocalStoreError> {
        let stored = self
            .db
            .kv_get(&self.key)
            .map_err(|source| LocalStoreError::Database {
                key: self.key.clone(),
                source,
            })?;
        match stored {
            None => Ok(Vec::new()),
            Some(blob) => parse_blob(&self.key, &blob),
        }
    }

    fn write_all(&self, items: &[Value]) -> Result<(), LocalStoreError> {
        let blob = serde_json::to_string(items)?;
        self.db
            .kv_set(&self.key, &blob)
            .map_err(|source| LocalStoreError::Database {
                key: self.key.clone(),
                source,
            })
    }
}

/// In-memory slot holding the serialized blob, so corrupt payloads can be
/// simulated the same way they happen on disk.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    blob: RefCell<Option<String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw blob, valid or not.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RefCell::new(Some(blob.into())),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.borrow().clone()
    }
}

impl LocalStore for MemoryLocalStore {
    fn read_all(&self) -> Result<Vec<Value>, LocalStoreError> {
        match self.blob.borrow().as_deref() {
            None => Ok(Vec::new()),
            Some(blob) => parse_blob(DEFAULT_LOCAL_KEY, blob),
        }
    }

    fn write_all(&self, items: &[Value]) -> Result<(), LocalStoreError> {
        let blob = serde_json::to_string(items)?;
        *self.blob.borrow_mut() = Some(blob);
        Ok(())
    }
}

impl<S: LocalStore + ?Sized> LocalStore for std::rc::Rc<S> {
    fn read_all(&self) -> Result<Vec<Value>, LocalStoreError> {
        (**self).read_all()
    }

    fn write_all(&self, items: &[Value]) -> Result<(), LocalStoreError> {
        (**self).write_all(items)
    }
}

fn parse_blob(key: &str, blob: &str) -> Result<Vec<Value>, LocalStoreError> {
    match serde_json::from_str::<Value>(blob) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(LocalStoreError::Corrupt {
            key: key.to_string(),
            message: format!("expected array, found {}", json_kind(&other)),
        }),
        Err(e) => Err(LocalStoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kv_slot_roundtrip() {
        let store = KvLocalStore::new(Database::open_memory().unwrap(), DEFAULT_LOCAL_KEY);
        assert!(store.read_all().unwrap().is_empty());

        let items = vec![json!({"id": "1", "durationMs": 10, "occurredAt": "2025-01-01T00:00:00.000Z"})];
        store.write_all(&items).unwrap();
        assert_eq!(store.read_all().unwrap(), items);
    }

    #[test]
    fn kv_slot_corrupt_payload_is_error() {
        let db = Database::open_memory().unwrap();
        db.kv_set(DEFAULT_LOCAL_KEY, "{not json").unwrap();
        let store = KvLocalStore::new(db, DEFAULT_LOCAL_KEY);
        assert!(matches!(store.read_all(), Err(LocalStoreError::Corrupt { .. })));
    }

    #[test]
    fn non_array_payload_is_corrupt() {
        let store = MemoryLocalStore::with_blob(r#"{"id": 1}"#);
        let err = store.read_all().unwrap_err();
        assert!(err.to_string().contains("expected array, found object"));
    }

    #[test]
    fn memory_slot_keeps_serialized_blob() {
        let store = MemoryLocalStore::new();
        assert!(store.blob().is_none());
        store.write_all(&[json!({"id": "a"})]).unwrap();
        assert_eq!(store.blob().as_deref(), Some(r#"[{"id":"a"}]"#));
    }
}
