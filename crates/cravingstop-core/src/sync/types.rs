//! Core types for local/remote record synchronization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::LogRecord;

/// Opaque identity token namespacing the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which store is currently the source of truth for the observable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Remote,
    Local,
}

/// Why the session degraded to local data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    SubscribeFailed,
    WriteFailed,
}

/// Non-fatal, displayable sync condition ("sync degraded, using local data").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncNotice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for SyncNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            NoticeKind::SubscribeFailed => "remote sync unavailable",
            NoticeKind::WriteFailed => "remote write failed",
        };
        write!(f, "{what}, using local data ({})", self.message)
    }
}

/// What observers see on every change.
#[derive(Debug, Clone, Copy)]
pub struct SyncView<'a> {
    /// Newest first.
    pub records: &'a [LogRecord],
    pub authority: Authority,
    pub notice: Option<&'a SyncNotice>,
}

/// Result of an append request. Never an error: failures turn into an
/// authority change or a dropped write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Duration was zero or negative.
    Ignored,
    /// Written to the remote collection; the record shows up with the next snapshot.
    Remote,
    /// Written to the local slot.
    Local { record: LogRecord },
    /// Remote write failed; written locally and the session is now local-only.
    FellBack { record: LogRecord },
    /// No store accepted the write.
    Dropped,
}

impl AppendOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(
            self,
            AppendOutcome::Remote | AppendOutcome::Local { .. } | AppendOutcome::FellBack { .. }
        )
    }
}

/// Current sync status, for hosts that report it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub authority: Authority,
    pub identity: Option<Identity>,
    pub record_count: usize,
    pub notice: Option<SyncNotice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_serializes_as_plain_string() {
        let id = Identity::new("craving-abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"craving-abc\"");
        assert_eq!(id.to_string(), "craving-abc");
    }

    #[test]
    fn notice_display_mentions_local_data() {
        let notice = SyncNotice {
            kind: NoticeKind::WriteFailed,
            message: "offline".into(),
            at: Utc::now(),
        };
        assert_eq!(
            notice.to_string(),
            "remote write failed, using local data (offline)"
        );
    }

    #[test]
    fn outcome_persistence() {
        assert!(!AppendOutcome::Ignored.is_persisted());
        assert!(!AppendOutcome::Dropped.is_persisted());
        assert!(AppendOutcome::Remote.is_persisted());
    }

    #[test]
    fn status_serializes_authority_lowercase() {
        let status = SyncStatus {
            authority: Authority::Remote,
            identity: None,
            record_count: 0,
            notice: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["authority"], "remote");
    }
}
