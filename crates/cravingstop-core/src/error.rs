//! Core error types for cravingstop-core.
//!
//! The sync layer itself never returns these across its public operations;
//! they flow through the storage, config and identity plumbing and are
//! converted into authority transitions or dropped items at the coordinator.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cravingstop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local record slot errors
    #[error("Local store error: {0}")]
    Local(#[from] LocalStoreError),

    /// Remote collection errors
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Identity file errors
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors from the device-local record slot.
#[derive(Error, Debug)]
pub enum LocalStoreError {
    /// The backing key-value table failed
    #[error("Local slot '{key}' unavailable: {source}")]
    Database {
        key: String,
        #[source]
        source: DatabaseError,
    },

    /// The stored blob is not a JSON array
    #[error("Local slot '{key}' holds a corrupt payload: {message}")]
    Corrupt { key: String, message: String },

    /// The collection could not be serialized
    #[error("Failed to serialize local records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the remote authoritative collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote could not be reached
    #[error("Remote unreachable: {0}")]
    Unreachable(String),

    /// The remote refused the operation
    #[error("Remote rejected request: {0}")]
    Rejected(String),

    /// Underlying storage failure on the remote side
    #[error("Remote IO failure: {0}")]
    Io(String),

    /// Remote payload could not be decoded
    #[error("Remote payload invalid: {0}")]
    Json(String),
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Json(err.to_string())
    }
}

/// Identity file errors.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid identity format: {0}")]
    InvalidFormat(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}
