mod config;
pub mod database;
pub mod local;

pub use config::{Config, RemoteConfig, StorageConfig};
pub use database::Database;
pub use local::{KvLocalStore, LocalStore, MemoryLocalStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/cravingstop[-dev]/` based on CRAVINGSTOP_ENV.
///
/// Set CRAVINGSTOP_ENV=dev to use the development data directory, or
/// CRAVINGSTOP_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("CRAVINGSTOP_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CRAVINGSTOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("cravingstop-dev")
            } else {
                base_dir.join("cravingstop")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
