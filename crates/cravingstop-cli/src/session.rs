//! Wiring shared by the commands: config, local slot, optional remote, and
//! the identity transition.

use cravingstop_core::storage::Database;
use cravingstop_core::sync::get_or_create_identity;
use cravingstop_core::{Config, DirRemoteStore, KvLocalStore, SyncCoordinator};
use tracing::{debug, warn};

pub struct Session {
    pub config: Config,
    pub sync: SyncCoordinator,
}

/// Build the coordinator and run the initial identity transition.
///
/// A missing or unreadable identity file is not fatal: the session starts
/// on local data.
pub fn open() -> Result<Session, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let local = KvLocalStore::new(db, config.storage.local_key.clone());

    let mut sync = SyncCoordinator::new(local);
    if let Some(dir) = config.remote.configured_dir() {
        debug!(dir = %dir.display(), "using directory remote");
        sync = sync.with_remote(DirRemoteStore::new(dir, config.app_id.clone()));
    }

    match get_or_create_identity() {
        Ok(identity) => sync.on_identity_available(identity),
        Err(e) => {
            warn!(error = %e, "no identity available");
            sync.on_identity_unavailable();
        }
    }

    Ok(Session { config, sync })
}

/// `HH:MM:SS.mmm`
pub fn format_duration(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1_000) % 60;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
