// Per-device identity used to namespace the remote collection.
// Format: "craving-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use super::types::Identity;
use crate::error::{CoreError, IdentityError};
use crate::storage::data_dir;

const IDENTITY_FILE: &str = "identity.txt";
const IDENTITY_PREFIX: &str = "craving-";

/// Get or create the identity stored under `path`.
///
/// # Arguments
/// * `path` - Directory where identity.txt is stored
///
/// # Returns
/// Identity in format "craving-<uuid>"
pub fn get_or_create_identity_at(path: &Path) -> Result<Identity, IdentityError> {
    let identity_path = path.join(IDENTITY_FILE);

    if identity_path.exists() {
        let content = fs::read_to_string(&identity_path)?;
        let token = content.trim().to_string();

        return if is_valid_token(&token) {
            Ok(Identity::new(token))
        } else {
            Err(IdentityError::InvalidFormat(token))
        };
    }

    let token = format!("{}{}", IDENTITY_PREFIX, Uuid::new_v4());

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let mut file = fs::File::create(&identity_path)?;
    writeln!(file, "{}", token)?;

    Ok(Identity::new(token))
}

/// Get or create the identity in the default data directory.
pub fn get_or_create_identity() -> Result<Identity, CoreError> {
    Ok(get_or_create_identity_at(&data_dir()?)?)
}

fn is_valid_token(token: &str) -> bool {
    token
        .strip_prefix(IDENTITY_PREFIX)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
}
