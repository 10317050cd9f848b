//! First-use creation of the vault key file.
//!
//! The vault key file is created at most once. Creation is a single
//! exclusive open, so two processes bootstrapping concurrently end up with
//! exactly one winner; the loser reads and unwraps the winner's file.

use std::path::Path;

use tracing::{debug, info};

use super::VaultKey;
use crate::core::fs as private_fs;
use crate::core::domain::UserIdentity;
use crate::error::{Result, VaultError};

/// How the vault key in a [`Bootstrapped`] came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// This call generated the key and wrote the vault key file.
    Created,
    /// The vault key file already existed and was unwrapped.
    Existing,
}

/// Result of [`bootstrap`].
#[derive(Debug)]
pub struct Bootstrapped {
    pub key: VaultKey,
    pub origin: Origin,
}

impl Bootstrapped {
    /// Whether this call created the vault key file.
    pub fn created(&self) -> bool {
        self.origin == Origin::Created
    }
}

/// Obtain the vault key, creating the vault key file if it does not exist.
///
/// When the file is absent a new key is generated, wrapped for `holder`,
/// and written with an exclusive create. The holder's copy is always
/// durable before the key is handed back, so a later failure (for example
/// while wrapping for another recipient) never strands a key nobody can
/// unwrap.
///
/// When the file exists it is unwrapped with `holder`; a holder that is not
/// a recipient of the envelope gets `CipherError::NoMatchingKey`.
pub fn bootstrap(vault_key_file: &Path, holder: &UserIdentity) -> Result<Bootstrapped> {
    if !vault_key_file.exists() {
        let key = VaultKey::generate();
        let envelope = key.wrap(&holder.recipient()?)?;

        if private_fs::create_private(vault_key_file, &envelope)? {
            info!(path = %vault_key_file.display(), "created vault key");
            return Ok(Bootstrapped {
                key,
                origin: Origin::Created,
            });
        }

        // Someone else created it between the check and the open.
        debug!(path = %vault_key_file.display(), "vault key created concurrently, reusing");
    }

    let key = VaultKey::load(vault_key_file, holder)?;
    Ok(Bootstrapped {
        key,
        origin: Origin::Existing,
    })
}

/// Create the vault key file for `holder`, failing if it already exists.
///
/// # Errors
///
/// Returns `VaultError::AlreadyExists` when a vault key file is present.
pub fn create(vault_key_file: &Path, holder: &UserIdentity) -> Result<VaultKey> {
    if vault_key_file.exists() {
        return Err(VaultError::AlreadyExists(vault_key_file.to_path_buf()).into());
    }

    let key = VaultKey::generate();
    let envelope = key.wrap(&holder.recipient()?)?;

    if !private_fs::create_private(vault_key_file, &envelope)? {
        return Err(VaultError::AlreadyExists(vault_key_file.to_path_buf()).into());
    }

    info!(path = %vault_key_file.display(), "created vault key");
    Ok(key)
}
