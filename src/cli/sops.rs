//! Sops wrapper.
//!
//! Runs `sops` with the vault key exposed through `SOPS_AGE_KEY_FILE`. The
//! key file lives in a private temp directory that is removed before this
//! process exits.

use std::process::Command;

use tracing::debug;
use zeroize::Zeroizing;

use crate::cli::open_vault;
use crate::core::config::Config;
use crate::core::fs as private_fs;
use crate::error::{Result, VaultError};

/// Environment variable sops reads age identities from.
const SOPS_AGE_KEY_FILE: &str = "SOPS_AGE_KEY_FILE";

/// Run sops and exit with its status.
pub fn execute(args: &[String]) -> Result<()> {
    let sops = which::which("sops")
        .map_err(|_| VaultError::Sops("sops not found in PATH".to_string()))?;

    let config = Config::load()?;
    let vault = open_vault(&config)?;

    let dir = tempfile::Builder::new().prefix("age-vault-").tempdir()?;
    let key_file = dir.path().join("keys.txt");
    let contents = Zeroizing::new(format!(
        "# public key: {}\n{}\n",
        vault.public_key(),
        vault.secret().as_str()
    ));
    private_fs::write_private(&key_file, contents.as_bytes())?;

    debug!(sops = %sops.display(), args = args.len(), "running sops");
    let status = Command::new(&sops)
        .args(args)
        .env(SOPS_AGE_KEY_FILE, &key_file)
        .status()
        .map_err(|e| VaultError::Sops(e.to_string()))?;

    // Remove the key before exiting; process::exit skips destructors.
    drop(dir);

    let code = status.code().unwrap_or(1);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
