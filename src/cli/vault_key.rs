//! Vault key commands.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cli::{open_vault, output, RecipientArgs};
use crate::core::config::Config;
use crate::core::domain::{RecipientKey, UserIdentity};
use crate::core::fs as private_fs;
use crate::core::vault;
use crate::error::{IdentityError, Result};

/// Where a freshly wrapped envelope goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Replace the configured vault key file.
    VaultKeyFile,
    /// Write to an explicit path.
    Path(PathBuf),
    /// Write to stdout.
    Stdout,
}

impl Disposition {
    pub fn new(output: Option<PathBuf>, stdout: bool) -> Self {
        match (output, stdout) {
            (Some(path), _) => Self::Path(path),
            (None, true) => Self::Stdout,
            (None, false) => Self::VaultKeyFile,
        }
    }
}

/// Wrap the vault key for another recipient.
///
/// On first use there is no vault key yet: one is generated and wrapped for
/// the configured identity before anything else happens.
pub fn encrypt(args: RecipientArgs, disposition: Disposition) -> Result<()> {
    let config = Config::load()?;
    let recipient = resolve_recipient(args)?;

    let holder = UserIdentity::load(&config.identity_file)?;
    let bootstrapped = vault::bootstrap(&config.vault_key_file, &holder)?;
    if bootstrapped.created() {
        output::success(&format!(
            "created vault key at {}",
            output::path(&config.vault_key_file)
        ));
    }

    let envelope = bootstrapped.key.wrap(&recipient)?;

    match disposition {
        Disposition::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&envelope)?;
            stdout.flush()?;
        }
        Disposition::Path(path) => {
            private_fs::write_private(&path, &envelope)?;
            output::success(&format!(
                "vault key wrapped for {} written to {}",
                recipient,
                output::path(&path)
            ));
        }
        Disposition::VaultKeyFile => {
            let holder_recipient = holder.recipient().ok().map(|r| r.to_string());
            if holder_recipient.as_deref() != Some(recipient.to_string().as_str()) {
                output::warn(&format!(
                    "{} is now wrapped for {}; your identity can no longer unwrap it",
                    output::path(&config.vault_key_file),
                    recipient
                ));
            }
            private_fs::write_private(&config.vault_key_file, &envelope)?;
            output::success(&format!(
                "vault key wrapped for {} written to {}",
                recipient,
                output::path(&config.vault_key_file)
            ));
        }
    }

    Ok(())
}

fn resolve_recipient(args: RecipientArgs) -> Result<RecipientKey> {
    match (args.pubkey, args.pubkey_file, args.identity) {
        (Some(key), _, _) => RecipientKey::parse(&key),
        (None, Some(path), _) => RecipientKey::from_file(&path),
        (None, None, Some(path)) => UserIdentity::load(&path)?.recipient(),
        (None, None, None) => {
            Err(IdentityError::NoRecipient("no recipient given".to_string()).into())
        }
    }
}

/// Create a brand-new vault key for the configured identity.
pub fn from_identity() -> Result<()> {
    let config = Config::load()?;
    let holder = UserIdentity::load(&config.identity_file)?;

    let key = vault::create(&config.vault_key_file, &holder)?;

    output::success(&format!(
        "created vault key at {}",
        output::path(&config.vault_key_file)
    ));
    output::kv("public key:", key.public_key());
    Ok(())
}

/// Install an envelope as the vault key file.
pub fn set(file: &Path) -> Result<()> {
    let config = Config::load()?;
    private_fs::copy_private(file, &config.vault_key_file)?;

    output::success(&format!(
        "vault key installed at {}",
        output::path(&config.vault_key_file)
    ));
    Ok(())
}

/// Print the vault key's public key.
pub fn pubkey(out: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let key = open_vault(&config)?;
    let public_key = key.public_key().to_string();

    match out {
        Some(path) => {
            private_fs::write_private(path, format!("{}\n", public_key).as_bytes())?;
            output::success(&format!("public key written to {}", output::path(path)));
        }
        None => output::data(public_key),
    }
    Ok(())
}
