//! Identity commands.

use std::path::Path;

use crate::cli::output;
use crate::core::config::Config;
use crate::core::domain::UserIdentity;
use crate::core::fs as private_fs;
use crate::error::Result;

/// Install an identity file as the configured identity.
///
/// The file is parsed first so a typo never replaces a working identity.
pub fn set(file: &Path) -> Result<()> {
    let config = Config::load()?;
    let identity = UserIdentity::load(file)?;

    private_fs::copy_private(file, &config.identity_file)?;

    output::success(&format!(
        "identity installed at {}",
        output::path(&config.identity_file)
    ));
    if let Ok(recipient) = identity.recipient() {
        output::kv("public key:", recipient);
    }
    Ok(())
}

/// Print the configured identity's public key.
pub fn pubkey(out: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let identity = UserIdentity::load(&config.identity_file)?;
    let recipient = identity.recipient()?.to_string();

    match out {
        Some(path) => {
            private_fs::write_private(path, format!("{}\n", recipient).as_bytes())?;
            output::success(&format!("public key written to {}", output::path(path)));
        }
        None => output::data(recipient),
    }
    Ok(())
}
