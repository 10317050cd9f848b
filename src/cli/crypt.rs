//! Encrypt and decrypt commands.
//!
//! Both stream, so arbitrarily large inputs run in constant memory.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::cli::open_vault;
use crate::core::cipher::Armor;
use crate::core::config::Config;
use crate::core::fs as private_fs;
use crate::error::{Result, VaultError};

/// Encrypt `file` (or stdin) with the vault key.
pub fn encrypt(file: Option<&Path>, output: Option<&Path>, armor: bool) -> Result<()> {
    let config = Config::load()?;
    let vault = open_vault(&config)?;
    let armor = if armor { Armor::Ascii } else { Armor::Binary };

    let input = open_input(file)?;
    let bytes = with_output(output, |out| vault.encrypt_stream(input, out, armor))?;

    debug!(bytes, "encrypted");
    Ok(())
}

/// Decrypt `file` (or stdin) with the vault key.
pub fn decrypt(file: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let vault = open_vault(&config)?;

    let input = open_input(file)?;
    let bytes = with_output(output, |out| vault.decrypt_stream(input, out))?;

    debug!(bytes, "decrypted");
    Ok(())
}

fn open_input(file: Option<&Path>) -> Result<Box<dyn Read>> {
    match file {
        Some(path) => {
            let file = File::open(path).map_err(|source| VaultError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Run `write` against the output file (0600) or stdout.
///
/// File output goes to a private temp file beside `path` and is renamed
/// into place only after a successful run, so an existing file never holds
/// plaintext under its old permissions and a failed run leaves it untouched.
fn with_output<F>(output: Option<&Path>, write: F) -> Result<u64>
where
    F: FnOnce(&mut dyn Write) -> Result<u64>,
{
    let Some(path) = output else {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        let bytes = write(&mut out)?;
        out.flush()?;
        return Ok(bytes);
    };

    private_fs::ensure_parent_dir(path)?;
    let write_err = |source: io::Error| VaultError::Write {
        path: path.to_path_buf(),
        source,
    };

    let temp = private_fs::private_temp_file(path).map_err(write_err)?;
    let mut out = BufWriter::new(temp);
    let bytes = write(&mut out)?;
    let temp = out.into_inner().map_err(|e| write_err(e.into_error()))?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(bytes)
}
