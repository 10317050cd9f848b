//! Owner-only file helpers.
//!
//! Every file this crate writes holds key material or ciphertext of it, so
//! all writes go through here: parent directories are created 0700 and files
//! land 0600.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::core::constants::{PRIVATE_DIR_MODE, PRIVATE_FILE_MODE};
use crate::error::{Result, VaultError};

/// Create the parent directory of `path` (0700 on Unix) if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }

    debug!(path = %dir.display(), "creating directory");

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(PRIVATE_DIR_MODE)
            .create(dir)
            .map_err(|source| write_err(dir, source))?;
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir).map_err(|source| write_err(dir, source))?;
    }

    Ok(())
}

/// Atomically replace `path` with `contents`, mode 0600.
///
/// The data is written to a temp file in the same directory and renamed
/// over the target, so readers see either the old or the new contents.
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut tmp = private_temp_file(path).map_err(|source| write_err(path, source))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|source| write_err(path, source))?;
    tmp.persist(path)
        .map_err(|e| write_err(path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote private file");
    Ok(())
}

/// An empty 0600 temp file in `path`'s directory, for renaming over `path`.
pub fn private_temp_file(path: &Path) -> io::Result<tempfile::NamedTempFile> {
    let tmp = tempfile::NamedTempFile::new_in(parent_or_cwd(path))?;
    set_private(tmp.path())?;
    Ok(tmp)
}

/// Create `path` with `contents` only if it does not exist yet.
///
/// Returns `Ok(false)` without touching the file when it already exists.
/// The contents are written to a temp file first and linked into place
/// with a no-clobber rename, so two racing callers cannot both observe
/// "created" and nobody ever reads a partially written file.
pub fn create_private(path: &Path, contents: &[u8]) -> Result<bool> {
    ensure_parent_dir(path)?;

    if path.exists() {
        return Ok(false);
    }

    let mut tmp = private_temp_file(path).map_err(|source| write_err(path, source))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|source| write_err(path, source))?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            debug!(path = %path.display(), bytes = contents.len(), "created private file");
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(write_err(path, e.error)),
    }
}

/// Copy `source` to `dest` with owner-only permissions.
pub fn copy_private(source: &Path, dest: &Path) -> Result<()> {
    let contents = fs::read(source).map_err(|e| VaultError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    write_private(dest, &contents)
}

/// Warn when a key file is readable by anyone but its owner.
#[cfg(unix)]
pub fn warn_if_insecure(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = %format!("{:o}", mode),
                "insecure key file permissions"
            );
        }
    }
}

#[cfg(not(unix))]
pub fn warn_if_insecure(_path: &Path) {}

fn parent_or_cwd(path: &Path) -> &Path {
    match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    }
}

#[cfg(unix)]
fn set_private(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(PRIVATE_FILE_MODE))
}

#[cfg(not(unix))]
fn set_private(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn write_err(path: &Path, source: io::Error) -> crate::error::Error {
    VaultError::Write {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
