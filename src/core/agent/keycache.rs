//! In-memory SSH key cache.
//!
//! The cache is an immutable [`KeySnapshot`] behind a single swappable
//! reference. Readers capture one `Arc<KeySnapshot>` per request; a reload
//! builds a complete new snapshot off to the side and publishes it with one
//! pointer swap, so a lookup never observes a half-built cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ssh_key::public::KeyData;
use ssh_key::{HashAlg, PrivateKey, PublicKey};
use tracing::{debug, warn};

use crate::core::constants::SSH_KEY_EXTENSION;
use crate::core::vault::VaultKey;
use crate::error::{AgentError, Result};

/// One decrypted SSH key entry.
pub struct KeyEntry {
    /// File the entry was loaded from.
    pub path: PathBuf,

    /// File name, used as the identity comment.
    pub comment: String,

    /// SHA-256 fingerprint (`SHA256:...`).
    pub fingerprint: String,

    private_key: PrivateKey,
    public_blob: Vec<u8>,
}

impl KeyEntry {
    /// Decrypt and parse one `*.age` entry.
    ///
    /// # Errors
    ///
    /// `AgentError::KeyDecryption` when the envelope cannot be opened with
    /// the vault key, `AgentError::KeyParse` when the payload is not an
    /// unencrypted OpenSSH private key.
    pub fn load(path: &Path, vault: &VaultKey) -> Result<Self> {
        let decryption_err = |reason: String| AgentError::KeyDecryption {
            path: path.to_path_buf(),
            reason,
        };
        let parse_err = |reason: String| AgentError::KeyParse {
            path: path.to_path_buf(),
            reason,
        };

        let envelope = fs::read(path).map_err(|e| decryption_err(e.to_string()))?;
        let plaintext = vault
            .decrypt(&envelope)
            .map_err(|e| decryption_err(e.to_string()))?;

        let pem = std::str::from_utf8(&plaintext)
            .map_err(|_| parse_err("payload is not UTF-8".to_string()))?;
        let private_key = PrivateKey::from_openssh(pem).map_err(|e| parse_err(e.to_string()))?;
        if private_key.is_encrypted() {
            return Err(parse_err("passphrase-protected keys are not supported".to_string()).into());
        }

        let public_key = private_key.public_key();
        let public_blob = public_key
            .to_bytes()
            .map_err(|e| parse_err(e.to_string()))?;
        let fingerprint = public_key.fingerprint(HashAlg::Sha256).to_string();

        let comment = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            comment,
            fingerprint,
            private_key,
            public_blob,
        })
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        self.private_key.public_key()
    }

    /// Key type name, e.g. `ssh-ed25519`.
    pub fn algorithm(&self) -> String {
        self.private_key.algorithm().to_string()
    }

    /// Canonical wire encoding of the public key.
    pub fn public_blob(&self) -> &[u8] {
        &self.public_blob
    }
}

impl std::fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEntry")
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// An entry that was found but could not be loaded.
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// The result of one directory scan. Never mutated once built.
#[derive(Debug, Default)]
pub struct KeySnapshot {
    keys: Vec<KeyEntry>,
    skipped: Vec<SkippedEntry>,
}

impl KeySnapshot {
    /// Loaded entries, in path order.
    pub fn keys(&self) -> &[KeyEntry] {
        &self.keys
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the entry whose public key has exactly this wire encoding.
    pub fn find(&self, blob: &[u8]) -> Option<&KeyEntry> {
        self.keys.iter().find(|entry| entry.public_blob == blob)
    }

    /// Find the entry matching a public key from an agent request.
    pub fn find_key_data(&self, key: &KeyData) -> Option<&KeyEntry> {
        let blob = PublicKey::from(key.clone()).to_bytes().ok()?;
        self.find(&blob)
    }
}

/// List the `*.age` files in `dir`, sorted by path.
///
/// # Errors
///
/// Returns `AgentError::DirectoryScan` when the directory cannot be read.
pub fn candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| AgentError::DirectoryScan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AgentError::DirectoryScan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_age = path
            .extension()
            .is_some_and(|ext| ext == SSH_KEY_EXTENSION);
        if is_age && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Scan `dir` and decrypt every entry with `vault`.
///
/// Entries that fail to decrypt or parse are logged and recorded in
/// [`KeySnapshot::skipped`]; only a failure to enumerate the directory is
/// returned as an error.
pub fn scan(dir: &Path, vault: &VaultKey) -> Result<KeySnapshot> {
    let mut snapshot = KeySnapshot::default();

    for path in candidates(dir)? {
        match KeyEntry::load(&path, vault) {
            Ok(entry) => {
                debug!(
                    path = %path.display(),
                    fingerprint = %entry.fingerprint,
                    "loaded SSH key"
                );
                snapshot.keys.push(entry);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping SSH key");
                snapshot.skipped.push(SkippedEntry {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        dir = %dir.display(),
        loaded = snapshot.keys.len(),
        skipped = snapshot.skipped.len(),
        "scanned keys directory"
    );
    Ok(snapshot)
}

/// Shared key cache for all agent connections.
pub struct KeyCache {
    dir: PathBuf,
    vault: Arc<VaultKey>,
    current: RwLock<Arc<KeySnapshot>>,
}

impl KeyCache {
    /// Build the cache with an initial scan of `dir`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::DirectoryScan` if the directory cannot be
    /// enumerated. Individual bad entries never fail construction.
    pub fn open(dir: impl Into<PathBuf>, vault: Arc<VaultKey>) -> Result<Self> {
        let dir = dir.into();
        let snapshot = scan(&dir, &vault)?;
        Ok(Self {
            dir,
            vault,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<KeySnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Rescan the directory and publish the result.
    ///
    /// On a scan error the previous snapshot stays in place and the error is
    /// logged; the returned snapshot is whichever one is current afterwards.
    pub fn reload(&self) -> Arc<KeySnapshot> {
        match scan(&self.dir, &self.vault) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                match self.current.write() {
                    Ok(mut guard) => *guard = Arc::clone(&snapshot),
                    Err(poisoned) => *poisoned.into_inner() = Arc::clone(&snapshot),
                }
                debug!(keys = snapshot.len(), "key cache reloaded");
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "reload failed, keeping previous keys");
                self.snapshot()
            }
        }
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("dir", &self.dir)
            .field("keys", &self.snapshot().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cipher::Armor;
    use ssh_key::{Algorithm, LineEnding};
    use tempfile::TempDir;

    fn write_key(dir: &Path, name: &str, vault: &VaultKey) -> PrivateKey {
        let key = PrivateKey::random(&mut ssh_key::rand_core::OsRng, Algorithm::Ed25519).unwrap();
        let pem = key.to_openssh(LineEnding::LF).unwrap();
        let mut envelope = Vec::new();
        vault
            .encrypt_stream(pem.as_bytes(), &mut envelope, Armor::Ascii)
            .unwrap();
        fs::write(dir.join(name), envelope).unwrap();
        key
    }

    #[test]
    fn test_scan_skips_bad_entries() {
        let tmp = TempDir::new().unwrap();
        let vault = VaultKey::generate();
        let other = VaultKey::generate();

        write_key(tmp.path(), "b.age", &vault);
        write_key(tmp.path(), "a.age", &vault);
        write_key(tmp.path(), "foreign.age", &other);
        fs::write(tmp.path().join("garbage.age"), b"not an envelope").unwrap();
        write_key(tmp.path(), "ignored.txt", &vault);

        let snapshot = scan(tmp.path(), &vault).unwrap();

        let comments: Vec<_> = snapshot.keys().iter().map(|k| k.comment.as_str()).collect();
        assert_eq!(comments, vec!["a.age", "b.age"]);
        assert_eq!(snapshot.skipped().len(), 2);
    }

    #[test]
    fn test_scan_skips_non_key_payload() {
        let tmp = TempDir::new().unwrap();
        let vault = VaultKey::generate();
        let mut envelope = Vec::new();
        vault
            .encrypt_stream(&b"hello"[..], &mut envelope, Armor::Binary)
            .unwrap();
        fs::write(tmp.path().join("hello.age"), envelope).unwrap();

        let snapshot = scan(tmp.path(), &vault).unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.skipped()[0].reason.contains("parse"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let vault = VaultKey::generate();

        let result = scan(&tmp.path().join("missing"), &vault);
        assert!(matches!(
            result,
            Err(crate::error::Error::Agent(AgentError::DirectoryScan { .. }))
        ));
    }

    #[test]
    fn test_find_by_blob() {
        let tmp = TempDir::new().unwrap();
        let vault = VaultKey::generate();
        let key = write_key(tmp.path(), "id.age", &vault);
        let stranger =
            PrivateKey::random(&mut ssh_key::rand_core::OsRng, Algorithm::Ed25519).unwrap();

        let snapshot = scan(tmp.path(), &vault).unwrap();

        let found = snapshot.find_key_data(key.public_key().key_data()).unwrap();
        assert_eq!(found.comment, "id.age");
        assert!(snapshot
            .find_key_data(stranger.public_key().key_data())
            .is_none());
    }

    #[test]
    fn test_reload_replaces_snapshot() {
        let tmp = TempDir::new().unwrap();
        let vault = Arc::new(VaultKey::generate());
        write_key(tmp.path(), "one.age", &vault);

        let cache = KeyCache::open(tmp.path(), Arc::clone(&vault)).unwrap();
        let before = cache.snapshot();
        assert_eq!(before.len(), 1);

        write_key(tmp.path(), "two.age", &vault);
        fs::remove_file(tmp.path().join("one.age")).unwrap();
        let after = cache.reload();

        assert_eq!(after.keys()[0].comment, "two.age");
        assert_eq!(after.len(), 1);
        // Captured snapshots are unaffected.
        assert_eq!(before.keys()[0].comment, "one.age");
    }

    #[test]
    fn test_reload_error_keeps_previous() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("keys");
        fs::create_dir(&dir).unwrap();
        let vault = Arc::new(VaultKey::generate());
        write_key(&dir, "one.age", &vault);

        let cache = KeyCache::open(&dir, vault).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let after = cache.reload();
        assert_eq!(after.len(), 1);
    }
}
