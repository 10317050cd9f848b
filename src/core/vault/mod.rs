//! Vault key store.
//!
//! The vault key is an X25519 keypair shared by every member of the vault.
//! It only ever exists in plaintext inside a [`VaultKey`] value; on disk it
//! is always an envelope wrapped for one user's identity.
//!
//! ```text
//!  identity.txt ──unwrap──► VaultKey ──encrypt_stream──► secrets
//!        ▲                     │
//!  vault_key.age ◄───wrap──────┘ (one envelope per recipient)
//! ```

pub mod bootstrap;

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::cipher::{self, Armor};
use crate::core::domain::{RecipientKey, UserIdentity};
use crate::error::{CipherError, Result, VaultError};

pub use bootstrap::{bootstrap, create, Bootstrapped, Origin};

/// The decrypted vault key.
pub struct VaultKey {
    identity: x25519::Identity,
}

impl VaultKey {
    /// Generate a fresh vault key from the OS CSPRNG.
    pub fn generate() -> Self {
        debug!("generating vault key");
        Self {
            identity: x25519::Identity::generate(),
        }
    }

    /// Parse the canonical serialized form (`AGE-SECRET-KEY-1...`).
    ///
    /// Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidVaultKey` when no line holds a key.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let line = secret
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| CipherError::InvalidVaultKey("empty payload".to_string()))?;

        let identity = line
            .parse::<x25519::Identity>()
            .map_err(|e: &str| CipherError::InvalidVaultKey(e.to_string()))?;

        Ok(Self { identity })
    }

    /// Wrap this key for `recipient`.
    ///
    /// The envelope is ASCII-armored so it can be pasted or printed safely.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` when the recipient cannot be
    /// encrypted to (for example a plugin that is not installed).
    pub fn wrap(&self, recipient: &RecipientKey) -> Result<Vec<u8>> {
        debug!(recipient = %recipient, "wrapping vault key");
        let secret = self.secret();
        recipient.encrypt(secret.as_bytes(), Armor::Ascii)
    }

    /// Unwrap an envelope with the holder's identity.
    ///
    /// This is the only access check there is: if the envelope was not
    /// wrapped for `holder`, this fails with `CipherError::NoMatchingKey`.
    pub fn unwrap(envelope: &[u8], holder: &UserIdentity) -> Result<Self> {
        let payload = holder.decrypt(envelope)?;
        let secret = std::str::from_utf8(&payload)
            .map_err(|_| CipherError::InvalidVaultKey("payload is not UTF-8".to_string()))?;
        let key = Self::from_secret(secret)?;

        debug!(public_key = %key.public_key(), "vault key unwrapped");
        Ok(key)
    }

    /// Read the vault key file and unwrap it.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` when the file is missing.
    pub fn load(path: &Path, holder: &UserIdentity) -> Result<Self> {
        debug!(path = %path.display(), "loading vault key");
        let envelope = fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                VaultError::NotFound(path.to_path_buf())
            } else {
                VaultError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::unwrap(&envelope, holder)
    }

    /// Public half of the vault key.
    pub fn public_key(&self) -> x25519::Recipient {
        self.identity.to_public()
    }

    /// Stream-encrypt `input` to `output` under the vault key.
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
        armor: Armor,
    ) -> Result<u64> {
        encrypt_stream(&self.public_key(), input, output, armor)
    }

    /// Stream-decrypt an envelope produced under the vault key.
    pub fn decrypt_stream<R: Read, W: Write>(&self, input: R, output: W) -> Result<u64> {
        cipher::decrypt_stream(input, output, &self.identity)
    }

    /// Decrypt a small envelope held in memory.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        cipher::decrypt(envelope, &self.identity)
    }

    /// The canonical serialized form. Handle with care.
    pub fn secret(&self) -> Zeroizing<String> {
        Zeroizing::new(self.identity.to_string().expose_secret().to_string())
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("public_key", &self.public_key().to_string())
            .finish_non_exhaustive()
    }
}

/// Stream-encrypt with only the vault's public key.
///
/// Anyone holding the public key can add secrets without being able to
/// read them back.
pub fn encrypt_stream<R: Read, W: Write>(
    public_key: &x25519::Recipient,
    input: R,
    output: W,
    armor: Armor,
) -> Result<u64> {
    cipher::encrypt_stream(input, output, &[public_key], armor)
}
