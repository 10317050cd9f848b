//! Recipient (public key) type.
//!
//! A recipient is whoever an envelope is wrapped for: a native X25519 key
//! (`age1...`) or a key held by an age plugin (`age1<plugin>1...`).

use std::fmt;
use std::fs;
use std::path::Path;

use age::{plugin, x25519};

use super::TerminalPrompts;
use crate::core::cipher::{self, Armor};
use crate::error::{IdentityError, Result};

/// A public key envelopes can be encrypted for.
#[derive(Clone)]
pub enum RecipientKey {
    /// Native age X25519 recipient.
    Native(x25519::Recipient),
    /// Recipient handled by an external `age-plugin-*` binary.
    Plugin(plugin::Recipient),
}

impl RecipientKey {
    /// Parse a recipient from a literal string.
    ///
    /// Blank lines and `#` comments are skipped; the first remaining line is
    /// parsed as a native recipient, then as a plugin recipient.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NoRecipient` for input without a key line and
    /// `IdentityError::InvalidRecipient` when the line is not a public key.
    pub fn parse(input: &str) -> Result<Self> {
        let line = input
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| IdentityError::NoRecipient(input.trim().to_string()))?;

        if let Ok(recipient) = line.parse::<x25519::Recipient>() {
            return Ok(Self::Native(recipient));
        }
        if let Ok(recipient) = line.parse::<plugin::Recipient>() {
            return Ok(Self::Plugin(recipient));
        }

        Err(IdentityError::InvalidRecipient(line.to_string()).into())
    }

    /// Read and parse a public key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| IdentityError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|e| match e {
            crate::error::Error::Identity(IdentityError::NoRecipient(_)) => {
                IdentityError::NoRecipient(path.display().to_string()).into()
            }
            other => other,
        })
    }

    /// Encrypt `plaintext` into an envelope for this recipient.
    pub fn encrypt(&self, plaintext: &[u8], armor: Armor) -> Result<Vec<u8>> {
        match self {
            Self::Native(recipient) => cipher::encrypt(plaintext, &[recipient], armor),
            Self::Plugin(recipient) => {
                let plugin_recipient = plugin::RecipientPluginV1::new(
                    recipient.plugin(),
                    std::slice::from_ref(recipient),
                    &[],
                    TerminalPrompts,
                )
                .map_err(|e| IdentityError::Plugin {
                    plugin: recipient.plugin().to_string(),
                    reason: e.to_string(),
                })?;
                cipher::encrypt(plaintext, &[&plugin_recipient], armor)
            }
        }
    }

    /// The native X25519 key, if this is one.
    pub fn as_native(&self) -> Option<&x25519::Recipient> {
        match self {
            Self::Native(recipient) => Some(recipient),
            Self::Plugin(_) => None,
        }
    }
}

impl From<x25519::Recipient> for RecipientKey {
    fn from(recipient: x25519::Recipient) -> Self {
        Self::Native(recipient)
    }
}

impl fmt::Display for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(recipient) => write!(f, "{}", recipient),
            Self::Plugin(recipient) => write!(f, "{}", recipient),
        }
    }
}

impl fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecipientKey").field(&self.to_string()).finish()
    }
}
