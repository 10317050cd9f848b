//! User identity.
//!
//! A user identity is the long-lived private key an operator uses to
//! unwrap the vault key. Two kinds exist, native X25519 keys and keys held
//! by an age plugin, and callers only ever use two capabilities:
//! [`UserIdentity::recipient`] (the public projection) and
//! [`UserIdentity::decrypt`].

use std::fs;
use std::path::{Path, PathBuf};

use age::secrecy::ExposeSecret;
use age::{plugin, x25519};
use tracing::debug;
use zeroize::Zeroizing;

use super::{RecipientKey, TerminalPrompts};
use crate::core::cipher;
use crate::core::fs as private_fs;
use crate::error::{IdentityError, Result};

/// Comment prefixes that declare a plugin identity's public key.
const PUBLIC_KEY_COMMENTS: &[&str] = &["# public key:", "# recipient:"];

enum Kind {
    Native(x25519::Identity),
    Plugin(plugin::Identity),
}

/// A private identity loaded from an identity file.
pub struct UserIdentity {
    kind: Kind,
    declared_recipient: Option<String>,
    path: PathBuf,
}

impl UserIdentity {
    /// Load an identity file.
    ///
    /// The first non-comment line is parsed as a native identity
    /// (`AGE-SECRET-KEY-1...`), then as a plugin identity
    /// (`AGE-PLUGIN-...`). Comment lines of the form
    /// `# public key: age1...` are remembered as the identity's recipient.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotFound` when the file is missing and
    /// `IdentityError::Parse` when no line parses as an identity.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading identity");

        if !path.exists() {
            return Err(IdentityError::NotFound(path.to_path_buf()).into());
        }
        private_fs::warn_if_insecure(path);

        let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
            IdentityError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?);

        let mut identity = Self::parse(&contents, path)?;
        identity.path = path.to_path_buf();

        debug!(path = %path.display(), plugin = identity.is_plugin(), "identity loaded");
        Ok(identity)
    }

    fn parse(contents: &str, origin: &Path) -> Result<Self> {
        let declared_recipient = contents.lines().map(str::trim).find_map(|line| {
            let lower = line.to_ascii_lowercase();
            PUBLIC_KEY_COMMENTS
                .iter()
                .any(|prefix| lower.starts_with(prefix))
                .then(|| line.split_once(':').map(|(_, key)| key.trim().to_string()))
                .flatten()
        });

        let line = contents
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| IdentityError::Empty(origin.to_path_buf()))?;

        let kind = match line.parse::<x25519::Identity>() {
            Ok(native) => Kind::Native(native),
            Err(native_err) => match line.parse::<plugin::Identity>() {
                Ok(plugin) => Kind::Plugin(plugin),
                Err(plugin_err) => {
                    return Err(IdentityError::Parse {
                        path: origin.to_path_buf(),
                        reason: format!(
                            "as native identity: {}; as plugin identity: {}",
                            native_err, plugin_err
                        ),
                    }
                    .into())
                }
            },
        };

        Ok(Self {
            kind,
            declared_recipient,
            path: origin.to_path_buf(),
        })
    }

    /// Wrap an in-memory native identity.
    pub fn from_native(identity: x25519::Identity) -> Self {
        Self {
            kind: Kind::Native(identity),
            declared_recipient: None,
            path: PathBuf::new(),
        }
    }

    /// The public key envelopes for this identity are encrypted to.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::PluginRecipientMissing` for a plugin identity
    /// whose file does not declare its public key in a comment.
    pub fn recipient(&self) -> Result<RecipientKey> {
        match &self.kind {
            Kind::Native(identity) => Ok(RecipientKey::Native(identity.to_public())),
            Kind::Plugin(_) => match &self.declared_recipient {
                Some(key) => RecipientKey::parse(key),
                None => Err(IdentityError::PluginRecipientMissing(self.path.clone()).into()),
            },
        }
    }

    /// Decrypt an envelope addressed to this identity.
    ///
    /// For plugin identities this runs the plugin, which may prompt on the
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::NoMatchingKey` when the envelope belongs to
    /// someone else.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match &self.kind {
            Kind::Native(identity) => cipher::decrypt(envelope, identity),
            Kind::Plugin(identity) => {
                let plugin_identity = plugin::IdentityPluginV1::new(
                    identity.plugin(),
                    std::slice::from_ref(identity),
                    TerminalPrompts,
                )
                .map_err(|e| IdentityError::Plugin {
                    plugin: identity.plugin().to_string(),
                    reason: e.to_string(),
                })?;
                cipher::decrypt(envelope, &plugin_identity)
            }
        }
    }

    /// True for plugin-backed identities.
    pub fn is_plugin(&self) -> bool {
        matches!(self.kind, Kind::Plugin(_))
    }

    /// File this identity was loaded from (empty for in-memory identities).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize a native identity in identity-file form.
    pub fn native_to_file_contents(identity: &x25519::Identity) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "# public key: {}\n{}\n",
            identity.to_public(),
            identity.to_string().expose_secret()
        ))
    }
}

impl std::fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserIdentity")
            .field("path", &self.path)
            .field("plugin", &self.is_plugin())
            .field("recipient", &self.recipient().ok())
            .finish()
    }
}
