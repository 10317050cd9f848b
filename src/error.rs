//! Error types.
//!
//! One enum per concern, wrapped by [`Error`] so `?` works across layers.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration resolution errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unable to determine home directory")]
    NoHomeDir,

    #[error("SSH keys directory not specified (use --keys-dir or set AGE_VAULT_SSH_KEYS_DIR)")]
    NoSshKeysDir,

    #[error("SSH keys directory does not exist: {0}")]
    SshKeysDirMissing(PathBuf),
}

/// Identity and recipient loading errors.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no identity found in {0}")]
    Empty(PathBuf),

    #[error("invalid identity in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid public key: {0}")]
    InvalidRecipient(String),

    #[error("no public key found in {0}")]
    NoRecipient(String),

    #[error(
        "plugin identity {0} has no public key; add a '# public key: age1...' comment line"
    )]
    PluginRecipientMissing(PathBuf),

    #[error("age plugin {plugin} failed: {reason}")]
    Plugin { plugin: String, reason: String },
}

/// Envelope encryption errors.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("no identity matched this envelope (it was encrypted for a different key)")]
    NoMatchingKey,

    #[error("invalid vault key: {0}")]
    InvalidVaultKey(String),

    #[error("ASCII armor error: {0}")]
    ArmorFailed(String),
}

/// Vault key file errors.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("vault key already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("vault key file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run sops: {0}")]
    Sops(String),
}

/// Key-serving agent errors.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to scan keys directory {path}: {source}")]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decrypt {path}: {reason}")]
    KeyDecryption { path: PathBuf, reason: String },

    #[error("failed to parse SSH key {path}: {reason}")]
    KeyParse { path: PathBuf, reason: String },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("{0} is not supported by this agent")]
    Unsupported(&'static str),

    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("socket error on {path}: {source}")]
    Socket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
