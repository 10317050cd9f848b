//! Configuration resolution.
//!
//! Paths come from, in order of precedence: environment variables, the
//! nearest `age_vault.toml` above the working directory, then defaults under
//! `~/.config/.age-vault/`. An `age_vault.yml` from earlier releases is
//! reported with a warning and otherwise ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Envelope holding the vault key, wrapped for this user.
    pub vault_key_file: PathBuf,
    /// This user's private identity.
    pub identity_file: PathBuf,
    /// Directory of vault-encrypted SSH keys, if configured.
    pub ssh_keys_dir: Option<PathBuf>,
    /// The `age_vault.toml` the values were read from, if any.
    pub source: Option<PathBuf>,
    /// An `age_vault.yml` closer to the working directory than `source`.
    /// Its values are not applied.
    pub ignored: Option<PathBuf>,
}

/// On-disk layout of `age_vault.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    vault_key_file: Option<String>,
    identity_file: Option<String>,
    ssh_keys_dir: Option<String>,
}

impl Config {
    /// Resolve configuration from the process environment and working directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHomeDir` when no home directory can be found,
    /// or a read/parse error for a malformed `age_vault.toml`.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        let cwd = std::env::current_dir()?;
        Self::resolve(&cwd, &home, |name| std::env::var(name).ok())
    }

    /// Resolve configuration with explicit inputs.
    ///
    /// `env` looks up an environment variable; empty values count as unset.
    pub fn resolve<F>(start: &Path, home: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.is_empty());

        let found = find_config_file(start);
        let ignored = find_legacy_config_file(start, found.as_deref());
        if let Some(path) = &ignored {
            warn!(
                path = %path.display(),
                "ignoring {}, rename it to {} (the keys are the same)",
                constants::LEGACY_CONFIG_FILE,
                constants::CONFIG_FILE
            );
        }
        let (file, base) = match &found {
            Some(path) => (read_config_file(path)?, path.parent()),
            None => (FileConfig::default(), None),
        };

        let from_file = |value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| resolve_relative(&v, base, home))
        };

        let default_dir = home.join(constants::DEFAULT_CONFIG_DIR);

        let vault_key_file = env(constants::ENV_VAULT_KEY_FILE)
            .map(|v| expand_home(&v, home))
            .or_else(|| from_file(file.vault_key_file))
            .unwrap_or_else(|| default_dir.join(constants::DEFAULT_VAULT_KEY_FILE));

        let identity_file = env(constants::ENV_IDENTITY_FILE)
            .map(|v| expand_home(&v, home))
            .or_else(|| from_file(file.identity_file))
            .unwrap_or_else(|| default_dir.join(constants::DEFAULT_IDENTITY_FILE));

        let ssh_keys_dir = env(constants::ENV_SSH_KEYS_DIR)
            .map(|v| expand_home(&v, home))
            .or_else(|| from_file(file.ssh_keys_dir));

        let config = Self {
            vault_key_file,
            identity_file,
            ssh_keys_dir,
            source: found,
            ignored,
        };

        debug!(
            vault_key_file = %config.vault_key_file.display(),
            identity_file = %config.identity_file.display(),
            source = ?config.source,
            "config resolved"
        );

        Ok(config)
    }

    /// The SSH keys directory, preferring an explicit override.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoSshKeysDir` when neither is set and
    /// `ConfigError::SshKeysDirMissing` when the directory does not exist.
    pub fn ssh_keys_dir(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        let dir = explicit
            .or_else(|| self.ssh_keys_dir.clone())
            .ok_or(ConfigError::NoSshKeysDir)?;
        if !dir.is_dir() {
            return Err(ConfigError::SshKeysDirMissing(dir).into());
        }
        Ok(dir)
    }
}

/// Walk up from `start` looking for `age_vault.toml`.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(constants::CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// The nearest `age_vault.yml` that sits below or beside `found`.
fn find_legacy_config_file(start: &Path, found: Option<&Path>) -> Option<PathBuf> {
    let stop = found.and_then(Path::parent);
    for dir in start.ancestors() {
        let candidate = dir.join(constants::LEGACY_CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if Some(dir) == stop {
            break;
        }
    }
    None
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed)
}

/// Expand a leading `~` to `home`.
fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Resolve a path written in the config file.
///
/// Absolute and `~` paths are taken as-is; anything else is relative to
/// the directory containing the config file.
fn resolve_relative(path: &str, base: Option<&Path>, home: &Path) -> PathBuf {
    if path.starts_with('~') {
        return expand_home(path, home);
    }
    let candidate = PathBuf::from(path);
    match base {
        Some(base) if candidate.is_relative() => base.join(candidate),
        _ => candidate,
    }
}
