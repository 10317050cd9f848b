//! Constants used throughout age-vault.
//!
//! Centralizes file names, environment variables and protocol values.

/// Project configuration file name, searched for upward from the working directory.
pub const CONFIG_FILE: &str = "age_vault.toml";

/// YAML config file name used by earlier releases. It is detected but not read.
pub const LEGACY_CONFIG_FILE: &str = "age_vault.yml";

/// Default configuration directory relative to HOME (`~/.config/.age-vault`).
pub const DEFAULT_CONFIG_DIR: &str = ".config/.age-vault";

/// Default vault key file name inside [`DEFAULT_CONFIG_DIR`].
pub const DEFAULT_VAULT_KEY_FILE: &str = "vault_key.age";

/// Default identity file name inside [`DEFAULT_CONFIG_DIR`].
pub const DEFAULT_IDENTITY_FILE: &str = "identity.txt";

/// Overrides the vault key file path.
pub const ENV_VAULT_KEY_FILE: &str = "AGE_VAULT_KEY_FILE";

/// Overrides the identity file path.
pub const ENV_IDENTITY_FILE: &str = "AGE_VAULT_IDENTITY_FILE";

/// Overrides the SSH keys directory.
pub const ENV_SSH_KEYS_DIR: &str = "AGE_VAULT_SSH_KEYS_DIR";

/// Log filter directive, read by the binary.
pub const ENV_LOG: &str = "AGE_VAULT_LOG";

/// Extension marking an SSH key entry in the keys directory.
pub const SSH_KEY_EXTENSION: &str = "age";

/// Owner read/write.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Owner read/write/execute.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// `SSH_AGENT_RSA_SHA2_256` sign request flag.
pub const SSH_AGENT_RSA_SHA2_256: u32 = 0x02;

/// `SSH_AGENT_RSA_SHA2_512` sign request flag.
pub const SSH_AGENT_RSA_SHA2_512: u32 = 0x04;
