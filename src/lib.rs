//! age-vault - share secrets and SSH keys through one age vault key.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── crypt         # encrypt / decrypt with the vault key
//! │   ├── vault_key     # vault-key encrypt|from-identity|set|pubkey
//! │   ├── identity      # identity set|pubkey
//! │   ├── ssh           # ssh start-agent|list-keys
//! │   ├── sops          # sops wrapper
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # env > age_vault.toml > defaults
//!     ├── cipher/       # age envelope adapter
//!     ├── domain/       # user identities and recipients
//!     ├── vault/        # vault key store and bootstrap
//!     ├── agent/        # key-serving SSH agent
//!     └── fs            # owner-only writes
//! ```
//!
//! # Model
//!
//! One X25519 vault key encrypts every secret. Each member holds their own
//! copy of the vault key, wrapped for their personal identity. Giving
//! someone access means wrapping the vault key for their public key; there
//! is no per-secret recipient list.

pub mod cli;
pub mod core;
pub mod error;
