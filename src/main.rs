//! age-vault - share secrets and SSH keys through one age vault key.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use age_vault::cli::output;
use age_vault::cli::{execute, Cli};
use age_vault::core::constants::ENV_LOG;
use age_vault::error::{CipherError, ConfigError, Error, IdentityError, VaultError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("age_vault=debug")
        } else {
            EnvFilter::new("age_vault=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli.command) {
        output::error(&e.to_string());
        if let Some(hint) = suggestion(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}

fn suggestion(e: &Error) -> Option<&'static str> {
    match e {
        Error::Identity(IdentityError::NotFound(_)) => Some("run: age-vault identity set <file>"),
        Error::Identity(IdentityError::PluginRecipientMissing(_)) => {
            Some("add '# public key: <recipient>' to the identity file")
        }
        Error::Vault(VaultError::NotFound(_)) => {
            Some("run: age-vault vault-key from-identity (or vault-key set <file>)")
        }
        Error::Vault(VaultError::AlreadyExists(_)) => {
            Some("run: age-vault vault-key encrypt to share the existing key")
        }
        Error::Cipher(CipherError::NoMatchingKey) => {
            Some("ask a vault member to run: age-vault vault-key encrypt --pubkey <your public key>")
        }
        Error::Config(ConfigError::NoSshKeysDir) => {
            Some("pass --keys-dir or set AGE_VAULT_SSH_KEYS_DIR")
        }
        Error::Vault(VaultError::Sops(_)) => Some("install sops: https://github.com/getsops/sops"),
        _ => None,
    }
}
