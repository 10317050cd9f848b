//! Command-line interface.

pub mod completions;
pub mod crypt;
pub mod identity;
pub mod output;
pub mod sops;
pub mod ssh;
pub mod vault_key;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::config::Config;
use crate::core::domain::UserIdentity;
use crate::core::vault::VaultKey;
use crate::error::Result;

/// age-vault - share secrets and SSH keys through one age vault key.
#[derive(Parser)]
#[command(
    name = "age-vault",
    about = "Share secrets and SSH keys across a team through a single age vault key",
    version
)]
pub struct Cli {
    /// Enable debug logging (overridden by AGE_VAULT_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt stdin or a file with the vault key
    Encrypt {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Produce ASCII-armored output
        #[arg(short, long)]
        armor: bool,
    },

    /// Decrypt stdin or a file with the vault key
    Decrypt {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run sops with SOPS_AGE_KEY_FILE pointing at the vault key
    Sops {
        /// Arguments passed through to sops
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Manage the vault key
    VaultKey {
        #[command(subcommand)]
        action: VaultKeyAction,
    },

    /// Manage your identity
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Serve vault-encrypted SSH keys
    Ssh {
        #[command(subcommand)]
        action: SshAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Where the public key to wrap the vault key for comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct RecipientArgs {
    /// Recipient public key (age1... or a plugin recipient)
    #[arg(long)]
    pub pubkey: Option<String>,
    /// File containing the recipient public key
    #[arg(long)]
    pub pubkey_file: Option<PathBuf>,
    /// Identity file whose public key to use
    #[arg(long)]
    pub identity: Option<PathBuf>,
}

/// Vault key subcommands.
#[derive(Subcommand)]
pub enum VaultKeyAction {
    /// Wrap the vault key for a recipient, creating the vault key on first use
    Encrypt {
        #[command(flatten)]
        recipient: RecipientArgs,
        /// Write the envelope here instead of the vault key file
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,
        /// Write the envelope to stdout
        #[arg(long)]
        stdout: bool,
    },

    /// Create a new vault key wrapped for your identity
    FromIdentity,

    /// Install a vault key envelope as your vault key file
    Set {
        /// Envelope to install
        file: PathBuf,
    },

    /// Print the vault key's public key
    Pubkey {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Identity subcommands.
#[derive(Subcommand)]
pub enum IdentityAction {
    /// Install an identity file
    Set {
        /// Identity file to install
        file: PathBuf,
    },

    /// Print your identity's public key
    Pubkey {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// SSH subcommands.
#[derive(Subcommand)]
pub enum SshAction {
    /// Start the SSH agent
    StartAgent {
        /// Directory of *.age SSH keys
        #[arg(value_name = "KEYS_DIR", conflicts_with = "keys_dir")]
        dir: Option<PathBuf>,
        /// Directory of *.age SSH keys
        #[arg(long, value_name = "DIR")]
        keys_dir: Option<PathBuf>,
        /// Socket path (default: a per-process path in the temp directory)
        #[arg(long)]
        socket: Option<PathBuf>,
        /// Rescan the keys directory for every new connection
        #[arg(long)]
        reload: bool,
    },

    /// List the SSH key files in the keys directory
    ListKeys {
        /// Directory of *.age SSH keys
        #[arg(value_name = "KEYS_DIR", conflicts_with = "keys_dir")]
        dir: Option<PathBuf>,
        /// Directory of *.age SSH keys
        #[arg(long, value_name = "DIR")]
        keys_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute a command.
pub fn execute(command: Command) -> Result<()> {
    match command {
        Command::Encrypt {
            file,
            output,
            armor,
        } => crypt::encrypt(file.as_deref(), output.as_deref(), armor),
        Command::Decrypt { file, output } => crypt::decrypt(file.as_deref(), output.as_deref()),
        Command::Sops { args } => sops::execute(&args),
        Command::VaultKey { action } => match action {
            VaultKeyAction::Encrypt {
                recipient,
                output,
                stdout,
            } => vault_key::encrypt(recipient, vault_key::Disposition::new(output, stdout)),
            VaultKeyAction::FromIdentity => vault_key::from_identity(),
            VaultKeyAction::Set { file } => vault_key::set(&file),
            VaultKeyAction::Pubkey { output } => vault_key::pubkey(output.as_deref()),
        },
        Command::Identity { action } => match action {
            IdentityAction::Set { file } => identity::set(&file),
            IdentityAction::Pubkey { output } => identity::pubkey(output.as_deref()),
        },
        Command::Ssh { action } => match action {
            SshAction::StartAgent {
                dir,
                keys_dir,
                socket,
                reload,
            } => ssh::start_agent(keys_dir.or(dir), socket, reload),
            SshAction::ListKeys {
                dir,
                keys_dir,
                json,
            } => ssh::list_keys(keys_dir.or(dir), json),
        },
        Command::Completions { shell } => completions::execute(shell),
    }
}

/// Load the configured identity and unwrap the vault key with it.
pub(crate) fn open_vault(config: &Config) -> Result<VaultKey> {
    let holder = UserIdentity::load(&config.identity_file)?;
    VaultKey::load(&config.vault_key_file, &holder)
}
