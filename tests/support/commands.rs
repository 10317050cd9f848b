//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

/// Variables that would leak the developer's real configuration into tests.
const ISOLATED_VARS: &[&str] = &[
    "AGE_VAULT_KEY_FILE",
    "AGE_VAULT_IDENTITY_FILE",
    "AGE_VAULT_SSH_KEYS_DIR",
    "AGE_VAULT_LOG",
];

impl Test {
    /// Create an age-vault command with correct environment variables.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory
    /// - Current directory set to the test project directory
    /// - age-vault environment overrides removed
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("age-vault").expect("failed to find age-vault binary");
        cmd.env("HOME", self.home.path());
        // Windows uses USERPROFILE instead of HOME for home directory
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("NO_COLOR", "1");
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run age-vault with `args`.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run age-vault")
    }

    /// Run age-vault with `args`, feeding `input` on stdin.
    pub fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Output {
        self.cmd()
            .args(args)
            .write_stdin(input.to_vec())
            .output()
            .expect("failed to run age-vault")
    }

    /// Shortcut for `age-vault encrypt` from stdin.
    pub fn encrypt(&self, plaintext: &[u8]) -> Output {
        self.run_with_stdin(&["encrypt"], plaintext)
    }

    /// Shortcut for `age-vault decrypt` from stdin.
    pub fn decrypt(&self, envelope: &[u8]) -> Output {
        self.run_with_stdin(&["decrypt"], envelope)
    }

    /// Shortcut for `age-vault identity pubkey`.
    pub fn identity_pubkey(&self) -> String {
        let output = self.run(&["identity", "pubkey"]);
        super::assert_success(&output);
        super::stdout(&output).trim().to_string()
    }

    /// Shortcut for `age-vault vault-key pubkey`.
    pub fn vault_pubkey(&self) -> String {
        let output = self.run(&["vault-key", "pubkey"]);
        super::assert_success(&output);
        super::stdout(&output).trim().to_string()
    }
}
