//! Test support utilities for age-vault integration tests.
//!
//! Provides reusable test environment setup and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own temporary project dir and home dir.
/// No process-global state is mutated. Child processes get HOME and the
/// working directory explicitly, so tests can safely run in parallel.
pub struct Test {
    /// Temporary directory for the test project
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Create a test environment with a native identity installed at the
    /// default location.
    pub fn with_identity() -> Self {
        let t = Self::new();
        write_identity(&t.identity_path());
        t
    }

    /// Create a test environment with an identity and a vault key.
    pub fn init() -> Self {
        let t = Self::with_identity();
        let output = t.run(&["vault-key", "from-identity"]);
        assert!(
            output.status.success(),
            "Failed to create vault key: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Default config directory inside the temp home.
    pub fn config_dir(&self) -> PathBuf {
        self.home.path().join(".config").join(".age-vault")
    }

    /// Default identity file.
    pub fn identity_path(&self) -> PathBuf {
        self.config_dir().join("identity.txt")
    }

    /// Default vault key file.
    pub fn vault_key_path(&self) -> PathBuf {
        self.config_dir().join("vault_key.age")
    }

    /// A path inside the project directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
