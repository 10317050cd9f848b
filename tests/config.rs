//! Configuration resolution through the CLI.

mod support;

use std::fs;

use support::*;

#[test]
fn test_env_overrides_defaults() {
    let t = Test::new();
    let identity = t.path("custom").join("id.txt");
    let expected = write_identity(&identity);

    let output = t
        .cmd()
        .args(["identity", "pubkey"])
        .env("AGE_VAULT_IDENTITY_FILE", &identity)
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), expected);
}

#[test]
fn test_config_file_in_parent_directory() {
    let t = Test::new();
    let expected = write_identity(&t.path("keys/identity.txt"));
    fs::write(
        t.path("age_vault.toml"),
        "identity_file = \"keys/identity.txt\"\nvault_key_file = \"keys/vault.age\"\n",
    )
    .unwrap();
    let nested = t.path("a/b");
    fs::create_dir_all(&nested).unwrap();

    let output = t
        .cmd()
        .current_dir(&nested)
        .args(["identity", "pubkey"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), expected);

    let output = t
        .cmd()
        .current_dir(&nested)
        .args(["vault-key", "from-identity"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(t.path("keys/vault.age").exists());
    assert!(!t.vault_key_path().exists());
}

#[test]
fn test_env_beats_config_file() {
    let t = Test::new();
    write_identity(&t.path("from-file.txt"));
    let expected = write_identity(&t.path("from-env.txt"));
    fs::write(t.path("age_vault.toml"), "identity_file = \"from-file.txt\"\n").unwrap();

    let output = t
        .cmd()
        .args(["identity", "pubkey"])
        .env("AGE_VAULT_IDENTITY_FILE", t.path("from-env.txt"))
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), expected);
}

#[test]
fn test_unknown_config_key_is_an_error() {
    let t = Test::with_identity();
    fs::write(t.path("age_vault.toml"), "identity = \"typo\"\n").unwrap();

    let output = t.run(&["identity", "pubkey"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "age_vault.toml");
}

#[test]
fn test_yaml_config_warns_and_falls_back() {
    let t = Test::with_identity();
    let expected = t.identity_pubkey();
    fs::write(t.path("age_vault.yml"), "identity_file: elsewhere.txt\n").unwrap();

    let output = t.run(&["identity", "pubkey"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), expected);
    assert_stderr_contains(&output, "age_vault.yml");
    assert_stderr_contains(&output, "age_vault.toml");
}
