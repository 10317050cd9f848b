//! Test fixtures.

use std::fs;
use std::path::Path;

use age::x25519;
use age_vault::core::cipher::Armor;
use age_vault::core::domain::UserIdentity;
use age_vault::core::vault;
use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::{Algorithm, LineEnding, PrivateKey};

/// A valid age public key nobody in the tests holds the identity for.
pub const STRANGER_PUBLIC_KEY: &str =
    "age1ql3z7hjy54pw3hyww5ayyfg7zqgvc7w3j2elw8zmrj2kg5sfn9aqmcac8p";

/// An invalid public key for negative tests.
pub const INVALID_PUBLIC_KEY: &str = "not-a-valid-age-key";

/// Write a fresh native identity file (0600) and return its public key.
pub fn write_identity(path: &Path) -> String {
    let identity = x25519::Identity::generate();
    let contents = UserIdentity::native_to_file_contents(&identity);
    age_vault::core::fs::write_private(path, contents.as_bytes()).expect("write identity");
    identity.to_public().to_string()
}

/// Generate an Ed25519 SSH key and store it as `dir/name`, wrapped for the
/// vault public key.
pub fn write_ssh_key(dir: &Path, name: &str, vault_public: &x25519::Recipient) -> PrivateKey {
    let key = PrivateKey::random(&mut ssh_key::rand_core::OsRng, Algorithm::Ed25519)
        .expect("generate ssh key");
    seal_ssh_key(dir, name, vault_public, &key);
    key
}

/// Like [`write_ssh_key`], with a 2048-bit RSA key.
pub fn write_rsa_ssh_key(dir: &Path, name: &str, vault_public: &x25519::Recipient) -> PrivateKey {
    let keypair = RsaKeypair::random(&mut ssh_key::rand_core::OsRng, 2048).expect("generate rsa key");
    let key = PrivateKey::new(KeypairData::from(keypair), name).expect("build rsa key");
    seal_ssh_key(dir, name, vault_public, &key);
    key
}

fn seal_ssh_key(dir: &Path, name: &str, vault_public: &x25519::Recipient, key: &PrivateKey) {
    let pem = key.to_openssh(LineEnding::LF).expect("serialize ssh key");

    let mut envelope = Vec::new();
    vault::encrypt_stream(vault_public, pem.as_bytes(), &mut envelope, Armor::Ascii)
        .expect("encrypt ssh key");
    fs::write(dir.join(name), envelope).expect("write ssh key");
}
