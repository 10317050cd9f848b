//! Envelope encryption.
//!
//! Thin adapter over the age format. Every envelope this crate reads or
//! writes goes through here; nothing above this module touches the `age`
//! encryptor/decryptor types directly.
//!
//! Reading auto-detects ASCII armor, so envelopes produced by the `age`
//! command line tool (armored or binary) are accepted.

mod age;

pub use self::age::{decrypt, decrypt_stream, encrypt, encrypt_stream, Armor};
