//! age encryption backend.

use std::io::{self, BufReader, Read, Write};

use ::age::armor::{ArmoredReader, ArmoredWriter, Format};
use ::age::DecryptError;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::{CipherError, Error, Result};

/// Output encoding for new envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Armor {
    /// Raw age binary format.
    #[default]
    Binary,
    /// PEM-style ASCII armor, safe for terminals and text files.
    Ascii,
}

impl Armor {
    fn format(self) -> Format {
        match self {
            Armor::Binary => Format::Binary,
            Armor::Ascii => Format::AsciiArmor,
        }
    }
}

/// Encrypt `plaintext` for every recipient in `recipients`.
///
/// # Errors
///
/// Returns `CipherError::EncryptionFailed` if no recipient was given or a
/// recipient (plugin) refuses to wrap the file key.
pub fn encrypt(
    plaintext: &[u8],
    recipients: &[&dyn ::age::Recipient],
    armor: Armor,
) -> Result<Vec<u8>> {
    let mut encrypted = Vec::with_capacity(plaintext.len() + 256);
    encrypt_stream(plaintext, &mut encrypted, recipients, armor)?;
    Ok(encrypted)
}

/// Decrypt a single envelope held in memory.
///
/// The plaintext is zeroized on drop.
///
/// # Errors
///
/// Returns `CipherError::NoMatchingKey` when the envelope was not encrypted
/// for `identity`, and `CipherError::DecryptionFailed` when it is malformed.
pub fn decrypt(ciphertext: &[u8], identity: &dyn ::age::Identity) -> Result<Zeroizing<Vec<u8>>> {
    let mut decrypted = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    decrypt_stream(ciphertext, &mut *decrypted, identity)?;
    Ok(decrypted)
}

/// Stream `input` into an envelope written to `output`.
///
/// Memory use is constant in the payload size. Returns the number of
/// plaintext bytes consumed.
pub fn encrypt_stream<R: Read, W: Write>(
    mut input: R,
    output: W,
    recipients: &[&dyn ::age::Recipient],
    armor: Armor,
) -> Result<u64> {
    trace!(recipients = recipients.len(), ?armor, "encrypting");

    if recipients.is_empty() {
        return Err(CipherError::EncryptionFailed("no recipients".to_string()).into());
    }

    let encryptor = ::age::Encryptor::with_recipients(recipients.iter().copied())
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let armored = ArmoredWriter::wrap_output(output, armor.format())
        .map_err(|e| CipherError::ArmorFailed(e.to_string()))?;
    let mut writer = encryptor
        .wrap_output(armored)
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

    let copied = io::copy(&mut input, &mut writer)?;

    let armored = writer
        .finish()
        .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
    armored
        .finish()
        .map_err(|e| CipherError::ArmorFailed(e.to_string()))?;

    trace!(plaintext_len = copied, "encrypted");
    Ok(copied)
}

/// Stream the envelope in `input` into plaintext written to `output`.
///
/// Returns the number of plaintext bytes produced. Output already written
/// before a mid-stream failure is not rolled back.
pub fn decrypt_stream<R: Read, W: Write>(
    input: R,
    mut output: W,
    identity: &dyn ::age::Identity,
) -> Result<u64> {
    trace!("decrypting");

    let reader = ArmoredReader::new(BufReader::new(input));
    let decryptor = ::age::Decryptor::new(reader).map_err(map_decrypt_error)?;
    let mut reader = decryptor
        .decrypt(std::iter::once(identity))
        .map_err(map_decrypt_error)?;

    let copied = io::copy(&mut reader, &mut output).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            CipherError::DecryptionFailed(e.to_string()).into()
        }
        _ => Error::Io(e),
    })?;

    trace!(plaintext_len = copied, "decrypted");
    Ok(copied)
}

fn map_decrypt_error(e: DecryptError) -> Error {
    match e {
        DecryptError::NoMatchingKeys => CipherError::NoMatchingKey.into(),
        other => CipherError::DecryptionFailed(other.to_string()).into(),
    }
}
