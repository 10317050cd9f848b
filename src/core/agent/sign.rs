//! Signing with an optional RSA algorithm hint.

use rsa::BigUint;
use sha2::{Sha256, Sha512};
use signature::{SignatureEncoding, Signer};
use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::{Algorithm, HashAlg, PrivateKey, Signature};
use tracing::trace;

use crate::core::constants::{SSH_AGENT_RSA_SHA2_256, SSH_AGENT_RSA_SHA2_512};
use crate::error::{AgentError, Result};

/// Sign `data` with `key`, honouring the agent protocol's sign flags.
///
/// The flags only matter for RSA keys: `SSH_AGENT_RSA_SHA2_512` selects
/// `rsa-sha2-512`, `SSH_AGENT_RSA_SHA2_256` selects `rsa-sha2-256`. RSA
/// without a recognised flag signs `rsa-sha2-512`, since SHA-1 `ssh-rsa`
/// signatures are not produced. Every other key type signs with its native
/// algorithm.
pub fn sign(key: &PrivateKey, data: &[u8], flags: u32) -> Result<Signature> {
    if let KeypairData::Rsa(keypair) = key.key_data() {
        let hash = rsa_hash(flags).unwrap_or(HashAlg::Sha512);
        trace!(?hash, flags, "signing with RSA");
        return sign_rsa(keypair, data, hash);
    }

    key.try_sign(data)
        .map_err(|e| AgentError::Signing(e.to_string()).into())
}

fn rsa_hash(flags: u32) -> Option<HashAlg> {
    if flags & SSH_AGENT_RSA_SHA2_512 != 0 {
        Some(HashAlg::Sha512)
    } else if flags & SSH_AGENT_RSA_SHA2_256 != 0 {
        Some(HashAlg::Sha256)
    } else {
        None
    }
}

fn signing_err(e: impl std::fmt::Display) -> AgentError {
    AgentError::Signing(e.to_string())
}

/// Rebuild the `rsa` private key from both primes.
///
/// ssh-key's own conversion does not carry `q` through, so the key is
/// assembled from its components here.
fn rsa_private_key(keypair: &RsaKeypair) -> Result<rsa::RsaPrivateKey> {
    let uint = |m: &ssh_key::Mpint| BigUint::try_from(m).map_err(signing_err);

    let private = rsa::RsaPrivateKey::from_components(
        uint(&keypair.public.n)?,
        uint(&keypair.public.e)?,
        uint(&keypair.private.d)?,
        vec![uint(&keypair.private.p)?, uint(&keypair.private.q)?],
    )
    .map_err(signing_err)?;
    Ok(private)
}

fn sign_rsa(keypair: &RsaKeypair, data: &[u8], hash: HashAlg) -> Result<Signature> {
    let private = rsa_private_key(keypair)?;
    let bytes = if hash == HashAlg::Sha512 {
        rsa::pkcs1v15::SigningKey::<Sha512>::new(private)
            .try_sign(data)
            .map_err(signing_err)?
            .to_vec()
    } else {
        rsa::pkcs1v15::SigningKey::<Sha256>::new(private)
            .try_sign(data)
            .map_err(signing_err)?
            .to_vec()
    };

    let signature =
        Signature::new(Algorithm::Rsa { hash: Some(hash) }, bytes).map_err(signing_err)?;
    Ok(signature)
}
