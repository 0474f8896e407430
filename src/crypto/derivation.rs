// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signature-Derived Encryption Keys
//!
//! A recipient's encryption keypair is never stored anywhere. It is
//! re-derived on demand from a signature over a fixed challenge:
//!
//! ```text
//! challenge = DOMAIN || identity
//! seed      = SHA-256(sign(challenge))[..32]
//! keypair   = X25519 keypair from seed
//! ```
//!
//! ## Security Note
//!
//! **The signature is the secret key.** Anyone able to produce the same
//! signature over the same challenge derives the same secret key and can
//! read every note sent to that identity. Signers with deterministic
//! signatures (Ed25519, RFC 6979 ECDSA) give the same keypair on every call,
//! which is what makes key recovery work without local storage. Never show,
//! log, or transmit the challenge signature.

use std::future::Future;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use zeroize::{Zeroize, Zeroizing};

use super::keys::{EncryptionKeypair, KEY_LENGTH};
use crate::error::CryptoError;

/// Domain-separation prefix of the challenge message.
///
/// Changing it changes every derived key.
pub const CHALLENGE_DOMAIN: &str = "relational-sealed-notes/encryption-key/v1\nidentity:";

/// Failure reported by a [`MessageSigner`].
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The user or device refused to sign.
    #[error("denied: {0}")]
    Denied(String),

    /// The signer could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// External capability: sign this exact byte sequence.
///
/// Implementations may wait on hardware or user confirmation. They must not
/// hold shared locks while waiting.
pub trait MessageSigner: Send + Sync {
    fn sign(&self, message: &[u8]) -> impl Future<Output = Result<Vec<u8>, SignerError>> + Send;
}

/// Build the challenge message for `identity`.
pub fn challenge_message(identity: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(CHALLENGE_DOMAIN.len() + identity.len());
    message.extend_from_slice(CHALLENGE_DOMAIN.as_bytes());
    message.extend_from_slice(identity.as_bytes());
    message
}

/// Derive the encryption keypair for `identity` from a signature over its
/// challenge.
///
/// Dropping the returned future cancels the derivation; no partial keypair
/// is ever produced.
pub async fn derive_keypair<S: MessageSigner>(
    signer: &S,
    identity: &str,
) -> Result<EncryptionKeypair, CryptoError> {
    let challenge = challenge_message(identity);
    let signature = Zeroizing::new(signer.sign(&challenge).await.map_err(|e| match e {
        SignerError::Denied(reason) => CryptoError::SigningDenied(reason),
        SignerError::Unavailable(reason) => CryptoError::SigningUnavailable(reason),
    })?);

    if signature.is_empty() {
        return Err(CryptoError::SigningUnavailable(
            "signer returned no signature".to_string(),
        ));
    }

    let keypair = keypair_from_signature(&signature)?;
    tracing::debug!(identity = %identity, "Derived encryption keypair from signature");
    Ok(keypair)
}

/// [`derive_keypair`] with a deadline and a cancellation token.
///
/// The signer is the only suspension point, so both bounds apply to it.
pub async fn derive_keypair_bounded<S: MessageSigner>(
    signer: &S,
    identity: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<EncryptionKeypair, CryptoError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CryptoError::SigningCancelled),
        result = tokio::time::timeout(timeout, derive_keypair(signer, identity)) => {
            result.map_err(|_| CryptoError::SigningTimedOut)?
        }
    }
}

/// Hash a signature down to a seed and expand it into a keypair.
pub fn keypair_from_signature(signature: &[u8]) -> Result<EncryptionKeypair, CryptoError> {
    let mut digest = Sha256::digest(signature);
    let seed: Result<[u8; KEY_LENGTH], _> = digest[..KEY_LENGTH].try_into();
    digest.as_mut_slice().zeroize();

    let seed = Zeroizing::new(
        seed.map_err(|_| CryptoError::DerivationFailed("digest shorter than seed".to_string()))?,
    );
    Ok(EncryptionKeypair::from_seed(*seed))
}
