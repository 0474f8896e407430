// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sealed Box Codec
//!
//! Public-key authenticated encryption with a fresh sender keypair per
//! message:
//!
//! ```text
//! shared  = X25519(ephemeral_secret, recipient_public)
//! key     = HKDF-SHA256(ikm = shared, salt = ephemeral_public || recipient_public, info)
//! sealed  = XChaCha20-Poly1305(key, nonce = 24 random bytes, message)
//! ```
//!
//! The ephemeral secret is dropped as soon as the shared secret has been
//! computed, so compromising one message never exposes another. The
//! Poly1305 tag covers the whole ciphertext; any flipped bit in the
//! ciphertext, nonce or ephemeral key makes [`decrypt`] fail.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};
use zeroize::Zeroizing;

use super::keys::{key_array, EncryptedPayload, KEY_LENGTH, NONCE_LENGTH};
use crate::error::CryptoError;

/// HKDF info label binding derived keys to this construction.
const KDF_INFO: &[u8] = b"relational-sealed-notes/box/v1";

/// Seal `message` so that only the holder of the matching secret key can
/// open it.
pub fn encrypt(message: &str, recipient_public_key: &[u8]) -> Result<EncryptedPayload, CryptoError> {
    let recipient = PublicKey::from(key_array(recipient_public_key, "recipient public key")?);

    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(&recipient);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey(
            "recipient public key is a low-order point".to_string(),
        ));
    }

    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    let cipher = box_cipher(&shared, ephemeral_public.as_bytes(), recipient.as_bytes())?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), message.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed("failed to seal message".to_string()))?;

    Ok(EncryptedPayload {
        ciphertext,
        nonce,
        ephemeral_public_key: ephemeral_public.to_bytes(),
    })
}

/// Open a payload with the recipient's secret key.
///
/// Every authentication failure surfaces as the same
/// [`CryptoError::DecryptionFailed`], whatever the cause.
pub fn decrypt(payload: &EncryptedPayload, recipient_secret_key: &[u8]) -> Result<String, CryptoError> {
    let secret = StaticSecret::from(key_array(recipient_secret_key, "recipient secret key")?);
    let recipient_public = PublicKey::from(&secret);
    let ephemeral = PublicKey::from(payload.ephemeral_public_key);

    let shared = secret.diffie_hellman(&ephemeral);
    // A low-order ephemeral key can only come from a forged payload.
    if !shared.was_contributory() {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = box_cipher(&shared, &payload.ephemeral_public_key, recipient_public.as_bytes())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidEncoding)
}

fn box_cipher(
    shared: &SharedSecret,
    ephemeral_public: &[u8; KEY_LENGTH],
    recipient_public: &[u8; KEY_LENGTH],
) -> Result<XChaCha20Poly1305, CryptoError> {
    let mut salt = [0u8; KEY_LENGTH * 2];
    salt[..KEY_LENGTH].copy_from_slice(ephemeral_public);
    salt[KEY_LENGTH..].copy_from_slice(recipient_public);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(KDF_INFO, &mut key[..])
        .map_err(|e| CryptoError::EncryptionFailed(format!("key schedule: {e}")))?;

    XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| CryptoError::EncryptionFailed(format!("key schedule: {e}")))
}
