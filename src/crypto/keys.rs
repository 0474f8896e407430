// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key and payload types shared by the codec and key derivation.

use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::wire::{base64_array, base64_bytes};
use crate::error::CryptoError;

/// Length of X25519 public and secret keys.
pub const KEY_LENGTH: usize = 32;

/// Length of the XChaCha20-Poly1305 nonce.
pub const NONCE_LENGTH: usize = 24;

/// An X25519 encryption keypair.
///
/// The secret half is wiped on drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKeypair {
    public_key: [u8; KEY_LENGTH],
    secret_key: [u8; KEY_LENGTH],
}

impl EncryptionKeypair {
    /// Generate a fresh random keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Deterministically expand a 32-byte seed into a keypair.
    ///
    /// The same seed always yields the same keypair.
    pub fn from_seed(seed: [u8; KEY_LENGTH]) -> Self {
        Self::from_secret(StaticSecret::from(seed))
    }

    /// Rebuild a keypair from raw secret key bytes.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::from_seed(key_array(secret, "secret key")?))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self {
            public_key: public.to_bytes(),
            secret_key: secret.to_bytes(),
        }
    }

    /// The shareable public half.
    pub fn public_key(&self) -> &[u8; KEY_LENGTH] {
        &self.public_key
    }

    /// The secret half. Must never leave the holder's process.
    pub fn secret_key(&self) -> &[u8; KEY_LENGTH] {
        &self.secret_key
    }
}

impl std::fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeypair")
            .field("public_key", &super::wire::encode(&self.public_key))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl PartialEq for EncryptionKeypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.secret_key == other.secret_key
    }
}

impl Eq for EncryptionKeypair {}

/// Sealed message as produced by [`encrypt`](super::encrypt).
///
/// Immutable once produced. Serializes to JSON with base64 byte fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// AEAD output: ciphertext followed by the 16-byte Poly1305 tag.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Random per-message nonce.
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_LENGTH],
    /// Public half of the sender's single-use keypair.
    #[serde(with = "base64_array")]
    pub ephemeral_public_key: [u8; KEY_LENGTH],
}

/// Check that `bytes` is exactly one X25519 key long.
pub(crate) fn key_array(bytes: &[u8], what: &str) -> Result<[u8; KEY_LENGTH], CryptoError> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "{what} must be {KEY_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })
}
