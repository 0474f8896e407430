// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # End-to-End Encryption
//!
//! - [`codec`]: sealed-box encryption to a recipient public key.
//! - [`derivation`]: recipient keypairs derived from a wallet signature.
//! - [`keys`]: keypair and payload types.
//!
//! Nothing in this module touches storage. The server only ever sees
//! [`EncryptedPayload`] values and public keys.

pub mod codec;
pub mod derivation;
pub mod keys;
pub mod wire;

pub use codec::{decrypt, encrypt};
pub use derivation::{
    challenge_message, derive_keypair, derive_keypair_bounded, MessageSigner, SignerError,
};
pub use keys::{EncryptedPayload, EncryptionKeypair, KEY_LENGTH, NONCE_LENGTH};
