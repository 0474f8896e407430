// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Error Taxonomy
//!
//! Two error families are exposed to callers:
//!
//! - [`CryptoError`] for the codec and key derivation.
//! - [`NoteError`] for the note lifecycle and key directory.
//!
//! Both carry a stable `error_code()` so an API layer can map them onto
//! responses without matching on display strings.

use crate::storage::StorageError;

/// Errors raised by encryption, decryption and key derivation.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key material is malformed or has the wrong length.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// AEAD authentication failed.
    ///
    /// Deliberately carries no detail: a wrong key and a tampered payload
    /// must be indistinguishable.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The AEAD refused to seal the message.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The opened plaintext is not valid UTF-8.
    #[error("decrypted content is not valid UTF-8")]
    InvalidEncoding,

    /// The signer refused to sign the challenge.
    #[error("signing denied: {0}")]
    SigningDenied(String),

    /// The signer could not be reached or returned no signature.
    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),

    /// The signer did not answer within the caller's deadline.
    #[error("signing timed out")]
    SigningTimedOut,

    /// The caller cancelled the derivation while waiting on the signer.
    #[error("signing cancelled")]
    SigningCancelled,

    /// Seed expansion failed.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

impl CryptoError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CryptoError::InvalidKey(_) => "invalid_key",
            CryptoError::DecryptionFailed => "decryption_failed",
            CryptoError::EncryptionFailed(_) => "encryption_failed",
            CryptoError::InvalidEncoding => "invalid_encoding",
            CryptoError::SigningDenied(_) => "signing_denied",
            CryptoError::SigningUnavailable(_) => "signing_unavailable",
            CryptoError::SigningTimedOut => "signing_timed_out",
            CryptoError::SigningCancelled => "signing_cancelled",
            CryptoError::DerivationFailed(_) => "derivation_failed",
        }
    }

    /// Whether the caller may retry after user action.
    ///
    /// The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CryptoError::SigningDenied(_)
                | CryptoError::SigningUnavailable(_)
                | CryptoError::SigningTimedOut
                | CryptoError::SigningCancelled
        )
    }
}

/// Errors raised by the note lifecycle and the key directory.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// The note or key is absent. Expected; treat as "already gone".
    #[error("not found: {0}")]
    NotFound(String),

    /// A note with this id already exists.
    #[error("duplicate note id: {0}")]
    DuplicateId(String),

    /// `max_reads` outside the accepted range.
    #[error("max_reads must be between 1 and {max}, got {got}")]
    InvalidMaxReads { got: u32, max: u32 },

    /// Public key material has the wrong length.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Storage failed for this single operation.
    #[error(transparent)]
    Storage(StorageError),
}

impl NoteError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            NoteError::NotFound(_) => "not_found",
            NoteError::DuplicateId(_) => "duplicate_id",
            NoteError::InvalidMaxReads { .. } => "invalid_max_reads",
            NoteError::InvalidKey(_) => "invalid_key",
            NoteError::Storage(_) => "storage_error",
        }
    }

    /// `true` for the expected "already gone" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NoteError::NotFound(_))
    }
}

impl From<StorageError> for NoteError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateId(id) => NoteError::DuplicateId(id),
            other => NoteError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failure_has_no_detail() {
        assert_eq!(CryptoError::DecryptionFailed.to_string(), "decryption failed");
        assert_eq!(CryptoError::DecryptionFailed.error_code(), "decryption_failed");
    }

    #[test]
    fn signing_errors_are_retryable() {
        assert!(CryptoError::SigningDenied("user rejected".into()).is_retryable());
        assert!(CryptoError::SigningTimedOut.is_retryable());
        assert!(!CryptoError::InvalidKey("short".into()).is_retryable());
        assert!(!CryptoError::DecryptionFailed.is_retryable());
    }

    #[test]
    fn seal_failure_is_not_a_derivation_failure() {
        let err = CryptoError::EncryptionFailed("failed to seal message".into());
        assert_eq!(err.error_code(), "encryption_failed");
        assert_eq!(err.to_string(), "encryption failed: failed to seal message");
        assert!(!err.is_retryable());
    }

    #[test]
    fn storage_duplicate_maps_to_duplicate_id() {
        let err: NoteError = StorageError::DuplicateId("abc".into()).into();
        assert!(matches!(err, NoteError::DuplicateId(ref id) if id == "abc"));
        assert_eq!(err.error_code(), "duplicate_id");
    }

    #[test]
    fn invalid_max_reads_message() {
        let err = NoteError::InvalidMaxReads { got: 0, max: 1000 };
        assert_eq!(err.to_string(), "max_reads must be between 1 and 1000, got 0");
        assert!(!err.is_not_found());
        assert!(NoteError::NotFound("n".into()).is_not_found());
    }
}
