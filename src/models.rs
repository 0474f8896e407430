// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Notes and registered keys as seen by callers of the core. All types
//! serialize to camelCase JSON so an API layer can return them directly.
//!
//! ## Timestamps
//!
//! Every timestamp is milliseconds since the Unix epoch (UTC), stored as
//! `i64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::wire::base64_array;
use crate::crypto::{EncryptedPayload, KEY_LENGTH};

/// Upper bound accepted for `max_reads`.
pub const MAX_READS_CAP: u32 = 1000;

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a `DateTime`, if representable.
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

// =============================================================================
// Notes
// =============================================================================

/// A stored, encrypted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Opaque unique identifier.
    pub id: String,
    /// Ciphertext only the recipient can open.
    pub payload: EncryptedPayload,
    /// Identity the note is addressed to.
    pub recipient_identity: String,
    /// Creation time (epoch ms).
    pub created_at: i64,
    /// Delete after the viewer has consumed it.
    pub self_destruct: bool,
    /// Successful decryptions allowed before destruction. `None` = unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reads: Option<u32>,
    /// Successful decryptions recorded so far.
    pub current_reads: u32,
}

impl Note {
    /// `true` once the read limit has been reached.
    ///
    /// Notes without a limit are never exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.max_reads.is_some_and(|max| self.current_reads >= max)
    }
}

/// Sender input for a new note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub payload: EncryptedPayload,
    pub recipient_identity: String,
    #[serde(default)]
    pub self_destruct: bool,
    #[serde(default)]
    pub max_reads: Option<u32>,
}

/// Outcome of recording a successful decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    /// The note reached its read limit and is gone.
    pub destroyed: bool,
    /// Read count after this decryption.
    pub current_reads: u32,
}

// =============================================================================
// Registered Keys
// =============================================================================

/// The encryption public key currently registered for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredKey {
    pub identity: String,
    #[serde(with = "base64_array")]
    pub encryption_public_key: [u8; KEY_LENGTH],
    /// Registration time (epoch ms). Last write wins.
    pub registered_at: i64,
}
