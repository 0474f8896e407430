// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Sealed Notes - End-to-end encrypted, self-destructing notes
//!
//! A sender encrypts a note to a recipient's public key; the service stores
//! only ciphertext and destroys the note after a bounded number of
//! successful decryptions, on explicit request, or once it ages out.
//!
//! ## Modules
//!
//! - `crypto` - Sealed-box codec and signature-derived keypairs
//! - `storage` - redb-backed note store and key directory
//! - `lifecycle` - Read counting and destruction of notes
//! - `purger` - Background age-based purge
//! - `state` - Service wiring for an API layer

pub mod config;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod purger;
pub mod state;
pub mod storage;

pub use error::{CryptoError, NoteError};
pub use lifecycle::NoteLifecycle;
