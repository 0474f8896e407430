// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key directory: identity → currently registered encryption public key.
//!
//! One record per identity. Re-registering overwrites the previous key;
//! there is no history and no rotation tracking. Identity format is not
//! validated here.

use std::sync::Arc;

use redb::ReadableDatabase;

use super::{KeyCache, Storage, REGISTERED_KEYS};
use crate::crypto::KEY_LENGTH;
use crate::error::NoteError;
use crate::models::{now_millis, RegisteredKey};

/// Repository for registered encryption keys.
#[derive(Clone)]
pub struct KeyDirectory {
    storage: Storage,
    cache: Arc<KeyCache>,
}

impl KeyDirectory {
    pub fn new(storage: Storage, cache: KeyCache) -> Self {
        Self {
            storage,
            cache: Arc::new(cache),
        }
    }

    /// Register (or replace) the encryption public key for `identity`.
    pub fn register(&self, identity: &str, public_key: &[u8]) -> Result<RegisteredKey, NoteError> {
        let encryption_public_key: [u8; KEY_LENGTH] = public_key.try_into().map_err(|_| {
            NoteError::InvalidKey(format!(
                "encryption public key must be {KEY_LENGTH} bytes, got {}",
                public_key.len()
            ))
        })?;

        let record = RegisteredKey {
            identity: identity.to_string(),
            encryption_public_key,
            registered_at: now_millis(),
        };
        let json = serde_json::to_vec(&record).map_err(|e| NoteError::Storage(e.into()))?;

        let write_txn = self.storage.db().begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(REGISTERED_KEYS).map_err(db_err)?;
            table.insert(identity, json.as_slice()).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        self.cache.replace(record.clone());
        tracing::info!(identity = %identity, "Registered encryption key");
        Ok(record)
    }

    /// Look up the key registered for `identity`.
    pub fn lookup(&self, identity: &str) -> Result<Option<RegisteredKey>, NoteError> {
        if let Some(cached) = self.cache.get(identity) {
            return Ok(Some(cached));
        }

        let read_txn = self.storage.db().begin_read().map_err(db_err)?;
        let table = read_txn.open_table(REGISTERED_KEYS).map_err(db_err)?;
        let record = match table.get(identity).map_err(db_err)? {
            Some(value) => {
                let record: RegisteredKey = serde_json::from_slice(value.value())
                    .map_err(|e| NoteError::Storage(e.into()))?;
                Some(record)
            }
            None => None,
        };

        if let Some(record) = &record {
            self.cache.put(record.clone());
        }
        Ok(record)
    }

    /// Like [`lookup`](Self::lookup), but absence is `NotFound`.
    pub fn require(&self, identity: &str) -> Result<RegisteredKey, NoteError> {
        self.lookup(identity)?
            .ok_or_else(|| NoteError::NotFound(format!("Encryption key for {identity}")))
    }
}

fn db_err(e: impl Into<super::StorageError>) -> NoteError {
    NoteError::Storage(e.into())
}
