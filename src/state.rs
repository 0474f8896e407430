// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::config::Config;
use crate::lifecycle::NoteLifecycle;
use crate::storage::{KeyCache, KeyDirectory, NoteStore, Storage, StorageResult};

/// Everything an API layer needs, built once at startup over a single
/// storage handle.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub notes: NoteLifecycle,
    pub keys: KeyDirectory,
}

impl AppState {
    /// Open the database named by `config` and wire up the services.
    pub fn open(config: &Config) -> StorageResult<Self> {
        let storage = Storage::open(&config.db_path())?;
        Ok(Self::new(storage, config))
    }

    pub fn new(storage: Storage, config: &Config) -> Self {
        Self {
            notes: NoteLifecycle::new(NoteStore::new(storage.clone())),
            keys: KeyDirectory::new(
                storage.clone(),
                KeyCache::new(config.key_cache_capacity, config.key_cache_ttl),
            ),
            storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt, encrypt, EncryptionKeypair};
    use crate::models::NewNote;

    #[test]
    fn services_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let state = AppState::open(&config).unwrap();
        assert_eq!(state.storage.path(), config.db_path().as_path());

        // Recipient registers, sender looks up and sends, recipient reads once.
        let recipient = EncryptionKeypair::generate();
        state.keys.register("0xrecipient", recipient.public_key()).unwrap();

        let key = state.keys.require("0xrecipient").unwrap();
        let note = state
            .notes
            .create(NewNote {
                payload: encrypt("hello", &key.encryption_public_key).unwrap(),
                recipient_identity: key.identity.clone(),
                self_destruct: true,
                max_reads: Some(1),
            })
            .unwrap();

        let fetched = state.notes.fetch(&note.id).unwrap();
        assert_eq!(decrypt(&fetched.payload, recipient.secret_key()).unwrap(), "hello");
        assert!(state.notes.record_successful_decrypt(&note.id).unwrap().destroyed);
    }
}
