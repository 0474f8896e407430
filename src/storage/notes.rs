// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Note persistence.
//!
//! The store knows nothing about destruction policy; it offers the five
//! primitive operations the lifecycle controller is built on:
//! insert-if-absent, get, compare-and-increment, delete and age purge.

use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::{Storage, StorageError, StorageResult, NOTES, NOTES_BY_CREATED};
use crate::crypto::EncryptedPayload;
use crate::models::Note;

// =============================================================================
// Row Format
// =============================================================================

/// On-disk note row. `self_destruct` is kept as `0`/`1` here only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredNote {
    pub id: String,
    pub payload: EncryptedPayload,
    pub recipient_identity: String,
    pub created_at: i64,
    pub self_destruct: u8,
    #[serde(default)]
    pub max_reads: Option<u32>,
    pub current_reads: u32,
}

impl From<&Note> for StoredNote {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            payload: note.payload.clone(),
            recipient_identity: note.recipient_identity.clone(),
            created_at: note.created_at,
            self_destruct: u8::from(note.self_destruct),
            max_reads: note.max_reads,
            current_reads: note.current_reads,
        }
    }
}

impl TryFrom<StoredNote> for Note {
    type Error = StorageError;

    fn try_from(row: StoredNote) -> Result<Self, Self::Error> {
        let self_destruct = match row.self_destruct {
            0 => false,
            1 => true,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "note {}: self_destruct = {other}",
                    row.id
                )))
            }
        };
        Ok(Note {
            id: row.id,
            payload: row.payload,
            recipient_identity: row.recipient_identity,
            created_at: row.created_at,
            self_destruct,
            max_reads: row.max_reads,
            current_reads: row.current_reads,
        })
    }
}

fn decode_row(bytes: &[u8]) -> StorageResult<Note> {
    let row: StoredNote = serde_json::from_slice(bytes)?;
    Note::try_from(row)
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Map an `i64` timestamp onto `u64` so big-endian bytes sort like the
/// signed value.
fn ordered_timestamp(millis: i64) -> [u8; 8] {
    ((millis as u64) ^ (1 << 63)).to_be_bytes()
}

/// Build a key for the `notes_by_created` index.
///
/// Format: `ordered_timestamp(created_at) | note_id`
pub(crate) fn created_index_key(created_at: i64, note_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + note_id.len());
    key.extend_from_slice(&ordered_timestamp(created_at));
    key.extend_from_slice(note_id.as_bytes());
    key
}

// =============================================================================
// NoteStore
// =============================================================================

/// Result of a compare-and-increment on a note's read counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadIncrement {
    /// The counter was advanced to `current_reads`.
    Applied {
        current_reads: u32,
        max_reads: Option<u32>,
    },
    /// The note had already reached its limit; nothing was written.
    AtLimit { current_reads: u32 },
}

/// Typed access to the `notes` table.
#[derive(Clone, Debug)]
pub struct NoteStore {
    storage: Storage,
}

impl NoteStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Insert a new note. Fails with `DuplicateId` if the id is taken.
    pub fn put(&self, note: &Note) -> StorageResult<()> {
        let json = serde_json::to_vec(&StoredNote::from(note))?;

        let write_txn = self.storage.db().begin_write()?;
        {
            let mut notes = write_txn.open_table(NOTES)?;
            if notes.get(note.id.as_str())?.is_some() {
                return Err(StorageError::DuplicateId(note.id.clone()));
            }
            notes.insert(note.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(NOTES_BY_CREATED)?;
            let key = created_index_key(note.created_at, &note.id);
            index.insert(key.as_slice(), note.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a note by id.
    pub fn get(&self, note_id: &str) -> StorageResult<Option<Note>> {
        let read_txn = self.storage.db().begin_read()?;
        let notes = read_txn.open_table(NOTES)?;
        match notes.get(note_id)? {
            Some(value) => Ok(Some(decode_row(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically advance the read counter by one.
    ///
    /// Never moves the counter past `max_reads`. Returns `None` if the note
    /// does not exist.
    pub fn increment_reads(&self, note_id: &str) -> StorageResult<Option<ReadIncrement>> {
        let write_txn = self.storage.db().begin_write()?;
        let outcome = {
            let mut notes = write_txn.open_table(NOTES)?;

            let existing_bytes = match notes.get(note_id)? {
                Some(existing) => existing.value().to_vec(),
                None => return Ok(None),
            };

            let mut note = decode_row(&existing_bytes)?;
            if note.is_exhausted() {
                ReadIncrement::AtLimit {
                    current_reads: note.current_reads,
                }
            } else {
                note.current_reads = note.current_reads.saturating_add(1);
                let json = serde_json::to_vec(&StoredNote::from(&note))?;
                notes.insert(note_id, json.as_slice())?;
                ReadIncrement::Applied {
                    current_reads: note.current_reads,
                    max_reads: note.max_reads,
                }
            }
        };

        match outcome {
            ReadIncrement::Applied { .. } => write_txn.commit()?,
            ReadIncrement::AtLimit { .. } => write_txn.abort()?,
        }
        Ok(Some(outcome))
    }

    /// Delete a note. Returns `true` iff a row was removed.
    pub fn delete(&self, note_id: &str) -> StorageResult<bool> {
        let write_txn = self.storage.db().begin_write()?;
        let removed = {
            let mut notes = write_txn.open_table(NOTES)?;
            let removed = notes.remove(note_id)?.map(|row| row.value().to_vec());

            match removed {
                Some(bytes) => {
                    let row: StoredNote = serde_json::from_slice(&bytes)?;
                    let mut index = write_txn.open_table(NOTES_BY_CREATED)?;
                    let key = created_index_key(row.created_at, note_id);
                    index.remove(key.as_slice())?;
                    true
                }
                None => false,
            }
        };

        if removed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(removed)
    }

    /// Delete every note created strictly before `cutoff` (epoch ms).
    ///
    /// Returns the number of notes removed.
    pub fn delete_older_than(&self, cutoff: i64) -> StorageResult<usize> {
        let upper = ordered_timestamp(cutoff);

        let write_txn = self.storage.db().begin_write()?;
        let removed = {
            let mut index = write_txn.open_table(NOTES_BY_CREATED)?;
            let mut notes = write_txn.open_table(NOTES)?;

            let expired = index
                .range(..upper.as_slice())?
                .map(|entry| entry.map(|(k, v)| (k.value().to_vec(), v.value().to_string())))
                .collect::<Result<Vec<_>, _>>()?;

            let mut removed = 0usize;
            for (key, note_id) in &expired {
                index.remove(key.as_slice())?;
                if notes.remove(note_id.as_str())?.is_some() {
                    removed += 1;
                }
            }
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
