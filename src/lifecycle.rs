// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Note Lifecycle
//!
//! ```text
//! create ──► Active (current_reads < max_reads)
//!              │ record_successful_decrypt
//!              ▼
//!            Exhausted (current_reads >= max_reads) ──delete──► Destroyed
//! ```
//!
//! ## Concurrency
//!
//! Any number of requests may hit the same note at once (several devices of
//! the recipient, network retries). The read counter is only ever changed by
//! [`NoteStore::increment_reads`], an atomic compare-and-increment, so the
//! count can neither lose updates nor pass `max_reads`.
//!
//! Noticing exhaustion and deleting are two steps. Two callers may both see
//! the limit and both try to delete: one removes the row, the other is a
//! no-op, and both report `destroyed: true`.
//!
//! Fetches never advance the counter. A fetch that finds an exhausted note
//! still on disk (an earlier delete failed) treats it as gone and deletes it.
//!
//! ## Policy
//!
//! - `max_reads` set: destroyed by the controller once reached.
//! - `self_destruct` without `max_reads`: the controller never deletes; the
//!   caller calls [`NoteLifecycle::destroy`] after the viewer has consumed
//!   the content.
//! - Neither: kept until the age purge removes it.

use std::time::Duration;

use uuid::Uuid;

use crate::error::NoteError;
use crate::models::{millis_to_datetime, now_millis, NewNote, Note, ReadReceipt, MAX_READS_CAP};
use crate::storage::{NoteStore, ReadIncrement, StorageError};

/// Fresh ids tried by [`NoteLifecycle::create`] before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// Default age after which notes are purged.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Orchestrates note creation, reads and destruction over a [`NoteStore`].
#[derive(Clone, Debug)]
pub struct NoteLifecycle {
    notes: NoteStore,
}

impl NoteLifecycle {
    pub fn new(notes: NoteStore) -> Self {
        Self { notes }
    }

    /// Store a new note in the `Active` state.
    ///
    /// No check is made that the recipient has registered a key; a note can
    /// be sent before its recipient registers.
    pub fn create(&self, request: NewNote) -> Result<Note, NoteError> {
        if let Some(max_reads) = request.max_reads {
            validate_max_reads(max_reads)?;
        }

        let mut note = Note {
            id: generate_note_id(),
            payload: request.payload,
            recipient_identity: request.recipient_identity,
            created_at: now_millis(),
            self_destruct: request.self_destruct,
            max_reads: request.max_reads,
            current_reads: 0,
        };

        let mut attempt = 1;
        loop {
            match self.notes.put(&note) {
                Ok(()) => break,
                Err(StorageError::DuplicateId(id)) if attempt < CREATE_ATTEMPTS => {
                    tracing::warn!(note_id = %id, attempt, "Note id collision, regenerating");
                    note.id = generate_note_id();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            note_id = %note.id,
            self_destruct = note.self_destruct,
            max_reads = ?note.max_reads,
            "Note created"
        );
        Ok(note)
    }

    /// Read a note for display. Never changes the read count.
    pub fn fetch(&self, note_id: &str) -> Result<Note, NoteError> {
        let note = self
            .notes
            .get(note_id)?
            .ok_or_else(|| not_found(note_id))?;

        if note.is_exhausted() {
            let removed = self.notes.delete(note_id)?;
            tracing::warn!(
                note_id = %note_id,
                current_reads = note.current_reads,
                removed,
                "Found exhausted note on fetch, deleted it"
            );
            return Err(not_found(note_id));
        }

        Ok(note)
    }

    /// Record that the recipient decrypted the note, destroying it if that
    /// used up its last read.
    ///
    /// `NotFound` means the note is already gone; callers should treat it
    /// as such rather than as a failure.
    pub fn record_successful_decrypt(&self, note_id: &str) -> Result<ReadReceipt, NoteError> {
        self.record_read(note_id).map(|(receipt, _)| receipt)
    }

    /// As [`record_successful_decrypt`](Self::record_successful_decrypt),
    /// also reporting whether this call is the one that removed the row.
    pub(crate) fn record_read(&self, note_id: &str) -> Result<(ReadReceipt, bool), NoteError> {
        let increment = self
            .notes
            .increment_reads(note_id)?
            .ok_or_else(|| not_found(note_id))?;

        let current_reads = match increment {
            ReadIncrement::Applied {
                current_reads,
                max_reads,
            } => {
                if !max_reads.is_some_and(|max| current_reads >= max) {
                    tracing::debug!(note_id = %note_id, current_reads, "Recorded note read");
                    let receipt = ReadReceipt {
                        destroyed: false,
                        current_reads,
                    };
                    return Ok((receipt, false));
                }
                current_reads
            }
            // Another caller used the last read and has not deleted yet.
            ReadIncrement::AtLimit { current_reads } => current_reads,
        };

        let removed = self.notes.delete(note_id)?;
        tracing::info!(
            note_id = %note_id,
            current_reads,
            removed,
            "Note reached its read limit and was destroyed"
        );
        let receipt = ReadReceipt {
            destroyed: true,
            current_reads,
        };
        Ok((receipt, removed))
    }

    /// Caller-driven delete, e.g. after a burn-after-reading note was shown.
    ///
    /// Idempotent: returns `false` if the note was already gone.
    pub fn destroy(&self, note_id: &str) -> Result<bool, NoteError> {
        let removed = self.notes.delete(note_id)?;
        tracing::info!(note_id = %note_id, removed, "Note destroyed on request");
        Ok(removed)
    }

    /// Delete every note older than `max_age`. Returns how many were
    /// removed.
    pub fn purge_expired(&self, max_age: Duration) -> Result<usize, NoteError> {
        let cutoff = now_millis().saturating_sub(duration_millis(max_age));
        let removed = self.notes.delete_older_than(cutoff)?;
        if removed > 0 {
            tracing::info!(
                removed,
                cutoff = ?millis_to_datetime(cutoff),
                "Purged expired notes"
            );
        }
        Ok(removed)
    }
}

fn validate_max_reads(max_reads: u32) -> Result<(), NoteError> {
    if (1..=MAX_READS_CAP).contains(&max_reads) {
        Ok(())
    } else {
        Err(NoteError::InvalidMaxReads {
            got: max_reads,
            max: MAX_READS_CAP,
        })
    }
}

fn generate_note_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn not_found(note_id: &str) -> NoteError {
    NoteError::NotFound(format!("Note {note_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt, encrypt, EncryptionKeypair};
    use crate::storage::notes::tests::sample_note;
    use crate::storage::{temp_storage, Storage};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn lifecycle(storage: Storage) -> (NoteLifecycle, NoteStore) {
        let store = NoteStore::new(storage);
        (NoteLifecycle::new(store.clone()), store)
    }

    fn request(self_destruct: bool, max_reads: Option<u32>) -> NewNote {
        let recipient = EncryptionKeypair::generate();
        NewNote {
            payload: encrypt("the eagle has landed", recipient.public_key()).unwrap(),
            recipient_identity: "0xrecipient".to_string(),
            self_destruct,
            max_reads,
        }
    }

    #[test]
    fn create_starts_active() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let note = notes.create(request(true, Some(3))).unwrap();

        assert_eq!(note.current_reads, 0);
        assert_eq!(note.id.len(), 32);
        assert_eq!(notes.fetch(&note.id).unwrap(), note);
    }

    #[test]
    fn create_validates_max_reads() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);

        for bad in [0, MAX_READS_CAP + 1] {
            let err = notes.create(request(true, Some(bad))).unwrap_err();
            assert!(matches!(err, NoteError::InvalidMaxReads { got, .. } if got == bad));
        }
        assert!(notes.create(request(true, Some(1))).is_ok());
        assert!(notes.create(request(true, Some(MAX_READS_CAP))).is_ok());
    }

    #[test]
    fn create_does_not_require_registered_recipient() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let mut req = request(false, None);
        req.recipient_identity = "0xnever-registered".to_string();
        assert!(notes.create(req).is_ok());
    }

    #[test]
    fn fetch_does_not_count_as_read() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let note = notes.create(request(true, Some(1))).unwrap();

        for _ in 0..5 {
            assert_eq!(notes.fetch(&note.id).unwrap().current_reads, 0);
        }
    }

    #[test]
    fn limited_note_is_destroyed_on_last_read() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let note = notes.create(request(true, Some(2))).unwrap();

        let first = notes.record_successful_decrypt(&note.id).unwrap();
        assert_eq!(first, ReadReceipt { destroyed: false, current_reads: 1 });
        assert!(notes.fetch(&note.id).is_ok());

        let second = notes.record_successful_decrypt(&note.id).unwrap();
        assert_eq!(second, ReadReceipt { destroyed: true, current_reads: 2 });
        assert!(notes.fetch(&note.id).unwrap_err().is_not_found());

        assert!(notes
            .record_successful_decrypt(&note.id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn burn_after_reading_waits_for_caller() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let note = notes.create(request(true, None)).unwrap();

        let receipt = notes.record_successful_decrypt(&note.id).unwrap();
        assert_eq!(receipt, ReadReceipt { destroyed: false, current_reads: 1 });
        assert!(notes.fetch(&note.id).is_ok());

        assert!(notes.destroy(&note.id).unwrap());
        assert!(notes.fetch(&note.id).unwrap_err().is_not_found());
        assert!(!notes.destroy(&note.id).unwrap());
    }

    #[test]
    fn permanent_note_survives_reads() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let note = notes.create(request(false, None)).unwrap();

        for expected in 1..=20 {
            let receipt = notes.record_successful_decrypt(&note.id).unwrap();
            assert_eq!(receipt, ReadReceipt { destroyed: false, current_reads: expected });
        }
        assert_eq!(notes.fetch(&note.id).unwrap().current_reads, 20);
    }

    #[test]
    fn fetch_heals_exhausted_leftover() {
        let (storage, _dir) = temp_storage();
        let (notes, store) = lifecycle(storage);

        // A note whose destroy step never ran.
        let mut leftover = sample_note("leftover", now_millis());
        leftover.max_reads = Some(1);
        leftover.current_reads = 1;
        store.put(&leftover).unwrap();

        assert!(notes.fetch("leftover").unwrap_err().is_not_found());
        assert!(store.get("leftover").unwrap().is_none());
    }

    #[test]
    fn late_reader_of_exhausted_note_still_reports_destroyed() {
        let (storage, _dir) = temp_storage();
        let (notes, store) = lifecycle(storage);

        let mut leftover = sample_note("late", now_millis());
        leftover.max_reads = Some(2);
        leftover.current_reads = 2;
        store.put(&leftover).unwrap();

        let receipt = notes.record_successful_decrypt("late").unwrap();
        assert_eq!(receipt, ReadReceipt { destroyed: true, current_reads: 2 });
        assert!(store.get("late").unwrap().is_none());
    }

    #[test]
    fn concurrent_reads_never_exceed_limit() {
        let (storage, _dir) = temp_storage();
        let (notes, store) = lifecycle(storage);
        let note = notes.create(request(true, Some(50))).unwrap();

        let results: Vec<Result<(ReadReceipt, bool), NoteError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..100)
                .map(|_| scope.spawn(|| notes.record_read(&note.id)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut live_counts: Vec<u32> = Vec::new();
        let mut destroyed = 0;
        let mut removals = 0;
        let mut gone = 0;
        for result in results {
            match result {
                Ok((ReadReceipt { destroyed: false, current_reads }, removed)) => {
                    assert!(!removed);
                    live_counts.push(current_reads);
                }
                Ok((ReadReceipt { destroyed: true, current_reads }, removed)) => {
                    assert_eq!(current_reads, 50);
                    destroyed += 1;
                    removals += usize::from(removed);
                }
                Err(e) => {
                    assert!(e.is_not_found(), "unexpected error: {e}");
                    gone += 1;
                }
            }
        }

        // Reads 1..=49 were each handed out exactly once; read 50 destroyed it.
        live_counts.sort_unstable();
        assert_eq!(live_counts, (1..50).collect::<Vec<u32>>());
        assert!(destroyed >= 1);
        assert_eq!(removals, 1, "the row must be deleted exactly once");
        assert_eq!(live_counts.len() + destroyed + gone, 100);
        assert!(store.get(&note.id).unwrap().is_none());
    }

    #[test]
    fn purge_respects_max_age() {
        let (storage, _dir) = temp_storage();
        let (notes, store) = lifecycle(storage);
        let now = now_millis();
        store.put(&sample_note("31-days", now - 31 * DAY_MS)).unwrap();
        store.put(&sample_note("29-days", now - 29 * DAY_MS)).unwrap();

        assert_eq!(notes.purge_expired(DEFAULT_MAX_AGE).unwrap(), 1);
        assert!(store.get("31-days").unwrap().is_none());
        assert!(store.get("29-days").unwrap().is_some());
    }

    #[test]
    fn purge_with_huge_age_removes_nothing() {
        let (storage, _dir) = temp_storage();
        let (notes, store) = lifecycle(storage);
        store.put(&sample_note("ancient", 0)).unwrap();
        assert_eq!(notes.purge_expired(Duration::MAX).unwrap(), 0);
    }

    #[test]
    fn full_round_trip_through_lifecycle() {
        let (storage, _dir) = temp_storage();
        let (notes, _) = lifecycle(storage);
        let recipient = EncryptionKeypair::generate();

        let note = notes
            .create(NewNote {
                payload: encrypt("one time only", recipient.public_key()).unwrap(),
                recipient_identity: "0xrecipient".to_string(),
                self_destruct: true,
                max_reads: Some(1),
            })
            .unwrap();

        let fetched = notes.fetch(&note.id).unwrap();
        let text = decrypt(&fetched.payload, recipient.secret_key()).unwrap();
        assert_eq!(text, "one time only");

        let receipt = notes.record_successful_decrypt(&note.id).unwrap();
        assert!(receipt.destroyed);
        assert!(notes.fetch(&note.id).unwrap_err().is_not_found());
    }
}
