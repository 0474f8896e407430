// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Note Storage
//!
//! Embedded ACID storage backed by redb (pure Rust). A single database file
//! holds every table; the [`Storage`] handle is opened once at startup and
//! cloned into the [`NoteStore`] and the [`KeyDirectory`]. The file is
//! released when the last clone is dropped.
//!
//! ## Table Layout
//!
//! - `notes`: note id → JSON row
//! - `notes_by_created`: `created_at_be | note id` → note id (age purge index)
//! - `registered_keys`: identity → JSON row
//! - `schema_meta`: key → u64 (`schema_version`)
//!
//! ## Atomicity
//!
//! redb admits one write transaction at a time. Every read-modify-write in
//! this module (insert-if-absent, compare-and-increment, delete, purge) runs
//! inside a single write transaction, so concurrent callers can never lose
//! an update.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, TableDefinition};

pub mod key_cache;
pub mod keys;
pub mod migrations;
pub mod notes;

pub use key_cache::KeyCache;
pub use keys::KeyDirectory;
pub use notes::{NoteStore, ReadIncrement};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: note id → serialized note row (JSON bytes).
pub(crate) const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");

/// Index: `created_at (order-preserving big-endian) | note id` → note id.
pub(crate) const NOTES_BY_CREATED: TableDefinition<&[u8], &str> =
    TableDefinition::new("notes_by_created");

/// Identity → serialized registered key (JSON bytes).
pub(crate) const REGISTERED_KEYS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("registered_keys");

/// Schema bookkeeping: key → value.
pub(crate) const SCHEMA_META: TableDefinition<&str, u64> = TableDefinition::new("schema_meta");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("migration {version} failed: {reason}")]
    MigrationFailed { version: u64, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Storage Handle
// =============================================================================

/// Explicitly constructed handle to the database file.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
    path: PathBuf,
}

impl Storage {
    /// Open (or create) the database at `path` and bring its schema up to
    /// date.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;
        let version = migrations::apply_pending(&db)?;

        tracing::info!(
            path = %path.display(),
            schema_version = version,
            "Note storage opened"
        );

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> StorageResult<u64> {
        migrations::current_version(&self.db)
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

#[cfg(test)]
pub(crate) fn temp_storage() -> (Storage, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
    (storage, dir)
}
