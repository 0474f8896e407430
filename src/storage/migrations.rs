// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered schema migrations.
//!
//! Each migration runs in its own write transaction together with the bump
//! of `schema_version`, so the recorded version always matches the tables
//! on disk. Opening an up-to-date database applies nothing.

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};

use super::notes::{created_index_key, StoredNote};
use super::{StorageError, StorageResult, NOTES, NOTES_BY_CREATED, REGISTERED_KEYS, SCHEMA_META};

const SCHEMA_VERSION_KEY: &str = "schema_version";

struct Migration {
    version: u64,
    name: &'static str,
    apply: fn(&WriteTransaction) -> StorageResult<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create notes and registered keys",
        apply: create_base_tables,
    },
    Migration {
        version: 2,
        name: "index notes by creation time",
        apply: index_notes_by_created,
    },
];

/// Version reached once every migration has run.
pub const LATEST_VERSION: u64 = 2;

/// Read the recorded schema version (0 for a fresh database).
pub fn current_version(db: &Database) -> StorageResult<u64> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(SCHEMA_META) {
        Ok(table) => table,
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let version = table.get(SCHEMA_VERSION_KEY)?.map(|v| v.value()).unwrap_or(0);
    Ok(version)
}

/// Apply every migration newer than the recorded version.
///
/// Returns the resulting schema version.
pub fn apply_pending(db: &Database) -> StorageResult<u64> {
    let mut version = current_version(db)?;

    if version > LATEST_VERSION {
        return Err(StorageError::MigrationFailed {
            version,
            reason: format!("database schema is newer than supported version {LATEST_VERSION}"),
        });
    }

    let start = version;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let write_txn = db.begin_write()?;
        (migration.apply)(&write_txn).map_err(|e| StorageError::MigrationFailed {
            version: migration.version,
            reason: e.to_string(),
        })?;
        {
            let mut meta = write_txn.open_table(SCHEMA_META)?;
            meta.insert(SCHEMA_VERSION_KEY, migration.version)?;
        }
        write_txn.commit()?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied schema migration"
        );
        version = migration.version;
    }

    Ok(version)
}

fn create_base_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(NOTES)?;
    let _ = txn.open_table(REGISTERED_KEYS)?;
    Ok(())
}

fn index_notes_by_created(txn: &WriteTransaction) -> StorageResult<()> {
    let notes = txn.open_table(NOTES)?;
    let mut index = txn.open_table(NOTES_BY_CREATED)?;

    let mut indexed = 0u64;
    for entry in notes.iter()? {
        let (id, row) = entry?;
        let stored: StoredNote = serde_json::from_slice(row.value())?;
        let key = created_index_key(stored.created_at, id.value());
        index.insert(key.as_slice(), id.value())?;
        indexed += 1;
    }

    if indexed > 0 {
        tracing::info!(notes = indexed, "Backfilled creation-time index");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::notes::tests::sample_note;

    fn fresh_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::create(dir.path().join("migrate.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn fresh_database_reaches_latest() {
        let (db, _dir) = fresh_db();
        assert_eq!(current_version(&db).unwrap(), 0);
        assert_eq!(apply_pending(&db).unwrap(), LATEST_VERSION);
        assert_eq!(current_version(&db).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn reapplying_is_a_no_op() {
        let (db, _dir) = fresh_db();
        apply_pending(&db).unwrap();
        assert_eq!(apply_pending(&db).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn migrations_are_ordered_and_end_at_latest() {
        let versions: Vec<u64> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
        assert_eq!(versions.last().copied(), Some(LATEST_VERSION));
    }

    #[test]
    fn version_two_backfills_index_from_version_one_data() {
        let (db, _dir) = fresh_db();

        // Simulate a database left at version 1 with a note in it.
        let txn = db.begin_write().unwrap();
        create_base_tables(&txn).unwrap();
        {
            let note = sample_note("legacy", 1_000);
            let row = serde_json::to_vec(&StoredNote::from(&note)).unwrap();
            let mut notes = txn.open_table(NOTES).unwrap();
            notes.insert("legacy", row.as_slice()).unwrap();
            let mut meta = txn.open_table(SCHEMA_META).unwrap();
            meta.insert(SCHEMA_VERSION_KEY, 1u64).unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(apply_pending(&db).unwrap(), 2);

        let read = db.begin_read().unwrap();
        let index = read.open_table(NOTES_BY_CREATED).unwrap();
        let key = created_index_key(1_000, "legacy");
        assert_eq!(
            index.get(key.as_slice()).unwrap().map(|v| v.value().to_string()),
            Some("legacy".to_string())
        );
    }

    #[test]
    fn newer_schema_is_refused() {
        let (db, _dir) = fresh_db();
        let txn = db.begin_write().unwrap();
        {
            let mut meta = txn.open_table(SCHEMA_META).unwrap();
            meta.insert(SCHEMA_VERSION_KEY, LATEST_VERSION + 1).unwrap();
        }
        txn.commit().unwrap();

        let err = apply_pending(&db).unwrap_err();
        assert!(matches!(err, StorageError::MigrationFailed { .. }));
    }
}
