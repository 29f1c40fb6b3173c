//! SQLite-backed [`Backend`].
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  Each collection is a single
//! row in the `collections` table; batches are applied inside one
//! `BEGIN IMMEDIATE` transaction so revision checks and writes are atomic even
//! when several processes share the file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::backend::{Backend, BlobWrite, CollectionKind, StoredBlob};
use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/linkheart/linkheart.db`
    /// - macOS:   `~/Library/Application Support/com.linkheart.linkheart/linkheart.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\linkheart\linkheart\data\linkheart.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "linkheart", "linkheart").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("linkheart.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn().path().map(PathBuf::from)
    }
}

impl Backend for Database {
    fn read(&self, kind: CollectionKind) -> Result<Option<StoredBlob>> {
        let conn = self.conn();
        let blob = conn
            .query_row(
                "SELECT payload, revision FROM collections WHERE kind = ?1",
                params![kind.key()],
                |row| {
                    let payload: String = row.get(0)?;
                    let revision: i64 = row.get(1)?;
                    Ok(StoredBlob {
                        payload,
                        revision: revision as u64,
                    })
                },
            )
            .optional()?;
        Ok(blob)
    }

    fn write(&self, writes: &[BlobWrite]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();

        for w in writes {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT revision FROM collections WHERE kind = ?1",
                    params![w.kind.key()],
                    |row| row.get(0),
                )
                .optional()?;

            // Dropping `tx` on the early return rolls the batch back.
            if current.map(|r| r as u64) != w.expected_revision {
                tracing::debug!(
                    kind = %w.kind,
                    expected = ?w.expected_revision,
                    found = ?current,
                    "revision mismatch"
                );
                return Err(StoreError::Conflict { kind: w.kind });
            }

            let next = current.unwrap_or(0) + 1;
            tx.execute(
                "INSERT INTO collections (kind, payload, revision, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(kind) DO UPDATE SET
                     payload = excluded.payload,
                     revision = excluded.revision,
                     updated_at = excluded.updated_at",
                params![w.kind.key(), w.payload, next, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(kind: CollectionKind, payload: &str, expected: Option<u64>) -> BlobWrite {
        BlobWrite {
            kind,
            payload: payload.to_string(),
            expected_revision: expected,
        }
    }

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
        assert!(db.read(CollectionKind::Users).unwrap().is_none());
    }

    #[test]
    fn blobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("linkheart.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.write(&[write(CollectionKind::Likes, "[]", None)]).unwrap();
            db.write(&[write(CollectionKind::Likes, "[\"x\"]", Some(1))])
                .unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        let blob = db.read(CollectionKind::Likes).unwrap().unwrap();
        assert_eq!(blob.payload, "[\"x\"]");
        assert_eq!(blob.revision, 2);
    }

    #[test]
    fn second_handle_sees_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = Database::open_at(&path).unwrap();
        let second = Database::open_at(&path).unwrap();

        first
            .write(&[write(CollectionKind::Matches, "[]", None)])
            .unwrap();

        // `second` still believes the collection does not exist.
        let err = second
            .write(&[write(CollectionKind::Matches, "[1]", None)])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                kind: CollectionKind::Matches
            }
        ));
        assert_eq!(
            second.read(CollectionKind::Matches).unwrap().unwrap().payload,
            "[]"
        );
    }

    #[test]
    fn failed_batch_leaves_earlier_writes_unapplied() {
        let db = Database::open_in_memory().unwrap();
        db.write(&[write(CollectionKind::Users, "[]", None)]).unwrap();

        let err = db
            .write(&[
                write(CollectionKind::Messages, "[]", None),
                write(CollectionKind::Users, "[1]", Some(7)),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(db.read(CollectionKind::Messages).unwrap().is_none());
    }
}
