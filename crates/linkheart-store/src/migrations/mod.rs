//! Schema for the `collections` table.
//!
//! The whole store is one table of JSON blobs, so the schema changes rarely.
//! `PRAGMA user_version` records the last applied step; [`run_migrations`]
//! applies the missing steps on open and refuses a file written by a newer
//! build.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Step = fn(&Connection) -> rusqlite::Result<()>;

/// Ordered schema steps; entry `i` brings the file to version `i + 1`.
const STEPS: &[(&str, Step)] = &[("v001_initial", v001_initial::up)];

fn target_version() -> u32 {
    STEPS.len() as u32
}

/// Bring the open file up to the current schema.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let target = target_version();

    if found > target {
        return Err(StoreError::Migration(format!(
            "database schema v{found} is newer than supported v{target}"
        )));
    }

    for (version, (name, up)) in (1u32..).zip(STEPS).skip(found as usize) {
        tracing::info!(step = name, version, "applying schema step");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", version)?;
    }

    tracing::debug!(version = target, "schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_version(conn: &Connection) -> u32 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(user_version(&conn), target_version());
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", target_version() + 1)
            .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration(_)));
    }
}
