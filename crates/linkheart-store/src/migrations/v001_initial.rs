//! The `collections` table: one row per entity kind holding its JSON array
//! and the revision used for optimistic writes.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    kind       TEXT PRIMARY KEY NOT NULL,   -- storage key, e.g. 'lh_users'
    payload    TEXT NOT NULL,               -- JSON array of records
    revision   INTEGER NOT NULL,            -- bumped on every write
    updated_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

/// Create the table if it does not exist.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
