// Database schema — table creation and migrations.
//
// A `schema_version` table tracks which migrations have run, and each
// migration is a function that executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Durable ignore tier: one row per suppressed account
        CREATE TABLE IF NOT EXISTS ignore_entries (
            subject_id TEXT PRIMARY KEY,       -- account DID
            expires_at INTEGER NOT NULL,       -- unix milliseconds, UTC (v3)
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: index expiry so active-entry counts don't scan the table.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_ignore_expires ON ignore_entries(expires_at);",
        )
    })?;

    // Migration v3: expiry moves from unix seconds to unix milliseconds.
    run_migration(conn, 3, |c| {
        c.execute_batch("UPDATE ignore_entries SET expires_at = expires_at * 1000;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, ignore_entries
        assert_eq!(table_count(&conn).unwrap(), 2i64);
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_seconds_rows_migrate_to_millis() {
        let conn = Connection::open_in_memory().unwrap();
        // A database created before v3: expiry in seconds
        conn.execute_batch(
            "
            CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE ignore_entries (
                subject_id TEXT PRIMARY KEY,
                expires_at INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            INSERT INTO schema_version (version) VALUES (1), (2);
            INSERT INTO ignore_entries (subject_id, expires_at) VALUES ('did:plc:a', 1760000000);
            ",
        )
        .unwrap();

        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let stored: i64 = conn
            .query_row(
                "SELECT expires_at FROM ignore_entries WHERE subject_id = 'did:plc:a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 1_760_000_000_000);
    }
}
