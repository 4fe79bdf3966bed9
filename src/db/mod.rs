// Database layer — SQLite storage for the durable ignore tier.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever CINDER_DB_PATH points
// (defaults to ./cinder.db).

pub mod queries;
pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteIgnoreStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Open (or create) the database and run migrations.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    // WAL keeps lookups cheap while the pipeline writes
    conn.pragma_update(None, "journal_mode", "WAL")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {db_path}. Run `cinder init` first.");
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Pick up migrations added since the database was created
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Create the database if needed and wrap it as an ignore store.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<SqliteIgnoreStore>> {
    Ok(Arc::new(SqliteIgnoreStore::new(initialize(db_path)?)))
}

/// Open an existing database as an ignore store.
pub fn open_sqlite(db_path: &str) -> Result<Arc<SqliteIgnoreStore>> {
    Ok(Arc::new(SqliteIgnoreStore::new(open(db_path)?)))
}
