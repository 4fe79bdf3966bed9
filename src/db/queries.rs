// Database queries — CRUD for the durable ignore tier.
//
// All SQL lives here. Expiry timestamps are stored as unix milliseconds so
// comparisons stay numeric and match the in-memory tier to the millisecond.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Get the stored expiry for a subject.
pub fn get_ignore_expiry(conn: &Connection, subject_id: &str) -> Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = conn
        .query_row(
            "SELECT expires_at FROM ignore_entries WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )
        .optional()?;

    match millis {
        Some(millis) => {
            let expires_at = DateTime::from_timestamp_millis(millis).with_context(|| {
                format!("Stored expiry out of range for {subject_id}: {millis}")
            })?;
            Ok(Some(expires_at))
        }
        None => Ok(None),
    }
}

/// Insert or replace a subject's expiry.
pub fn upsert_ignore_entry(
    conn: &Connection,
    subject_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ignore_entries (subject_id, expires_at, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(subject_id) DO UPDATE SET expires_at = ?2, updated_at = datetime('now')",
        params![subject_id, expires_at.timestamp_millis()],
    )?;
    Ok(())
}

/// Delete a subject's entry (no-op if absent).
pub fn delete_ignore_entry(conn: &Connection, subject_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM ignore_entries WHERE subject_id = ?1",
        params![subject_id],
    )?;
    Ok(())
}

/// Count entries that have not yet expired as of `now`.
pub fn count_active_ignores(conn: &Connection, now: DateTime<Utc>) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ignore_entries WHERE expires_at >= ?1",
        params![now.timestamp_millis()],
        |row| row.get(0),
    )?;
    Ok(count)
}
