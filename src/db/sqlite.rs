// SqliteIgnoreStore — rusqlite backend for the durable ignore tier.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::ignore::IgnoreStore;

pub struct SqliteIgnoreStore {
    conn: Mutex<Connection>,
}

impl SqliteIgnoreStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Count the number of user-created tables in the database.
    pub async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    /// Count entries that are still in force at `now`.
    pub async fn active_count(&self, now: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_active_ignores(&conn, now)
    }
}

#[async_trait]
impl IgnoreStore for SqliteIgnoreStore {
    async fn get(&self, subject_id: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().await;
        super::queries::get_ignore_expiry(&conn, subject_id)
    }

    async fn upsert(&self, subject_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::upsert_ignore_entry(&conn, subject_id, expires_at)
    }

    async fn delete(&self, subject_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::delete_ignore_entry(&conn, subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use chrono::Duration;

    fn test_store() -> SqliteIgnoreStore {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteIgnoreStore::new(conn)
    }

    #[tokio::test]
    async fn test_trait_roundtrip() {
        let store = test_store();
        // Millisecond precision, like the stored column
        let expires = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();

        assert!(store.get("did:plc:a").await.unwrap().is_none());
        store.upsert("did:plc:a", expires).await.unwrap();
        assert_eq!(store.get("did:plc:a").await.unwrap(), Some(expires));
        store.delete("did:plc:a").await.unwrap();
        assert!(store.get("did:plc:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_count() {
        let store = test_store();
        let now = Utc::now();
        store.upsert("did:plc:a", now + Duration::days(7)).await.unwrap();
        store.upsert("did:plc:b", now - Duration::days(7)).await.unwrap();
        assert_eq!(store.active_count(now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let store = test_store();
        assert_eq!(store.table_count().await.unwrap(), 2);
    }
}
