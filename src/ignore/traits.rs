// Ignore store trait — the key/value contract both cache tiers sit on.
//
// Implementors: MemoryIgnoreStore (HashMap behind a mutex) and
// SqliteIgnoreStore (rusqlite). Expiry policy lives in IgnoreCache, not here;
// a store only remembers one expiry per subject.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait IgnoreStore: Send + Sync {
    /// Look up the stored expiry for a subject, if any.
    async fn get(&self, subject_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Insert or replace the expiry for a subject.
    async fn upsert(&self, subject_id: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Remove a subject's entry. Removing an unknown subject is not an error.
    async fn delete(&self, subject_id: &str) -> Result<()>;
}
