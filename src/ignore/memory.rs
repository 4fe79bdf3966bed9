// In-process ignore store — backs the ephemeral tier.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::traits::IgnoreStore;

/// HashMap-backed store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryIgnoreStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryIgnoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl IgnoreStore for MemoryIgnoreStore {
    async fn get(&self, subject_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.entries.lock().await.get(subject_id).copied())
    }

    async fn upsert(&self, subject_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(subject_id.to_string(), expires_at);
        Ok(())
    }

    async fn delete(&self, subject_id: &str) -> Result<()> {
        self.entries.lock().await.remove(subject_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_replaces_previous_expiry() {
        let store = MemoryIgnoreStore::new();
        let first = Utc::now();
        let second = first + Duration::days(3);

        store.upsert("did:plc:a", first).await.unwrap();
        store.upsert("did:plc:a", second).await.unwrap();

        assert_eq!(store.get("did:plc:a").await.unwrap(), Some(second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_ok() {
        let store = MemoryIgnoreStore::new();
        store.delete("did:plc:nobody").await.unwrap();
        assert!(store.is_empty().await);
    }
}
