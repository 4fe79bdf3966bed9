// TTL ignore cache — lazy-expiry suppression over an IgnoreStore.
//
// Entries are never swept proactively. An expired entry is only noticed (and
// deleted) when someone asks about that subject.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::memory::MemoryIgnoreStore;
use super::traits::IgnoreStore;
use crate::clock::Clock;

/// Which tier a cache instance represents. Only used for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreTier {
    /// Process memory — the aggregator's escalation cooldown.
    Ephemeral,
    /// SQLite — the dispatcher's verdict cooldowns, survives restarts.
    Durable,
}

impl IgnoreTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreTier::Ephemeral => "ephemeral",
            IgnoreTier::Durable => "durable",
        }
    }
}

impl std::fmt::Display for IgnoreTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct IgnoreCache {
    tier: IgnoreTier,
    store: Arc<dyn IgnoreStore>,
    clock: Arc<dyn Clock>,
}

impl IgnoreCache {
    pub fn new(tier: IgnoreTier, store: Arc<dyn IgnoreStore>, clock: Arc<dyn Clock>) -> Self {
        Self { tier, store, clock }
    }

    /// An ephemeral-tier cache backed by a fresh in-memory store.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            IgnoreTier::Ephemeral,
            Arc::new(MemoryIgnoreStore::new()),
            clock,
        )
    }

    pub fn tier(&self) -> IgnoreTier {
        self.tier
    }

    /// Whether `subject_id` is currently suppressed.
    ///
    /// An entry whose expiry has passed is deleted as a side effect and
    /// reported as not ignored. A failed delete is logged; the entry still
    /// counts as expired.
    pub async fn is_ignored(&self, subject_id: &str) -> Result<bool> {
        let expires_at = self
            .store
            .get(subject_id)
            .await
            .with_context(|| format!("Failed to read {} ignore entry", self.tier))?;

        let Some(expires_at) = expires_at else {
            return Ok(false);
        };

        if self.clock.now() > expires_at {
            debug!(
                tier = %self.tier,
                subject = subject_id,
                expired_at = %expires_at,
                "Ignore entry expired, removing"
            );
            if let Err(e) = self.store.delete(subject_id).await {
                warn!(
                    tier = %self.tier,
                    subject = subject_id,
                    error = %e,
                    "Failed to delete expired ignore entry"
                );
            }
            return Ok(false);
        }

        Ok(true)
    }

    /// Suppress `subject_id` for `period_days` from now, replacing any
    /// existing expiry. Returns the new expiry.
    pub async fn add(&self, subject_id: &str, period_days: u32) -> Result<DateTime<Utc>> {
        let expires_at = self.clock.now() + Duration::days(i64::from(period_days));
        self.store
            .upsert(subject_id, expires_at)
            .await
            .with_context(|| format!("Failed to write {} ignore entry", self.tier))?;
        debug!(
            tier = %self.tier,
            subject = subject_id,
            days = period_days,
            "Added ignore entry"
        );
        Ok(expires_at)
    }
}
