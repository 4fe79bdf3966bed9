// Term sources — where the fast-path term list comes from, and the loop that
// keeps the matcher fresh.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::MatcherHandle;

/// Supplies the current term list. Polled periodically.
#[async_trait]
pub trait TermSource: Send + Sync {
    async fn fetch_terms(&self) -> Result<Vec<String>>;
}

/// Reads one term per line from a text file. Blank lines and lines starting
/// with `#` are skipped.
pub struct FileTermSource {
    path: PathBuf,
}

impl FileTermSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TermSource for FileTermSource {
    async fn fetch_terms(&self) -> Result<Vec<String>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read term list {}", self.path.display()))?;
        Ok(parse_term_list(&contents))
    }
}

/// A fixed term list.
pub struct StaticTermSource {
    terms: Vec<String>,
}

impl StaticTermSource {
    pub fn new<S: Into<String>>(terms: impl IntoIterator<Item = S>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TermSource for StaticTermSource {
    async fn fetch_terms(&self) -> Result<Vec<String>> {
        Ok(self.terms.clone())
    }
}

/// Parse a newline-separated term list.
pub fn parse_term_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Fetch terms once and rebuild the matcher. Returns the compiled term count.
pub async fn refresh_once(handle: &MatcherHandle, source: &dyn TermSource) -> Result<usize> {
    let terms = source.fetch_terms().await?;
    handle.rebuild(&terms)
}

/// Spawn a background loop that refreshes the matcher on a timer.
///
/// The first tick fires after one full period; callers should run
/// `refresh_once` at startup. A failed refresh keeps the previous matcher.
pub fn spawn_refresh_loop(
    handle: Arc<MatcherHandle>,
    source: Arc<dyn TermSource>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match refresh_once(&handle, source.as_ref()).await {
                Ok(count) => info!(terms = count, "Term list refreshed"),
                Err(e) => error!(error = %e, "Term refresh failed, keeping previous list"),
            }
        }
    })
}
