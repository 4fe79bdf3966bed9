// Shared fakes for the integration tests.
//
// Every collaborator the pipeline talks to has an in-memory stand-in here:
// a labeler that records calls, a classifier with a scripted verdict, a
// resolver with a fixed handle table, and an ignore store that always fails.
// CapturedLogs collects formatted tracing output for assertions on log records.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, Semaphore};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use cinder::bluesky::IdentityResolver;
use cinder::classifier::{ScamClassifier, Verdict};
use cinder::clock::ManualClock;
use cinder::ignore::{IgnoreCache, IgnoreStore, IgnoreTier, MemoryIgnoreStore};
use cinder::moderation::{LabelActuator, LabelSubject};
use cinder::pipeline::PostEvent;

/// Text long enough to pass the five-word filter.
pub const DUP_TEXT: &str = "buy now before the price doubles";

pub fn post(account: &str, post_id: &str, text: &str) -> PostEvent {
    PostEvent::new(account, post_id, text).with_content_ref(&format!("bafy-{account}-{post_id}"))
}

// ============================================================
// Labeler
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCall {
    pub subject: LabelSubject,
    pub labels: Vec<String>,
    pub comment: String,
}

/// Records every label call. Calls whose subject string contains one of the
/// `fail_on` fragments return an error (after being recorded).
#[derive(Default)]
pub struct RecordingLabeler {
    calls: Mutex<Vec<LabelCall>>,
    fail_on: Vec<String>,
}

impl RecordingLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fragments: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: fragments.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<LabelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn account_calls(&self) -> Vec<LabelCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.subject.is_account())
            .collect()
    }

    pub fn post_calls(&self) -> Vec<LabelCall> {
        self.calls()
            .into_iter()
            .filter(|c| !c.subject.is_account())
            .collect()
    }
}

#[async_trait]
impl LabelActuator for RecordingLabeler {
    async fn apply_label(
        &self,
        subject: &LabelSubject,
        labels: &[&str],
        comment: &str,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(LabelCall {
            subject: subject.clone(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            comment: comment.to_string(),
        });

        let rendered = subject.to_string();
        if self.fail_on.iter().any(|f| rendered.contains(f.as_str())) {
            anyhow::bail!("labeler unavailable for {rendered}");
        }
        Ok(())
    }
}

/// Blocks every label call until the gate is opened. `entered` is notified
/// each time a call starts waiting.
pub struct GatedLabeler {
    pub inner: RecordingLabeler,
    pub entered: Notify,
    gate: Semaphore,
}

impl GatedLabeler {
    pub fn new() -> Self {
        Self {
            inner: RecordingLabeler::new(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Let all current and future calls through.
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl LabelActuator for GatedLabeler {
    async fn apply_label(
        &self,
        subject: &LabelSubject,
        labels: &[&str],
        comment: &str,
    ) -> Result<()> {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await?;
        self.inner.apply_label(subject, labels, comment).await
    }
}

// ============================================================
// Classifier
// ============================================================

/// Returns a fixed verdict (or always fails) and records the snippets it saw.
pub struct ScriptedClassifier {
    verdict: Option<Verdict>,
    calls: AtomicUsize,
    snippets: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn returning(verdict: Verdict) -> Self {
        Self {
            verdict: Some(verdict),
            calls: AtomicUsize::new(0),
            snippets: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: None,
            calls: AtomicUsize::new(0),
            snippets: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snippets(&self) -> Vec<String> {
        self.snippets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScamClassifier for ScriptedClassifier {
    async fn classify(&self, snippet: &str) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snippets.lock().unwrap().push(snippet.to_string());
        match self.verdict {
            Some(verdict) => Ok(verdict),
            None => anyhow::bail!("classifier returned 503"),
        }
    }
}

// ============================================================
// Identity
// ============================================================

/// Resolves from a fixed table, falling back to the account id.
#[derive(Default)]
pub struct FixedResolver {
    handles: HashMap<String, String>,
}

impl FixedResolver {
    pub fn with(mut self, did: &str, handle: &str) -> Self {
        self.handles.insert(did.to_string(), handle.to_string());
        self
    }
}

#[async_trait]
impl IdentityResolver for FixedResolver {
    async fn resolve(&self, account_id: &str) -> String {
        self.handles
            .get(account_id)
            .cloned()
            .unwrap_or_else(|| account_id.to_string())
    }
}

// ============================================================
// Ignore stores
// ============================================================

/// A durable store that is always down.
pub struct UnavailableStore;

#[async_trait]
impl IgnoreStore for UnavailableStore {
    async fn get(&self, _subject_id: &str) -> Result<Option<DateTime<Utc>>> {
        anyhow::bail!("database is locked")
    }

    async fn upsert(&self, _subject_id: &str, _expires_at: DateTime<Utc>) -> Result<()> {
        anyhow::bail!("database is locked")
    }

    async fn delete(&self, _subject_id: &str) -> Result<()> {
        anyhow::bail!("database is locked")
    }
}

/// A durable-tier cache over a memory store, driven by a manual clock.
pub fn durable_cache() -> (Arc<IgnoreCache>, Arc<MemoryIgnoreStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryIgnoreStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = Arc::new(IgnoreCache::new(
        IgnoreTier::Durable,
        store.clone(),
        clock.clone(),
    ));
    (cache, store, clock)
}

/// An ephemeral-tier cache driven by a manual clock.
pub fn ephemeral_cache() -> (Arc<IgnoreCache>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = Arc::new(IgnoreCache::in_memory(clock.clone()));
    (cache, clock)
}

// ============================================================
// Logs
// ============================================================

/// Shared buffer that a fmt subscriber writes into.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's info-level events into the buffer until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
