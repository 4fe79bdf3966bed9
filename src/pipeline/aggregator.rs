// Windowed duplicate aggregator — catches copy-paste spam.
//
// Each window's batch is grouped by exact text, then by account. Two rules
// run per group:
// - Cross-account: enough distinct accounts posting the same text labels
//   every collected post in the group.
// - Same-account: one account repeating the text enough times labels its
//   posts and adds to that account's cumulative score.
// A cumulative score above the escalation threshold labels the account
// itself, parks it in the ephemeral ignore tier, and resets the score.
//
// Groups live for one run only. Scores live for the aggregator's lifetime.
// Only one run may be in flight; a run triggered while another is processing
// drops its batch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::PostEvent;
use crate::ignore::IgnoreCache;
use crate::moderation::{labels, LabelActuator, LabelSubject};
use crate::output::truncate_chars;

/// Posts with fewer whitespace-delimited words are too short to be a signal.
pub const MIN_WORDS: usize = 5;

/// How long an escalated account stays in the ephemeral tier.
pub const ESCALATION_IGNORE_DAYS: u32 = 7;

/// Rule thresholds. Cross-account and same-account compare with `>=`;
/// escalation compares with `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorThresholds {
    pub same_account: u32,
    pub multi_account: u32,
    pub scam_score: u32,
}

impl Default for AggregatorThresholds {
    fn default() -> Self {
        Self {
            same_account: 3,
            multi_account: 3,
            scam_score: 5,
        }
    }
}

/// A post as remembered by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedPost {
    pub post_id: String,
    pub content_ref: Option<String>,
}

/// One account's posts of one text within a window.
#[derive(Debug, Default)]
pub struct AccountWindowEntry {
    pub unique_post_ids: HashSet<String>,
    pub occurrence_count: u32,
    pub posts: Vec<CollectedPost>,
}

impl AccountWindowEntry {
    /// Record a post. Returns false if this post id was already counted.
    fn record(&mut self, post_id: &str, content_ref: Option<&str>) -> bool {
        if !self.unique_post_ids.insert(post_id.to_string()) {
            return false;
        }
        self.occurrence_count += 1;
        self.posts.push(CollectedPost {
            post_id: post_id.to_string(),
            content_ref: content_ref.map(str::to_string),
        });
        true
    }
}

/// All accounts that posted one exact text, in first-seen order.
#[derive(Debug)]
pub struct DuplicateGroup {
    pub text: String,
    pub accounts: Vec<(String, AccountWindowEntry)>,
    index: HashMap<String, usize>,
}

impl DuplicateGroup {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            accounts: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn entry_mut(&mut self, account_id: &str) -> &mut AccountWindowEntry {
        let slot = match self.index.get(account_id) {
            Some(&slot) => slot,
            None => {
                self.accounts
                    .push((account_id.to_string(), AccountWindowEntry::default()));
                let slot = self.accounts.len() - 1;
                self.index.insert(account_id.to_string(), slot);
                slot
            }
        };
        &mut self.accounts[slot].1
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn entry(&self, account_id: &str) -> Option<&AccountWindowEntry> {
        self.index
            .get(account_id)
            .map(|&slot| &self.accounts[slot].1)
    }
}

/// The build-phase result for one batch.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    pub groups: Vec<DuplicateGroup>,
    index: HashMap<String, usize>,
    /// Events that made it into a group.
    pub accepted: usize,
}

impl DuplicateIndex {
    /// Group a batch by text and account, skipping malformed and short posts.
    pub fn build(batch: &[PostEvent]) -> Self {
        let mut index = Self::default();
        for event in batch {
            index.insert(event);
        }
        index
    }

    /// Add one event. Returns true if it was counted.
    pub fn insert(&mut self, event: &PostEvent) -> bool {
        if !event.is_well_formed() {
            debug!(post = %event.post_id, "Dropping malformed event");
            return false;
        }
        if event.word_count() < MIN_WORDS {
            return false;
        }

        let slot = match self.index.get(&event.text) {
            Some(&slot) => slot,
            None => {
                self.groups.push(DuplicateGroup::new(&event.text));
                let slot = self.groups.len() - 1;
                self.index.insert(event.text.clone(), slot);
                slot
            }
        };

        let counted = self.groups[slot]
            .entry_mut(&event.account_id)
            .record(&event.post_id, event.content_ref());
        if counted {
            self.accepted += 1;
        }
        counted
    }

    pub fn group(&self, text: &str) -> Option<&DuplicateGroup> {
        self.index.get(text).map(|&slot| &self.groups[slot])
    }
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowReport {
    pub events_received: usize,
    pub events_accepted: usize,
    pub groups: usize,
    pub cross_account_hits: usize,
    pub same_account_hits: usize,
    pub label_attempts: usize,
    pub label_failures: usize,
    /// Accounts whose score crossed the escalation threshold this run.
    pub escalated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was processing; the batch was discarded.
    Dropped { events: usize },
    Completed(WindowReport),
}

/// Resets the processing flag when a run ends, however it ends.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DuplicateAggregator {
    thresholds: AggregatorThresholds,
    labeler: Arc<dyn LabelActuator>,
    quick_ignore: Arc<IgnoreCache>,
    processing: AtomicBool,
    scores: Mutex<HashMap<String, u32>>,
}

impl DuplicateAggregator {
    pub fn new(
        thresholds: AggregatorThresholds,
        labeler: Arc<dyn LabelActuator>,
        quick_ignore: Arc<IgnoreCache>,
    ) -> Self {
        Self {
            thresholds,
            labeler,
            quick_ignore,
            processing: AtomicBool::new(false),
            scores: Mutex::new(HashMap::new()),
        }
    }

    pub fn thresholds(&self) -> AggregatorThresholds {
        self.thresholds
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Current cumulative score for an account (0 if never scored).
    pub async fn cumulative_score(&self, account_id: &str) -> u32 {
        self.scores
            .lock()
            .await
            .get(account_id)
            .copied()
            .unwrap_or(0)
    }

    /// Process one window's batch.
    pub async fn run(&self, batch: Vec<PostEvent>) -> RunOutcome {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                events = batch.len(),
                "Aggregator still processing previous window, dropping batch"
            );
            return RunOutcome::Dropped {
                events: batch.len(),
            };
        }
        let _guard = ProcessingGuard(&self.processing);

        let report = self.process(&batch).await;

        info!(
            events = report.events_received,
            accepted = report.events_accepted,
            groups = report.groups,
            cross_account = report.cross_account_hits,
            same_account = report.same_account_hits,
            labels = report.label_attempts,
            label_failures = report.label_failures,
            escalated = report.escalated.len(),
            "Window processed"
        );

        RunOutcome::Completed(report)
    }

    async fn process(&self, batch: &[PostEvent]) -> WindowReport {
        let index = DuplicateIndex::build(batch);

        let mut report = WindowReport {
            events_received: batch.len(),
            events_accepted: index.accepted,
            groups: index.groups.len(),
            ..Default::default()
        };
        let mut escalated_this_window: HashSet<String> = HashSet::new();

        for group in &index.groups {
            let snippet = truncate_chars(&group.text, 80);

            if group.account_count() >= self.thresholds.multi_account as usize {
                report.cross_account_hits += 1;
                let comment = format!(
                    "Identical text posted by {} accounts in one window",
                    group.account_count()
                );
                for (account_id, entry) in &group.accounts {
                    for post in &entry.posts {
                        self.label_post(account_id, post, &comment, &mut report)
                            .await;
                    }
                }

                let accounts: Vec<&str> =
                    group.accounts.iter().map(|(a, _)| a.as_str()).collect();
                info!(
                    text = %snippet,
                    accounts = ?accounts,
                    "Cross-account duplicate detected"
                );
            }

            for (account_id, entry) in &group.accounts {
                if entry.occurrence_count < self.thresholds.same_account {
                    continue;
                }
                report.same_account_hits += 1;
                info!(
                    account = %account_id,
                    occurrences = entry.occurrence_count,
                    text = %snippet,
                    "Same-account repetition detected"
                );

                let comment = format!(
                    "Same text posted {} times in one window",
                    entry.occurrence_count
                );
                for post in &entry.posts {
                    self.label_post(account_id, post, &comment, &mut report)
                        .await;
                }

                let score = self.add_score(account_id, entry.occurrence_count).await;
                if score > self.thresholds.scam_score
                    && escalated_this_window.insert(account_id.clone())
                {
                    self.escalate(account_id, score, &mut report).await;
                }
            }
        }

        report
    }

    async fn label_post(
        &self,
        account_id: &str,
        post: &CollectedPost,
        comment: &str,
        report: &mut WindowReport,
    ) {
        let subject =
            LabelSubject::for_post(account_id, &post.post_id, post.content_ref.as_deref());
        report.label_attempts += 1;
        if let Err(e) = self
            .labeler
            .apply_label(&subject, &[labels::SPAM], comment)
            .await
        {
            report.label_failures += 1;
            warn!(
                account = %account_id,
                post = %post.post_id,
                error = %e,
                "Failed to label duplicate post"
            );
        }
    }

    /// Add to an account's score and return the new total.
    async fn add_score(&self, account_id: &str, amount: u32) -> u32 {
        let mut scores = self.scores.lock().await;
        let score = scores.entry(account_id.to_string()).or_insert(0);
        *score = score.saturating_add(amount);
        *score
    }

    async fn escalate(&self, account_id: &str, score: u32, report: &mut WindowReport) {
        report.escalated.push(account_id.to_string());

        let already_parked = match self.quick_ignore.is_ignored(account_id).await {
            Ok(ignored) => ignored,
            Err(e) => {
                warn!(account = %account_id, error = %e, "Ephemeral ignore lookup failed");
                false
            }
        };

        if already_parked {
            debug!(account = %account_id, "Account already escalated recently, skipping label");
        } else {
            info!(
                account = %account_id,
                score,
                threshold = self.thresholds.scam_score,
                "Escalating account to account-level label"
            );

            let subject = LabelSubject::account(account_id);
            let comment = format!("Repeated duplicate posting, cumulative score {score}");
            report.label_attempts += 1;
            if let Err(e) = self
                .labeler
                .apply_label(&subject, &[labels::SPAM, labels::POTENTIAL_SCAM], &comment)
                .await
            {
                report.label_failures += 1;
                warn!(account = %account_id, error = %e, "Failed to label escalated account");
            }

            if let Err(e) = self
                .quick_ignore
                .add(account_id, ESCALATION_IGNORE_DAYS)
                .await
            {
                warn!(
                    account = %account_id,
                    error = %e,
                    "Failed to add escalated account to ignore cache"
                );
            }
        }

        self.scores.lock().await.insert(account_id.to_string(), 0);
    }
}
