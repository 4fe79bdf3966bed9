// Classification dispatcher — per-post path from term match to label.
//
// The matcher is the cost gate: posts without a term never reach the
// classifier. Matched posts are checked against the operator bypass list and
// the durable ignore tier, then classified, and the verdict is applied via
// the dispatch table. Nothing here returns an error; every collaborator
// failure is logged and ends or narrows the work for that post.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::models::PostEvent;
use crate::bluesky::IdentityResolver;
use crate::classifier::{ScamClassifier, Verdict};
use crate::ignore::IgnoreCache;
use crate::matcher::MatcherHandle;
use crate::moderation::{LabelActuator, LabelSubject};

/// How much of the post text the classifier sees.
pub const SNIPPET_CHARS: usize = 100;

/// Operator-maintained accounts that are never classified.
///
/// Entries are DIDs or handles, compared case-insensitively; a leading `@`
/// on a handle is ignored.
#[derive(Debug, Clone, Default)]
pub struct BypassList {
    entries: HashSet<String>,
}

fn normalize_identity(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

impl BypassList {
    pub fn new<S: AsRef<str>>(entries: impl IntoIterator<Item = S>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| normalize_identity(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse a comma-separated list, e.g. from `CINDER_BYPASS`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn contains(&self, account_id: &str, handle: &str) -> bool {
        self.entries.contains(&normalize_identity(account_id))
            || self.entries.contains(&normalize_identity(handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the dispatcher did with one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No term matched; the classifier was not called.
    NoMatch,
    Bypassed { term: String },
    /// The account is in the durable ignore tier.
    Ignored { term: String },
    /// The classifier call failed; nothing was applied.
    ClassifierFailed { term: String },
    Classified {
        term: String,
        verdict: Verdict,
        /// The dispatch table named a label and it was applied.
        labeled: bool,
        /// Cooldown the dispatch table asked for, if any.
        ignore_days: Option<u32>,
    },
}

pub struct ClassificationDispatcher {
    matcher: Arc<MatcherHandle>,
    resolver: Arc<dyn IdentityResolver>,
    bypass: BypassList,
    ignore: Arc<IgnoreCache>,
    classifier: Arc<dyn ScamClassifier>,
    labeler: Arc<dyn LabelActuator>,
}

impl ClassificationDispatcher {
    pub fn new(
        matcher: Arc<MatcherHandle>,
        resolver: Arc<dyn IdentityResolver>,
        bypass: BypassList,
        ignore: Arc<IgnoreCache>,
        classifier: Arc<dyn ScamClassifier>,
        labeler: Arc<dyn LabelActuator>,
    ) -> Self {
        Self {
            matcher,
            resolver,
            bypass,
            ignore,
            classifier,
            labeler,
        }
    }

    pub async fn handle(&self, event: &PostEvent) -> DispatchOutcome {
        let Some(term) = self.matcher.find(&event.text) else {
            return DispatchOutcome::NoMatch;
        };

        let account_id = event.account_id.as_str();
        let handle = self.resolver.resolve(account_id).await;

        if self.bypass.contains(account_id, &handle) {
            info!(handle = %handle, term = %term, "Account on bypass list, skipping");
            return DispatchOutcome::Bypassed { term };
        }

        match self.ignore.is_ignored(account_id).await {
            Ok(true) => {
                info!(handle = %handle, term = %term, "Account in ignore cache, skipping");
                return DispatchOutcome::Ignored { term };
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    account = %account_id,
                    error = %e,
                    "Ignore lookup failed, classifying anyway"
                );
            }
        }

        let snippet = event.snippet(SNIPPET_CHARS);
        let verdict = match self.classifier.classify(&snippet).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(handle = %handle, term = %term, error = %e, "Classifier call failed");
                return DispatchOutcome::ClassifierFailed { term };
            }
        };

        let policy = verdict.policy();
        info!(
            handle = %handle,
            term = %term,
            verdict = %verdict,
            "Post classified"
        );

        let mut labeled = false;
        if let Some(label) = policy.label {
            let subject =
                LabelSubject::for_post(account_id, &event.post_id, event.content_ref());
            let comment = format!("Matched term \"{term}\", classified as {verdict}");
            match self.labeler.apply_label(&subject, &[label], &comment).await {
                Ok(()) => labeled = true,
                Err(e) => {
                    warn!(handle = %handle, label, error = %e, "Failed to apply label");
                }
            }
        }

        if let Some(days) = policy.ignore_days {
            match self.ignore.add(account_id, days).await {
                Ok(expires_at) => {
                    debug!(handle = %handle, days, expires_at = %expires_at, "Account ignored");
                }
                Err(e) => {
                    warn!(
                        handle = %handle,
                        days,
                        error = %e,
                        "Failed to add account to ignore cache"
                    );
                }
            }
        }

        DispatchOutcome::Classified {
            term,
            verdict,
            labeled,
            ignore_days: policy.ignore_days,
        }
    }
}
