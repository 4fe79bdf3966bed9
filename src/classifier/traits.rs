// Scam classifier trait — the swap-ready abstraction over the external
// text classifier.

use anyhow::Result;
use async_trait::async_trait;

use super::verdict::Verdict;

/// Classifies a short text snippet into one of the closed verdicts.
#[async_trait]
pub trait ScamClassifier: Send + Sync {
    async fn classify(&self, snippet: &str) -> Result<Verdict>;
}

/// Classifier used when no classifier backend is configured.
/// Always fails, so no event is ever labeled on a made-up verdict.
pub struct NoopClassifier;

#[async_trait]
impl ScamClassifier for NoopClassifier {
    async fn classify(&self, _snippet: &str) -> Result<Verdict> {
        anyhow::bail!("No classifier configured — set CLASSIFIER_API_KEY")
    }
}
