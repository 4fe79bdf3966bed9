// Post events as delivered by the ingress adapter.

use serde::{Deserialize, Serialize};

/// One ingested post. Immutable once created.
///
/// Every field defaults when missing so a partial record still parses; the
/// aggregator drops events that fail `is_well_formed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEvent {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub text: String,
    /// Unique within `account_id` (the record key of the post).
    #[serde(default)]
    pub post_id: String,
    /// Content CID, used to label this specific post rather than the account.
    #[serde(default)]
    pub content_ref: Option<String>,
}

impl PostEvent {
    pub fn new(account_id: &str, post_id: &str, text: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            text: text.to_string(),
            post_id: post_id.to_string(),
            content_ref: None,
        }
    }

    pub fn with_content_ref(mut self, content_ref: &str) -> Self {
        self.content_ref = Some(content_ref.to_string());
        self
    }

    /// Account id, post id and text are all present.
    pub fn is_well_formed(&self) -> bool {
        !self.account_id.is_empty() && !self.post_id.is_empty() && !self.text.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// The first `max_chars` characters of the text.
    pub fn snippet(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }

    pub fn content_ref(&self) -> Option<&str> {
        self.content_ref.as_deref()
    }
}
