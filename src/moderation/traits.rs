// Label actuator trait and label subjects.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// What a label is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSubject {
    /// A specific post, addressed by AT-URI and content CID.
    Post { uri: String, cid: String },
    /// An account as a whole.
    Account { did: String },
}

impl LabelSubject {
    /// Target the post when its content ref is known, otherwise the account.
    pub fn for_post(account_id: &str, post_id: &str, content_ref: Option<&str>) -> Self {
        match content_ref {
            Some(cid) if !cid.is_empty() => LabelSubject::Post {
                uri: post_uri(account_id, post_id),
                cid: cid.to_string(),
            },
            _ => LabelSubject::account(account_id),
        }
    }

    pub fn account(account_id: &str) -> Self {
        LabelSubject::Account {
            did: account_id.to_string(),
        }
    }

    pub fn is_account(&self) -> bool {
        matches!(self, LabelSubject::Account { .. })
    }
}

impl std::fmt::Display for LabelSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelSubject::Post { uri, .. } => write!(f, "{uri}"),
            LabelSubject::Account { did } => write!(f, "{did}"),
        }
    }
}

/// AT-URI of a post record.
pub fn post_uri(account_id: &str, post_id: &str) -> String {
    format!("at://{account_id}/app.bsky.feed.post/{post_id}")
}

/// Applies moderation labels.
#[async_trait]
pub trait LabelActuator: Send + Sync {
    async fn apply_label(&self, subject: &LabelSubject, labels: &[&str], comment: &str)
        -> Result<()>;
}

/// Logs the labels it would apply and reports success.
pub struct DryRunLabeler;

#[async_trait]
impl LabelActuator for DryRunLabeler {
    async fn apply_label(
        &self,
        subject: &LabelSubject,
        labels: &[&str],
        comment: &str,
    ) -> Result<()> {
        info!(subject = %subject, labels = ?labels, comment, "[dry run] would apply label");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_post_with_content_ref_targets_post() {
        let subject = LabelSubject::for_post("did:plc:abc", "3kxyz", Some("bafycid"));
        assert_eq!(
            subject,
            LabelSubject::Post {
                uri: "at://did:plc:abc/app.bsky.feed.post/3kxyz".to_string(),
                cid: "bafycid".to_string(),
            }
        );
        assert!(!subject.is_account());
    }

    #[test]
    fn test_for_post_without_content_ref_targets_account() {
        let subject = LabelSubject::for_post("did:plc:abc", "3kxyz", None);
        assert_eq!(subject, LabelSubject::account("did:plc:abc"));

        let empty = LabelSubject::for_post("did:plc:abc", "3kxyz", Some(""));
        assert!(empty.is_account());
    }
}
