// Ozone label emission — applies moderation labels through the labeler
// service's moderation API.
//
// Requests go to the moderator's PDS and are proxied to the labeler with the
// atproto-proxy header. The session is created lazily and recreated once when
// the PDS rejects the access token.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::client::USER_AGENT;
use super::session::{create_session, Session};
use crate::moderation::{LabelActuator, LabelSubject};
use crate::retry::{with_retry, HttpStatusError, RetryPolicy};

const EMIT_EVENT_NSID: &str = "tools.ozone.moderation.emitEvent";

/// Labeler that emits `modEventLabel` events via Ozone.
pub struct OzoneLabeler {
    client: reqwest::Client,
    service_url: String,
    identifier: String,
    password: String,
    labeler_did: String,
    session: Mutex<Option<Session>>,
    retry: RetryPolicy,
}

impl OzoneLabeler {
    pub fn new(
        service_url: &str,
        identifier: &str,
        password: &str,
        labeler_did: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            service_url: service_url.trim_end_matches('/').to_string(),
            identifier: identifier.to_string(),
            password: password.to_string(),
            labeler_did: labeler_did.to_string(),
            session: Mutex::new(None),
            retry: RetryPolicy::default(),
        })
    }

    /// Return the cached session, logging in if there isn't one.
    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = with_retry(&self.retry, "createSession", || {
            create_session(
                &self.client,
                &self.service_url,
                &self.identifier,
                &self.password,
            )
        })
        .await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn emit(&self, session: &Session, body: &Value) -> Result<()> {
        let url = format!("{}/xrpc/{}", self.service_url, EMIT_EVENT_NSID);
        let proxy = format!("{}#atproto_labeler", self.labeler_did);

        with_retry(&self.retry, EMIT_EVENT_NSID, || async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&session.access_jwt)
                .header("atproto-proxy", &proxy)
                .json(body)
                .send()
                .await
                .context("emitEvent request failed")?;

            if !response.status().is_success() {
                return Err(HttpStatusError::from_response(EMIT_EVENT_NSID, response)
                    .await
                    .into());
            }
            Ok(())
        })
        .await
    }
}

/// Whether the PDS rejected our access token.
fn is_auth_rejection(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<HttpStatusError>().is_some_and(|e| {
            e.status == StatusCode::UNAUTHORIZED
                || (e.status == StatusCode::BAD_REQUEST && e.body.contains("ExpiredToken"))
        })
    })
}

/// Build the emitEvent request body.
pub fn emit_event_body(
    subject: &LabelSubject,
    labels: &[&str],
    comment: &str,
    created_by: &str,
) -> Value {
    let subject = match subject {
        LabelSubject::Post { uri, cid } => json!({
            "$type": "com.atproto.repo.strongRef",
            "uri": uri,
            "cid": cid,
        }),
        LabelSubject::Account { did } => json!({
            "$type": "com.atproto.admin.defs#repoRef",
            "did": did,
        }),
    };

    json!({
        "event": {
            "$type": "tools.ozone.moderation.defs#modEventLabel",
            "createLabelVals": labels,
            "negateLabelVals": [],
            "comment": comment,
        },
        "subject": subject,
        "createdBy": created_by,
    })
}

#[async_trait]
impl LabelActuator for OzoneLabeler {
    async fn apply_label(
        &self,
        subject: &LabelSubject,
        labels: &[&str],
        comment: &str,
    ) -> Result<()> {
        let session = self.session().await?;
        let body = emit_event_body(subject, labels, comment, &session.did);

        match self.emit(&session, &body).await {
            Ok(()) => {}
            Err(e) if is_auth_rejection(&e) => {
                warn!(error = %e, "Moderator session rejected, logging in again");
                self.invalidate_session().await;
                let session = self.session().await?;
                let body = emit_event_body(subject, labels, comment, &session.did);
                self.emit(&session, &body)
                    .await
                    .with_context(|| format!("Failed to label {subject}"))?;
            }
            Err(e) => return Err(e.context(format!("Failed to label {subject}"))),
        }

        info!(subject = %subject, labels = ?labels, "Applied label");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_subject_is_strong_ref() {
        let subject = LabelSubject::for_post("did:plc:abc", "3kxyz", Some("bafycid"));
        let body = emit_event_body(&subject, &["spam"], "dup", "did:plc:mod");

        assert_eq!(body["subject"]["$type"], "com.atproto.repo.strongRef");
        assert_eq!(
            body["subject"]["uri"],
            "at://did:plc:abc/app.bsky.feed.post/3kxyz"
        );
        assert_eq!(body["subject"]["cid"], "bafycid");
        assert_eq!(body["event"]["createLabelVals"][0], "spam");
        assert_eq!(body["createdBy"], "did:plc:mod");
    }

    #[test]
    fn test_account_subject_is_repo_ref() {
        let subject = LabelSubject::account("did:plc:abc");
        let body = emit_event_body(&subject, &["spam", "potential-scam"], "", "did:plc:mod");

        assert_eq!(body["subject"]["$type"], "com.atproto.admin.defs#repoRef");
        assert_eq!(body["subject"]["did"], "did:plc:abc");
        assert_eq!(
            body["event"]["createLabelVals"],
            json!(["spam", "potential-scam"])
        );
    }

    #[test]
    fn test_auth_rejection_detection() {
        let unauthorized: anyhow::Error = HttpStatusError {
            endpoint: EMIT_EVENT_NSID.to_string(),
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        }
        .into();
        assert!(is_auth_rejection(&unauthorized));

        let expired: anyhow::Error = HttpStatusError {
            endpoint: EMIT_EVENT_NSID.to_string(),
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"ExpiredToken"}"#.to_string(),
        }
        .into();
        assert!(is_auth_rejection(&expired));

        let server: anyhow::Error = HttpStatusError {
            endpoint: EMIT_EVENT_NSID.to_string(),
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
        .into();
        assert!(!is_auth_rejection(&server));
    }
}
