// Public AT Protocol client — unauthenticated XRPC over HTTP.
//
// Read endpoints are public and don't require authentication. Used for
// identity lookups; label writes go through bluesky::labeler instead.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::retry::{with_retry, HttpStatusError, RetryPolicy};

/// Default public API endpoint for AT Protocol read operations.
pub const DEFAULT_PUBLIC_API_URL: &str = "https://public.api.bsky.app";

/// User agent sent on every request.
pub const USER_AGENT: &str = "cinder/0.1 (spam-prefilter)";

/// Unauthenticated HTTP client for public AT Protocol XRPC endpoints.
pub struct PublicAtpClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PublicAtpClient {
    /// Create a new public API client pointing at the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Make a GET request to an XRPC endpoint and deserialize the response.
    ///
    /// `nsid` is the XRPC method name (e.g. "app.bsky.actor.getProfile").
    /// Transient failures are retried per the client's retry policy.
    pub async fn xrpc_get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/xrpc/{}", self.base_url, nsid);

        with_retry(&self.retry, nsid, || async {
            debug!(nsid = nsid, "XRPC GET request");

            let response = self
                .client
                .get(&url)
                .query(params)
                .send()
                .await
                .with_context(|| format!("XRPC request failed: {nsid}"))?;

            if !response.status().is_success() {
                return Err(HttpStatusError::from_response(nsid, response).await.into());
            }

            response
                .json::<T>()
                .await
                .with_context(|| format!("Failed to deserialize {nsid} response"))
        })
        .await
    }

    /// Look up an account's current handle by DID (or handle).
    pub async fn get_handle(&self, actor: &str) -> Result<String> {
        let profile: ProfileView = self
            .xrpc_get("app.bsky.actor.getProfile", &[("actor", actor)])
            .await
            .with_context(|| format!("Failed to fetch profile for {actor}"))?;
        Ok(profile.handle)
    }
}

// -- Serde types for app.bsky.actor.getProfile --

#[derive(Debug, Deserialize)]
struct ProfileView {
    handle: String,
}
