// App-password sessions for authenticated writes.
//
// Label emission needs an access token for the moderator account. Sessions
// come from com.atproto.server.createSession; we don't refresh tokens, we
// just create a new session when the old one is rejected.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::retry::HttpStatusError;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub did: String,
    pub access_jwt: String,
}

/// Log in with a handle and app password.
pub async fn create_session(
    client: &reqwest::Client,
    service_url: &str,
    identifier: &str,
    password: &str,
) -> Result<Session> {
    let url = format!("{service_url}/xrpc/com.atproto.server.createSession");

    let response = client
        .post(&url)
        .json(&CreateSessionRequest {
            identifier,
            password,
        })
        .send()
        .await
        .context("createSession request failed")?;

    if !response.status().is_success() {
        return Err(HttpStatusError::from_response("com.atproto.server.createSession", response)
            .await
            .into());
    }

    let body: CreateSessionResponse = response
        .json()
        .await
        .context("Failed to parse createSession response")?;

    info!(handle = %body.handle, did = %body.did, "Created moderator session");

    Ok(Session {
        did: body.did,
        access_jwt: body.access_jwt,
    })
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
}
