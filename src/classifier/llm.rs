// OpenAI-compatible chat-completion classifier.
//
// Sends the post snippet with a fixed system prompt that names the six
// verdicts and asks for the category name only. Whatever comes back is run
// through Verdict::parse, so an off-script reply degrades to benign.
//
// Works against any endpoint that speaks the /chat/completions shape.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::ScamClassifier;
use super::verdict::Verdict;
use crate::output::truncate_chars;
use crate::retry::{with_retry, HttpStatusError, RetryPolicy};

/// Default base URL for the classifier API.
pub const DEFAULT_CLASSIFIER_API_URL: &str = "https://api.openai.com/v1";

/// Default model name.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a moderation classifier for short social media posts. \
Classify the post into exactly one category:\n\
- scam: phishing, wallet drainers, fake giveaways, impersonation, or requests for funds\n\
- shilling-crypto: promoting a specific token, coin, NFT or presale\n\
- fomo-inducer: pressure tactics and urgency (\"last chance\", \"don't miss out\") without a clear scam\n\
- potential: suspicious but not clearly any of the above\n\
- bot-activity: templated, automated or engagement-farming content\n\
- benign: none of the above\n\
Respond with the category name only.";

/// Classifier backed by an OpenAI-compatible chat-completion API.
pub struct LlmClassifier {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl LlmClassifier {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        requests_per_second: f64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            rate_limiter: RateLimiter::new(requests_per_second),
            retry: RetryPolicy::default(),
        })
    }

    async fn complete(&self, snippet: &str) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: 8,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: snippet,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call classifier API")?;

        if !response.status().is_success() {
            return Err(HttpStatusError::from_response("classifier", response)
                .await
                .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse classifier response")?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Classifier response had no choices")
    }
}

#[async_trait]
impl ScamClassifier for LlmClassifier {
    async fn classify(&self, snippet: &str) -> Result<Verdict> {
        let reply = with_retry(&self.retry, "classifier", || self.complete(snippet)).await?;
        let verdict = Verdict::parse(&reply);

        debug!(
            reply = reply.trim(),
            verdict = %verdict,
            text_preview = %truncate_chars(snippet, 50),
            "Classified snippet"
        );

        Ok(verdict)
    }
}

// --- Chat completion request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_into_verdict() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"bot-activity"}}]}"#;
        let body: ChatResponse = serde_json::from_str(json).unwrap();
        let reply = &body.choices[0].message.content;
        assert_eq!(Verdict::parse(reply), Verdict::BotActivity);
    }

    #[test]
    fn test_null_content_defaults_to_empty() {
        let json = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let body: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            Verdict::parse(&body.choices[0].message.content),
            Verdict::Benign
        );
    }

    #[test]
    fn test_prompt_names_every_verdict() {
        for verdict in Verdict::ALL {
            assert!(SYSTEM_PROMPT.contains(verdict.as_str()));
        }
    }
}
