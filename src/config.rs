use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::{AggregatorThresholds, MAX_IN_FLIGHT_DISPATCHES};

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Aggregation window length in seconds.
    pub window_secs: u64,
    pub same_account_threshold: u32,
    pub multi_account_threshold: u32,
    /// Cumulative score an account must exceed to be escalated.
    pub scam_score_threshold: u32,
    pub db_path: String,
    /// Term list file, one term per line.
    pub terms_path: String,
    pub terms_refresh_mins: u64,
    /// Comma-separated DIDs/handles that are never classified.
    pub bypass: String,
    /// Moderator account used to emit labels.
    pub bluesky_handle: String,
    pub bluesky_app_password: String,
    /// PDS that hosts the moderator account and proxies to the labeler.
    pub bluesky_service_url: String,
    /// Public AT Protocol API endpoint for handle lookups.
    pub public_api_url: String,
    pub labeler_did: String,
    /// OpenAI-compatible API base URL.
    pub classifier_api_url: String,
    pub classifier_api_key: String,
    pub classifier_model: String,
    pub classifier_qps: f64,
    pub http_timeout_secs: u64,
    /// Cap on posts being dispatched at once before ingest backs off.
    pub max_in_flight: usize,
    /// Log labels instead of sending them.
    pub dry_run: bool,
}

/// Read a variable, treating unset and empty the same.
fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable if set. A value that is set but doesn't parse is an error,
/// not a silent fallback to the default.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

fn env_flag(key: &str) -> Result<bool> {
    match env_string(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{key} must be true or false, got {v:?}"),
        },
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default; credentials are only checked by the
    /// commands that need them.
    pub fn load() -> Result<Self> {
        let defaults = AggregatorThresholds::default();

        Ok(Self {
            window_secs: env_parse("CINDER_WINDOW_SECS", 60)?,
            same_account_threshold: env_parse(
                "CINDER_SAME_ACCOUNT_THRESHOLD",
                defaults.same_account,
            )?,
            multi_account_threshold: env_parse(
                "CINDER_MULTI_ACCOUNT_THRESHOLD",
                defaults.multi_account,
            )?,
            scam_score_threshold: env_parse("CINDER_SCAM_SCORE_THRESHOLD", defaults.scam_score)?,
            db_path: env_string("CINDER_DB_PATH").unwrap_or_else(|| "./cinder.db".to_string()),
            terms_path: env_string("CINDER_TERMS_PATH")
                .unwrap_or_else(|| "./terms.txt".to_string()),
            terms_refresh_mins: env_parse("CINDER_TERMS_REFRESH_MINS", 60)?,
            bypass: env_string("CINDER_BYPASS").unwrap_or_default(),
            bluesky_handle: env_string("BLUESKY_HANDLE").unwrap_or_default(),
            bluesky_app_password: env_string("BLUESKY_APP_PASSWORD").unwrap_or_default(),
            bluesky_service_url: env_string("BLUESKY_SERVICE_URL")
                .unwrap_or_else(|| "https://bsky.social".to_string()),
            public_api_url: env_string("PUBLIC_API_URL")
                .unwrap_or_else(|| crate::bluesky::client::DEFAULT_PUBLIC_API_URL.to_string()),
            labeler_did: env_string("CINDER_LABELER_DID").unwrap_or_default(),
            classifier_api_url: env_string("CLASSIFIER_API_URL").unwrap_or_else(|| {
                crate::classifier::llm::DEFAULT_CLASSIFIER_API_URL.to_string()
            }),
            classifier_api_key: env_string("CLASSIFIER_API_KEY").unwrap_or_default(),
            classifier_model: env_string("CLASSIFIER_MODEL").unwrap_or_else(|| {
                crate::classifier::llm::DEFAULT_CLASSIFIER_MODEL.to_string()
            }),
            classifier_qps: env_parse("CINDER_CLASSIFIER_QPS", 2.0)?,
            http_timeout_secs: env_parse("CINDER_HTTP_TIMEOUT_SECS", 15)?,
            max_in_flight: env_parse("CINDER_MAX_IN_FLIGHT", MAX_IN_FLIGHT_DISPATCHES)?,
            dry_run: env_flag("CINDER_DRY_RUN")?,
        })
    }

    pub fn thresholds(&self) -> AggregatorThresholds {
        AggregatorThresholds {
            same_account: self.same_account_threshold,
            multi_account: self.multi_account_threshold,
            scam_score: self.scam_score_threshold,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn terms_refresh(&self) -> Duration {
        Duration::from_secs(self.terms_refresh_mins * 60)
    }

    /// Check that the pipeline can run: the window must be non-zero.
    pub fn require_pipeline(&self) -> Result<()> {
        if self.window_secs == 0 {
            anyhow::bail!("CINDER_WINDOW_SECS must be at least 1");
        }
        if self.terms_refresh_mins == 0 {
            anyhow::bail!("CINDER_TERMS_REFRESH_MINS must be at least 1");
        }
        if self.max_in_flight == 0 {
            anyhow::bail!("CINDER_MAX_IN_FLIGHT must be at least 1");
        }
        Ok(())
    }

    /// Check that label emission credentials are configured.
    /// Not needed in dry-run mode.
    pub fn require_labeler(&self) -> Result<()> {
        if self.bluesky_handle.is_empty() || self.bluesky_app_password.is_empty() {
            anyhow::bail!(
                "BLUESKY_HANDLE and BLUESKY_APP_PASSWORD must be set to apply labels.\n\
                 Add them to your .env file, or set CINDER_DRY_RUN=true."
            );
        }
        if self.labeler_did.is_empty() {
            anyhow::bail!(
                "CINDER_LABELER_DID not set. Add it to your .env file, \
                 or set CINDER_DRY_RUN=true."
            );
        }
        Ok(())
    }

    /// Check that the classifier API key is configured.
    pub fn require_classifier(&self) -> Result<()> {
        if self.classifier_api_key.is_empty() {
            anyhow::bail!(
                "CLASSIFIER_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}
