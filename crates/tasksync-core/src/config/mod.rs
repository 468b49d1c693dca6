//! Runtime settings for the sync layer.
//!
//! `SyncSettings` is shared by the CLI profile file and by embedders. Every
//! field has a default, so an empty JSON object is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";
pub const DEFAULT_DRAFT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DRAFT_KEY_PREFIX: &str = "tasksync:draft:";

const ENV_API_URL: &str = "TASKSYNC_API_URL";
const ENV_DRAFT_DEBOUNCE_MS: &str = "TASKSYNC_DRAFT_DEBOUNCE_MS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "TASKSYNC_REQUEST_TIMEOUT_SECS";

/// Settings for drafts, debouncing and remote calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// GraphQL endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Edit inactivity before a draft is written
    #[serde(default = "default_draft_debounce_ms")]
    pub draft_debounce_ms: u64,
    /// Upper bound for each remote call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Prefix of draft keys in the local store
    #[serde(default = "default_draft_key_prefix")]
    pub draft_key_prefix: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_draft_debounce_ms() -> u64 {
    DEFAULT_DRAFT_DEBOUNCE_MS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_draft_key_prefix() -> String {
    DEFAULT_DRAFT_KEY_PREFIX.to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            draft_debounce_ms: DEFAULT_DRAFT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            draft_key_prefix: default_draft_key_prefix(),
        }
    }
}

impl SyncSettings {
    /// Parse settings from JSON and validate them.
    pub fn from_json(payload: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid settings JSON: {error}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override fields from `TASKSYNC_*` environment variables.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_url = url;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_DRAFT_DEBOUNCE_MS)) {
            self.draft_debounce_ms = parse_number(ENV_DRAFT_DEBOUNCE_MS, &raw)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            self.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_http_url(self.api_url.trim()) {
            return Err(Error::Config(
                "api_url must include http:// or https://".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.draft_key_prefix.trim().is_empty() {
            return Err(Error::Config(
                "draft_key_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the draft debounce interval
    #[must_use]
    pub fn with_draft_debounce(mut self, interval: Duration) -> Self {
        self.draft_debounce_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub const fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got '{raw}'")))
}
