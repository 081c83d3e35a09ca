//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use toxiguard_core::{Error, Result};

/// Environment variable carrying extra comma-separated API keys
pub const API_KEYS_ENV: &str = "TOXIGUARD_API_KEYS";

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Valid API keys
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<String>,

    /// Header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Path to the model artifact
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Maximum texts per batch request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Deadline for the scoring step, in milliseconds
    #[serde(default = "default_score_timeout_ms")]
    pub score_timeout_ms: u64,

    /// Concurrent scoring jobs; defaults to the CPU count
    #[serde(default = "default_scoring_workers")]
    pub scoring_workers: usize,
}

impl GatewayConfig {
    /// Load configuration from a YAML file, or defaults if it does not exist.
    ///
    /// Keys from [`API_KEYS_ENV`] are appended to the configured keys.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        if let Ok(keys) = std::env::var(API_KEYS_ENV) {
            config.merge_api_keys(&keys);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))
    }

    /// Append comma-separated keys, skipping blanks and duplicates
    pub fn merge_api_keys(&mut self, csv: &str) {
        for key in csv.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            if !self.api_keys.iter().any(|k| k == key) {
                self.api_keys.push(key.to_string());
            }
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.api_key_header.trim().is_empty() {
            return Err(Error::config("api_key_header must not be empty"));
        }
        if axum::http::HeaderName::try_from(self.api_key_header.as_str()).is_err() {
            return Err(Error::config(format!(
                "api_key_header '{}' is not a valid header name",
                self.api_key_header
            )));
        }
        if self.max_batch_size == 0 {
            return Err(Error::config("max_batch_size must be greater than 0"));
        }
        if self.score_timeout_ms == 0 {
            return Err(Error::config("score_timeout_ms must be greater than 0"));
        }
        if self.scoring_workers == 0 {
            return Err(Error::config("scoring_workers must be greater than 0"));
        }
        self.rate_limit.validate()
    }

    /// Scoring deadline
    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_keys: default_api_keys(),
            api_key_header: default_api_key_header(),
            model_path: default_model_path(),
            rate_limit: RateLimitConfig::default(),
            max_batch_size: default_max_batch_size(),
            max_body_bytes: default_max_body_bytes(),
            score_timeout_ms: default_score_timeout_ms(),
            scoring_workers: default_scoring_workers(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Units admitted per identity per window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How much quota a batch request consumes
    #[serde(default)]
    pub batch_cost: BatchCost,

    /// Upper bound on tracked identities
    #[serde(default = "default_max_identities")]
    pub max_identities: usize,

    /// Number of independently locked shards
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Where the client identity comes from
    #[serde(default)]
    pub identity_source: IdentitySource,
}

impl RateLimitConfig {
    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(Error::config("rate_limit.window_secs must be greater than 0"));
        }
        if self.shards == 0 {
            return Err(Error::config("rate_limit.shards must be greater than 0"));
        }
        if self.max_identities < self.shards {
            return Err(Error::config(
                "rate_limit.max_identities must be at least rate_limit.shards",
            ));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            batch_cost: BatchCost::default(),
            max_identities: default_max_identities(),
            shards: default_shards(),
            identity_source: IdentitySource::default(),
        }
    }
}

/// Quota consumed by a batch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchCost {
    /// One unit per request, whatever the batch size
    #[default]
    Request,
    /// One unit per text (at least one)
    PerText,
}

impl BatchCost {
    /// Units consumed by a request carrying `num_texts` texts
    pub fn units(&self, num_texts: usize) -> u64 {
        match self {
            Self::Request => 1,
            Self::PerText => (num_texts as u64).max(1),
        }
    }
}

/// Source of the rate-limit partition key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// TCP peer address
    #[default]
    PeerAddress,
    /// First `X-Forwarded-For` hop, falling back to the peer address
    ForwardedFor,
    /// Digest of the presented API key
    ApiKey,
}

fn default_api_keys() -> Vec<String> {
    vec!["frontend-dev-key".to_string()]
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

fn default_model_path() -> String {
    "./resources/toxic_model.yaml".to_string()
}

fn default_max_batch_size() -> usize {
    64
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_score_timeout_ms() -> u64 {
    5_000
}

fn default_scoring_workers() -> usize {
    toxiguard_classifiers::ClassifierEngine::default_workers()
}

fn default_requests_per_window() -> u64 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_identities() -> usize {
    100_000
}

fn default_shards() -> usize {
    16
}
