//! Configuration for the paginated executor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default GitHub GraphQL endpoint
pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// Configuration for one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// GraphQL endpoint to query (overridable for tests)
    pub endpoint: String,
    /// Page size requested per paginated fragment
    pub page_size: u32,
    /// Whether to query and honor the API rate-limit budget
    pub rate_limit: bool,
    /// Remaining-budget floor below which the executor waits for the reset
    pub rate_limit_floor: u32,
    /// Grace period added to rate-limit waits (seconds)
    pub rate_limit_grace_secs: u64,
    /// Emit per-round progress at info level instead of debug
    pub verbose: bool,
    /// Hard cap on pagination rounds before aborting
    pub max_rounds: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of retries for transient failures per round
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            endpoint: GITHUB_GRAPHQL_ENDPOINT.to_string(),
            page_size: 50,
            rate_limit: false,
            rate_limit_floor: 100,
            rate_limit_grace_secs: 5,
            verbose: false,
            max_rounds: 100,
            timeout_secs: 100,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl ExecutorConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get base retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate configuration values that would stall or break a run
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size must be at least 1".to_string());
        }
        if self.max_rounds == 0 {
            return Err("max_rounds must be at least 1".to_string());
        }
        Ok(())
    }
}
