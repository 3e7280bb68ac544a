//! Password-reset endpoints.
//!
//! Two variants of the same operation: `send_reset` asks the identity
//! provider to mint the recovery link, `send_reset_email` mints its own token
//! pair and enqueues the email directly. Both are rate limited per source IP
//! and keep their responses opaque so callers cannot probe which email
//! addresses have accounts.

pub mod rate_limit;
pub mod send_reset;
pub mod send_reset_email;

mod storage;
mod types;
mod utils;

pub use types::{SendResetRequest, SendResetResponse};

use rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_RECOVERY_TOKEN_TTL_SECONDS: i64 = 3600;
const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);
const DEFAULT_MAX_PER_WINDOW: u32 = 5;

/// Configuration for the reset endpoints.
#[derive(Clone, Debug)]
pub struct ResetConfig {
    site_base_url: String,
    recovery_token_ttl_seconds: i64,
    window: Duration,
    max_per_window: u32,
}

impl ResetConfig {
    #[must_use]
    pub fn new(site_base_url: String) -> Self {
        Self {
            site_base_url,
            recovery_token_ttl_seconds: DEFAULT_RECOVERY_TOKEN_TTL_SECONDS,
            window: DEFAULT_WINDOW,
            max_per_window: DEFAULT_MAX_PER_WINDOW,
        }
    }

    #[must_use]
    pub fn with_recovery_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.recovery_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_window_seconds(mut self, seconds: u64) -> Self {
        self.window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_per_window(mut self, max: u32) -> Self {
        self.max_per_window = max;
        self
    }

    #[must_use]
    pub fn site_base_url(&self) -> &str {
        &self.site_base_url
    }

    #[must_use]
    pub fn recovery_token_ttl_seconds(&self) -> i64 {
        self.recovery_token_ttl_seconds
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }
}

/// Shared state for the reset handlers.
pub struct ResetState {
    config: ResetConfig,
    limiter: Arc<dyn RateLimiter>,
}

impl ResetState {
    #[must_use]
    pub fn new(config: ResetConfig, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { config, limiter }
    }

    #[must_use]
    pub fn config(&self) -> &ResetConfig {
        &self.config
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_policy() {
        let config = ResetConfig::new("https://portal.treina.app".to_string());
        assert_eq!(config.recovery_token_ttl_seconds(), 3600);
        assert_eq!(config.window(), Duration::from_secs(3600));
        assert_eq!(config.max_per_window(), 5);
    }

    #[test]
    fn config_builders_override_defaults() {
        let config = ResetConfig::new("https://portal.treina.app".to_string())
            .with_recovery_token_ttl_seconds(900)
            .with_window_seconds(60)
            .with_max_per_window(2);
        assert_eq!(config.recovery_token_ttl_seconds(), 900);
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.max_per_window(), 2);
    }
}
