//! Engine Configuration
//!
//! All tunables in one place, loaded from environment variables with safe
//! defaults and validated once at startup. Treated as immutable per run.

use std::env;
use std::time::Duration;

use crate::errors::{EngineError, EngineResult};
use crate::logic::threat::ThresholdConfig;

/// Retry/backoff policy for the dispatch coordinator.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum transport attempts per request, first attempt included.
    pub max_attempts: u32,
    /// Backoff floor; the exponential schedule starts from here.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_cap: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
        }
    }
}

/// Response backend endpoint settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub thresholds: ThresholdConfig,
    pub retry: RetryConfig,
    pub transport: TransportConfig,
    /// How long a jam stays active before the engine issues the
    /// deactivation call.
    pub jammer_window: Duration,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            thresholds: ThresholdConfig {
                low: env_parse("AEROGUARD_THRESHOLD_LOW").unwrap_or(defaults.thresholds.low),
                medium: env_parse("AEROGUARD_THRESHOLD_MEDIUM")
                    .unwrap_or(defaults.thresholds.medium),
                high: env_parse("AEROGUARD_THRESHOLD_HIGH").unwrap_or(defaults.thresholds.high),
            },
            retry: RetryConfig {
                max_attempts: env_parse("AEROGUARD_MAX_ATTEMPTS")
                    .unwrap_or(defaults.retry.max_attempts),
                backoff_base: env_parse("AEROGUARD_BACKOFF_BASE_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.backoff_base),
                backoff_cap: env_parse("AEROGUARD_BACKOFF_CAP_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.backoff_cap),
            },
            transport: TransportConfig {
                base_url: env::var("AEROGUARD_BACKEND_URL")
                    .unwrap_or(defaults.transport.base_url),
                timeout: env_parse("AEROGUARD_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.transport.timeout),
            },
            jammer_window: env_parse("AEROGUARD_JAMMER_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.jammer_window),
        }
    }

    /// Validate everything once at startup.
    pub fn validate(&self) -> EngineResult<()> {
        self.thresholds.validate()?;

        if self.retry.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_base.is_zero() {
            return Err(EngineError::InvalidConfig(
                "backoff base must be positive".to_string(),
            ));
        }
        if self.retry.backoff_cap < self.retry.backoff_base {
            return Err(EngineError::InvalidConfig(format!(
                "backoff cap {:?} below base {:?}",
                self.retry.backoff_cap, self.retry.backoff_base
            )));
        }
        if self.transport.timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "transport timeout must be positive".to_string(),
            ));
        }
        if self.transport.base_url.is_empty() {
            return Err(EngineError::InvalidConfig(
                "backend base URL must not be empty".to_string(),
            ));
        }
        if self.jammer_window.is_zero() {
            return Err(EngineError::InvalidConfig(
                "jammer effect window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            retry: RetryConfig::default(),
            transport: TransportConfig::default(),
            jammer_window: Duration::from_secs(30),
        }
    }
}
