//! Configuration loading and validation for the traffic generator.

use std::time::Duration;

use anyhow::{Context, Result};
use common::{protocol::parse_route_weights, Route};
use serde::Deserialize;

use crate::logging::LogFormat;

/// Validated traffic generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the workload service.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Comma-separated `route=weight` list.
    #[serde(default = "default_route_weights")]
    pub route_weights: String,

    /// Lower bound of the pause between requests, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Upper bound of the pause between requests, in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Delay before the first request, giving the service time to start.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Pause after a failed request.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `json` or `text`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_target_url() -> String {
    "http://127.0.0.1:3000".into()
}
fn default_route_weights() -> String {
    "hello=60,slow=30,alloc=10".into()
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_max_interval_ms() -> u64 {
    3000
}
fn default_startup_delay_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_error_backoff_secs() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "json".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build traffic-gen configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise traffic-gen configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            anyhow::bail!("TARGET_URL is required and must not be empty");
        }
        let weights = self.weights()?;
        if weights.iter().all(|(_, w)| *w == 0) {
            anyhow::bail!("ROUTE_WEIGHTS must give at least one route a positive weight");
        }
        if self.min_interval_ms > self.max_interval_ms {
            anyhow::bail!("MIN_INTERVAL_MS must not exceed MAX_INTERVAL_MS");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        if self.error_backoff_secs == 0 {
            anyhow::bail!("ERROR_BACKOFF_SECS must be > 0");
        }
        self.log_format()?;
        Ok(())
    }

    /// Parsed route weights.
    pub fn weights(&self) -> Result<Vec<(Route, u32)>> {
        parse_route_weights(&self.route_weights).context("invalid ROUTE_WEIGHTS")
    }

    /// Parsed log output format.
    pub fn log_format(&self) -> Result<LogFormat> {
        self.log_format.parse()
    }

    /// Target URL without a trailing slash.
    pub fn target_base(&self) -> &str {
        self.target_url.trim().trim_end_matches('/')
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            target_url: default_target_url(),
            route_weights: default_route_weights(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            startup_delay_secs: default_startup_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_target_url(), "http://127.0.0.1:3000");
        assert_eq!(default_route_weights(), "hello=60,slow=30,alloc=10");
        assert_eq!(default_min_interval_ms(), 1000);
        assert_eq!(default_max_interval_ms(), 3000);
        assert_eq!(default_startup_delay_secs(), 10);
        assert_eq!(default_request_timeout_secs(), 30);
        assert_eq!(default_error_backoff_secs(), 5);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn validate_accepts_valid_config() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.weights().unwrap().len(), 3);
    }

    #[test]
    fn validate_rejects_empty_target() {
        let cfg = Config {
            target_url: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_weights() {
        for weights in ["", "hello=0,slow=0", "hello=x", "metrics=1"] {
            let cfg = Config {
                route_weights: weights.into(),
                ..valid()
            };
            assert!(cfg.validate().is_err(), "{weights:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_inverted_interval() {
        let cfg = Config {
            min_interval_ms: 5000,
            max_interval_ms: 1000,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout_and_backoff() {
        let cfg = Config {
            request_timeout_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            error_backoff_secs: 0,
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("ERROR_BACKOFF_SECS"));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let cfg = Config {
            log_format: "xml".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn target_base_trims_trailing_slash() {
        let cfg = Config {
            target_url: "http://svc:3000/".into(),
            ..valid()
        };
        assert_eq!(cfg.target_base(), "http://svc:3000");
    }
}
