//! Log output for the traffic generator.
//!
//! The generator is a load source, not a monitored service: it writes logs to
//! stdout only and has no OTLP export.

use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Output format of the stdout log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Compact human-readable lines.
    Text,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "compact" => Ok(LogFormat::Text),
            other => anyhow::bail!("LOG_FORMAT must be `json` or `text`, got {other:?}"),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter directive or a
/// subscriber is already installed.
pub fn init(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid LOG_LEVEL {log_level:?}"))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialise traffic-gen logging: {e}"))
}
