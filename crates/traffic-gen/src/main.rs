//! `traffic-gen`: synthetic traffic client entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging (JSON by default).
//! 3. Run the weighted traffic loop until Ctrl-C.

mod config;
mod logging;
mod traffic;

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: traffic-gen configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Logging
    // -----------------------------------------------------------------------
    logging::init(&cfg.log_level, cfg.log_format()?)?;

    // -----------------------------------------------------------------------
    // 3. Traffic
    // -----------------------------------------------------------------------
    tokio::select! {
        res = traffic::run(&cfg) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping traffic generator");
            Ok(())
        }
    }
}
