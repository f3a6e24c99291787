//! Reword server entry point.
//!
//! Loads configuration from the environment (see [`reword_gateway::config`]),
//! installs logging and serves the moderation API until SIGINT/SIGTERM.

use anyhow::Context;
use reword_gateway::{config::AppConfig, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    telemetry::init(&config);
    config.log_fallbacks();

    info!(
        port = config.server_port,
        assistant_model = %config.assistant_model,
        moderator_model = %config.moderator_model,
        rate_limit_per_min = config.rate_limit_per_min,
        metrics = config.enable_metrics,
        cache = config.cache_enabled,
        "reword configuration loaded"
    );

    server::run(config).await
}
