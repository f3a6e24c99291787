//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LogFormat};

/// Install the global subscriber. `RUST_LOG`, when set, overrides `LOG_LEVEL`.
pub fn init(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.log_format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Pretty => builder.init(),
    }
}
