//! `reword-gateway` - HTTP surface of the comment moderation service.
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment configuration |
//! | [`server`] | Router assembly, serving and graceful shutdown |
//! | [`handlers`] | `/api/v1/moderate`, `/api/v1/moderate/batch`, `/health`, `/metrics` |
//! | [`middleware`] | Access log and per-client rate limiting |
//! | [`error`] | [`ApiError`](error::ApiError) and the JSON error envelope |
//! | [`metrics`] | Prometheus registry |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use reword_gateway::{config::AppConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_pairs(&[("OPENAI_API_KEY", "sk-...")])?;
//!     server::run(config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod state;
pub mod telemetry;
