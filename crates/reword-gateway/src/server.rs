//! Axum HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/moderate` | Moderate one comment and reply to it. |
//! | `POST` | `/api/v1/moderate/batch` | Same for up to 10 comments. |
//! | `GET`  | `/health` | Liveness check. |
//! | `GET`  | `/metrics` | Prometheus metrics, when enabled. |
//!
//! Layers, outermost first: CORS, access log, then the rate limiter on
//! `/api/v1` only.

use anyhow::Context;
use axum::{
    Router,
    http::Method,
    middleware::from_fn_with_state,
};
use reword_foundation::ChainService;
use reword_foundation::llm::{CachedGateway, OpenAiGateway};
use reword_kernel::CompletionGateway;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::handlers::{health_router, metrics_router, moderate_router};
use crate::metrics::Metrics;
use crate::middleware::{RateLimiter, access_log, rate_limit, spawn_sweeper};
use crate::state::AppState;

/// How long in-flight requests get to finish after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    pub enable_metrics: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            enable_metrics: true,
        }
    }
}

/// Build the full application router over `state`.
pub fn build_router(state: Arc<AppState>, options: RouterOptions) -> Router {
    let api = moderate_router().route_layer(from_fn_with_state(state.clone(), rate_limit));

    let mut router = Router::new().nest("/api/v1", api).merge(health_router());
    if options.enable_metrics {
        router = router.merge(metrics_router());
    }

    router
        .layer(from_fn_with_state(state.clone(), access_log))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// Wire the upstream gateway, the chain and shared state from `config`.
pub fn build_state(config: &AppConfig) -> anyhow::Result<Arc<AppState>> {
    let upstream: Arc<dyn CompletionGateway> = Arc::new(
        OpenAiGateway::new(config.openai_config()).context("failed to build OpenAI gateway")?,
    );
    let gateway: Arc<dyn CompletionGateway> = if config.cache_enabled {
        info!(ttl = ?config.cache_ttl, "completion cache enabled");
        Arc::new(CachedGateway::new(upstream, config.cache_ttl))
    } else {
        upstream
    };

    let metrics = Metrics::new().context("failed to register metrics")?;
    Ok(Arc::new(AppState::new(
        ChainService::from_gateway(gateway),
        Arc::new(RateLimiter::per_minute(config.rate_limit_per_min)),
        Arc::new(metrics),
    )))
}

/// Bind `0.0.0.0:{SERVER_PORT}` and serve until SIGINT/SIGTERM, then drain
/// for at most [`SHUTDOWN_GRACE`].
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let app = build_router(
        state.clone(),
        RouterOptions {
            enable_metrics: config.enable_metrics,
        },
    );

    let background = CancellationToken::new();
    let sweeper = spawn_sweeper(
        state.rate_limiter.clone(),
        state.rate_limiter.window(),
        background.clone(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "reword server listening");

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        }
    });

    let outcome = tokio::select! {
        joined = &mut server => Some(joined),
        _ = shutdown_signal() => None,
    };

    let result = match outcome {
        Some(joined) => joined.context("server task failed")?.context("server error"),
        None => {
            info!(grace = ?SHUTDOWN_GRACE, "shutdown signal received, draining connections");
            shutdown.cancel();
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
                Ok(joined) => joined.context("server task failed")?.context("server error"),
                Err(_) => {
                    warn!("drain deadline elapsed, aborting remaining connections");
                    server.abort();
                    Ok(())
                }
            }
        }
    };

    background.cancel();
    let _ = sweeper.await;
    info!("server stopped");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
