//! Shared application state for the HTTP server

use crate::metrics::Metrics;
use crate::middleware::RateLimiter;
use reword_foundation::ChainService;
use std::sync::Arc;

/// State shared across all request handlers
pub struct AppState {
    /// Moderation and reply pipeline
    pub chain: ChainService,
    /// Per-client rate limiter guarding `/api/v1`
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(chain: ChainService, rate_limiter: Arc<RateLimiter>, metrics: Arc<Metrics>) -> Self {
        Self {
            chain,
            rate_limiter,
            metrics,
        }
    }
}
