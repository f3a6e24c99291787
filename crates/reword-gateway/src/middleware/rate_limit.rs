//! Per-client rate limiting middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::client_key;
use crate::error::ApiError;
use crate::state::AppState;

/// Per-client sliding-log rate limiter.
///
/// Each client keeps the admission times of its requests over the last
/// `window`. A request is admitted while fewer than `max_requests` of those
/// remain; rejected requests are not recorded and do not extend the window.
pub struct RateLimiter {
    clients: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            max_requests: max_requests as usize,
            window,
        }
    }

    /// `max_requests` per rolling minute.
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a request from `client_key` at `now` is admitted.
    pub fn admit(&self, client_key: &str, now: Instant) -> bool {
        let mut log = self.clients.entry(client_key.to_string()).or_default();
        log.retain(|at| now.saturating_duration_since(*at) < self.window);

        if log.len() >= self.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }

    /// [`admit`](Self::admit) at the current instant.
    pub fn check(&self, client_key: &str) -> bool {
        self.admit(client_key, Instant::now())
    }

    /// Drop expired timestamps and forget clients with nothing left in the
    /// window. Returns the number of clients removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, log| {
            log.retain(|at| now.saturating_duration_since(*at) < self.window);
            !log.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Run [`RateLimiter::sweep`] every `every` until `cancel` fires.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = limiter.sweep(Instant::now());
                    if removed > 0 {
                        debug!(removed, remaining = limiter.tracked_clients(), "rate limiter sweep");
                    }
                }
            }
        }
    })
}

/// Reject requests over the per-client budget with `429`.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    if state.rate_limiter.check(&client) {
        return next.run(request).await;
    }

    warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
    state.metrics.record_rate_limited();
    ApiError::RateLimited.into_response()
}
