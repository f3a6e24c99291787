//! Structured access log.
//!
//! Assigns every request an id (honouring an inbound `x-request-id`), echoes
//! it on the response, records request metrics and emits one log line per
//! request with method, path, status, latency, client and user agent.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::USER_AGENT},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::client_key;
use crate::metrics::route_label;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn access_log(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let header_value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header_value {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_key(&request);
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut response = next.run(request).await;

    let status = response.status();
    let latency = started.elapsed();
    state
        .metrics
        .observe_request(method.as_str(), route_label(&path), status.as_u16(), latency);

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let latency_ms = latency.as_millis() as u64;
    if status.is_server_error() {
        error!(
            request_id = %request_id,
            method     = %method,
            path       = %path,
            status     = status.as_u16(),
            latency_ms,
            client_ip  = %client,
            user_agent = %user_agent,
            "request failed"
        );
    } else if status.is_client_error() {
        warn!(
            request_id = %request_id,
            method     = %method,
            path       = %path,
            status     = status.as_u16(),
            latency_ms,
            client_ip  = %client,
            user_agent = %user_agent,
            "request rejected"
        );
    } else {
        info!(
            request_id = %request_id,
            method     = %method,
            path       = %path,
            status     = status.as_u16(),
            latency_ms,
            client_ip  = %client,
            user_agent = %user_agent,
            "request completed"
        );
    }

    response
}
