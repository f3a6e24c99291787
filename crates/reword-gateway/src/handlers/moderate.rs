//! Comment moderation endpoints
//!
//! POST /moderate        - one comment
//! POST /moderate/batch  - up to `MAX_BATCH_SIZE` comments, all-or-nothing
//!
//! Each request owns a cancellation token that fires when the handler future
//! is dropped, so a client that disconnects stops its in-flight upstream calls.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use reword_kernel::{CommentRequest, ModeratedResponse, validate_batch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::middleware::REQUEST_ID_HEADER;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub responses: Vec<ModeratedResponse>,
    pub count: usize,
}

pub async fn moderate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Response {
    match moderate_one(&state, payload).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.to_response(request_id(&headers)),
    }
}

pub async fn moderate_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Vec<CommentRequest>>, JsonRejection>,
) -> Response {
    match moderate_many(&state, payload).await {
        Ok(batch) => Json(batch).into_response(),
        Err(err) => err.to_response(request_id(&headers)),
    }
}

async fn moderate_one(
    state: &AppState,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<ModeratedResponse> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    request.validate()?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state.chain.process_comment(&request, &cancel).await;
    state.metrics.record_comment(result.as_ref());
    result.map_err(|err| {
        error!(error = %err, stage = ?err.stage(), "comment processing failed");
        ApiError::Processing(err)
    })
}

async fn moderate_many(
    state: &AppState,
    payload: Result<Json<Vec<CommentRequest>>, JsonRejection>,
) -> ApiResult<BatchResponse> {
    let Json(requests) = payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    validate_batch(&requests)?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match state.chain.process_batch(requests, &cancel).await {
        Ok(responses) => {
            for response in &responses {
                state.metrics.record_comment(Ok(response));
            }
            Ok(BatchResponse {
                count: responses.len(),
                responses,
            })
        }
        Err(err) => {
            state.metrics.record_comment(Err(&err));
            error!(error = %err, stage = ?err.stage(), "batch processing failed");
            Err(ApiError::BatchProcessing(err))
        }
    }
}

fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// Routes relative to `/api/v1`.
pub fn moderate_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/moderate", post(moderate))
        .route("/moderate/batch", post(moderate_batch))
}
