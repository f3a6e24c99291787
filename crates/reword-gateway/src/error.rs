//! API error types and their JSON envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reword_foundation::ChainError;
use reword_kernel::{MAX_BATCH_SIZE, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Body returned for every failed request except rate-limit rejections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, or the wrong shape.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("processing failed: {0}")]
    Processing(#[source] ChainError),

    #[error("batch processing failed: {0}")]
    BatchProcessing(#[source] ChainError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Processing(_) | ApiError::BatchProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render the envelope, tagging it with the request id when one is known.
    /// Upstream failure details stay in the logs, never in the body.
    pub fn to_response(&self, trace_id: Option<&str>) -> Response {
        let status = self.status();
        let (error, message) = match self {
            ApiError::RateLimited => {
                return (status, Json(json!({ "error": "Rate limit exceeded" }))).into_response();
            }
            ApiError::Validation(ValidationError::BatchTooLarge { .. }) => (
                "Batch Too Large",
                format!("Maximum {MAX_BATCH_SIZE} comments per batch"),
            ),
            ApiError::Validation(err) => ("Invalid Request", err.to_string()),
            ApiError::InvalidRequest(msg) => ("Invalid Request", msg.clone()),
            ApiError::Processing(_) => ("Processing Failed", "Failed to process comment".to_string()),
            ApiError::BatchProcessing(_) => {
                ("Batch Processing Failed", "Failed to process batch".to_string())
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            code: status.as_u16(),
            trace_id: trace_id.map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response(None)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reword_kernel::GenerationError;

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Processing(ChainError::Reply(GenerationError::EmptyCompletion)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn processing_failures_hide_details() {
        let err = ApiError::Processing(ChainError::Moderation(GenerationError::Rejected {
            status: 401,
            message: "bad api key sk-123".into(),
        }));
        let response = err.to_response(Some("req-1"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("sk-123"));

        let body: ErrorResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(body.error, "Processing Failed");
        assert_eq!(body.message, "Failed to process comment");
        assert_eq!(body.code, 500);
        assert_eq!(body.trace_id.as_deref(), Some("req-1"));
    }
}
