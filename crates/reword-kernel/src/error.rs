//! Completion gateway error types.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single call through a [`CompletionGateway`](crate::CompletionGateway).
///
/// Messages may contain upstream provider text. They are meant for logs and
/// must never be forwarded to HTTP clients verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum GenerationError {
    /// The upstream endpoint could not be reached (DNS, connect, TLS, reset).
    #[error("completion upstream unreachable: {0}")]
    Unreachable(String),

    /// The upstream answered with a non-success status.
    #[error("completion rejected by upstream (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The call did not finish within the configured timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired before the call finished.
    #[error("completion cancelled by caller")]
    Cancelled,

    /// The upstream answered successfully but without any completion text.
    #[error("completion response contained no text")]
    EmptyCompletion,

    /// The upstream body could not be decoded.
    #[error("malformed completion response: {0}")]
    Malformed(String),

    /// The gateway itself could not be constructed or is misconfigured.
    #[error("completion gateway misconfigured: {0}")]
    Configuration(String),
}

impl GenerationError {
    /// `true` when the failure was caused by the caller giving up rather than
    /// by the upstream provider.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }
}

/// Result alias for completion calls.
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_includes_status() {
        let err = GenerationError::Rejected {
            status: 429,
            message: "quota".into(),
        };
        assert_eq!(
            err.to_string(),
            "completion rejected by upstream (status 429): quota"
        );
        assert!(!err.is_cancelled());
        assert!(GenerationError::Cancelled.is_cancelled());
    }
}
