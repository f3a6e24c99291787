//! Orchestration chain.
//!
//! [`ChainService::process_comment`] runs one comment through a fixed,
//! forward-only sequence of stages:
//!
//! ```text
//! ToxicityCheck ──► ModerationDecision ──► SentimentResolution ──► ReplyGeneration ──► Assembled
//!                          │                                            │
//!                          └──────────────────► Failed ◄────────────────┘
//! ```
//!
//! Toxicity checking and sentiment inference are best-effort: their failures
//! are logged and replaced by defaults (non-toxic, `"helpful"`). Rewriting a
//! toxic comment and generating the reply are fatal: their failures end the
//! chain in `Failed`.
//!
//! [`ChainService::process_batch`] fans a batch out over a [`JoinSet`], keeps
//! results in input order, and fails as a whole on the first item error.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reword_kernel::{
    CommentRequest, CompletionGateway, GenerationError, MAX_BATCH_SIZE, ModeratedResponse,
    ModeratedText, ModerationOutcome,
};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::assistant::AssistantStage;
use crate::moderation::ModerationStage;

/// Tone used when sentiment inference fails.
pub const FALLBACK_SENTIMENT: &str = "helpful";

/// Position of a request inside the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    ToxicityCheck,
    ModerationDecision,
    SentimentResolution,
    ReplyGeneration,
    Assembled,
    Failed,
}

impl ChainStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStage::ToxicityCheck => "toxicity_check",
            ChainStage::ModerationDecision => "moderation_decision",
            ChainStage::SentimentResolution => "sentiment_resolution",
            ChainStage::ReplyGeneration => "reply_generation",
            ChainStage::Assembled => "assembled",
            ChainStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal chain failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainError {
    /// A comment classified toxic could not be rewritten.
    #[error("failed to moderate input comment: {0}")]
    Moderation(#[source] GenerationError),

    /// The assistant reply could not be generated.
    #[error("failed to generate assistant response: {0}")]
    Reply(#[source] GenerationError),

    #[error("batch of {size} comments exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A batch worker panicked or was aborted.
    #[error("batch task failed: {0}")]
    TaskFailed(String),
}

impl ChainError {
    /// The stage the chain was in when it failed, for per-request failures.
    pub fn stage(&self) -> Option<ChainStage> {
        match self {
            ChainError::Moderation(_) => Some(ChainStage::ModerationDecision),
            ChainError::Reply(_) => Some(ChainStage::ReplyGeneration),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            ChainError::Moderation(err) | ChainError::Reply(err) => err.is_cancelled(),
            _ => false,
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Sequences the moderation and assistant stages.
///
/// Cloning is cheap; clones share the underlying gateway.
#[derive(Clone)]
pub struct ChainService {
    moderator: ModerationStage,
    assistant: AssistantStage,
}

impl ChainService {
    pub fn new(moderator: ModerationStage, assistant: AssistantStage) -> Self {
        Self {
            moderator,
            assistant,
        }
    }

    /// Build both stages on top of a single gateway.
    pub fn from_gateway(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self::new(
            ModerationStage::new(gateway.clone()),
            AssistantStage::new(gateway),
        )
    }

    /// Run one comment through the full chain.
    #[instrument(skip_all, fields(user_id = request.user_id.as_deref().unwrap_or("")))]
    pub async fn process_comment(
        &self,
        request: &CommentRequest,
        cancel: &CancellationToken,
    ) -> ChainResult<ModeratedResponse> {
        let started = Instant::now();
        info!(
            comment = %request.comment,
            sentiment = ?request.sentiment,
            "processing comment"
        );

        let outcome = match self.moderator.check_toxicity(&request.comment, cancel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    stage = %ChainStage::ToxicityCheck,
                    error = %err,
                    "toxicity check failed, treating comment as non-toxic"
                );
                ModerationOutcome::default()
            }
        };

        let moderated = if outcome.is_toxic {
            let moderated = self
                .moderator
                .moderate_comment(&request.comment, cancel)
                .await
                .map_err(|err| {
                    error!(
                        stage = %ChainStage::ModerationDecision,
                        error = %err,
                        "rewrite of toxic comment failed"
                    );
                    ChainError::Moderation(err)
                })?;
            info!(
                original_input = %request.comment,
                moderated_input = %moderated.text,
                was_modified = moderated.was_modified,
                "input comment was moderated"
            );
            moderated
        } else {
            ModeratedText::unchanged(&request.comment)
        };

        let sentiment = match request.requested_sentiment() {
            Some(requested) => requested.to_string(),
            None => match self
                .assistant
                .analyze_sentiment(&moderated.text, cancel)
                .await
                .into_result()
            {
                Ok(sentiment) => sentiment.as_str().to_string(),
                Err(err) => {
                    warn!(
                        stage = %ChainStage::SentimentResolution,
                        error = %err,
                        fallback = FALLBACK_SENTIMENT,
                        "sentiment analysis failed, using fallback"
                    );
                    FALLBACK_SENTIMENT.to_string()
                }
            },
        };

        let assistant_reply = self
            .assistant
            .generate_response(&sentiment, &moderated.text, cancel)
            .await
            .map_err(|err| {
                error!(
                    stage = %ChainStage::ReplyGeneration,
                    error = %err,
                    "assistant reply generation failed"
                );
                ChainError::Reply(err)
            })?;

        let response = ModeratedResponse {
            original_comment: request.comment.clone(),
            moderated_input: moderated.was_modified.then_some(moderated.text),
            assistant_reply,
            was_modified: moderated.was_modified,
            moderation_reason: outcome.reason,
            timestamp: Utc::now(),
        };

        info!(
            stage = %ChainStage::Assembled,
            was_modified = response.was_modified,
            processing_ms = started.elapsed().as_millis() as u64,
            "comment processed"
        );
        Ok(response)
    }

    /// Process every request concurrently and return responses in input order.
    ///
    /// All-or-nothing: the first failure to complete (by completion order, not
    /// index) is returned, the remaining items are cancelled, and no partial
    /// results are kept. The call still waits for every task to wind down.
    #[instrument(skip_all, fields(batch_size = requests.len()))]
    pub async fn process_batch(
        &self,
        requests: Vec<CommentRequest>,
        cancel: &CancellationToken,
    ) -> ChainResult<Vec<ModeratedResponse>> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(ChainError::BatchTooLarge {
                size: requests.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let batch_cancel = cancel.child_token();
        let mut slots: Vec<Option<ModeratedResponse>> = (0..requests.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let chain = self.clone();
            let cancel = batch_cancel.clone();
            tasks.spawn(async move { (index, chain.process_comment(&request, &cancel).await) });
        }

        let mut first_error: Option<ChainError> = None;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(response))) => {
                    slots[index] = Some(response);
                    continue;
                }
                Ok((index, Err(err))) => {
                    warn!(index, error = %err, "batch item failed");
                    err
                }
                Err(join_err) => ChainError::TaskFailed(join_err.to_string()),
            };
            if first_error.is_none() {
                batch_cancel.cancel();
                first_error = Some(failure);
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ChainError::TaskFailed("batch finished with missing results".into()))
    }
}
