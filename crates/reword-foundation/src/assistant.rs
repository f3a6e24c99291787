//! Assistant stage: sentiment inference and reply generation.

use std::sync::Arc;

use reword_kernel::{CompletionGateway, GenerationError, GenerationResult, Role, Sentiment};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::prompts;

/// Outcome of [`AssistantStage::analyze_sentiment`].
///
/// On a gateway failure `sentiment` is still populated with
/// [`Sentiment::Neutral`] so callers that only need a usable label can ignore
/// `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub error: Option<GenerationError>,
}

impl SentimentAnalysis {
    pub fn into_result(self) -> GenerationResult<Sentiment> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.sentiment),
        }
    }
}

/// Sentiment classification and reply writing backed by the assistant model.
#[derive(Clone)]
pub struct AssistantStage {
    gateway: Arc<dyn CompletionGateway>,
}

impl AssistantStage {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip_all, fields(gateway = %self.gateway.name()))]
    pub async fn analyze_sentiment(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> SentimentAnalysis {
        match self
            .gateway
            .complete(Role::Assistant, &prompts::sentiment(text), cancel)
            .await
        {
            Ok(answer) => {
                let sentiment = Sentiment::coerce(&answer);
                debug!(raw = %answer.trim(), %sentiment, "sentiment analyzed");
                SentimentAnalysis {
                    sentiment,
                    error: None,
                }
            }
            Err(err) => SentimentAnalysis {
                sentiment: Sentiment::Neutral,
                error: Some(err),
            },
        }
    }

    /// Write a reply to `text` in the given tone. A blank `sentiment` means
    /// "helpful and professional".
    #[instrument(skip_all, fields(gateway = %self.gateway.name(), sentiment = %sentiment))]
    pub async fn generate_response(
        &self,
        sentiment: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<String> {
        let reply = self
            .gateway
            .complete(Role::Assistant, &prompts::reply(sentiment, text), cancel)
            .await?;
        let reply = reply.trim().to_string();
        debug!(reply_len = reply.len(), "assistant reply generated");
        Ok(reply)
    }
}
