//! Domain and wire types for comment moderation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of comments accepted in one batch request.
pub const MAX_BATCH_SIZE: usize = 10;

/// A comment submitted for moderation and reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
    /// Tone to answer in. Absent or blank means "infer from the comment".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl CommentRequest {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            sentiment: None,
            user_id: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.sentiment = Some(sentiment.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// The caller-supplied sentiment, if it is non-blank.
    ///
    /// The label is returned untouched: it is not checked against
    /// [`Sentiment`]'s closed set.
    pub fn requested_sentiment(&self) -> Option<&str> {
        self.sentiment.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.comment.trim().is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        Ok(())
    }
}

/// Check a batch against the size cap and validate every item.
pub fn validate_batch(requests: &[CommentRequest]) -> Result<(), ValidationError> {
    if requests.len() > MAX_BATCH_SIZE {
        return Err(ValidationError::BatchTooLarge {
            size: requests.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    for (index, request) in requests.iter().enumerate() {
        request
            .validate()
            .map_err(|source| ValidationError::BatchItem {
                index,
                source: Box::new(source),
            })?;
    }
    Ok(())
}

/// Malformed or out-of-bounds client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment must not be empty")]
    EmptyComment,

    #[error("batch of {size} comments exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("batch item {index}: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Verdict of a toxicity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub is_toxic: bool,
    /// Free-text explanation from the moderator model; may be empty.
    pub reason: String,
}

/// Result of a rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratedText {
    pub text: String,
    /// `true` iff the trimmed rewrite differs from the trimmed original.
    pub was_modified: bool,
}

impl ModeratedText {
    /// Build from the original comment and a raw model rewrite.
    pub fn from_rewrite(original: &str, rewrite: &str) -> Self {
        let text = rewrite.trim().to_string();
        let was_modified = text != original.trim();
        Self { text, was_modified }
    }

    /// The original comment passed through untouched.
    pub fn unchanged(original: &str) -> Self {
        Self {
            text: original.to_string(),
            was_modified: false,
        }
    }
}

/// Final output for one processed comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratedResponse {
    pub original_comment: String,
    /// Only present when the comment was rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderated_input: Option<String>,
    pub assistant_reply: String,
    pub was_modified: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub moderation_reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Sentiment labels the assistant can infer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Parse a model answer; anything but an exact label (after trimming and
    /// lowercasing) becomes [`Sentiment::Neutral`].
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
