//! Text-completion gateway contract.
//!
//! Every stage of the moderation pipeline talks to the language model through
//! [`CompletionGateway`]. A gateway is handed a [`Role`] and a prompt and
//! returns the generated text; which model serves the role, and the shared
//! generation parameters, are gateway configuration.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::GenerationResult;

/// Logical model identity a completion request is issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Writes replies and classifies sentiment.
    Assistant,
    /// Classifies toxicity and rewrites offending comments.
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model names backing each [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleModels {
    pub assistant: String,
    pub moderator: String,
}

impl RoleModels {
    pub fn new(assistant: impl Into<String>, moderator: impl Into<String>) -> Self {
        Self {
            assistant: assistant.into(),
            moderator: moderator.into(),
        }
    }

    /// Resolve the model name configured for `role`.
    pub fn model_for(&self, role: Role) -> &str {
        match role {
            Role::Assistant => &self.assistant,
            Role::Moderator => &self.moderator,
        }
    }
}

impl Default for RoleModels {
    fn default() -> Self {
        Self::new("gpt-3.5-turbo", "gpt-4")
    }
}

/// Generation parameters shared by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

/// A remote text-generation capability.
///
/// Implementations must be safe for unlimited concurrent use and must stop
/// work promptly once `cancel` fires, returning
/// [`GenerationError::Cancelled`](crate::GenerationError::Cancelled).
/// No retries are performed behind this trait; callers decide.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Gateway name used in logs and metrics.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` using the model configured for `role`.
    async fn complete(
        &self,
        role: Role,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_models_resolve_per_role() {
        let models = RoleModels::new("small", "large");
        assert_eq!(models.model_for(Role::Assistant), "small");
        assert_eq!(models.model_for(Role::Moderator), "large");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
