//! `reword-foundation` - the moderation pipeline.
//!
//! Builds on the contracts in `reword-kernel`:
//!
//! | Component | Type |
//! |-----------|------|
//! | Moderation stage | [`moderation::ModerationStage`] |
//! | Assistant stage | [`assistant::AssistantStage`] |
//! | Orchestration chain | [`chain::ChainService`] |
//! | OpenAI-compatible gateway | [`llm::OpenAiGateway`] |
//! | Completion cache | [`llm::CachedGateway`] |
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reword_foundation::chain::ChainService;
//! use reword_foundation::llm::{OpenAiConfig, OpenAiGateway};
//! use reword_kernel::CommentRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = OpenAiGateway::new(OpenAiConfig::new(std::env::var("OPENAI_API_KEY")?))?;
//! let chain = ChainService::from_gateway(Arc::new(gateway));
//!
//! let response = chain
//!     .process_comment(&CommentRequest::new("Loved the update!"), &CancellationToken::new())
//!     .await?;
//! println!("{}", response.assistant_reply);
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod chain;
pub mod llm;
pub mod moderation;
pub mod prompts;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chain::{ChainError, ChainResult, ChainService, ChainStage};
