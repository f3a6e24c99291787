//! `reword-kernel` - contracts for the Reword comment moderation service.
//!
//! This crate owns the pieces every other layer agrees on:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`types`] | Wire and domain types ([`CommentRequest`], [`ModeratedResponse`], ...) |
//! | [`llm`] | The [`CompletionGateway`] trait, [`Role`] and generation parameters |
//! | [`error`] | [`GenerationError`], the failure type of every completion call |
//!
//! No network I/O lives here. Concrete gateways and the moderation pipeline
//! are implemented in `reword-foundation`.

pub mod error;
pub mod llm;
pub mod types;

pub use error::{GenerationError, GenerationResult};
pub use llm::{CompletionGateway, GenerationParams, Role, RoleModels};
pub use types::{
    CommentRequest, MAX_BATCH_SIZE, ModeratedResponse, ModeratedText, ModerationOutcome,
    Sentiment, ValidationError, validate_batch,
};
