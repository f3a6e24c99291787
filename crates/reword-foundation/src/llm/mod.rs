//! Concrete [`CompletionGateway`](reword_kernel::CompletionGateway) implementations.

mod cache;
mod openai;

pub use cache::CachedGateway;
pub use openai::{OpenAiConfig, OpenAiGateway};
