//! In-memory [`CompletionGateway`] for tests.
//!
//! [`ScriptedGateway`] answers every call from a closure, records what it was
//! asked, and can delay individual answers to shuffle completion order.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reword_kernel::{CompletionGateway, GenerationError, GenerationResult, Role};
use tokio_util::sync::CancellationToken;

use crate::prompts::{self, PromptKind};

type Responder = dyn Fn(Role, &str) -> GenerationResult<String> + Send + Sync;
type Delay = dyn Fn(&str) -> Duration + Send + Sync;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub role: Role,
    pub prompt: String,
    pub kind: Option<PromptKind>,
}

pub struct ScriptedGateway {
    responder: Box<Responder>,
    delay: Option<Box<Delay>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    /// Answer every call with `responder(role, prompt)`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(Role, &str) -> GenerationResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `responder(kind, subject)`, where `kind` is the
    /// pipeline stage the prompt was built for and `subject` the comment text
    /// embedded in it.
    pub fn by_kind<F>(responder: F) -> Self
    where
        F: Fn(PromptKind, &str) -> GenerationResult<String> + Send + Sync + 'static,
    {
        Self::new(move |_, prompt| {
            let kind = PromptKind::classify(prompt)
                .ok_or_else(|| GenerationError::Malformed("unrecognized prompt".into()))?;
            let subject = prompts::subject_of(prompt).unwrap_or_default();
            responder(kind, subject)
        })
    }

    /// Sleep for `delay(prompt)` before answering. The sleep observes the
    /// caller's cancellation token.
    pub fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls issued for a given stage.
    pub fn count(&self, kind: PromptKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.kind == Some(kind))
            .count()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        role: Role,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<String> {
        self.calls.lock().push(RecordedCall {
            role,
            prompt: prompt.to_string(),
            kind: PromptKind::classify(prompt),
        });

        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        if let Some(delay) = &self.delay {
            let wait = delay(prompt);
            if !wait.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        (self.responder)(role, prompt)
    }
}
