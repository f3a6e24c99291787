//! Moderation stage: toxicity classification and comment rewriting.
//!
//! Both operations run under [`Role::Moderator`].

use std::sync::Arc;

use reword_kernel::{
    CompletionGateway, GenerationResult, ModeratedText, ModerationOutcome, Role,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::prompts;

/// Toxicity checks and rewrites backed by the moderator model.
#[derive(Clone)]
pub struct ModerationStage {
    gateway: Arc<dyn CompletionGateway>,
}

impl ModerationStage {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Classify `comment` as toxic or not.
    ///
    /// Gateway failures are returned as-is; the caller decides how to degrade.
    #[instrument(skip_all, fields(gateway = %self.gateway.name()))]
    pub async fn check_toxicity(
        &self,
        comment: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<ModerationOutcome> {
        let answer = self
            .gateway
            .complete(Role::Moderator, &prompts::toxicity(comment), cancel)
            .await?;
        let outcome = parse_verdict(&answer);
        debug!(is_toxic = outcome.is_toxic, reason = %outcome.reason, "toxicity checked");
        Ok(outcome)
    }

    /// Ask the moderator to clean up `comment`, returning it unchanged when it
    /// is already acceptable.
    #[instrument(skip_all, fields(gateway = %self.gateway.name()))]
    pub async fn moderate_comment(
        &self,
        comment: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<ModeratedText> {
        let answer = self
            .gateway
            .complete(Role::Moderator, &prompts::rewrite(comment), cancel)
            .await?;
        let moderated = ModeratedText::from_rewrite(comment, &answer);
        debug!(
            original = %comment,
            moderated = %moderated.text,
            was_modified = moderated.was_modified,
            "comment moderated"
        );
        Ok(moderated)
    }
}

/// Split a moderator answer into verdict and reason.
///
/// The first whitespace-delimited token is the verdict; it counts as toxic when
/// it reads `yes` in any case, ignoring trailing punctuation (`YES,` `Yes.`).
/// Everything after that token is the reason, with leading separators stripped.
/// This is a heuristic over free-form model output, not a strict grammar.
pub fn parse_verdict(answer: &str) -> ModerationOutcome {
    let answer = answer.trim();
    let (verdict, rest) = match answer.split_once(char::is_whitespace) {
        Some((verdict, rest)) => (verdict, rest),
        None => (answer, ""),
    };
    let verdict = verdict.trim_end_matches(|c: char| !c.is_alphanumeric());
    let reason = rest
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | ',' | '.'))
        .trim_end();

    ModerationOutcome {
        is_toxic: verdict.eq_ignore_ascii_case("yes"),
        reason: reason.to_string(),
    }
}
