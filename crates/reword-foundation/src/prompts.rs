//! Prompt templates for every pipeline stage.
//!
//! Each template ends with a distinct cue line (`Verdict:`, `Rewritten comment:`,
//! `Sentiment:`, `Reply:`) which [`PromptKind::classify`] uses to tell stages
//! apart when inspecting recorded prompts.

const TOXICITY_CUE: &str = "Verdict:";
const REWRITE_CUE: &str = "Rewritten comment:";
const SENTIMENT_CUE: &str = "Sentiment:";
const REPLY_CUE: &str = "Reply:";

/// Tone used when the caller asked for none.
pub const DEFAULT_REPLY_TONE: &str = "helpful and professional";

pub fn toxicity(comment: &str) -> String {
    format!(
        "Decide whether the comment below is toxic, rude, or otherwise inappropriate.\n\
         Answer with YES or NO as the first word, then a short reason.\n\
         \n\
         Comment: \"{comment}\"\n\
         \n\
         {TOXICITY_CUE}"
    )
}

pub fn rewrite(comment: &str) -> String {
    format!(
        "You moderate an online forum and do not tolerate rude, offensive, or hostile comments.\n\
         \n\
         1. Read the comment.\n\
         2. If it contains profanity, insults, hostility, or other inappropriate content, \
         rewrite it so it is polite and constructive while keeping its meaning.\n\
         3. If it is already acceptable, return it exactly as written.\n\
         \n\
         Keep the information and intent. Remove offensive language. Turn negativity into \
         constructive feedback. Output only the comment.\n\
         \n\
         Comment: \"{comment}\"\n\
         \n\
         {REWRITE_CUE}"
    )
}

pub fn sentiment(text: &str) -> String {
    format!(
        "Classify the sentiment of the comment below. Answer with exactly one word: \
         positive, negative, or neutral.\n\
         \n\
         Comment: \"{text}\"\n\
         \n\
         {SENTIMENT_CUE}"
    )
}

/// Reply prompt; a blank `tone` falls back to [`DEFAULT_REPLY_TONE`].
pub fn reply(tone: &str, text: &str) -> String {
    let tone = if tone.trim().is_empty() {
        DEFAULT_REPLY_TONE
    } else {
        tone
    };
    format!(
        "You are a {tone} assistant replying to user comments. Match the vocabulary the user uses.\n\
         User: \"{text}\"\n\
         {REPLY_CUE}"
    )
}

/// Which stage a prompt was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Toxicity,
    Rewrite,
    Sentiment,
    Reply,
}

impl PromptKind {
    pub fn classify(prompt: &str) -> Option<Self> {
        let cue = prompt.trim_end().lines().last()?.trim();
        match cue {
            TOXICITY_CUE => Some(PromptKind::Toxicity),
            REWRITE_CUE => Some(PromptKind::Rewrite),
            SENTIMENT_CUE => Some(PromptKind::Sentiment),
            REPLY_CUE => Some(PromptKind::Reply),
            _ => None,
        }
    }
}

/// Pull the quoted subject text back out of a prompt built by this module.
pub fn subject_of(prompt: &str) -> Option<&str> {
    let line = prompt
        .lines()
        .find(|l| l.starts_with("Comment: \"") || l.starts_with("User: \""))?;
    let start = line.find('"')? + 1;
    let end = line.rfind('"')?;
    (end >= start).then(|| &line[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_is_classifiable() {
        assert_eq!(PromptKind::classify(&toxicity("x")), Some(PromptKind::Toxicity));
        assert_eq!(PromptKind::classify(&rewrite("x")), Some(PromptKind::Rewrite));
        assert_eq!(PromptKind::classify(&sentiment("x")), Some(PromptKind::Sentiment));
        assert_eq!(PromptKind::classify(&reply("", "x")), Some(PromptKind::Reply));
        assert_eq!(PromptKind::classify("free text"), None);
    }

    #[test]
    fn reply_defaults_tone() {
        assert!(reply("", "hi").starts_with("You are a helpful and professional assistant"));
        assert!(reply("negative", "hi").starts_with("You are a negative assistant"));
    }

    #[test]
    fn subject_round_trips() {
        assert_eq!(subject_of(&toxicity("you \"fool\"")), Some("you \"fool\""));
        assert_eq!(subject_of(&reply("", "thanks!")), Some("thanks!"));
    }
}
