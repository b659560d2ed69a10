//! Text preprocessing
//!
//! Optional punctuation restoration, transcription fixes and sentence
//! segmentation.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use reqgraph_core::{ExtractionConfig, PunctuationRestorer};

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence end pattern"));

static SENTENCE_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]").expect("mark pattern"));

/// Speech-to-text slips that hide a class suffix or a trigger
static TRANSCRIPTION_FIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bconstrained\b", "constraint"),
        (r"\bConstrained\b", "Constraint"),
        (r"\bapply(\s+to)\b", "applies${1}"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Split after `.`, `!` or `?` followed by whitespace. Pieces are trimmed
/// and empty pieces dropped; the punctuation stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        // Keep the mark, drop the whitespace
        let end = m.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        sentences.push(piece.to_string());
    }
}

/// Rewrite known transcription artifacts
pub fn fix_transcription_artifacts(text: &str) -> String {
    TRANSCRIPTION_FIXES
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Restoration, fixes and segmentation in one place
pub struct Preprocessor {
    restorer: Option<Box<dyn PunctuationRestorer>>,
    /// Restore when the text has more words than this...
    min_words: usize,
    /// ...and fewer sentence marks than this
    max_marks: usize,
}

impl Preprocessor {
    /// Create a preprocessor without a restorer
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create with thresholds from configuration
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            restorer: None,
            min_words: config.restore_min_words,
            max_marks: config.restore_max_marks,
        }
    }

    /// Attach a punctuation restorer
    pub fn with_restorer(mut self, restorer: Box<dyn PunctuationRestorer>) -> Self {
        self.restorer = Some(restorer);
        self
    }

    /// Name of the attached restorer, if any
    pub fn restorer_name(&self) -> Option<&str> {
        self.restorer.as_deref().map(|r| r.name())
    }

    /// Check if `text` looks like an unpunctuated transcript
    pub fn needs_restoration(&self, text: &str) -> bool {
        SENTENCE_MARK.find_iter(text).count() < self.max_marks
            && text.split_whitespace().count() > self.min_words
    }

    /// Restore punctuation when forced or when the text looks unpunctuated.
    ///
    /// Any restorer problem leaves the text as it was.
    pub fn restore(&self, text: &str, force: bool) -> String {
        let Some(restorer) = &self.restorer else {
            return text.to_string();
        };
        if !force && !self.needs_restoration(text) {
            return text.to_string();
        }
        if !restorer.is_available() {
            warn!(restorer = restorer.name(), "Punctuation restorer unavailable, using raw text");
            return text.to_string();
        }

        match restorer.restore(text) {
            Ok(restored) => {
                debug!(restorer = restorer.name(), "Punctuation restored");
                restored
            }
            Err(e) => {
                warn!(restorer = restorer.name(), error = %e, "Punctuation restoration failed, using raw text");
                text.to_string()
            }
        }
    }

    /// Text both extraction passes read: restored, then artifact-fixed
    pub fn prepare(&self, text: &str, force: bool) -> String {
        fix_transcription_artifacts(&self.restore(text, force))
    }

    /// Restore (if needed) and split into sentences
    pub fn restore_and_segment(&self, text: &str, force: bool) -> Vec<String> {
        split_sentences(&self.restore(text, force))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Segment `text` with the default, restorer-less preprocessor
pub fn restore_and_segment(text: &str, force: bool) -> Vec<String> {
    Preprocessor::new().restore_and_segment(text, force)
}
