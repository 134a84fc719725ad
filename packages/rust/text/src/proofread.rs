//! Sentence segmentation and the proofreading pass.
//!
//! Proofreading splits the content into sentences and rejoins them with a
//! single space. Whitespace between sentences (including newlines inside
//! markup) is not preserved.

use std::sync::LazyLock;

use blogwright_shared::{BlogwrightError, ProofreadMode, Result};
use regex::Regex;
use tracing::{info, instrument, warn};

// ---------------------------------------------------------------------------
// Segmenter trait
// ---------------------------------------------------------------------------

/// Splits text into an ordered list of sentences covering it.
pub trait SentenceSegmenter: Send + Sync {
    /// Segment `text`. Returned sentences are trimmed and non-empty.
    fn segment(&self, text: &str) -> Result<Vec<String>>;

    /// Human-readable segmenter name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Rule-based segmenter
// ---------------------------------------------------------------------------

/// Terminal punctuation, optional closing quotes/brackets, then whitespace.
static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*\s+"#).expect("sentence boundary regex")
});

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc",
    "ltd", "co", "corp", "no", "fig", "approx", "dept", "est", "u.s",
];

/// Punctuation-driven segmenter with an abbreviation list.
///
/// A boundary is a run of `.`, `!` or `?` followed by whitespace, unless the
/// period closes a known abbreviation or a single-letter initial, or the
/// next word starts with a lowercase letter.
#[derive(Debug, Clone, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    fn is_boundary(text: &str, m: &regex::Match<'_>) -> bool {
        let Some(next) = text[m.end()..].chars().next() else {
            return false;
        };
        if next.is_lowercase() {
            return false;
        }

        let punct = m.as_str().trim_end();
        if !punct.starts_with('.') || punct.starts_with("..") {
            return true;
        }

        let before = &text[..m.start()];
        let word = before
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default()
            .trim_start_matches(|c: char| !c.is_alphanumeric());

        let mut letters = word.chars();
        if let (Some(c), None) = (letters.next(), letters.next()) {
            if c.is_uppercase() {
                return false;
            }
        }

        let lower = word.to_lowercase();
        !ABBREVIATIONS.contains(&lower.as_str())
    }
}

impl SentenceSegmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in BOUNDARY_RE.find_iter(text) {
            if !Self::is_boundary(text, &m) {
                continue;
            }
            push_trimmed(&mut sentences, &text[start..m.end()]);
            start = m.end();
        }
        push_trimmed(&mut sentences, &text[start..]);

        Ok(sentences)
    }

    fn name(&self) -> &str {
        "rule"
    }
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

// ---------------------------------------------------------------------------
// Proofreading
// ---------------------------------------------------------------------------

/// Output of [`proofread`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proofread {
    pub content: String,
    pub sentences: usize,
    pub mode: ProofreadMode,
}

/// Segment `content` and rejoin the sentences with single spaces.
///
/// If the segmenter fails, or returns nothing for non-blank input, the
/// content is passed through unchanged.
#[instrument(skip_all, fields(segmenter = segmenter.name(), len = content.len()))]
pub fn proofread(content: &str, segmenter: &dyn SentenceSegmenter) -> Proofread {
    let segmented = segmenter.segment(content).and_then(|sentences| {
        if sentences.is_empty() && !content.trim().is_empty() {
            Err(BlogwrightError::Segmentation(
                "segmenter returned no sentences for non-empty content".into(),
            ))
        } else {
            Ok(sentences)
        }
    });

    match segmented {
        Ok(sentences) => {
            info!(sentences = sentences.len(), "content proofread");
            Proofread {
                content: sentences.join(" "),
                sentences: sentences.len(),
                mode: ProofreadMode::Segmented,
            }
        }
        Err(e) => {
            warn!(error = %e, "segmentation failed, passing content through");
            Proofread {
                content: content.to_string(),
                sentences: 0,
                mode: ProofreadMode::Passthrough,
            }
        }
    }
}
