//! Core domain types for the blog pipeline.
//!
//! Every artifact here is produced by exactly one stage and handed forward
//! by value; nothing is mutated after hand-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Topic / research
// ---------------------------------------------------------------------------

/// The subject a post is written about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One short fact gathered about a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResearchSnippet(String);

impl ResearchSnippet {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// A single outline section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

impl Section {
    pub fn new(heading: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
        }
    }
}

/// Title plus ordered sections guiding generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// Generated content
// ---------------------------------------------------------------------------

/// Where a generated block came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOrigin {
    /// Text produced by the generation backend.
    Model,
    /// The deterministic template, with the backend error that forced it.
    Fallback { reason: String },
}

impl BlockOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Generated text for one outline section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBlock {
    /// Heading of the section this block expands.
    pub heading: String,
    pub text: String,
    pub origin: BlockOrigin,
}

/// One block per outline section, in section order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub blocks: Vec<GeneratedBlock>,
}

impl GeneratedContent {
    /// Concatenate blocks, each followed by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&block.text);
            out.push_str("\n\n");
        }
        out
    }

    pub fn fallback_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.origin.is_fallback()).count()
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// How the topic for a run was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicSource {
    /// First title returned by discovery.
    Discovered,
    /// Discovery came back empty; the configured default was used.
    Default,
    /// Supplied by the caller, discovery skipped.
    Override,
}

/// How the proofreader produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofreadMode {
    /// Sentences were segmented and rejoined with single spaces.
    Segmented,
    /// Segmentation failed; content passed through unchanged.
    Passthrough,
}

/// Per-section entry in a [`RunReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReport {
    pub heading: String,
    pub origin: BlockOrigin,
}

/// What a pipeline run did, stage by stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub topic: Topic,
    pub topic_source: TopicSource,
    pub title: String,
    pub generator: String,
    pub sections: Vec<SectionReport>,
    pub proofread: ProofreadMode,
    pub sentences: usize,
    pub output_path: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
