//! End-to-end pipeline: discover → research → plan → generate → optimize → proofread → write.
//!
//! Stages run strictly in sequence. Discovery, generation and proofreading
//! absorb their own failures, so the only error a run can return is a
//! failure to write the output file.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use blogwright_discovery::{DiscoveryOptions, DiscoveryResult};
use blogwright_shared::{
    AppConfig, GeneratedContent, Outline, ResearchSnippet, Result, RunId, RunReport,
    SectionReport, Topic, TopicSource,
};
use blogwright_text::{Proofread, RewritePlan, SentenceSegmenter};

use crate::generation::{self, GenerationProgress, GenerationSettings, TextGenerator};
use crate::output;
use crate::planner;

/// Runtime configuration for [`generate_blog`], merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct GenerateBlogConfig {
    /// Topic used when discovery comes back empty.
    pub default_topic: Topic,
    /// Caller-chosen topic; skips discovery entirely.
    pub topic_override: Option<Topic>,
    /// Discovery settings, `None` to skip the fetch.
    pub discovery: Option<DiscoveryOptions>,
    /// Emphasis keywords, applied in order.
    pub seo_keywords: Vec<String>,
    /// Year token for the title.
    pub year: String,
    /// Where the post is written.
    pub output_path: PathBuf,
    /// Prompt subject and decoding limits.
    pub generation: GenerationSettings,
}

impl From<&AppConfig> for GenerateBlogConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_topic: Topic::new(config.blog.default_topic.clone()),
            topic_override: None,
            discovery: config
                .discovery
                .enabled
                .then(|| DiscoveryOptions::from(&config.discovery)),
            seo_keywords: config.blog.seo_keywords.clone(),
            year: config.blog.year.clone(),
            output_path: PathBuf::from(&config.blog.output_path),
            generation: GenerationSettings::from(&config.generation),
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct BlogResult {
    /// The text written to the output file.
    pub content: String,
    /// Outline the post was generated from.
    pub outline: Outline,
    /// Stage-by-stage record of the run.
    pub report: RunReport,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called after each outline section is generated or falls back.
    fn section_generated(&self, heading: &str, current: usize, total: usize, fallback: bool);
    /// Called when the pipeline completes.
    fn done(&self, result: &BlogResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_generated(&self, _heading: &str, _current: usize, _total: usize, _fallback: bool) {}
    fn done(&self, _result: &BlogResult) {}
}

// ---------------------------------------------------------------------------
// Topic selection
// ---------------------------------------------------------------------------

/// The topic a run will write about, and how it was picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicChoice {
    Discovered(Topic),
    Default(Topic),
    Override(Topic),
}

impl TopicChoice {
    pub fn topic(&self) -> &Topic {
        match self {
            Self::Discovered(t) | Self::Default(t) | Self::Override(t) => t,
        }
    }

    pub fn source(&self) -> TopicSource {
        match self {
            Self::Discovered(_) => TopicSource::Discovered,
            Self::Default(_) => TopicSource::Default,
            Self::Override(_) => TopicSource::Override,
        }
    }
}

/// First discovered topic, or `default` when discovery found nothing.
pub fn select_topic(discovered: Vec<Topic>, default: &Topic) -> TopicChoice {
    match discovered.into_iter().next() {
        Some(topic) => TopicChoice::Discovered(topic),
        None => {
            info!(%default, "no trending topics found, using default topic");
            TopicChoice::Default(default.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Composition (stages 2–5)
// ---------------------------------------------------------------------------

/// Every intermediate artifact of the plan → proofread stages.
#[derive(Debug, Clone)]
pub struct Composed {
    pub outline: Outline,
    pub generated: GeneratedContent,
    pub optimized: String,
    pub proofread: Proofread,
}

/// Run planning, generation, SEO and proofreading for a chosen topic.
#[instrument(skip_all, fields(topic = %topic, generator = generator.name()))]
pub fn compose(
    topic: &Topic,
    snippets: &[ResearchSnippet],
    config: &GenerateBlogConfig,
    generator: &mut dyn TextGenerator,
    segmenter: &dyn SentenceSegmenter,
    progress: &dyn ProgressReporter,
) -> Composed {
    progress.phase("Creating outline");
    let outline = planner::create_outline(topic, snippets, &config.year);

    progress.phase("Generating content");
    let gen_progress = PipelineGenerationProgress { inner: progress };
    let generated =
        generation::generate_content(&outline, generator, &config.generation, &gen_progress);

    progress.phase("Optimizing for SEO");
    let optimized = RewritePlan::new(config.seo_keywords.as_slice()).apply(&generated.render());

    progress.phase("Proofreading");
    let proofread = blogwright_text::proofread(&optimized, segmenter);

    Composed {
        outline,
        generated,
        optimized,
        proofread,
    }
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Run the whole pipeline and write the post.
///
/// 1. Discovery (or override / disabled → default topic)
/// 2. Research
/// 3. Outline
/// 4. Generation, per-section fallback
/// 5. SEO rewrite
/// 6. Proofreading
/// 7. Write output
#[instrument(skip_all, fields(output = %config.output_path.display()))]
pub async fn generate_blog(
    config: &GenerateBlogConfig,
    generator: &mut dyn TextGenerator,
    segmenter: &dyn SentenceSegmenter,
    progress: &dyn ProgressReporter,
) -> Result<BlogResult> {
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting blog pipeline");

    // --- Phase 1: Topic ---
    let choice = match (&config.topic_override, &config.discovery) {
        (Some(topic), _) => {
            info!(%topic, "using caller-supplied topic");
            TopicChoice::Override(topic.clone())
        }
        (None, Some(opts)) => {
            progress.phase("Discovering trending topics");
            let discovered = match blogwright_discovery::discover(opts).await {
                DiscoveryResult::Found { topics, .. } => topics,
                DiscoveryResult::NoTitles => Vec::new(),
                DiscoveryResult::Unavailable { reason } => {
                    warn!(%reason, "discovery failed");
                    Vec::new()
                }
            };
            select_topic(discovered, &config.default_topic)
        }
        (None, None) => {
            info!("discovery disabled");
            select_topic(Vec::new(), &config.default_topic)
        }
    };
    let topic = choice.topic().clone();
    info!(%topic, source = ?choice.source(), "topic selected");

    // --- Phase 2: Research ---
    progress.phase("Gathering information");
    let snippets = blogwright_discovery::gather_information(&topic);

    // --- Phases 3–6 ---
    let composed = compose(&topic, &snippets, config, generator, segmenter, progress);

    // --- Phase 7: Write ---
    progress.phase("Writing output");
    let meta = output::write_output(&config.output_path, &composed.proofread.content)?;

    let report = RunReport {
        run_id,
        topic,
        topic_source: choice.source(),
        title: composed.outline.title.clone(),
        generator: generator.name().to_string(),
        sections: composed
            .generated
            .blocks
            .iter()
            .map(|b| SectionReport {
                heading: b.heading.clone(),
                origin: b.origin.clone(),
            })
            .collect(),
        proofread: composed.proofread.mode,
        sentences: composed.proofread.sentences,
        output_path: config.output_path.display().to_string(),
        size_bytes: meta.size_bytes,
        sha256: meta.sha256,
        generated_at: Utc::now(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    let result = BlogResult {
        content: composed.proofread.content,
        outline: composed.outline,
        report,
    };

    progress.done(&result);

    info!(
        run_id = %result.report.run_id,
        fallbacks = composed.generated.fallback_count(),
        size = result.report.size_bytes,
        elapsed_ms = result.report.elapsed_ms,
        "blog pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Generation progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `GenerationProgress` interface.
struct PipelineGenerationProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl GenerationProgress for PipelineGenerationProgress<'_> {
    fn section_done(&self, current: usize, total: usize, heading: &str, fallback: bool) {
        self.inner
            .section_generated(heading, current, total, fallback);
    }
}
