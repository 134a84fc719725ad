//! Outline planning: topic + research → titled, four-section outline.

use blogwright_shared::{Outline, ResearchSnippet, Section, Topic};
use tracing::info;

/// Content used when a research snippet is missing for a trend section.
pub const NO_DATA_PLACEHOLDER: &str = "No data available.";

/// Build the post outline.
///
/// The shape is fixed: Introduction, Trend 1, Trend 2, Conclusion. Trend
/// sections take the first two snippets in order; snippets beyond the second
/// are not used.
pub fn create_outline(topic: &Topic, snippets: &[ResearchSnippet], year: &str) -> Outline {
    info!(%topic, snippets = snippets.len(), "creating outline");

    let trend = |idx: usize| {
        snippets
            .get(idx)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| NO_DATA_PLACEHOLDER.to_string())
    };

    Outline {
        title: format!("Top Trends in {topic} for {year}"),
        sections: vec![
            Section::new("Introduction", "Brief overview of the topic."),
            Section::new("Trend 1", trend(0)),
            Section::new("Trend 2", trend(1)),
            Section::new("Conclusion", "Summary and future outlook."),
        ],
    }
}
