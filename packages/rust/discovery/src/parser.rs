//! Title extraction from the talent blog listing page.
//!
//! The listing has shipped two layouts:
//! - `<h2 class="blog-post__title">Title</h2>` (primary)
//! - `<a class="blog-post__title-link">Title</a>` (fallback)
//!
//! The fallback selector is only consulted when the primary matches nothing.

use std::sync::LazyLock;

use blogwright_shared::Topic;
use scraper::{Html, Selector};

// ---------------------------------------------------------------------------
// Selectors (compiled once)
// ---------------------------------------------------------------------------

/// Which selector produced the titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSelector {
    /// `h2.blog-post__title`
    Primary,
    /// `a.blog-post__title-link`
    Fallback,
}

impl TitleSelector {
    /// CSS source of the selector.
    pub fn css(&self) -> &'static str {
        match self {
            Self::Primary => "h2.blog-post__title",
            Self::Fallback => "a.blog-post__title-link",
        }
    }
}

static PRIMARY_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(TitleSelector::Primary.css()).expect("primary title selector")
});

static FALLBACK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(TitleSelector::Fallback.css()).expect("fallback title selector")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Extract trending titles from a listing page, in document order.
///
/// Returns `None` when neither selector yields a non-empty title.
pub(crate) fn extract_titles(html: &str) -> Option<(Vec<Topic>, TitleSelector)> {
    let doc = Html::parse_document(html);

    let primary = select_titles(&doc, &PRIMARY_SEL);
    if !primary.is_empty() {
        return Some((primary, TitleSelector::Primary));
    }

    tracing::debug!("no primary titles, trying fallback selector");
    let fallback = select_titles(&doc, &FALLBACK_SEL);
    if !fallback.is_empty() {
        return Some((fallback, TitleSelector::Fallback));
    }

    None
}

fn select_titles(doc: &Html, selector: &Selector) -> Vec<Topic> {
    doc.select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .map(Topic::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn primary_layout() {
        let (titles, selector) = extract_titles(&fixture("talent-blog.html")).unwrap();
        assert_eq!(selector, TitleSelector::Primary);
        let labels: Vec<&str> = titles.iter().map(Topic::as_str).collect();
        // Blank title dropped, nested markup flattened, site header ignored
        assert_eq!(
            labels,
            vec!["Skills-Based Hiring", "Pay Transparency Laws", "AI in Recruiting"]
        );
    }

    #[test]
    fn fallback_layout() {
        let (titles, selector) = extract_titles(&fixture("talent-blog-links.html")).unwrap();
        assert_eq!(selector, TitleSelector::Fallback);
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[1].as_str(), "The Four-Day Week");
    }

    #[test]
    fn primary_wins_when_both_present() {
        let html = r#"<html><body>
            <a class="blog-post__title-link">Link Title</a>
            <h2 class="blog-post__title">Heading Title</h2>
        </body></html>"#;
        let (titles, selector) = extract_titles(html).unwrap();
        assert_eq!(selector, TitleSelector::Primary);
        assert_eq!(titles, vec![Topic::new("Heading Title")]);
    }

    #[test]
    fn no_titles() {
        assert!(extract_titles(&fixture("no-titles.html")).is_none());
        assert!(extract_titles("").is_none());
    }

    #[test]
    fn wrong_tag_with_right_class_is_ignored() {
        let html = r#"<div class="blog-post__title">Not a heading</div>"#;
        assert!(extract_titles(html).is_none());
    }
}
