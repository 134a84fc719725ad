//! SEO annotation as an ordered list of literal rewrite rules.
//!
//! Rules are applied one after another with plain substring replacement, so
//! a keyword that is a substring of a later keyword changes what the later
//! rule sees. The plan is single-pass: running it over its own output wraps
//! every match again.

use tracing::{debug, instrument, warn};

/// Literal headings promoted to `<h2>` after keyword emphasis.
pub const HEADING_TERMS: [&str; 2] = ["Trend 1", "Trend 2"];

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// What a rule wraps its match in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `<strong>…</strong>`
    Emphasis,
    /// `<h2>…</h2>`
    Heading,
}

/// Replace every occurrence of `find` with `replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub find: String,
    pub replace: String,
    pub kind: RuleKind,
}

impl RewriteRule {
    pub fn emphasis(keyword: &str) -> Self {
        Self {
            find: keyword.to_string(),
            replace: format!("<strong>{keyword}</strong>"),
            kind: RuleKind::Emphasis,
        }
    }

    pub fn heading(term: &str) -> Self {
        Self {
            find: term.to_string(),
            replace: format!("<h2>{term}</h2>"),
            kind: RuleKind::Heading,
        }
    }

    /// Apply this rule to `content`, returning the rewritten text and match count.
    pub fn apply(&self, content: &str) -> (String, usize) {
        let hits = content.matches(self.find.as_str()).count();
        if hits == 0 {
            return (content.to_string(), 0);
        }
        (content.replace(self.find.as_str(), &self.replace), hits)
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Keyword emphasis rules in caller order, then the heading rules.
#[derive(Debug, Clone)]
pub struct RewritePlan {
    rules: Vec<RewriteRule>,
}

impl RewritePlan {
    /// Build the plan for `keywords`. Duplicates are kept; empty keywords are skipped.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut rules = Vec::with_capacity(keywords.len() + HEADING_TERMS.len());

        for keyword in keywords {
            let keyword = keyword.as_ref();
            if keyword.is_empty() {
                warn!("skipping empty SEO keyword");
                continue;
            }
            rules.push(RewriteRule::emphasis(keyword));
        }
        rules.extend(HEADING_TERMS.iter().map(|term| RewriteRule::heading(term)));

        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Run every rule in order over `content`.
    #[instrument(skip_all, fields(rules = self.rules.len(), len = content.len()))]
    pub fn apply(&self, content: &str) -> String {
        let mut out = content.to_string();
        for rule in &self.rules {
            let (next, hits) = rule.apply(&out);
            debug!(find = %rule.find, kind = ?rule.kind, hits, "applied rewrite rule");
            out = next;
        }
        out
    }
}

/// Emphasize `keywords` and promote the trend headings.
pub fn optimize<S: AsRef<str>>(content: &str, keywords: &[S]) -> String {
    RewritePlan::new(keywords).apply(content)
}
