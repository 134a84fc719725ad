//! Research gathering for a selected topic.
//!
//! There is no live research source yet: every topic gets the same two
//! facts. Callers must still treat the result as a variable-length list.

use blogwright_shared::{ResearchSnippet, Topic};
use tracing::info;

const STOCK_FACTS: [&str; 2] = [
    "Remote work is becoming increasingly popular in 2023, with companies adopting hybrid models to balance flexibility and collaboration.",
    "Employee well-being is a top priority for HR departments, with a focus on mental health support and work-life balance.",
];

/// Gather supporting facts for `topic`.
pub fn gather_information(topic: &Topic) -> Vec<ResearchSnippet> {
    info!(%topic, "gathering information");
    STOCK_FACTS.iter().map(|fact| ResearchSnippet::new(*fact)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_stock_facts_for_any_topic() {
        let a = gather_information(&Topic::new("Remote Work"));
        let b = gather_information(&Topic::new("Pay Transparency"));
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
        assert!(a[0].as_str().contains("2023"));
        assert!(a[1].as_str().starts_with("Employee well-being"));
    }
}
