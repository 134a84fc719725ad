//! Text passes applied after generation: SEO annotation and proofreading.
//!
//! Both passes are total. [`seo::optimize`] is pure literal substitution and
//! [`proofread::proofread`] falls back to passthrough when segmentation fails.

pub mod proofread;
pub mod seo;

pub use proofread::{Proofread, RuleSegmenter, SentenceSegmenter, proofread};
pub use seo::{HEADING_TERMS, RewritePlan, RewriteRule, RuleKind, optimize};
