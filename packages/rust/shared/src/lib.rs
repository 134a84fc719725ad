//! Shared types, error model, and configuration for Blogwright.
//!
//! This crate is the foundation depended on by all other Blogwright crates.
//! It provides:
//! - [`BlogwrightError`], the unified error type
//! - Domain types ([`Topic`], [`Outline`], [`GeneratedContent`], [`RunReport`])
//! - Configuration ([`AppConfig`], config loading and validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BACKENDS, BROWSER_USER_AGENT, BlogConfig, DiscoveryConfig, GenerationConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{BlogwrightError, Result};
pub use types::{
    BlockOrigin, GeneratedBlock, GeneratedContent, Outline, ProofreadMode, ResearchSnippet,
    RunId, RunReport, Section, SectionReport, Topic, TopicSource,
};
