//! Application configuration for Blogwright.
//!
//! User config lives at `~/.blogwright/blogwright.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlogwrightError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blogwright.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blogwright";

/// Browser-identifying User-Agent; the talent blog rejects unidentified clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching blogwright.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// What gets written and how it is annotated.
    #[serde(default)]
    pub blog: BlogConfig,

    /// Topic discovery source.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Text-generation backend.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// `[blog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Topic used when discovery finds nothing.
    #[serde(default = "default_topic")]
    pub default_topic: String,

    /// Keywords wrapped in emphasis markers, applied in this order.
    #[serde(default = "default_seo_keywords")]
    pub seo_keywords: Vec<String>,

    /// Where the finished post is written.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Year token used in the post title.
    #[serde(default = "default_year")]
    pub year: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            default_topic: default_topic(),
            seo_keywords: default_seo_keywords(),
            output_path: default_output_path(),
            year: default_year(),
        }
    }
}

fn default_topic() -> String {
    "Remote Work".into()
}
fn default_seo_keywords() -> Vec<String> {
    vec!["HR trends".into(), "2023".into()]
}
fn default_output_path() -> String {
    "hr_trends_blog.html".into()
}
fn default_year() -> String {
    "2023".into()
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Set to false to skip the network fetch and go straight to the default topic.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Page scraped for trending titles.
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with the request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_url: default_source_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_source_url() -> String {
    "https://www.linkedin.com/business/talent/blog".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Backend kind: "bridge" or "offline".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Command that starts the model bridge.
    #[serde(default = "default_bridge_cmd")]
    pub bridge_cmd: String,

    /// Arguments passed to the bridge command. The default script path is
    /// relative to the working directory (`bridge/gpt2_bridge.py` in this repo).
    #[serde(default = "default_bridge_args")]
    pub bridge_args: Vec<String>,

    /// Model identifier forwarded to the bridge.
    #[serde(default = "default_model")]
    pub model: String,

    /// Subject phrase embedded in every section prompt.
    #[serde(default = "default_prompt_subject")]
    pub prompt_subject: String,

    /// Prompt length limit in model tokens (the bridge truncates).
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u32,

    /// Output length limit in model tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// N-gram size that may not repeat in the output.
    #[serde(default = "default_no_repeat_ngram_size")]
    pub no_repeat_ngram_size: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bridge_cmd: default_bridge_cmd(),
            bridge_args: default_bridge_args(),
            model: default_model(),
            prompt_subject: default_prompt_subject(),
            max_input_tokens: default_max_input_tokens(),
            max_output_tokens: default_max_output_tokens(),
            no_repeat_ngram_size: default_no_repeat_ngram_size(),
        }
    }
}

fn default_backend() -> String {
    "bridge".into()
}
fn default_bridge_cmd() -> String {
    "python3".into()
}
fn default_bridge_args() -> Vec<String> {
    vec!["bridge/gpt2_bridge.py".into()]
}
fn default_model() -> String {
    "gpt2".into()
}
fn default_prompt_subject() -> String {
    "HR trends".into()
}
fn default_max_input_tokens() -> u32 {
    512
}
fn default_max_output_tokens() -> u32 {
    500
}
fn default_no_repeat_ngram_size() -> u32 {
    2
}

/// Recognised values for `generation.backend`.
pub const BACKENDS: [&str; 2] = ["bridge", "offline"];

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blogwright/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlogwrightError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blogwright/blogwright.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlogwrightError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BlogwrightError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlogwrightError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlogwrightError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlogwrightError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values that would make a run meaningless.
///
/// An empty keyword matches between every character, so it is refused here
/// rather than silently exploding the output.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.blog.default_topic.trim().is_empty() {
        return Err(BlogwrightError::config("blog.default_topic must not be empty"));
    }
    if let Some(pos) = config.blog.seo_keywords.iter().position(|k| k.is_empty()) {
        return Err(BlogwrightError::config(format!(
            "blog.seo_keywords[{pos}] is empty"
        )));
    }
    if config.blog.output_path.trim().is_empty() {
        return Err(BlogwrightError::config("blog.output_path must not be empty"));
    }
    if config.discovery.timeout_secs == 0 {
        return Err(BlogwrightError::config("discovery.timeout_secs must be at least 1"));
    }
    if !BACKENDS.contains(&config.generation.backend.as_str()) {
        return Err(BlogwrightError::config(format!(
            "unknown generation.backend '{}': expected one of {}",
            config.generation.backend,
            BACKENDS.join(", ")
        )));
    }
    Ok(())
}
