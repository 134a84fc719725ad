//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use blogwright_core::generation::{TextGenerator, open_generator};
use blogwright_core::pipeline::{BlogResult, GenerateBlogConfig, ProgressReporter};
use blogwright_shared::{
    AppConfig, Topic, init_config, load_config, load_config_from, validate_config,
};
use blogwright_text::RuleSegmenter;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Blogwright: trending-topic blog posts with SEO emphasis.
#[derive(Parser)]
#[command(
    name = "blogwright",
    version,
    about = "Generate an SEO-annotated blog post about a trending HR topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.blogwright/blogwright.toml.
    #[arg(long, global = true, env = "BLOGWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline and write the post.
    Generate(GenerateArgs),

    /// Print the outline a run would use, without calling the model.
    Outline {
        /// Topic to plan (defaults to blog.default_topic).
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `generate`. Each one overrides the matching config value.
#[derive(Args, Debug, Default)]
pub(crate) struct GenerateArgs {
    /// Write about this topic and skip discovery.
    #[arg(short, long)]
    pub topic: Option<String>,

    /// SEO keyword to emphasize (repeatable, replaces blog.seo_keywords).
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Output file (defaults to blog.output_path).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Do not start the model backend; every section uses its fallback.
    #[arg(long)]
    pub offline: bool,

    /// Skip the trending-topic fetch.
    #[arg(long)]
    pub no_discovery: bool,

    /// Also write a JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl GenerateArgs {
    fn apply(&self, config: &mut AppConfig) {
        if !self.keywords.is_empty() {
            config.blog.seo_keywords = self.keywords.clone();
        }
        if let Some(out) = &self.out {
            config.blog.output_path = out.display().to_string();
        }
        if self.offline {
            config.generation.backend = "offline".to_string();
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blogwright=info",
        1 => "blogwright=debug",
        _ => "blogwright=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Generate(args) => cmd_generate(config_path, &args).await,
        Command::Outline { topic } => cmd_outline(config_path, topic.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn non_blank_topic(topic: &str) -> Result<Topic> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(eyre!("--topic must not be blank"));
    }
    Ok(Topic::new(trimmed))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config_path: Option<&Path>, args: &GenerateArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    args.apply(&mut config);
    validate_config(&config)?;

    let mut run_config = GenerateBlogConfig::from(&config);
    run_config.topic_override = args.topic.as_deref().map(non_blank_topic).transpose()?;

    info!(
        output = %run_config.output_path.display(),
        backend = %config.generation.backend,
        discovery = config.discovery.enabled,
        "generating blog post"
    );

    let mut generator = open_generator(&config.generation);
    let reporter = CliProgress::new();

    let outcome = blogwright_core::pipeline::generate_blog(
        &run_config,
        generator.as_mut(),
        &RuleSegmenter,
        &reporter,
    )
    .await;

    close_generator(generator.as_mut());
    reporter.spinner.finish_and_clear();

    let result = outcome?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&result.report)?;
        blogwright_core::output::write_output(path, &json)?;
        info!(path = %path.display(), "run report written");
    }

    print_summary(&result);
    Ok(())
}

fn close_generator(generator: &mut dyn TextGenerator) {
    if let Err(e) = generator.close() {
        warn!(generator = generator.name(), error = %e, "generator did not shut down cleanly");
    }
}

fn print_summary(result: &BlogResult) {
    let report = &result.report;
    let fallbacks = report.sections.iter().filter(|s| s.origin.is_fallback()).count();

    println!();
    println!("  Blog post written!");
    println!("  Title:     {}", report.title);
    println!("  Topic:     {} ({:?})", report.topic, report.topic_source);
    println!(
        "  Sections:  {} ({fallbacks} fallback)",
        report.sections.len()
    );
    println!("  Generator: {}", report.generator);
    println!(
        "  Proofread: {:?}, {} sentence(s)",
        report.proofread, report.sentences
    );
    println!("  Path:      {}", report.output_path);
    println!("  Size:      {} bytes", report.size_bytes);
    println!("  SHA-256:   {}", report.sha256);
    println!(
        "  Time:      {:.1}s",
        report.elapsed_ms as f64 / 1000.0
    );
    println!();
}

fn cmd_outline(config_path: Option<&Path>, topic: Option<&str>) -> Result<()> {
    let config = resolve_config(config_path)?;
    validate_config(&config)?;

    let topic = match topic {
        Some(t) => non_blank_topic(t)?,
        None => Topic::new(config.blog.default_topic.clone()),
    };

    let snippets = blogwright_discovery::gather_information(&topic);
    let outline = blogwright_core::planner::create_outline(&topic, &snippets, &config.blog.year);
    println!("{}", serde_json::to_string_pretty(&outline)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_generated(&self, heading: &str, current: usize, total: usize, fallback: bool) {
        let note = if fallback { " (fallback)" } else { "" };
        self.spinner
            .set_message(format!("Generated [{current}/{total}] {heading}{note}"));
    }

    fn done(&self, _result: &BlogResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "blogwright",
            "generate",
            "--topic",
            "Pay Transparency",
            "-k",
            "HR",
            "-k",
            "pay",
            "--offline",
            "--no-discovery",
            "--out",
            "out/post.html",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.topic.as_deref(), Some("Pay Transparency"));
        assert_eq!(args.keywords, vec!["HR", "pay"]);
        assert!(args.offline);
        assert!(args.no_discovery);
    }

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        let args = GenerateArgs {
            keywords: vec!["remote".into()],
            out: Some(PathBuf::from("post.html")),
            offline: true,
            no_discovery: true,
            ..GenerateArgs::default()
        };
        args.apply(&mut config);

        assert_eq!(config.blog.seo_keywords, vec!["remote"]);
        assert_eq!(config.blog.output_path, "post.html");
        assert_eq!(config.generation.backend, "offline");
        assert!(!config.discovery.enabled);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = AppConfig::default();
        GenerateArgs::default().apply(&mut config);
        assert_eq!(config.blog.seo_keywords, vec!["HR trends", "2023"]);
        assert_eq!(config.generation.backend, "bridge");
        assert!(config.discovery.enabled);
    }

    #[test]
    fn blank_topic_rejected() {
        assert!(non_blank_topic("   ").is_err());
        assert_eq!(non_blank_topic(" AI ").unwrap().as_str(), "AI");
    }
}
