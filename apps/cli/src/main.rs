//! Blogwright CLI: trending-topic blog post generator.
//!
//! Picks a topic, plans an outline, expands it with a language model, then
//! applies SEO emphasis and sentence clean-up before writing the post.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
