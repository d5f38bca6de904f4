//! # llmkit
//!
//! Render prompt templates and send one-shot prompts to a text-generation
//! backend.

use clap::Parser;
use llmkit::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::logging::init_tracing(&cli.log_level);

    let mut stdout = std::io::stdout();
    llmkit::commands::run(cli, &mut stdout).await
}
