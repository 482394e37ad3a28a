//! TopicDesk CLI: research webhook server and one-shot runs.
//!
//! Receives topics from a Notion database automation, researches them with
//! language-model agents and publishes a report and a content-ideas page
//! back to Notion.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
