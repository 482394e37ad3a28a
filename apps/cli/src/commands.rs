//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use topicdesk_agents::{AgentSet, OpenAiRunner};
use topicdesk_core::{PageStatus, Pipeline, RunProgress, RunQueue, RunReport, Stage};
use topicdesk_notion::NotionPublisher;
use topicdesk_server::AppState;
use topicdesk_shared::{
    AppConfig, ResearchTopic, Secrets, init_config, load_config, load_config_from,
    resolve_secrets,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicDesk: research topics from a Notion database and publish the results.
#[derive(Parser)]
#[command(
    name = "topicdesk",
    version,
    about = "Research topics posted by a Notion webhook and publish reports back to Notion.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.topicdesk/topicdesk.toml).
    #[arg(long, global = true, env = "TOPICDESK_CONFIG")]
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
    /// Start the webhook server.
    Serve {
        /// Address to bind (overrides `server.bind`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Research one topic in the foreground and publish both pages.
    Run {
        /// Topic to research.
        #[arg(long)]
        topic: String,

        /// Notion page under which the results are created.
        #[arg(long)]
        page_id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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
        0 => "topicdesk=info,tower_http=info",
        1 => "topicdesk=debug,tower_http=debug",
        _ => "topicdesk=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Serve { bind } => cmd_serve(config_path, bind).await,
        Command::Run { topic, page_id } => cmd_run(config_path, topic, page_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Wire the production agent runner and publisher into a pipeline.
fn build_pipeline(config: &AppConfig, secrets: &Secrets) -> Result<Pipeline> {
    let runner = OpenAiRunner::new(&config.openai, secrets.openai_api_key.clone())?;
    let publisher = NotionPublisher::new(&config.notion, secrets.notion_token.clone())?;

    Ok(Pipeline::new(
        AgentSet::from_config(&config.agents),
        Arc::new(runner),
        Arc::new(publisher),
    ))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let config = load(config_path)?;
    let secrets = resolve_secrets(&config)?;

    let pipeline = build_pipeline(&config, &secrets)?;
    let queue = Arc::new(RunQueue::new(Arc::new(pipeline)));
    let state = AppState::new(
        queue,
        &secrets.webhook_api_key,
        &config.server.api_key_header,
    )?;

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    info!(
        addr = %addr,
        research_model = %config.agents.research_model,
        format_model = %config.agents.format_model,
        "starting webhook server"
    );

    topicdesk_server::serve(&addr, state).await?;
    Ok(())
}

async fn cmd_run(config_path: Option<PathBuf>, topic: String, page_id: String) -> Result<()> {
    let config = load(config_path)?;
    let secrets = resolve_secrets(&config)?;
    let topic = ResearchTopic::new(topic, page_id)?;

    let pipeline = build_pipeline(&config, &secrets)?;

    info!(topic = %topic.topic, destination_id = %topic.destination_id, "running research");

    let reporter = CliProgress::new();
    let report = match pipeline.run(&topic, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.spinner.abandon_with_message("Research failed");
            return Err(e.into());
        }
    };

    println!();
    println!("  Research complete for: {}", report.topic.topic);
    println!("  Report page: {}", describe(&report.research_page));
    println!("  Ideas page:  {}", describe(&report.ideas_page));
    println!("  Tokens:      {} in / {} out", report.tokens_in, report.tokens_out);
    println!("  Time:        {:.1}s", report.elapsed.as_secs_f64());
    println!();

    if !report.research_page.is_published() && !report.ideas_page.is_published() {
        return Err(eyre!("neither page could be published"));
    }

    Ok(())
}

fn describe(status: &PageStatus) -> String {
    match status {
        PageStatus::Published { page_id, url } => match url {
            Some(url) => format!("{page_id} ({url})"),
            None => page_id.clone(),
        },
        PageStatus::Failed { reason } => format!("FAILED: {reason}"),
    }
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.label());
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
