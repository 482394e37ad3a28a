//! End-to-end research pipeline: topic → research → ideas → format → publish.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use topicdesk_agents::{Agent, AgentOutput, AgentRunner, AgentSet};
use topicdesk_notion::{PagePublisher, PublishOutcome, PublishRequest};
use topicdesk_shared::{BlockCollection, BlockKind, ResearchTopic, Result, TopicDeskError};

// ---------------------------------------------------------------------------
// Stages & report
// ---------------------------------------------------------------------------

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Research,
    Ideas,
    FormatResearch,
    PublishResearch,
    FormatIdeas,
    PublishIdeas,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Ideas => "ideas",
            Self::FormatResearch => "format_research",
            Self::PublishResearch => "publish_research",
            Self::FormatIdeas => "format_ideas",
            Self::PublishIdeas => "publish_ideas",
        }
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Research => "Researching topic",
            Self::Ideas => "Generating content ideas",
            Self::FormatResearch => "Formatting research report",
            Self::PublishResearch => "Publishing research report",
            Self::FormatIdeas => "Formatting content ideas",
            Self::PublishIdeas => "Publishing content ideas",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of publishing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Published {
        page_id: String,
        url: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl PageStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Summary of a completed run. A run "completes" once every agent call
/// succeeded; individual pages may still have failed to publish.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub topic: ResearchTopic,
    pub research_page: PageStatus,
    pub ideas_page: PageStatus,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait RunProgress: Send + Sync {
    /// Called when a stage starts.
    fn stage(&self, stage: Stage);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs the agents and publishes the two pages for one topic.
///
/// Holds no per-run state, so one instance serves any number of concurrent
/// runs.
pub struct Pipeline {
    agents: AgentSet,
    runner: Arc<dyn AgentRunner>,
    publisher: Arc<dyn PagePublisher>,
}

/// Running token totals for one run.
#[derive(Default)]
struct Usage {
    tokens_in: u64,
    tokens_out: u64,
}

impl Usage {
    fn record(&mut self, output: &AgentOutput) {
        self.tokens_in += output.tokens_in;
        self.tokens_out += output.tokens_out;
    }
}

impl Pipeline {
    pub fn new(
        agents: AgentSet,
        runner: Arc<dyn AgentRunner>,
        publisher: Arc<dyn PagePublisher>,
    ) -> Self {
        Self {
            agents,
            runner,
            publisher,
        }
    }

    /// Run every stage for `topic`, strictly in order.
    ///
    /// 1. Research the topic
    /// 2. Generate content ideas from the research
    /// 3. Format the research into blocks
    /// 4. Publish the research report
    /// 5. Format the ideas and publish them
    ///
    /// An agent failure aborts the run; pages already published stay.
    /// Conversion and publish failures are recorded in the report and the
    /// run moves on.
    #[instrument(skip_all, fields(topic = %topic.topic, destination = %topic.destination_id))]
    pub async fn run(&self, topic: &ResearchTopic, progress: &dyn RunProgress) -> Result<RunReport> {
        let start = Instant::now();
        let mut usage = Usage::default();

        info!("starting research run");

        progress.stage(Stage::Research);
        let research = self.call(&self.agents.research, &topic.topic).await?;
        usage.record(&research);
        info!(chars = research.text.len(), "received research result");

        progress.stage(Stage::Ideas);
        let ideas = self.call(&self.agents.ideas, &research.text).await?;
        usage.record(&ideas);
        info!(chars = ideas.text.len(), "received content ideas");

        progress.stage(Stage::FormatResearch);
        let research_blocks = self.format(&research.text, &mut usage).await?;
        info!(blocks = research_blocks.len(), "formatted research report");

        progress.stage(Stage::PublishResearch);
        let research_page = self
            .publish_page(topic, topic.research_title(), &research_blocks)
            .await;

        progress.stage(Stage::FormatIdeas);
        let ideas_blocks = self.format(&ideas.text, &mut usage).await?;
        info!(blocks = ideas_blocks.len(), "formatted content ideas");

        progress.stage(Stage::PublishIdeas);
        let ideas_page = self
            .publish_page(topic, topic.ideas_title(), &ideas_blocks)
            .await;

        let report = RunReport {
            topic: topic.clone(),
            research_page,
            ideas_page,
            tokens_in: usage.tokens_in,
            tokens_out: usage.tokens_out,
            elapsed: start.elapsed(),
        };

        progress.done(&report);

        info!(
            research_published = report.research_page.is_published(),
            ideas_published = report.ideas_page.is_published(),
            tokens_in = report.tokens_in,
            tokens_out = report.tokens_out,
            elapsed_ms = report.elapsed.as_millis(),
            "research run complete"
        );

        Ok(report)
    }

    async fn call(&self, agent: &Agent, input: &str) -> Result<AgentOutput> {
        self.runner.run(agent, input).await.inspect_err(|e| {
            warn!(agent = %agent.name, error = %e, "agent call failed, aborting run");
        })
    }

    /// Run the format agent and parse its output into blocks.
    async fn format(&self, text: &str, usage: &mut Usage) -> Result<BlockCollection> {
        let output = self.call(&self.agents.format, text).await?;
        usage.record(&output);
        BlockCollection::from_json(&output.text)
            .and_then(|blocks| {
                ensure_recognized(&blocks)?;
                Ok(blocks)
            })
            .inspect_err(|e| {
                warn!(error = %e, "format agent output rejected, aborting run");
            })
    }

    /// Convert and publish one page. Never fails the run.
    async fn publish_page(
        &self,
        topic: &ResearchTopic,
        title: String,
        blocks: &BlockCollection,
    ) -> PageStatus {
        let children = match topicdesk_blocks::convert(blocks) {
            Ok(children) => children,
            Err(e) => {
                warn!(%title, error = %e, "block conversion failed, skipping page");
                return PageStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let request = PublishRequest::new(&topic.destination_id, title, children);

        match self.publisher.publish(&request).await {
            Ok(PublishOutcome::Created { page_id, url }) => {
                info!(title = %request.title, %page_id, "page published");
                PageStatus::Published { page_id, url }
            }
            Ok(PublishOutcome::Rejected { status, body }) => {
                warn!(title = %request.title, status, %body, "page rejected by document API");
                PageStatus::Failed {
                    reason: format!("HTTP {status}: {body}"),
                }
            }
            Err(e) => {
                warn!(title = %request.title, error = %e, "page publish failed");
                PageStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// The format agent may only emit the block kinds its schema allows.
fn ensure_recognized(blocks: &BlockCollection) -> Result<()> {
    let unrecognized = blocks
        .blocks
        .iter()
        .enumerate()
        .find(|(_, block)| matches!(block.kind, BlockKind::Unrecognized(_)));

    match unrecognized {
        Some((index, block)) => Err(TopicDeskError::Agent(format!(
            "format agent returned unsupported block type '{}' at position {index}",
            block.kind
        ))),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
