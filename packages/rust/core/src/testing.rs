//! Scripted collaborators for exercising the pipeline without network access.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use topicdesk_agents::{Agent, AgentOutput, AgentRole, AgentRunner, AgentSet};
use topicdesk_notion::{PagePublisher, PublishOutcome, PublishRequest};
use topicdesk_shared::{AgentsConfig, Result, TopicDeskError};

use crate::pipeline::Pipeline;

/// Build a pipeline with default agent definitions around the given fakes.
pub fn pipeline_with(
    runner: Arc<dyn AgentRunner>,
    publisher: Arc<dyn PagePublisher>,
) -> Pipeline {
    Pipeline::new(
        AgentSet::from_config(&AgentsConfig::default()),
        runner,
        publisher,
    )
}

const DEFAULT_BLOCKS: &str =
    r#"{"blocks":[{"type":"paragraph","text":"formatted","url":null}]}"#;

/// Agent runner answering from a script and recording every call.
pub struct ScriptedRunner {
    research: String,
    ideas: String,
    format_outputs: Mutex<VecDeque<String>>,
    failing: Option<AgentRole>,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(AgentRole, String)>>,
}

impl ScriptedRunner {
    /// Every agent succeeds; each call reports 10 tokens in and 5 out.
    pub fn happy() -> Self {
        Self {
            research: "research text".into(),
            ideas: "ideas text".into(),
            format_outputs: Mutex::new(VecDeque::new()),
            failing: None,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outputs for successive format calls; a default block list afterwards.
    pub fn format_outputs(self, outputs: Vec<String>) -> Self {
        *self.format_outputs.lock().unwrap() = outputs.into();
        self
    }

    /// Make every call for `role` fail.
    pub fn fail(mut self, role: AgentRole) -> Self {
        self.failing = Some(role);
        self
    }

    /// Hold the research call until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(AgentRole, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(&self, agent: &Agent, input: &str) -> Result<AgentOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((agent.role, input.to_string()));

        if agent.role == AgentRole::Research {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }

        if self.failing == Some(agent.role) {
            return Err(TopicDeskError::Agent(format!("{}: scripted failure", agent.name)));
        }

        let text = match agent.role {
            AgentRole::Research => self.research.clone(),
            AgentRole::Ideas => self.ideas.clone(),
            AgentRole::Format => self
                .format_outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| DEFAULT_BLOCKS.to_string()),
        };

        Ok(AgentOutput {
            text,
            model: agent.model.clone(),
            tokens_in: 10,
            tokens_out: 5,
            latency_ms: 0,
        })
    }
}

/// Publisher that records requests and answers per configuration.
#[derive(Default)]
pub struct RecordingPublisher {
    requests: Mutex<Vec<PublishRequest>>,
    rejected_titles: HashSet<String>,
    unreachable: bool,
}

impl RecordingPublisher {
    /// Answer HTTP 400 for pages with this title.
    pub fn reject_title(mut self, title: &str) -> Self {
        self.rejected_titles.insert(title.to_string());
        self
    }

    /// Fail every call with a network error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.title).collect()
    }
}

#[async_trait]
impl PagePublisher for RecordingPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if self.unreachable {
            return Err(TopicDeskError::Network("connection refused".into()));
        }
        if self.rejected_titles.contains(&request.title) {
            return Ok(PublishOutcome::Rejected {
                status: 400,
                body: r#"{"code":"validation_error"}"#.into(),
            });
        }

        Ok(PublishOutcome::Created {
            page_id: format!("page-{n}"),
            url: None,
        })
    }
}
