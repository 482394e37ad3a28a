//! Language-model agents used by the research pipeline.
//!
//! An [`Agent`] is a named bundle of instructions, model and tool settings.
//! An [`AgentRunner`] executes one agent on one text input and returns its
//! final output. [`OpenAiRunner`] is the production runner.

mod openai;
mod prompts;

use async_trait::async_trait;
use serde_json::json;

use topicdesk_shared::{AgentsConfig, BlockKind, Result};

pub use openai::OpenAiRunner;

// ---------------------------------------------------------------------------
// Agent definitions
// ---------------------------------------------------------------------------

/// Which pipeline role an agent plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Research,
    Ideas,
    Format,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Ideas => "ideas",
            Self::Format => "format",
        }
    }
}

/// Structured-output contract for an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// One agent identity.
#[derive(Debug, Clone)]
pub struct Agent {
    pub role: AgentRole,
    pub name: String,
    pub instructions: String,
    pub model: String,
    /// Enable the hosted web-search tool.
    pub web_search: bool,
    /// When set, the agent must answer with JSON matching this schema.
    pub output_schema: Option<OutputSchema>,
}

/// The three agents a run needs.
#[derive(Debug, Clone)]
pub struct AgentSet {
    pub research: Agent,
    pub ideas: Agent,
    pub format: Agent,
}

impl AgentSet {
    pub fn from_config(config: &AgentsConfig) -> Self {
        Self {
            research: Agent {
                role: AgentRole::Research,
                name: "Research Agent".into(),
                instructions: prompts::RESEARCH.into(),
                model: config.research_model.clone(),
                web_search: config.web_search,
                output_schema: None,
            },
            ideas: Agent {
                role: AgentRole::Ideas,
                name: "Content Ideas Agent".into(),
                instructions: prompts::IDEAS.into(),
                model: config.ideas_model.clone(),
                web_search: false,
                output_schema: None,
            },
            format: Agent {
                role: AgentRole::Format,
                name: "Text to JSON Content Formatter".into(),
                instructions: prompts::FORMAT.into(),
                model: config.format_model.clone(),
                web_search: false,
                output_schema: Some(block_schema()),
            },
        }
    }
}

/// Strict JSON schema for the format agent's `{"blocks": [...]}` output.
pub fn block_schema() -> OutputSchema {
    OutputSchema {
        name: "notion_blocks".into(),
        schema: json!({
            "type": "object",
            "properties": {
                "blocks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": { "type": "string", "enum": BlockKind::RECOGNIZED },
                            "text": { "type": "string" },
                            "url": { "type": ["string", "null"] }
                        },
                        "required": ["type", "text", "url"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["blocks"],
            "additionalProperties": false
        }),
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Final output of one agent call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

/// Executes agents. Implementations must not retry on their own.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, agent: &Agent, input: &str) -> Result<AgentOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_set_follows_config() {
        let config = AgentsConfig {
            research_model: "gpt-research".into(),
            web_search: false,
            ..AgentsConfig::default()
        };
        let agents = AgentSet::from_config(&config);
        assert_eq!(agents.research.model, "gpt-research");
        assert!(!agents.research.web_search);
        assert_eq!(agents.format.model, "gpt-4o-mini");
        assert!(agents.research.output_schema.is_none());
        assert!(agents.format.output_schema.is_some());
    }

    #[test]
    fn block_schema_is_strict() {
        let schema = block_schema().schema;
        let item = &schema["properties"]["blocks"]["items"];
        assert_eq!(item["additionalProperties"], false);
        assert_eq!(
            item["properties"]["type"]["enum"],
            json!(["paragraph", "heading_2", "link_preview"])
        );
        assert_eq!(item["required"], json!(["type", "text", "url"]));
    }
}
