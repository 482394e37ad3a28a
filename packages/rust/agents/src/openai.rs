//! OpenAI Responses API runner.
//!
//! One agent call is one `POST /responses`: instructions as the system
//! prompt, the input text as the user turn, the hosted web-search tool when
//! the agent asks for it and a strict JSON-schema text format when the agent
//! has an output schema. The final output is the concatenated `output_text`
//! of the message items.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use topicdesk_shared::{OpenAiConfig, Result, Secret, TopicDeskError};

use crate::{Agent, AgentOutput, AgentRunner};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("topicdesk/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Tool {
    WebSearchPreview,
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: TextFormat<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TextFormat<'a> {
    JsonSchema {
        name: &'a str,
        schema: &'a serde_json::Value,
        strict: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    incomplete_details: Option<serde_json::Value>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(rename = "refusal")]
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// [`AgentRunner`] backed by the OpenAI Responses API.
pub struct OpenAiRunner {
    client: Client,
    endpoint: String,
    api_key: Secret,
}

impl OpenAiRunner {
    pub fn new(config: &OpenAiConfig, api_key: Secret) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                TopicDeskError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/responses",
                config.api_base.as_str().trim_end_matches('/')
            ),
            api_key,
        })
    }
}

#[async_trait]
impl AgentRunner for OpenAiRunner {
    #[instrument(skip_all, fields(agent = %agent.name, model = %agent.model))]
    async fn run(&self, agent: &Agent, input: &str) -> Result<AgentOutput> {
        let start = Instant::now();

        let request = ResponsesRequest {
            model: &agent.model,
            instructions: &agent.instructions,
            input,
            tools: if agent.web_search {
                vec![Tool::WebSearchPreview]
            } else {
                Vec::new()
            },
            text: agent.output_schema.as_ref().map(|schema| TextOptions {
                format: TextFormat::JsonSchema {
                    name: &schema.name,
                    schema: &schema.schema,
                    strict: true,
                },
            }),
        };

        debug!(input_len = input.len(), "calling agent");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| TopicDeskError::Agent(format!("{}: request failed: {e}", agent.name)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TopicDeskError::Agent(format!("{}: failed to read response: {e}", agent.name))
        })?;

        if !status.is_success() {
            return Err(TopicDeskError::Agent(format!(
                "{}: API error {status}: {}",
                agent.name,
                body.chars().take(500).collect::<String>()
            )));
        }

        let reply: ResponsesReply = serde_json::from_str(&body).map_err(|e| {
            TopicDeskError::Agent(format!("{}: invalid response JSON: {e}", agent.name))
        })?;

        let text = final_output(&agent.name, &reply)?;
        let usage = reply.usage.unwrap_or_default();
        let output = AgentOutput {
            text,
            model: reply.model.unwrap_or_else(|| agent.model.clone()),
            tokens_in: usage.input_tokens,
            tokens_out: usage.output_tokens,
            latency_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            tokens_in = output.tokens_in,
            tokens_out = output.tokens_out,
            latency_ms = output.latency_ms,
            output_len = output.text.len(),
            "agent finished"
        );

        Ok(output)
    }
}

/// Extract the final text from a reply, or explain why there is none.
fn final_output(agent: &str, reply: &ResponsesReply) -> Result<String> {
    if let Some(error) = &reply.error {
        return Err(TopicDeskError::Agent(format!(
            "{agent}: {} ({})",
            error.message,
            error.code.as_deref().unwrap_or("no code")
        )));
    }

    match reply.status.as_deref() {
        None | Some("completed") => {}
        Some(status) => {
            let detail = reply
                .incomplete_details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            return Err(TopicDeskError::Agent(format!(
                "{agent}: response status '{status}' {detail}"
            )));
        }
    }

    let mut text = String::new();
    for item in &reply.output {
        let OutputItem::Message { content } = item else {
            continue;
        };
        for part in content {
            match part {
                OutputContent::OutputText { text: chunk } => text.push_str(chunk),
                OutputContent::Refusal { refusal } => {
                    return Err(TopicDeskError::Agent(format!("{agent} refused: {refusal}")));
                }
                OutputContent::Other => {}
            }
        }
    }

    if text.trim().is_empty() {
        warn!(agent, "agent returned no text output");
        return Err(TopicDeskError::Agent(format!("{agent}: empty output")));
    }

    Ok(text)
}
