//! Application configuration for topicdesk.
//!
//! User config lives at `~/.topicdesk/topicdesk.toml`.
//! CLI flags override config file values, which override defaults.
//! The config file only ever names the environment variables that hold
//! secrets; the secrets themselves are resolved once at startup into
//! [`Secrets`] and handed to the components that need them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TopicDeskError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topicdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topicdesk";

// ---------------------------------------------------------------------------
// Config structs (matching topicdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Notion page-creation API settings.
    #[serde(default)]
    pub notion: NotionConfig,

    /// OpenAI Responses API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Per-agent model selection.
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the webhook server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Header carrying the shared-secret credential.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Name of the env var holding the shared secret.
    #[serde(default = "default_server_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key_header: default_api_key_header(),
            api_key_env: default_server_api_key_env(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".into()
}
fn default_api_key_header() -> String {
    "x-api-key".into()
}
fn default_server_api_key_env() -> String {
    "API_KEY".into()
}

/// `[notion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Base URL of the Notion REST API.
    #[serde(default = "default_notion_api_base")]
    pub api_base: Url,

    /// Value sent in the `Notion-Version` header.
    #[serde(default = "default_notion_version")]
    pub version: String,

    /// Name of the env var holding the integration token.
    #[serde(default = "default_notion_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_notion_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: default_notion_api_base(),
            version: default_notion_version(),
            token_env: default_notion_token_env(),
            timeout_secs: default_notion_timeout(),
        }
    }
}

fn default_notion_api_base() -> Url {
    Url::parse("https://api.notion.com/v1").expect("static URL is valid")
}
fn default_notion_version() -> String {
    "2022-06-28".into()
}
fn default_notion_token_env() -> String {
    "NOTION_API_KEY".into()
}
fn default_notion_timeout() -> u64 {
    60
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_openai_api_base")]
    pub api_base: Url,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds. Research with web search can be slow.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            api_key_env: default_openai_api_key_env(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

fn default_openai_api_base() -> Url {
    Url::parse("https://api.openai.com/v1").expect("static URL is valid")
}
fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_timeout() -> u64 {
    300
}

/// `[agents]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_research_model")]
    pub research_model: String,

    #[serde(default = "default_ideas_model")]
    pub ideas_model: String,

    #[serde(default = "default_format_model")]
    pub format_model: String,

    /// Give the research agent the hosted web-search tool.
    #[serde(default = "default_true")]
    pub web_search: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            research_model: default_research_model(),
            ideas_model: default_ideas_model(),
            format_model: default_format_model(),
            web_search: true,
        }
    }
}

fn default_research_model() -> String {
    "gpt-4.1".into()
}
fn default_ideas_model() -> String {
    "gpt-4.1".into()
}
fn default_format_model() -> String {
    "gpt-4o-mini".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Secrets (runtime, resolved once from the environment)
// ---------------------------------------------------------------------------

/// A credential that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Only call this at the point of use.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// All process-wide credentials, built once at startup.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Shared secret expected on inbound webhook requests.
    pub webhook_api_key: Secret,
    /// Notion integration token.
    pub notion_token: Secret,
    /// OpenAI API key.
    pub openai_api_key: Secret,
}

/// Resolve [`Secrets`] from the process environment.
pub fn resolve_secrets(config: &AppConfig) -> Result<Secrets> {
    resolve_secrets_with(config, |name| std::env::var(name).ok())
}

/// Resolve [`Secrets`] through an arbitrary lookup (used by tests).
pub fn resolve_secrets_with(
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Secrets> {
    let require = |var_name: &str, what: &str| -> Result<Secret> {
        match lookup(var_name) {
            Some(val) if !val.is_empty() => Ok(Secret::new(val)),
            _ => Err(TopicDeskError::config(format!(
                "{what} not found. Set the {var_name} environment variable."
            ))),
        }
    };

    Ok(Secrets {
        webhook_api_key: require(&config.server.api_key_env, "webhook API key")?,
        notion_token: require(&config.notion.token_env, "Notion token")?,
        openai_api_key: require(&config.openai.api_key_env, "OpenAI API key")?,
    })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topicdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicDeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topicdesk/topicdesk.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| TopicDeskError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TopicDeskError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicDeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicDeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicDeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
