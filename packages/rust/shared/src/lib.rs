//! Shared types, error model, and configuration for topicdesk.
//!
//! This crate is the foundation depended on by all other topicdesk crates.
//! It provides:
//! - [`TopicDeskError`] — the unified error type
//! - Domain types ([`Block`], [`BlockCollection`], [`ResearchTopic`])
//! - Configuration ([`AppConfig`], [`Secrets`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AgentsConfig, AppConfig, NotionConfig, OpenAiConfig, Secret, Secrets, ServerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_secrets,
    resolve_secrets_with,
};
pub use error::{Result, TopicDeskError};
pub use types::{Block, BlockCollection, BlockKind, ResearchTopic};
