//! Core domain types: content blocks and the research topic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicDeskError};

// ---------------------------------------------------------------------------
// BlockKind
// ---------------------------------------------------------------------------

/// Kind of a structured content block.
///
/// The recognized set is closed. Anything else is kept as
/// [`BlockKind::Unrecognized`] so the converter can reject it explicitly
/// instead of losing it during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Paragraph,
    /// Second-level heading. Other levels are not produced.
    Heading,
    LinkPreview,
    Unrecognized(String),
}

impl BlockKind {
    /// Wire name, as used by the format agent's schema.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading_2",
            Self::LinkPreview => "link_preview",
            Self::Unrecognized(name) => name,
        }
    }

    /// Names accepted by the format agent's output schema.
    pub const RECOGNIZED: [&'static str; 3] = ["paragraph", "heading_2", "link_preview"];
}

impl From<String> for BlockKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "paragraph" => Self::Paragraph,
            "heading_2" => Self::Heading,
            "link_preview" => Self::LinkPreview,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Block / BlockCollection
// ---------------------------------------------------------------------------

/// One structured content unit produced by the format agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            url: None,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading,
            text: text.into(),
            url: None,
        }
    }

    pub fn link_preview(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::LinkPreview,
            text: text.into(),
            url: Some(url.into()),
        }
    }
}

/// Ordered blocks for one document. Order is significant; no deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCollection {
    pub blocks: Vec<Block>,
}

impl BlockCollection {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Parse the format agent's JSON output (`{"blocks": [...]}`).
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            TopicDeskError::Agent(format!(
                "format agent returned invalid block JSON: {e} (got: {})",
                raw.chars().take(200).collect::<String>()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ResearchTopic
// ---------------------------------------------------------------------------

/// Topic plus destination for one pipeline run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchTopic {
    /// Topic exactly as it was extracted from the event.
    pub topic: String,
    /// Notion page under which the generated pages are created.
    pub destination_id: String,
}

impl ResearchTopic {
    /// Build a topic, rejecting blank values.
    pub fn new(topic: impl Into<String>, destination_id: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        let destination_id = destination_id.into();

        if destination_id.trim().is_empty() {
            return Err(TopicDeskError::validation(
                "Invalid request: 'Page ID' is required",
            ));
        }
        if topic.trim().is_empty() {
            return Err(TopicDeskError::validation(
                "Invalid request: 'Title' property is required",
            ));
        }

        Ok(Self {
            topic,
            destination_id,
        })
    }

    /// Title of the research report page.
    pub fn research_title(&self) -> String {
        format!("Research Report on {}", self.topic)
    }

    /// Title of the content ideas page.
    pub fn ideas_title(&self) -> String {
        format!("Content Ideas for {}", self.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_collection_parses_agent_output() {
        let raw = r#"{"blocks":[
            {"type":"heading_2","text":"Overview","url":null},
            {"type":"paragraph","text":"Tokio is a runtime.","url":null},
            {"type":"link_preview","text":"Docs","url":"https://tokio.rs"}
        ]}"#;
        let parsed = BlockCollection::from_json(raw).expect("parse");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.blocks[0].kind, BlockKind::Heading);
        assert_eq!(parsed.blocks[1].kind, BlockKind::Paragraph);
        assert_eq!(parsed.blocks[2].url.as_deref(), Some("https://tokio.rs"));
    }

    #[test]
    fn unknown_kind_survives_parsing() {
        let raw = r#"{"blocks":[{"type":"bulleted_list_item","text":"x"}]}"#;
        let parsed = BlockCollection::from_json(raw).expect("parse");
        assert_eq!(
            parsed.blocks[0].kind,
            BlockKind::Unrecognized("bulleted_list_item".into())
        );
    }

    #[test]
    fn malformed_output_is_an_agent_error() {
        let err = BlockCollection::from_json("Here are your blocks: ...").unwrap_err();
        assert!(matches!(err, TopicDeskError::Agent(_)));

        let err = BlockCollection::from_json(r#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, TopicDeskError::Agent(_)));
    }

    #[test]
    fn block_without_text_is_rejected() {
        let err = BlockCollection::from_json(r#"{"blocks":[{"type":"paragraph"}]}"#).unwrap_err();
        assert!(matches!(err, TopicDeskError::Agent(ref msg) if msg.contains("text")));
    }

    #[test]
    fn block_kind_roundtrips_through_string() {
        for name in BlockKind::RECOGNIZED {
            let kind = BlockKind::from(name.to_string());
            assert!(!matches!(kind, BlockKind::Unrecognized(_)));
            assert_eq!(String::from(kind), name);
        }
    }

    #[test]
    fn topic_titles() {
        let topic = ResearchTopic::new("Rust async runtimes", "abc123").expect("valid");
        assert_eq!(topic.research_title(), "Research Report on Rust async runtimes");
        assert_eq!(topic.ideas_title(), "Content Ideas for Rust async runtimes");
    }

    #[test]
    fn blank_topic_or_destination_rejected() {
        let err = ResearchTopic::new("   ", "abc123").unwrap_err();
        assert!(err.to_string().contains("Title"));

        let err = ResearchTopic::new("Rust", "").unwrap_err();
        assert!(err.to_string().contains("Page ID"));
    }
}
