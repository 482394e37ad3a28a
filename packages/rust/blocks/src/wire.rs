//! Notion block JSON shapes.

use serde::Serialize;

/// Maximum characters in a single rich-text `text.content`.
pub const MAX_RICH_TEXT_CHARS: usize = 2000;

/// One child block in a page-creation or append request.
///
/// Serializes to `{"object": "block", "type": ..., <type>: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireBlock {
    object: &'static str,
    #[serde(flatten)]
    pub content: WireContent,
}

impl WireBlock {
    pub fn new(content: WireContent) -> Self {
        Self {
            object: "block",
            content,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new(WireContent::Paragraph {
            paragraph: RichTextBody::from_text(text),
        })
    }

    pub fn heading_2(text: &str) -> Self {
        Self::new(WireContent::Heading2 {
            heading_2: RichTextBody::from_text(text),
        })
    }

    pub fn link_preview(url: &str) -> Self {
        Self::new(WireContent::LinkPreview {
            link_preview: LinkPreviewBody {
                url: url.to_string(),
            },
        })
    }

    /// The `type` tag of this block.
    pub fn type_name(&self) -> &'static str {
        match self.content {
            WireContent::Paragraph { .. } => "paragraph",
            WireContent::Heading2 { .. } => "heading_2",
            WireContent::LinkPreview { .. } => "link_preview",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WireContent {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: RichTextBody },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextBody },
    #[serde(rename = "link_preview")]
    LinkPreview { link_preview: LinkPreviewBody },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichTextBody {
    pub rich_text: Vec<RichText>,
}

impl RichTextBody {
    /// Split `text` into runs no longer than [`MAX_RICH_TEXT_CHARS`].
    /// Empty text yields a single empty run.
    pub fn from_text(text: &str) -> Self {
        let mut rich_text = Vec::new();
        let mut chars = text.chars().peekable();

        loop {
            let chunk: String = chars.by_ref().take(MAX_RICH_TEXT_CHARS).collect();
            rich_text.push(RichText::text(chunk));
            if chars.peek().is_none() {
                break;
            }
        }

        Self { rich_text }
    }

    /// Concatenated plain text of all runs.
    pub fn plain_text(&self) -> String {
        self.rich_text
            .iter()
            .map(|run| match run {
                RichText::Text { text } => text.content.as_str(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichText {
    Text { text: TextContent },
}

impl RichText {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPreviewBody {
    pub url: String,
}
