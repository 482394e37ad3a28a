//! Block-collection to Notion wire-format conversion.
//!
//! The format agent emits a [`BlockCollection`]; the document API wants a list
//! of typed child blocks. [`convert`] maps one to the other, preserving order.

mod wire;

use tracing::{debug, instrument, warn};

use topicdesk_shared::{BlockCollection, BlockKind, Result, TopicDeskError};

pub use wire::{
    LinkPreviewBody, MAX_RICH_TEXT_CHARS, RichText, RichTextBody, TextContent, WireBlock,
    WireContent,
};

/// Convert blocks into Notion child blocks.
///
/// - `paragraph` and `heading_2` carry their text as rich text.
/// - `link_preview` carries its url verbatim. A link preview without a url
///   (absent or empty) is dropped and logged.
/// - Any other kind fails the whole conversion with a validation error.
#[instrument(skip_all, fields(blocks = collection.len()))]
pub fn convert(collection: &BlockCollection) -> Result<Vec<WireBlock>> {
    let mut wire = Vec::with_capacity(collection.len());

    for (index, block) in collection.blocks.iter().enumerate() {
        match &block.kind {
            BlockKind::Paragraph => wire.push(WireBlock::paragraph(&block.text)),
            BlockKind::Heading => wire.push(WireBlock::heading_2(&block.text)),
            BlockKind::LinkPreview => match block.url.as_deref() {
                Some(url) if !url.is_empty() => wire.push(WireBlock::link_preview(url)),
                _ => {
                    warn!(index, text = %block.text, "dropping link_preview block without url");
                }
            },
            BlockKind::Unrecognized(name) => {
                return Err(TopicDeskError::validation(format!(
                    "unrecognized block type '{name}' at position {index}; expected one of {}",
                    BlockKind::RECOGNIZED.join(", ")
                )));
            }
        }
    }

    debug!(
        input = collection.len(),
        output = wire.len(),
        "block conversion complete"
    );

    Ok(wire)
}
