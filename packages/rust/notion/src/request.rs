//! Request bodies for page creation and block appends.

use serde::Serialize;

use topicdesk_blocks::{TextContent, WireBlock};

/// A page to create: destination, title, converted children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub destination_id: String,
    pub title: String,
    pub children: Vec<WireBlock>,
}

impl PublishRequest {
    pub fn new(
        destination_id: impl Into<String>,
        title: impl Into<String>,
        children: Vec<WireBlock>,
    ) -> Self {
        Self {
            destination_id: destination_id.into(),
            title: title.into(),
            children,
        }
    }
}

/// `POST /pages` body.
#[derive(Debug, Serialize)]
pub struct CreatePageBody<'a> {
    parent: Parent<'a>,
    properties: Properties,
    children: &'a [WireBlock],
}

impl<'a> CreatePageBody<'a> {
    pub fn new(page_id: &'a str, title: &str, children: &'a [WireBlock]) -> Self {
        Self {
            parent: Parent { page_id },
            properties: Properties {
                title: TitleProperty {
                    title: vec![TitleRun {
                        text: TextContent {
                            content: title.to_string(),
                        },
                    }],
                },
            },
            children,
        }
    }
}

#[derive(Debug, Serialize)]
struct Parent<'a> {
    page_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Properties {
    title: TitleProperty,
}

#[derive(Debug, Serialize)]
struct TitleProperty {
    title: Vec<TitleRun>,
}

#[derive(Debug, Serialize)]
struct TitleRun {
    text: TextContent,
}

/// `PATCH /blocks/{id}/children` body.
#[derive(Debug, Serialize)]
pub struct AppendChildrenBody<'a> {
    pub children: &'a [WireBlock],
}
