//! Webhook payload parsing.
//!
//! The database automation posts the whole page object. Only the page id and
//! the first run of its `Title` property matter here; every other property is
//! ignored.

use serde::Deserialize;

use topicdesk_shared::{ResearchTopic, Result, TopicDeskError};

const TITLE_REQUIRED: &str = "Invalid request: 'Title' property is required";
const PAGE_ID_REQUIRED: &str = "Invalid request: 'Page ID' is required";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<EventProperties>,
}

#[derive(Debug, Deserialize)]
struct EventProperties {
    #[serde(rename = "Title")]
    title: Option<TitleProperty>,
}

#[derive(Debug, Deserialize)]
struct TitleProperty {
    #[serde(default)]
    title: Vec<TitleRun>,
}

#[derive(Debug, Deserialize)]
struct TitleRun {
    text: Option<TitleText>,
}

#[derive(Debug, Deserialize)]
struct TitleText {
    content: String,
}

/// Extract the research topic and destination page from a raw event body.
pub fn parse_event(body: &[u8]) -> Result<ResearchTopic> {
    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|e| TopicDeskError::validation(format!("invalid event payload: {e}")))?;

    let data = event
        .data
        .ok_or_else(|| TopicDeskError::validation(TITLE_REQUIRED))?;

    let title = data
        .properties
        .and_then(|properties| properties.title)
        .ok_or_else(|| TopicDeskError::validation(TITLE_REQUIRED))?;

    let page_id = data
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TopicDeskError::validation(PAGE_ID_REQUIRED))?;

    let topic = title
        .title
        .into_iter()
        .next()
        .and_then(|run| run.text)
        .map(|text| text.content)
        .unwrap_or_default();

    ResearchTopic::new(topic, page_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<ResearchTopic>) -> String {
        match result {
            Err(TopicDeskError::Validation { message }) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn extracts_topic_and_page_id() {
        let body = br#"{
            "data": {
                "id": "abc123",
                "properties": {
                    "Title": {"title": [{"text": {"content": "Quantum Computing"}}]},
                    "Status": {"select": {"name": "New"}}
                }
            }
        }"#;
        let topic = parse_event(body).unwrap();
        assert_eq!(topic.topic, "Quantum Computing");
        assert_eq!(topic.destination_id, "abc123");
    }

    #[test]
    fn topic_is_taken_verbatim() {
        let body = br#"{"data":{"id":"p1","properties":{"Title":{"title":[
            {"text":{"content":"  Rust & WASM  "}},
            {"text":{"content":" ignored"}}
        ]}}}}"#;
        assert_eq!(parse_event(body).unwrap().topic, "  Rust & WASM  ");
    }

    #[test]
    fn missing_title_property() {
        let body = br#"{"data":{"id":"abc123","properties":{}}}"#;
        assert_eq!(message(parse_event(body)), TITLE_REQUIRED);
    }

    #[test]
    fn title_is_checked_before_page_id() {
        let body = br#"{"data":{"properties":{}}}"#;
        assert_eq!(message(parse_event(body)), TITLE_REQUIRED);
    }

    #[test]
    fn missing_or_empty_page_id() {
        let body = br#"{"data":{"properties":{"Title":{"title":[{"text":{"content":"X"}}]}}}}"#;
        assert_eq!(message(parse_event(body)), PAGE_ID_REQUIRED);

        let body = br#"{"data":{"id":"","properties":{"Title":{"title":[{"text":{"content":"X"}}]}}}}"#;
        assert_eq!(message(parse_event(body)), PAGE_ID_REQUIRED);
    }

    #[test]
    fn empty_title_array_or_blank_topic() {
        let body = br#"{"data":{"id":"abc","properties":{"Title":{"title":[]}}}}"#;
        assert_eq!(message(parse_event(body)), TITLE_REQUIRED);

        let body = br#"{"data":{"id":"abc","properties":{"Title":{"title":[{"text":{"content":"   "}}]}}}}"#;
        assert_eq!(message(parse_event(body)), TITLE_REQUIRED);
    }

    #[test]
    fn absent_or_null_levels_mean_missing_title() {
        let bodies: [&[u8]; 6] = [
            br#"{}"#,
            br#"{"page":{}}"#,
            br#"{"data":null}"#,
            br#"{"data":{"id":"a"}}"#,
            br#"{"data":{"id":"a","properties":null}}"#,
            br#"{"data":{"id":"a","properties":{"Title":null}}}"#,
        ];
        for body in bodies {
            assert_eq!(message(parse_event(body)), TITLE_REQUIRED);
        }
    }

    #[test]
    fn malformed_body() {
        assert!(message(parse_event(b"not json")).starts_with("invalid event payload"));
        assert!(message(parse_event(br#"{"data":"abc123"}"#)).starts_with("invalid event payload"));
    }
}
