//! Notion page publishing.
//!
//! Creates a child page under a destination page with a title and a list of
//! converted blocks. A non-200 answer is reported back as
//! [`PublishOutcome::Rejected`]; nothing is retried.

mod request;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use topicdesk_blocks::WireBlock;
use topicdesk_shared::{NotionConfig, Result, Secret, TopicDeskError};

pub use request::{AppendChildrenBody, CreatePageBody, PublishRequest};

/// Notion rejects create/append requests with more children than this.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

/// User-Agent string for Notion requests.
const USER_AGENT: &str = concat!("topicdesk/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// PublishOutcome
// ---------------------------------------------------------------------------

/// What the document API said about a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The page exists and every child block was accepted.
    Created {
        page_id: String,
        url: Option<String>,
    },
    /// The API refused the create (or a later append) call.
    Rejected { status: u16, body: String },
}

impl PublishOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Subset of the page object returned by `POST /pages`.
#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// PagePublisher
// ---------------------------------------------------------------------------

/// Anything that can turn a [`PublishRequest`] into a page.
#[async_trait]
pub trait PagePublisher: Send + Sync {
    /// Create the page. `Err` means the API could not be reached at all.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome>;
}

/// [`PagePublisher`] backed by the Notion REST API.
pub struct NotionPublisher {
    client: Client,
    api_base: String,
    version: String,
    token: Secret,
}

impl NotionPublisher {
    /// Build a publisher from config and the resolved integration token.
    pub fn new(config: &NotionConfig, token: Secret) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                TopicDeskError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.as_str().trim_end_matches('/').to_string(),
            version: config.version.clone(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    /// Send one request and hand back the status and raw body.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request
            .bearer_auth(self.token.expose())
            .header("Notion-Version", &self.version)
            .send()
            .await
            .map_err(|e| TopicDeskError::Network(format!("notion request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TopicDeskError::Network(format!("failed to read notion response: {e}")))?;

        Ok((status, body))
    }

    /// Append children beyond the first batch, in order.
    async fn append_children(
        &self,
        page_id: &str,
        children: &[WireBlock],
    ) -> Result<Option<PublishOutcome>> {
        let url = self.endpoint(&format!("blocks/{page_id}/children"));

        for (batch_no, batch) in children.chunks(MAX_CHILDREN_PER_REQUEST).enumerate() {
            let body = AppendChildrenBody { children: batch };
            let (status, text) = self.send(self.client.patch(&url).json(&body)).await?;

            if status != StatusCode::OK {
                warn!(
                    page_id,
                    batch = batch_no + 1,
                    status = status.as_u16(),
                    body = %text,
                    "failed to append children"
                );
                return Ok(Some(PublishOutcome::Rejected {
                    status: status.as_u16(),
                    body: text,
                }));
            }

            debug!(page_id, batch = batch_no + 1, blocks = batch.len(), "appended children");
        }

        Ok(None)
    }
}

#[async_trait]
impl PagePublisher for NotionPublisher {
    #[instrument(skip_all, fields(destination = %request.destination_id, title = %request.title))]
    async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let split = request.children.len().min(MAX_CHILDREN_PER_REQUEST);
        let (first, rest) = request.children.split_at(split);
        let body = CreatePageBody::new(&request.destination_id, &request.title, first);

        info!(children = request.children.len(), "creating page");
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload = serde_json::to_string(&body).unwrap_or_default();
            debug!(%payload, "page payload");
        }

        let (status, text) = self
            .send(self.client.post(self.endpoint("pages")).json(&body))
            .await?;

        info!(status = status.as_u16(), "page create response");

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), body = %text, "failed to create page");
            return Ok(PublishOutcome::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let created: CreatedPage = serde_json::from_str(&text).map_err(|e| {
            TopicDeskError::Publish {
                status: status.as_u16(),
                body: format!("unreadable page object: {e}"),
            }
        })?;

        if !rest.is_empty() {
            if let Some(rejected) = self.append_children(&created.id, rest).await? {
                return Ok(rejected);
            }
        }

        info!(page_id = %created.id, url = ?created.url, "page created");

        Ok(PublishOutcome::Created {
            page_id: created.id,
            url: created.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher_for(server: &MockServer) -> NotionPublisher {
        let config = NotionConfig {
            api_base: format!("{}/v1", server.uri()).parse().unwrap(),
            ..NotionConfig::default()
        };
        NotionPublisher::new(&config, Secret::new("secret_test_token")).unwrap()
    }

    fn request_with(children: usize) -> PublishRequest {
        PublishRequest::new(
            "abc123",
            "Research Report on Rust async runtimes",
            (0..children)
                .map(|i| WireBlock::paragraph(&format!("paragraph {i}")))
                .collect(),
        )
    }

    #[tokio::test]
    async fn creates_page_with_title_and_children() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(header("authorization", "Bearer secret_test_token"))
            .and(header("notion-version", "2022-06-28"))
            .and(body_partial_json(serde_json::json!({
                "parent": {"page_id": "abc123"},
                "properties": {"title": {"title": [
                    {"text": {"content": "Research Report on Rust async runtimes"}}
                ]}},
                "children": [{"object": "block", "type": "paragraph"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "page",
                "id": "page-1",
                "url": "https://www.notion.so/page-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = publisher_for(&server).publish(&request_with(1)).await.unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Created {
                page_id: "page-1".into(),
                url: Some("https://www.notion.so/page-1".into()),
            }
        );
    }

    #[tokio::test]
    async fn non_200_is_rejected_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"code":"validation_error","message":"bad parent"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = publisher_for(&server).publish(&request_with(2)).await.unwrap();
        match outcome {
            PublishOutcome::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad parent"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn created_status_other_than_200_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{}"))
            .mount(&server)
            .await;

        let outcome = publisher_for(&server).publish(&request_with(0)).await.unwrap();
        assert!(!outcome.is_created());
    }

    #[tokio::test]
    async fn oversized_page_appends_remaining_children() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "page-big"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/v1/blocks/page-big/children"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&server)
            .await;

        let outcome = publisher_for(&server)
            .publish(&request_with(250))
            .await
            .unwrap();
        assert!(outcome.is_created());

        let requests = server.received_requests().await.unwrap();
        let create: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(create["children"].as_array().unwrap().len(), 100);
        let last: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
        assert_eq!(last["children"].as_array().unwrap().len(), 50);
        assert_eq!(
            last["children"][49]["paragraph"]["rich_text"][0]["text"]["content"],
            "paragraph 249"
        );
    }

    #[tokio::test]
    async fn failed_append_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "page-big"
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/v1/blocks/page-big/children"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate_limited"))
            .mount(&server)
            .await;

        let outcome = publisher_for(&server)
            .publish(&request_with(120))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Rejected {
                status: 429,
                body: "rate_limited".into(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_error() {
        let config = NotionConfig {
            api_base: "http://127.0.0.1:9/v1".parse().unwrap(),
            timeout_secs: 2,
            ..NotionConfig::default()
        };
        let publisher = NotionPublisher::new(&config, Secret::new("t")).unwrap();
        let err = publisher.publish(&request_with(1)).await.unwrap_err();
        assert!(matches!(err, TopicDeskError::Network(_)));
    }
}
