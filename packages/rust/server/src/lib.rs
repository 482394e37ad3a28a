//! HTTP intake for research requests.
//!
//! `POST /process` accepts a database webhook event, validates it, schedules a
//! run on the [`RunQueue`] and answers `202 Accepted` without waiting for the
//! run. `GET /` is an authenticated liveness probe and `GET /health` an
//! unauthenticated one.

pub mod auth;
pub mod intake;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderName, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use topicdesk_core::{RunId, RunQueue};
use topicdesk_shared::{Result, Secret, TopicDeskError};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<RunQueue>,
    api_key_header: HeaderName,
    api_key_digest: Arc<Vec<u8>>,
}

impl AppState {
    pub fn new(queue: Arc<RunQueue>, api_key: &Secret, header: &str) -> Result<Self> {
        let api_key_header = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
            TopicDeskError::config(format!("invalid API key header name '{header}': {e}"))
        })?;

        Ok(Self {
            queue,
            api_key_header,
            api_key_digest: Arc::new(auth::digest(api_key.expose().as_bytes())),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(root))
        .route("/process", post(process))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C, then wait for in-flight runs.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TopicDeskError::Network(format!("failed to bind {addr}: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| TopicDeskError::Network(e.to_string()))?;

    info!(%local_addr, "topicdesk listening");

    let queue = Arc::clone(&state.queue);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TopicDeskError::Internal(format!("server error: {e}")))?;

    queue.drain().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown requested, no longer accepting requests");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Accepted {
    status: &'static str,
    message: String,
    run_id: RunId,
}

async fn process(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>)> {
    let topic = intake::parse_event(&body)?;
    let message = format!("Research started for topic: {}", topic.topic);

    info!(
        topic = %topic.topic,
        destination_id = %topic.destination_id,
        "research request accepted"
    );
    let handle = state.queue.submit(topic);

    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            status: "processing",
            message,
            run_id: handle.id,
        }),
    ))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "API is working" }))
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use topicdesk_core::testing::{RecordingPublisher, ScriptedRunner, pipeline_with};
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn app() -> (Router, Arc<RunQueue>, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline_with(Arc::new(ScriptedRunner::happy()), publisher.clone());
        let queue = Arc::new(RunQueue::new(Arc::new(pipeline)));
        let state = AppState::new(Arc::clone(&queue), &Secret::new(KEY), "x-api-key").unwrap();
        (router(state), queue, publisher)
    }

    fn post_process(key: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/process")
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const VALID: &str = r#"{"data":{"id":"abc123","properties":{"Title":{"title":[{"text":{"content":"Quantum Computing"}}]}}}}"#;

    #[tokio::test]
    async fn accepted_event_schedules_a_run() {
        let (app, queue, publisher) = app();

        let response = app.oneshot(post_process(Some(KEY), VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = json_body(response).await;
        assert_eq!(body["status"], "processing");
        assert_eq!(
            body["message"],
            "Research started for topic: Quantum Computing"
        );
        assert!(body["run_id"].is_string());

        queue.drain().await;
        assert_eq!(
            publisher.titles(),
            vec![
                "Research Report on Quantum Computing",
                "Content Ideas for Quantum Computing",
            ]
        );
    }

    #[tokio::test]
    async fn wrong_or_missing_key_is_forbidden() {
        for key in [Some("nope"), None] {
            let (app, queue, _) = app();
            let response = app.oneshot(post_process(key, VALID)).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(json_body(response).await["detail"], "Invalid API Key");
            assert_eq!(queue.in_flight(), 0);
        }
    }

    #[tokio::test]
    async fn invalid_event_is_a_bad_request() {
        let cases = [
            ("{}", "Invalid request: 'Title' property is required"),
            (
                r#"{"data":{"id":"abc","properties":{}}}"#,
                "Invalid request: 'Title' property is required",
            ),
            (
                r#"{"data":{"properties":{"Title":{"title":[{"text":{"content":"X"}}]}}}}"#,
                "Invalid request: 'Page ID' is required",
            ),
            (
                r#"{"data":{"id":"abc","properties":{"Title":{"title":[]}}}}"#,
                "Invalid request: 'Title' property is required",
            ),
        ];

        for (body, detail) in cases {
            let (app, queue, publisher) = app();
            let response = app.oneshot(post_process(Some(KEY), body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["detail"], detail);
            queue.drain().await;
            assert!(publisher.titles().is_empty());
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (app, _, _) = app();
        let response = app
            .oneshot(post_process(Some(KEY), "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("invalid event payload"));
    }

    #[tokio::test]
    async fn root_requires_key() {
        let (app, _, _) = app();
        let request = Request::builder()
            .uri("/")
            .header("x-api-key", KEY)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "API is working");

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _, _) = app();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[test]
    fn rejects_invalid_header_name() {
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline_with(Arc::new(ScriptedRunner::happy()), publisher);
        let queue = Arc::new(RunQueue::new(Arc::new(pipeline)));
        assert!(AppState::new(queue, &Secret::new(KEY), "bad header").is_err());
    }
}
