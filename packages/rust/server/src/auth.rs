//! Shared-secret check for inbound requests.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use tracing::warn;

use topicdesk_shared::{Result, TopicDeskError};

use crate::AppState;

pub(crate) fn digest(value: &[u8]) -> Vec<u8> {
    Sha256::digest(value).to_vec()
}

/// Reject the request with 403 unless the configured header carries the key.
///
/// Both sides are hashed first so the comparison runs over equal-length input.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let presented = request
        .headers()
        .get(&state.api_key_header)
        .map(|value| digest(value.as_bytes()));

    if presented.as_deref() != Some(state.api_key_digest.as_slice()) {
        warn!(
            path = %request.uri().path(),
            header_present = presented.is_some(),
            "rejected request with invalid API key"
        );
        return Err(TopicDeskError::Auth("Invalid API Key".into()));
    }

    Ok(next.run(request).await)
}
