//! Chat relay endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use relay_common::{ChatRequest, ChatResponse};

use crate::error::{Error, Result};
use crate::provider::ChatSession;
use crate::state::AppState;

/// Build the chat router, mounted at `path`.
pub fn router(path: &str) -> Router<Arc<AppState>> {
    Router::new().route(
        path,
        post(relay)
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

/// OPTIONS - CORS preflight. The body is never read.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// POST - relay the newest turn to the provider.
///
/// The body is taken as raw bytes so that malformed JSON goes through the
/// same error reply as every other failure.
async fn relay(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match relay_message(&state, &body).await {
        Ok(text) => (StatusCode::OK, Json(ChatResponse { response: text })).into_response(),
        Err(e) => {
            tracing::error!("Chat relay failed: {}", e);
            e.into_response_with(state.config.api.sharpen_status_codes)
        }
    }
}

async fn relay_message(state: &AppState, body: &[u8]) -> Result<String> {
    let request: ChatRequest = serde_json::from_slice(body)?;

    let provider_config = &state.config.provider;
    let api_key = provider_config.api_key().ok_or(Error::MissingCredential)?;

    let (history, last) = request
        .split_last()
        .ok_or_else(|| Error::BadRequest("contents must not be empty".to_string()))?;
    let message = last
        .first_text()
        .ok_or_else(|| Error::BadRequest("last content has no parts".to_string()))?;

    let session = ChatSession {
        api_key,
        model: &provider_config.model,
        history,
        generation_config: provider_config.generation_config(),
    };

    tracing::debug!(
        "Relaying message to {} model={} history_len={}",
        state.provider.provider_type(),
        session.model,
        history.len()
    );

    state.provider.send_message(&session, message).await
}
