//! HTTP API: the relay endpoint plus health.

pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderName, HeaderValue};
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// CORS headers attached to every response.
pub fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS")),
        (ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type")),
    ]
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(chat::router(&state.config.api.path))
        .route("/health", get(health::health));

    for (name, value) in cors_headers() {
        app = app.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
