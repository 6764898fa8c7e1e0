//! Webhook and health endpoints.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, handle_inbound};
use crate::payload::WebhookPayload;

/// Upper bound for one webhook call, video encoding included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Query of the subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook
///
/// Echoes the challenge when the mode is `subscribe` and the token matches.
async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> impl IntoResponse {
    let token_ok = !state.verify_token.is_empty() && query.verify_token.as_deref() == Some(state.verify_token.as_str());

    match (query.mode.as_deref(), query.challenge) {
        (Some("subscribe"), Some(challenge)) if token_ok => {
            tracing::info!("webhook verified");
            (StatusCode::OK, challenge)
        }
        _ => {
            tracing::warn!(mode = ?query.mode, "webhook verification rejected");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

/// POST /webhook
///
/// Unparseable bodies and calls without a message are acknowledged as ignored.
async fn receive(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: WebhookPayload = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "unparseable webhook body");
        WebhookPayload::default()
    });

    match payload.first_message() {
        Some(inbound) => {
            handle_inbound(&state, inbound).await;
            Json(json!({ "status": "ok" }))
        }
        None => Json(json!({ "status": "ignored" })),
    }
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Build the service router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
