//! Webhook server for Messenger
//!
//! Handles the subscription handshake and incoming event deliveries

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::{FacebookError, Result};
use crate::handler::FacebookHandler;
use crate::types::WebhookPayload;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub verify_token: String,
    pub handler: Arc<FacebookHandler>,
}

/// Query of the subscription handshake
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", get(verify).post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn index() -> &'static str {
    "Hello world, I am a chat bot"
}

/// Returns the challenge when mode and token match
pub fn verify_webhook(params: &VerifyParams, verify_token: &str) -> Result<String> {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = !verify_token.is_empty() && params.verify_token.as_deref() == Some(verify_token);

    if mode_ok && token_ok {
        info!("Webhook verified successfully");
        Ok(params.challenge.clone().unwrap_or_default())
    } else {
        error!("Failed validation. Make sure the validation tokens match.");
        Err(FacebookError::WebhookVerificationFailed)
    }
}

async fn verify(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<VerifyParams>,
) -> std::result::Result<String, StatusCode> {
    verify_webhook(&params, &state.verify_token).map_err(|_| StatusCode::FORBIDDEN)
}

/// Acknowledge at once; events are processed in the background
async fn receive(State(state): State<Arc<WebhookState>>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to parse webhook body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if !payload.is_page() {
        debug!("Ignoring webhook for object {:?}", payload.object);
        return StatusCode::OK;
    }

    let handler = Arc::clone(&state.handler);
    tokio::spawn(async move {
        handler.process_payload(&payload).await;
    });

    StatusCode::OK
}
