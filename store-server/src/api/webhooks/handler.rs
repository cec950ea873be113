//! Webhook Ingress Handler

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::core::ServerState;
use crate::payments::PaymentService;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /api/webhooks/{provider}
///
/// Always acknowledges. Internal failures are logged out-of-band; the
/// provider must never see them.
pub async fn receive(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<WebhookAck> {
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string());

    let service = PaymentService::new(state.storage.clone(), state.config.clone());
    if let Err(e) = service.record_webhook(&provider, payload, source_ip) {
        error!(
            provider = %provider,
            error = %e,
            "Webhook processing failed, acknowledging anyway"
        );
    }

    Json(WebhookAck { received: true })
}
