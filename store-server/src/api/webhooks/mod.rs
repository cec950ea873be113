//! Webhook ingress
//!
//! One endpoint per provider. The response is a success acknowledgment
//! no matter what happened internally - an error here would trigger
//! provider retry storms against records we already decided to drop.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Webhook router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/webhooks/{provider}", post(handler::receive))
}
