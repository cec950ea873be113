//! Payment API Module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Payment router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::initiate))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/manual-verification", post(handler::submit_manual_verification))
        .route("/{id}/verify", post(handler::admin_verify))
        .route("/{id}/refund", post(handler::refund))
}
