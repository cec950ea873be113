//! Digital download endpoint

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Download router
pub fn router() -> Router<ServerState> {
    Router::new().route("/downloads/{order_id}/{product_id}", get(handler::download))
}
