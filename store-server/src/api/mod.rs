//! API routing
//!
//! # Structure
//!
//! - [`health`] - liveness and store statistics
//! - [`categories`] - category management
//! - [`products`] - catalog and stock administration
//! - [`orders`] - checkout and order lifecycle
//! - [`payments`] - payment initiation, verification, refunds
//! - [`webhooks`] - provider webhook ingress
//! - [`downloads`] - signed digital delivery downloads

pub mod categories;
pub mod downloads;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod webhooks;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(webhooks::router())
        .merge(downloads::router())
}

/// Build the fully configured application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // ========== Tower HTTP Middleware ==========
        // CORS - storefront and dashboard run on their own origins
        .layer(CorsLayer::permissive())
        // Compression - gzip responses
        .layer(CompressionLayer::new())
        // Trace - request tracing at INFO level
        .layer(TraceLayer::new_for_http())
        // Request ID - generate and propagate x-request-id
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}
