//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::Actor;
use crate::core::ServerState;
use crate::orders::{CheckoutRequest, CheckoutService, OrderStateMachine};
use shared::models::{Order, OrderStatus};
use shared::{AppError, AppResult};

/// POST /api/orders - checkout
pub async fn checkout(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<Order>> {
    let service = CheckoutService::new(state.storage.clone(), state.config.clone());
    let order = service.checkout(payload, &actor)?;
    Ok(Json(order))
}

/// GET /api/orders - list the caller's orders
pub async fn list_mine(
    State(state): State<ServerState>,
    actor: Actor,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.storage.list_orders_for_user(&actor.user_id)?;
    Ok(Json(orders))
}

/// GET /api/orders/{id} - owner or elevated
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
) -> AppResult<Json<Order>> {
    let order = state
        .storage
        .get_order(&id)?
        .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;
    if !actor.can_access(&order.user_id) {
        return Err(AppError::forbidden("You do not own this order"));
    }
    Ok(Json(order))
}

/// Status update payload
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// POST /api/orders/{id}/status - fulfilment transitions (elevated)
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    if !actor.is_elevated() {
        return Err(AppError::forbidden("Only staff may update order status"));
    }

    let mut order = state
        .storage
        .get_order(&id)?
        .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;

    let sm = OrderStateMachine::new(state.storage.clone(), state.config.clone());
    sm.transition(&mut order, payload.status, payload.note, &actor)?;
    Ok(Json(order))
}

/// Cancellation payload
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /api/orders/{id}/cancel - owner or elevated
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<Order>> {
    let mut order = state
        .storage
        .get_order(&id)?
        .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;
    if !actor.can_access(&order.user_id) {
        return Err(AppError::forbidden("You do not own this order"));
    }

    let sm = OrderStateMachine::new(state.storage.clone(), state.config.clone());
    sm.transition(&mut order, OrderStatus::Cancelled, payload.reason, &actor)?;
    Ok(Json(order))
}
