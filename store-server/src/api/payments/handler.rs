//! Payment API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::Actor;
use crate::core::ServerState;
use crate::payments::{
    ManualVerificationRequest, PaymentInitRequest, PaymentInstructions, PaymentService,
};
use shared::models::Transaction;
use shared::{AppError, AppResult};

fn service(state: &ServerState) -> PaymentService {
    PaymentService::new(state.storage.clone(), state.config.clone())
}

/// POST /api/payments - initiate a payment attempt
pub async fn initiate(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<PaymentInitRequest>,
) -> AppResult<Json<PaymentInstructions>> {
    let instructions = service(&state).initiate(payload, &actor).await?;
    Ok(Json(instructions))
}

/// GET /api/payments/{id} - owner or elevated
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
) -> AppResult<Json<Transaction>> {
    let transaction = state
        .storage
        .get_transaction(&id)?
        .ok_or_else(|| AppError::not_found(format!("Transaction {id}")))?;
    if !actor.can_access(&transaction.user_id) {
        return Err(AppError::forbidden("You do not own this transaction"));
    }
    Ok(Json(transaction))
}

/// POST /api/payments/{id}/manual-verification - submit transfer proof
pub async fn submit_manual_verification(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<ManualVerificationRequest>,
) -> AppResult<Json<Transaction>> {
    let transaction = service(&state).submit_manual_verification(&id, payload, &actor)?;
    Ok(Json(transaction))
}

/// Admin verification decision payload
#[derive(Debug, Deserialize)]
pub struct AdminVerifyRequest {
    pub approved: bool,
    pub note: Option<String>,
}

/// POST /api/payments/{id}/verify - approve or reject (elevated)
pub async fn admin_verify(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<AdminVerifyRequest>,
) -> AppResult<Json<Transaction>> {
    let transaction =
        service(&state).admin_verify(&id, payload.approved, payload.note, &actor)?;
    Ok(Json(transaction))
}

/// Refund payload
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: Decimal,
    pub reason: String,
}

/// POST /api/payments/{id}/refund - record a refund (elevated)
pub async fn refund(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<Transaction>> {
    let transaction = service(&state).refund(&id, payload.amount, payload.reason, &actor)?;
    Ok(Json(transaction))
}
