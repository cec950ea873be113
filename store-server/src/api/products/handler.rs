//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::Actor;
use crate::core::ServerState;
use crate::stock::StockLedger;
use shared::models::{Product, ProductCreate, StockAuditEntry};
use shared::util::now_millis;
use shared::{AppError, AppResult};

/// GET /api/products - list active products
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = state
        .storage
        .list_products()?
        .into_iter()
        .filter(|p| p.is_active)
        .collect();
    Ok(Json(products))
}

/// GET /api/products/{id} - get one product
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = state
        .storage
        .get_product(&id)?
        .ok_or_else(|| AppError::not_found(format!("Product {id}")))?;
    Ok(Json(product))
}

/// POST /api/products - create a product (elevated)
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    if !actor.is_elevated() {
        return Err(AppError::forbidden("Only staff may manage products"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    if payload.price < Decimal::ZERO {
        return Err(AppError::validation("Price must not be negative"));
    }
    if payload.kind.grants_digital_access() && payload.digital.is_none() {
        return Err(AppError::validation(
            "Digital products need digital asset details",
        ));
    }
    // Category must exist before a product can reference it
    if state.storage.get_category(&payload.category)?.is_none() {
        return Err(AppError::not_found(format!("Category {}", payload.category)));
    }

    let now = now_millis();
    let mut product = Product {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        sku: payload.sku,
        category: payload.category,
        price: payload.price,
        sale_price: payload.sale_price,
        sale_starts_at: payload.sale_starts_at,
        sale_ends_at: payload.sale_ends_at,
        stock: payload.stock.unwrap_or(0),
        low_stock_threshold: payload.low_stock_threshold.unwrap_or(5),
        low_stock: false,
        kind: payload.kind,
        digital: payload.digital,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    product.recompute_low_stock();
    state.storage.save_product(&product)?;
    Ok(Json(product))
}

/// Stock adjustment payload
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: i64,
    pub reason: String,
}

/// POST /api/products/{id}/stock - set absolute stock (elevated)
pub async fn adjust_stock(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<AdjustStockRequest>,
) -> AppResult<Json<Product>> {
    if !actor.is_elevated() {
        return Err(AppError::forbidden("Only staff may adjust stock"));
    }
    let ledger = StockLedger::new(state.storage.clone());
    let product = ledger.adjust(&id, payload.quantity, &payload.reason, &actor)?;
    Ok(Json(product))
}

/// GET /api/products/{id}/stock/audit - audit trail (elevated)
pub async fn stock_audit(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    actor: Actor,
) -> AppResult<Json<Vec<StockAuditEntry>>> {
    if !actor.is_elevated() {
        return Err(AppError::forbidden("Only staff may view the stock audit"));
    }
    let trail = state.storage.list_stock_audit(&id)?;
    Ok(Json(trail))
}
