//! Download Handler
//!
//! Serves a digital item against its signed link: verifies the token,
//! enforces the download limit and access expiry, then counts the
//! download and returns the asset reference.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::delivery::DeliveryService;
use shared::models::DeliveryStatus;
use shared::util::now_millis;
use shared::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub order_id: String,
    pub product_id: String,
    pub asset_key: String,
    pub download_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_downloads: Option<u32>,
}

/// GET /downloads/{order_id}/{product_id}?token=...
pub async fn download(
    State(state): State<ServerState>,
    Path((order_id, product_id)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Json<DownloadResponse>> {
    let delivery_service = DeliveryService::new(state.config.clone());
    if !delivery_service.verify_token(&order_id, &product_id, &query.token) {
        return Err(AppError::forbidden("Invalid download token"));
    }

    let mut order = state
        .storage
        .get_order(&order_id)?
        .ok_or_else(|| AppError::not_found(format!("Order {order_id}")))?;

    let now = now_millis();
    {
        let item = order
            .item(&product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;
        let delivery = item
            .digital
            .as_ref()
            .ok_or_else(|| AppError::validation("Item has no digital delivery"))?;

        if delivery.delivery_status != DeliveryStatus::Delivered {
            return Err(AppError::business_rule("Item has not been delivered"));
        }
        if let Some(expiry) = delivery.access_expires_at
            && now > expiry
        {
            return Err(AppError::forbidden("Download access has expired"));
        }
        if let Some(limit) = delivery.download_limit
            && delivery.download_count >= limit
        {
            return Err(AppError::forbidden("Download limit reached"));
        }
    }

    // The snapshot does not carry the asset itself; resolve it live
    let product = state
        .storage
        .get_product(&product_id)?
        .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;
    let asset_key = product
        .digital
        .as_ref()
        .map(|d| d.asset_key.clone())
        .ok_or_else(|| AppError::internal("Product has no digital asset"))?;

    let (download_count, remaining_downloads) = {
        let item = order
            .item_mut(&product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;
        let delivery = item
            .digital
            .as_mut()
            .ok_or_else(|| AppError::validation("Item has no digital delivery"))?;
        delivery.download_count += 1;
        (
            delivery.download_count,
            delivery
                .download_limit
                .map(|limit| limit.saturating_sub(delivery.download_count)),
        )
    };
    state.storage.save_order(&order)?;

    Ok(Json(DownloadResponse {
        order_id,
        product_id,
        asset_key,
        download_count,
        remaining_downloads,
    }))
}
