//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product kind - governs stock handling and digital delivery
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Physical,
    Digital,
    Both,
}

impl ProductKind {
    /// Physical and hybrid products hold reservable stock
    pub fn requires_stock(&self) -> bool {
        matches!(self, Self::Physical | Self::Both)
    }

    /// Digital and hybrid products grant download access after payment
    pub fn grants_digital_access(&self) -> bool {
        matches!(self, Self::Digital | Self::Both)
    }
}

/// Digital access rules attached to digital/both products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalAsset {
    /// Storage key of the deliverable asset
    pub asset_key: String,
    /// Maximum downloads per purchase (None = unlimited)
    pub download_limit: Option<u32>,
    /// Access duration in days from delivery (None = unlimited)
    pub access_days: Option<u32>,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    /// Category reference, validated at creation
    pub category: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    /// Sale window (millis); open-ended when either bound is None
    pub sale_starts_at: Option<i64>,
    pub sale_ends_at: Option<i64>,
    /// On-hand quantity; meaningful only when the kind requires stock
    pub stock: i64,
    pub low_stock_threshold: i64,
    /// Advisory flag, recomputed after every stock mutation
    pub low_stock: bool,
    pub kind: ProductKind,
    pub digital: Option<DigitalAsset>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Unit price at `now`: the sale price when the sale window covers it
    pub fn effective_price(&self, now: i64) -> Decimal {
        if let Some(sale_price) = self.sale_price {
            let started = self.sale_starts_at.is_none_or(|t| now >= t);
            let not_ended = self.sale_ends_at.is_none_or(|t| now <= t);
            if started && not_ended {
                return sale_price;
            }
        }
        self.price
    }

    /// Recompute the advisory low-stock flag; never blocks reservation
    pub fn recompute_low_stock(&mut self) {
        self.low_stock = self.stock <= self.low_stock_threshold;
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub sale_starts_at: Option<i64>,
    pub sale_ends_at: Option<i64>,
    pub stock: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    pub kind: ProductKind,
    pub digital: Option<DigitalAsset>,
}
