//! Stock audit trail entries

use serde::{Deserialize, Serialize};

/// Kind of stock mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// Quantity added back (restoration, restock)
    Add,
    /// Quantity removed (reservation)
    Remove,
    /// Administrative absolute set
    Set,
}

/// Append-only audit entry recorded with every stock mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAuditEntry {
    pub product_id: String,
    pub action: StockAction,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: String,
    pub actor: String,
    pub timestamp: i64,
}
