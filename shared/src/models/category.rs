//! Category Model

use serde::{Deserialize, Serialize};

/// Category entity
///
/// Categories are referenced by products; the order/payment core only
/// validates existence at product-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Parent category reference (None for top-level)
    pub parent: Option<String>,
    pub created_at: i64,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub parent: Option<String>,
}
