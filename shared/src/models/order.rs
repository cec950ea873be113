//! Order aggregate
//!
//! The order document owns its item snapshots and status history; totals
//! are computed once at checkout and never recomputed. Status mutation
//! happens only through the server's state machine, which validates
//! against [`OrderStatus::allowed_targets`] before touching the document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::product::ProductKind;
use crate::models::transaction::PaymentMethod;
use crate::util::now_millis;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    PaymentPending,
    PaymentFailed,
    Paid,
    ReadyForShipping,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Legal transition targets from this status.
    ///
    /// `cancelled` and `refunded` are terminal; `completed` may only move
    /// to `refunded`.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, PaymentPending, Cancelled],
            Processing => &[ReadyForShipping, Shipped, Completed, Cancelled],
            PaymentPending => &[Paid, PaymentFailed, Cancelled],
            PaymentFailed => &[PaymentPending, Cancelled],
            Paid => &[Processing, ReadyForShipping, Completed, Refunded],
            ReadyForShipping => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered => &[Completed, Refunded],
            Completed => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_targets().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::PaymentPending => "payment_pending",
            Self::PaymentFailed => "payment_failed",
            Self::Paid => "paid",
            Self::ReadyForShipping => "ready_for_shipping",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digital delivery state of an order item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

/// Access-granting sub-record attached to digital order items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalDelivery {
    pub delivery_status: DeliveryStatus,
    pub download_link: Option<String>,
    pub download_count: u32,
    /// Snapshot of the product's download limit at purchase time
    pub download_limit: Option<u32>,
    /// Snapshot of the product's access duration, applied at delivery
    pub access_days: Option<u32>,
    pub access_expires_at: Option<i64>,
}

impl DigitalDelivery {
    /// Fresh sub-record for a just-created order item
    pub fn pending(download_limit: Option<u32>, access_days: Option<u32>) -> Self {
        Self {
            delivery_status: DeliveryStatus::Pending,
            download_link: None,
            download_count: 0,
            download_limit,
            access_days,
            access_expires_at: None,
        }
    }

    /// True when another download is allowed at `now`
    pub fn can_download(&self, now: i64) -> bool {
        if self.delivery_status != DeliveryStatus::Delivered {
            return false;
        }
        if let Some(limit) = self.download_limit
            && self.download_count >= limit
        {
            return false;
        }
        self.access_expires_at.is_none_or(|expiry| now <= expiry)
    }
}

/// Frozen snapshot of a product at purchase time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub kind: ProductKind,
    /// Present iff the kind grants digital access
    pub digital: Option<DigitalDelivery>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Shipping method offered at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Standard,
    Express,
}

/// Shipping sub-record, required iff any item is physical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient: String,
    pub phone: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub method: ShippingMethod,
}

/// Payment sub-record state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Payment sub-record embedded in the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayment {
    pub method: Option<PaymentMethod>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentState,
    /// Active transaction reference
    pub transaction_id: Option<String>,
    pub paid_at: Option<i64>,
}

/// Append-only status history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
    pub note: Option<String>,
    pub actor: String,
}

/// Order entity
///
/// Never hard-deleted; it is a financial record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Storefront-visible number, `SV-YYMMDD-NNNN`
    pub order_number: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub items_count: u32,
    pub subtotal: Decimal,
    /// Tax rate in percent, frozen at checkout
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub payment: OrderPayment,
    pub shipping: Option<ShippingInfo>,
    pub has_digital_items: bool,
    pub has_physical_items: bool,
    /// Set once checkout reservation succeeds; cancellation restores
    /// stock only when this is set
    pub stock_reserved: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

impl Order {
    /// Append a history entry and move to `status`.
    ///
    /// Callers (the state machine) must have validated the transition;
    /// this method never checks the table.
    pub fn record_status(&mut self, status: OrderStatus, note: Option<String>, actor: &str) {
        let now = now_millis();
        self.status_history.push(StatusHistoryEntry {
            status,
            timestamp: now,
            note,
            actor: actor.to_string(),
        });
        self.status = status;
        self.updated_at = now;
    }

    pub fn is_digital_only(&self) -> bool {
        self.has_digital_items && !self.has_physical_items
    }

    /// Item lookup by product id
    pub fn item(&self, product_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn item_mut(&mut self, product_id: &str) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }
}
