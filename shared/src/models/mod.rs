//! Domain models
//!
//! Plain serde documents persisted by the server's storage layer. Models
//! hold data and pure invariant helpers; every mutation of an aggregate
//! goes through the server's services.

pub mod category;
pub mod order;
pub mod product;
pub mod stock;
pub mod transaction;

pub use category::{Category, CategoryCreate};
pub use order::{
    DeliveryStatus, DigitalDelivery, Order, OrderItem, OrderPayment, OrderStatus, PaymentState,
    ShippingInfo, ShippingMethod, StatusHistoryEntry,
};
pub use product::{DigitalAsset, Product, ProductCreate, ProductKind};
pub use stock::{StockAction, StockAuditEntry};
pub use transaction::{
    PaymentMethod, ProviderDetails, Refund, RefundStatus, Transaction, TransactionStatus,
    TransactionStatusEntry, WebhookLogEntry,
};
