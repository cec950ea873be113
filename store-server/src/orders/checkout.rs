//! Checkout
//!
//! Builds the order aggregate from the live catalog: frozen item
//! snapshots (sale-window pricing), shipping requirement, totals
//! computed once, an order number from the atomic daily counter - then
//! persists the document and reserves stock. A reservation failure never
//! leaves a pending order behind: the already-created order is forced to
//! `cancelled` and the error surfaces to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use shared::models::{
    DigitalDelivery, Order, OrderItem, OrderPayment, OrderStatus, PaymentState, ShippingInfo,
    ShippingMethod,
};
use shared::util::now_millis;
use shared::{AppError, AppResult};

use crate::auth::Actor;
use crate::config::Config;
use crate::db::StoreStorage;
use crate::orders::money;
use crate::orders::state_machine::OrderStateMachine;
use crate::stock::StockLedger;

/// One requested line at checkout
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 9999))]
    pub quantity: u32,
}

/// Checkout request payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"), nested)]
    pub items: Vec<CheckoutItem>,
    pub shipping: Option<ShippingInfo>,
    pub currency: Option<String>,
}

pub struct CheckoutService {
    storage: StoreStorage,
    config: Arc<Config>,
}

impl CheckoutService {
    pub fn new(storage: StoreStorage, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    /// Build and persist an order, then reserve stock for it.
    pub fn checkout(&self, request: CheckoutRequest, actor: &Actor) -> AppResult<Order> {
        request
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let now = now_millis();
        let items = self.snapshot_items(&request.items, now)?;

        let has_digital_items = items.iter().any(|i| i.kind.grants_digital_access());
        let has_physical_items = items.iter().any(|i| i.kind.requires_stock());

        let shipping = if has_physical_items {
            Some(request.shipping.ok_or_else(|| {
                AppError::validation("Shipping details are required for physical items")
            })?)
        } else {
            None
        };

        let shipping_amount = match &shipping {
            Some(info) => match info.method {
                ShippingMethod::Standard => self.config.shipping_standard,
                ShippingMethod::Express => self.config.shipping_express,
            },
            None => Decimal::ZERO,
        };

        let totals = money::compute_totals(&items, self.config.tax_rate_percent, shipping_amount);
        let order_number = self.next_order_number()?;
        let currency = request
            .currency
            .unwrap_or_else(|| self.config.currency.clone());

        let mut order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number,
            user_id: actor.user_id.clone(),
            items_count: items.len() as u32,
            items,
            subtotal: totals.subtotal,
            tax_rate: self.config.tax_rate_percent,
            tax_amount: totals.tax_amount,
            shipping_amount: totals.shipping_amount,
            total_amount: totals.total_amount,
            status: OrderStatus::Pending,
            status_history: Vec::new(),
            payment: OrderPayment {
                method: None,
                amount: totals.total_amount,
                currency,
                status: PaymentState::Pending,
                transaction_id: None,
                paid_at: None,
            },
            shipping,
            has_digital_items,
            has_physical_items,
            stock_reserved: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        order.record_status(
            OrderStatus::Pending,
            Some("Order created".to_string()),
            &actor.user_id,
        );

        self.storage.save_order(&order)?;
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "Order created"
        );

        // Reserve stock immediately after the order document persists
        let ledger = StockLedger::new(self.storage.clone());
        let reason = format!("Reservation for order {}", order.order_number);
        if let Err(reserve_err) = ledger.reserve(&order.items, &reason, actor) {
            let sm = OrderStateMachine::new(self.storage.clone(), self.config.clone());
            if let Err(cancel_err) = sm.transition(
                &mut order,
                OrderStatus::Cancelled,
                Some("Failed to reserve stock".to_string()),
                actor,
            ) {
                error!(
                    order_id = %order.id,
                    error = %cancel_err,
                    "Failed to cancel order after reservation failure"
                );
            }
            return Err(reserve_err);
        }

        if order.has_physical_items {
            order.stock_reserved = true;
            self.storage.save_order(&order)?;
        }

        Ok(order)
    }

    /// Freeze the requested lines against the live catalog.
    ///
    /// Checked before any mutation: unknown or inactive products and
    /// obviously-insufficient stock fail the whole checkout here.
    fn snapshot_items(&self, lines: &[CheckoutItem], now: i64) -> AppResult<Vec<OrderItem>> {
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let product = self
                .storage
                .get_product(&line.product_id)?
                .ok_or_else(|| AppError::not_found(format!("Product {}", line.product_id)))?;

            if !product.is_active {
                return Err(AppError::validation(format!(
                    "Product {} is not available",
                    product.name
                )));
            }

            if product.kind.requires_stock() && product.stock < i64::from(line.quantity) {
                return Err(AppError::validation(format!(
                    "Insufficient stock for {}: requested {}, available {}",
                    product.name, line.quantity, product.stock
                )));
            }

            let digital = if product.kind.grants_digital_access() {
                let (limit, days) = product
                    .digital
                    .as_ref()
                    .map(|d| (d.download_limit, d.access_days))
                    .unwrap_or((None, None));
                Some(DigitalDelivery::pending(limit, days))
            } else {
                None
            };

            items.push(OrderItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                sku: product.sku.clone(),
                unit_price: product.effective_price(now),
                quantity: line.quantity,
                kind: product.kind,
                digital,
            });
        }

        Ok(items)
    }

    /// `SV-YYMMDD-NNNN` with an atomic per-day sequence
    fn next_order_number(&self) -> AppResult<String> {
        let day = chrono::Utc::now().format("%y%m%d").to_string();
        let seq = self.storage.next_daily_order_seq(&day)?;
        Ok(format!("SV-{day}-{seq:04}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use shared::models::{DigitalAsset, Product, ProductKind};

    fn test_actor() -> Actor {
        Actor::new("u-1", Role::Customer)
    }

    fn service(storage: &StoreStorage) -> CheckoutService {
        CheckoutService::new(storage.clone(), Arc::new(Config::from_env()))
    }

    fn save_product(storage: &StoreStorage, id: &str, price: Decimal, stock: i64, kind: ProductKind) {
        let product = Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sku: format!("SKU-{id}"),
            category: "c-1".to_string(),
            price,
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            stock,
            low_stock_threshold: 2,
            low_stock: false,
            kind,
            digital: kind.grants_digital_access().then(|| DigitalAsset {
                asset_key: format!("assets/{id}.pdf"),
                download_limit: Some(3),
                access_days: Some(30),
            }),
            is_active: true,
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        storage.save_product(&product).unwrap();
    }

    fn standard_shipping() -> ShippingInfo {
        ShippingInfo {
            recipient: "Pat Doe".to_string(),
            phone: None,
            address_line1: "1 School Lane".to_string(),
            address_line2: None,
            city: "Springfield".to_string(),
            method: ShippingMethod::Standard,
        }
    }

    fn request(items: Vec<(&str, u32)>, shipping: Option<ShippingInfo>) -> CheckoutRequest {
        CheckoutRequest {
            items: items
                .into_iter()
                .map(|(product_id, quantity)| CheckoutItem {
                    product_id: product_id.to_string(),
                    quantity,
                })
                .collect(),
            shipping,
            currency: None,
        }
    }

    #[test]
    fn test_checkout_physical_item_totals_and_reservation() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "p-1", Decimal::new(10000, 2), 10, ProductKind::Physical);

        let order = service(&storage)
            .checkout(request(vec![("p-1", 2)], Some(standard_shipping())), &test_actor())
            .unwrap();

        // 100.00 x 2 + 5% tax + 25.00 standard shipping
        assert_eq!(order.subtotal, Decimal::new(20000, 2));
        assert_eq!(order.tax_amount, Decimal::new(1000, 2));
        assert_eq!(order.shipping_amount, Decimal::new(2500, 2));
        assert_eq!(order.total_amount, Decimal::new(23500, 2));

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items_count, 1);
        assert_eq!(order.items_count as usize, order.items.len());
        assert!(order.has_physical_items);
        assert!(!order.has_digital_items);
        assert!(order.stock_reserved);
        assert_eq!(order.payment.amount, Decimal::new(23500, 2));
        assert!(order.order_number.starts_with("SV-"));

        // Stock reduced to 8
        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 8);

        // Persisted
        let stored = storage.get_order(&order.id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.stock_reserved);
    }

    #[test]
    fn test_checkout_digital_only_needs_no_shipping() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "d-1", Decimal::new(999, 2), 0, ProductKind::Digital);

        let order = service(&storage)
            .checkout(request(vec![("d-1", 1)], None), &test_actor())
            .unwrap();

        assert!(order.is_digital_only());
        assert!(order.shipping.is_none());
        assert_eq!(order.shipping_amount, Decimal::ZERO);
        assert!(!order.stock_reserved);

        let delivery = order.items[0].digital.as_ref().unwrap();
        assert_eq!(delivery.download_limit, Some(3));
        assert_eq!(delivery.access_days, Some(30));
    }

    #[test]
    fn test_checkout_physical_without_shipping_fails() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "p-1", Decimal::new(1000, 2), 5, ProductKind::Physical);

        let result = service(&storage).checkout(request(vec![("p-1", 1)], None), &test_actor());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_checkout_unknown_product_fails_before_any_order() {
        let storage = StoreStorage::open_in_memory().unwrap();

        let result = service(&storage).checkout(
            request(vec![("ghost", 1)], Some(standard_shipping())),
            &test_actor(),
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(storage.get_stats().unwrap().order_count, 0);
    }

    #[test]
    fn test_checkout_insufficient_stock_fails_before_any_order() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "p-1", Decimal::new(1000, 2), 1, ProductKind::Physical);

        let result = service(&storage).checkout(
            request(vec![("p-1", 5)], Some(standard_shipping())),
            &test_actor(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(storage.get_stats().unwrap().order_count, 0);
    }

    #[test]
    fn test_reservation_failure_cancels_order_and_restores_prefix() {
        let storage = StoreStorage::open_in_memory().unwrap();
        // Two lines of the same product pass the pre-check individually
        // but cannot both be reserved
        save_product(&storage, "p-1", Decimal::new(1000, 2), 4, ProductKind::Physical);

        let result = service(&storage).checkout(
            request(vec![("p-1", 3), ("p-1", 3)], Some(standard_shipping())),
            &test_actor(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Stock back to its pre-reservation value
        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 4);

        // The order exists, cancelled, with exactly one entry beyond creation
        let orders = storage.list_orders_for_user("u-1").unwrap();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.status_history.len(), 2);
        assert_eq!(
            order.status_history[1].note.as_deref(),
            Some("Failed to reserve stock")
        );
        assert!(!order.stock_reserved);
    }

    #[test]
    fn test_checkout_uses_sale_price_inside_window() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "d-1", Decimal::new(2000, 2), 0, ProductKind::Digital);
        let mut product = storage.get_product("d-1").unwrap().unwrap();
        product.sale_price = Some(Decimal::new(1500, 2));
        product.sale_starts_at = Some(0);
        product.sale_ends_at = Some(i64::MAX);
        storage.save_product(&product).unwrap();

        let order = service(&storage)
            .checkout(request(vec![("d-1", 1)], None), &test_actor())
            .unwrap();
        assert_eq!(order.items[0].unit_price, Decimal::new(1500, 2));
    }

    #[test]
    fn test_checkout_empty_items_rejected() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let result = service(&storage).checkout(request(vec![], None), &test_actor());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_order_numbers_increment_within_day() {
        let storage = StoreStorage::open_in_memory().unwrap();
        save_product(&storage, "d-1", Decimal::new(999, 2), 0, ProductKind::Digital);
        let service = service(&storage);

        let first = service
            .checkout(request(vec![("d-1", 1)], None), &test_actor())
            .unwrap();
        let second = service
            .checkout(request(vec![("d-1", 1)], None), &test_actor())
            .unwrap();

        let first_seq: u32 = first.order_number.rsplit('-').next().unwrap().parse().unwrap();
        let second_seq: u32 = second.order_number.rsplit('-').next().unwrap().parse().unwrap();
        assert_eq!(second_seq, first_seq + 1);
    }
}
