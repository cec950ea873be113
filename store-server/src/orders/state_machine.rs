//! Order state machine
//!
//! The only writer of an order's status. A transition validates against
//! the allowed-target table, appends the history entry, persists the
//! document, then runs the status side effects:
//!
//! - `paid`: marks the payment sub-record completed; a digital-only
//!   order immediately advances to `completed` with delivery links
//! - `cancelled`: restores reserved stock for physical items
//! - `refunded`: marks the payment sub-record refunded
//! - `completed`: stamps the completion timestamp
//!
//! Side effects run after the status has persisted; a side-effect
//! failure is logged and surfaced without reverting the status - the
//! audit trail stays authoritative even when downstream work partially
//! fails.

use std::sync::Arc;
use tracing::info;

use shared::models::{Order, OrderStatus, PaymentState};
use shared::util::now_millis;
use shared::{AppError, AppResult};

use crate::auth::Actor;
use crate::config::Config;
use crate::db::StoreStorage;
use crate::delivery::DeliveryService;
use crate::stock::StockLedger;

pub struct OrderStateMachine {
    storage: StoreStorage,
    config: Arc<Config>,
}

impl OrderStateMachine {
    pub fn new(storage: StoreStorage, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    /// Transition the order to `new_status`.
    ///
    /// Fails with a business-rule error naming both statuses when the
    /// transition is not in the table; the order is left unchanged.
    pub fn transition(
        &self,
        order: &mut Order,
        new_status: OrderStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<()> {
        if !order.status.can_transition_to(new_status) {
            return Err(AppError::business_rule(format!(
                "Invalid transition from {} to {}",
                order.status, new_status
            )));
        }

        let previous = order.status;
        order.record_status(new_status, note.clone(), &actor.user_id);
        self.storage.save_order(order)?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            from = %previous,
            to = %new_status,
            "Order status changed"
        );

        self.run_side_effects(order, previous, note, actor)
    }

    fn run_side_effects(
        &self,
        order: &mut Order,
        previous: OrderStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<()> {
        match order.status {
            OrderStatus::Paid => {
                order.payment.status = PaymentState::Completed;
                order.payment.paid_at = Some(now_millis());
                self.storage.save_order(order)?;

                if order.is_digital_only() {
                    let delivery = DeliveryService::new(self.config.clone());
                    delivery.deliver_digital_items(order);
                    self.storage.save_order(order)?;
                    self.transition(
                        order,
                        OrderStatus::Completed,
                        Some("Digital items delivered".to_string()),
                        actor,
                    )?;
                }
            }
            OrderStatus::Cancelled => {
                // Restore only stock this order actually holds; the
                // reservation-failure path cancels with nothing reserved
                if order.has_physical_items
                    && order.stock_reserved
                    && previous != OrderStatus::Completed
                {
                    let ledger = StockLedger::new(self.storage.clone());
                    let reason = note.unwrap_or_else(|| "Order cancelled".to_string());
                    ledger.restore(&order.items, &reason, actor)?;
                    order.stock_reserved = false;
                    self.storage.save_order(order)?;
                }
            }
            OrderStatus::Refunded => {
                order.payment.status = PaymentState::Refunded;
                self.storage.save_order(order)?;
            }
            OrderStatus::Completed => {
                order.completed_at = Some(now_millis());
                self.storage.save_order(order)?;
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use rust_decimal::Decimal;
    use shared::models::{
        DeliveryStatus, DigitalDelivery, OrderItem, OrderPayment, Product, ProductKind,
        ShippingInfo, ShippingMethod,
    };

    fn test_actor() -> Actor {
        Actor::new("u-1", Role::Customer)
    }

    fn admin_actor() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn machine(storage: &StoreStorage) -> OrderStateMachine {
        OrderStateMachine::new(storage.clone(), Arc::new(Config::from_env()))
    }

    fn physical_item(product_id: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: "Backpack".to_string(),
            sku: "BP-1".to_string(),
            unit_price: Decimal::new(4500, 2),
            quantity,
            kind: ProductKind::Physical,
            digital: None,
        }
    }

    fn digital_item(product_id: &str) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: "Exam Prep PDF".to_string(),
            sku: "PDF-1".to_string(),
            unit_price: Decimal::new(1500, 2),
            quantity: 1,
            kind: ProductKind::Digital,
            digital: Some(DigitalDelivery::pending(Some(5), Some(30))),
        }
    }

    fn base_order(id: &str, items: Vec<OrderItem>) -> Order {
        let has_digital_items = items.iter().any(|i| i.kind.grants_digital_access());
        let has_physical_items = items.iter().any(|i| i.kind.requires_stock());
        let items_count = items.len() as u32;
        Order {
            id: id.to_string(),
            order_number: format!("SV-250101-{id}"),
            user_id: "u-1".to_string(),
            items,
            items_count,
            subtotal: Decimal::new(10000, 2),
            tax_rate: Decimal::from(5),
            tax_amount: Decimal::new(500, 2),
            shipping_amount: Decimal::ZERO,
            total_amount: Decimal::new(10500, 2),
            status: OrderStatus::Pending,
            status_history: vec![],
            payment: OrderPayment {
                method: None,
                amount: Decimal::new(10500, 2),
                currency: "USD".to_string(),
                status: PaymentState::Pending,
                transaction_id: None,
                paid_at: None,
            },
            shipping: if has_physical_items {
                Some(ShippingInfo {
                    recipient: "Pat Doe".to_string(),
                    phone: None,
                    address_line1: "1 School Lane".to_string(),
                    address_line2: None,
                    city: "Springfield".to_string(),
                    method: ShippingMethod::Standard,
                })
            } else {
                None
            },
            has_digital_items,
            has_physical_items,
            stock_reserved: false,
            created_at: now_millis(),
            updated_at: now_millis(),
            completed_at: None,
        }
    }

    fn save_product(storage: &StoreStorage, id: &str, stock: i64) {
        let product = Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sku: format!("SKU-{id}"),
            category: "c-1".to_string(),
            price: Decimal::new(4500, 2),
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            stock,
            low_stock_threshold: 2,
            low_stock: false,
            kind: ProductKind::Physical,
            digital: None,
            is_active: true,
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        storage.save_product(&product).unwrap();
    }

    #[test]
    fn test_invalid_transition_rejected_and_order_unchanged() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        let mut order = base_order("o-1", vec![physical_item("p-1", 1)]);
        order.status = OrderStatus::Shipped;
        storage.save_order(&order).unwrap();

        let result = sm.transition(&mut order, OrderStatus::Processing, None, &admin_actor());
        assert!(matches!(result, Err(AppError::BusinessRule(_))));
        if let Err(AppError::BusinessRule(msg)) = result {
            assert!(msg.contains("shipped"));
            assert!(msg.contains("processing"));
        }

        // Untouched in memory and in the store
        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(order.status_history.is_empty());
        let stored = storage.get_order("o-1").unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
        assert!(stored.status_history.is_empty());
    }

    #[test]
    fn test_transition_appends_history_and_persists() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        let mut order = base_order("o-1", vec![physical_item("p-1", 1)]);
        storage.save_order(&order).unwrap();

        sm.transition(
            &mut order,
            OrderStatus::PaymentPending,
            Some("Payment initiated".to_string()),
            &test_actor(),
        )
        .unwrap();

        let stored = storage.get_order("o-1").unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::PaymentPending);
        assert_eq!(stored.status_history.len(), 1);
        assert_eq!(stored.status_history[0].status, OrderStatus::PaymentPending);
        assert_eq!(
            stored.status_history[0].note.as_deref(),
            Some("Payment initiated")
        );
        assert_eq!(stored.status_history[0].actor, "u-1");
    }

    #[test]
    fn test_paid_digital_only_auto_completes_with_links() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        let mut order = base_order("o-1", vec![digital_item("d-1")]);
        order.status = OrderStatus::PaymentPending;
        storage.save_order(&order).unwrap();

        sm.transition(&mut order, OrderStatus::Paid, None, &test_actor())
            .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.completed_at.is_some());
        assert_eq!(order.payment.status, PaymentState::Completed);
        assert!(order.payment.paid_at.is_some());

        let delivery = order.items[0].digital.as_ref().unwrap();
        assert_eq!(delivery.delivery_status, DeliveryStatus::Delivered);
        assert!(!delivery.download_link.as_deref().unwrap().is_empty());

        // History shows paid then completed
        let statuses: Vec<OrderStatus> =
            order.status_history.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Paid, OrderStatus::Completed]);
    }

    #[test]
    fn test_paid_with_physical_items_stays_paid() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        let mut order = base_order("o-1", vec![physical_item("p-1", 1), digital_item("d-1")]);
        order.status = OrderStatus::PaymentPending;
        storage.save_order(&order).unwrap();

        sm.transition(&mut order, OrderStatus::Paid, None, &test_actor())
            .unwrap();

        // Mixed orders wait for fulfilment; no auto-completion
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(
            order.items[1].digital.as_ref().unwrap().delivery_status,
            DeliveryStatus::Pending
        );
    }

    #[test]
    fn test_cancel_restores_reserved_stock() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);
        save_product(&storage, "p-1", 8); // 10 on hand, 2 reserved

        let mut order = base_order("o-1", vec![physical_item("p-1", 2)]);
        order.stock_reserved = true;
        storage.save_order(&order).unwrap();

        sm.transition(
            &mut order,
            OrderStatus::Cancelled,
            Some("Customer request".to_string()),
            &test_actor(),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(!order.stock_reserved);
        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 10);
    }

    #[test]
    fn test_cancel_without_reservation_skips_restore() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);
        save_product(&storage, "p-1", 8);

        let mut order = base_order("o-1", vec![physical_item("p-1", 2)]);
        // Reservation never succeeded (checkout failure path)
        order.stock_reserved = false;
        storage.save_order(&order).unwrap();

        sm.transition(
            &mut order,
            OrderStatus::Cancelled,
            Some("Failed to reserve stock".to_string()),
            &test_actor(),
        )
        .unwrap();

        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 8);
    }

    #[test]
    fn test_refunded_marks_payment() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        let mut order = base_order("o-1", vec![digital_item("d-1")]);
        order.status = OrderStatus::Delivered;
        order.payment.status = PaymentState::Completed;
        storage.save_order(&order).unwrap();

        sm.transition(
            &mut order,
            OrderStatus::Refunded,
            Some("Defective file".to_string()),
            &admin_actor(),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.payment.status, PaymentState::Refunded);
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        let storage = StoreStorage::open_in_memory().unwrap();
        let sm = machine(&storage);

        for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
            let mut order = base_order("o-1", vec![digital_item("d-1")]);
            order.status = terminal;
            storage.save_order(&order).unwrap();

            let result =
                sm.transition(&mut order, OrderStatus::Pending, None, &admin_actor());
            assert!(result.is_err());
            assert_eq!(order.status, terminal);
        }
    }
}
