//! Stock ledger operations
//!
//! Every mutation re-reads the product inside a single write
//! transaction, so check-then-decrement commits atomically per product.
//! Cross-product operations (multi-item reservation) still commit item
//! by item; a failed reservation compensates the already-reserved prefix
//! before surfacing the error, so partial reservation is never left
//! outstanding.

use shared::models::{OrderItem, Product, StockAction, StockAuditEntry};
use shared::util::now_millis;
use shared::{AppError, AppResult};
use tracing::{error, info};

use crate::auth::Actor;
use crate::db::StoreStorage;

pub struct StockLedger {
    storage: StoreStorage,
}

impl StockLedger {
    pub fn new(storage: StoreStorage) -> Self {
        Self { storage }
    }

    /// Reserve stock for every physical/both item of an order.
    ///
    /// Fails with a validation error when any product has less stock
    /// than requested; stock already taken for earlier items is restored
    /// before the error is returned.
    pub fn reserve(&self, items: &[OrderItem], reason: &str, actor: &Actor) -> AppResult<()> {
        let mut reserved: Vec<&OrderItem> = Vec::new();

        for item in items.iter().filter(|i| i.kind.requires_stock()) {
            match self.remove_stock(&item.product_id, i64::from(item.quantity), reason, actor) {
                Ok(_) => reserved.push(item),
                Err(e) => {
                    for done in &reserved {
                        if let Err(restore_err) = self.add_stock(
                            &done.product_id,
                            i64::from(done.quantity),
                            "Reservation rollback",
                            actor,
                        ) {
                            error!(
                                product_id = %done.product_id,
                                error = %restore_err,
                                "Failed to roll back partial reservation"
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Restore stock for every physical/both item of an order.
    ///
    /// Invoked from the cancellation side effect with the original order
    /// quantities.
    pub fn restore(&self, items: &[OrderItem], reason: &str, actor: &Actor) -> AppResult<()> {
        for item in items.iter().filter(|i| i.kind.requires_stock()) {
            self.add_stock(&item.product_id, i64::from(item.quantity), reason, actor)?;
        }
        Ok(())
    }

    /// Administrative absolute set, bypassing add/remove semantics.
    pub fn adjust(
        &self,
        product_id: &str,
        target_quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> AppResult<Product> {
        if target_quantity < 0 {
            return Err(AppError::validation("Stock quantity cannot be negative"));
        }

        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;

        let previous = product.stock;
        product.stock = target_quantity;
        product.recompute_low_stock();
        product.updated_at = now_millis();

        self.storage.append_stock_audit(
            &txn,
            &StockAuditEntry {
                product_id: product_id.to_string(),
                action: StockAction::Set,
                quantity: target_quantity,
                previous_stock: previous,
                new_stock: product.stock,
                reason: reason.to_string(),
                actor: actor.user_id.clone(),
                timestamp: now_millis(),
            },
        )?;
        self.storage.store_product(&txn, &product)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(
            product_id = %product_id,
            previous,
            new = product.stock,
            "Stock adjusted"
        );
        Ok(product)
    }

    /// Decrement stock by `quantity` within one write transaction.
    fn remove_stock(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> AppResult<Product> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;

        if product.stock < quantity {
            return Err(AppError::validation(format!(
                "Insufficient stock for {}: requested {}, available {}",
                product.name, quantity, product.stock
            )));
        }

        let previous = product.stock;
        product.stock -= quantity;
        product.recompute_low_stock();
        product.updated_at = now_millis();

        self.storage.append_stock_audit(
            &txn,
            &StockAuditEntry {
                product_id: product_id.to_string(),
                action: StockAction::Remove,
                quantity,
                previous_stock: previous,
                new_stock: product.stock,
                reason: reason.to_string(),
                actor: actor.user_id.clone(),
                timestamp: now_millis(),
            },
        )?;
        self.storage.store_product(&txn, &product)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        Ok(product)
    }

    /// Increment stock by `quantity` within one write transaction.
    fn add_stock(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> AppResult<Product> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, product_id)?
            .ok_or_else(|| AppError::not_found(format!("Product {product_id}")))?;

        let previous = product.stock;
        product.stock += quantity;
        product.recompute_low_stock();
        product.updated_at = now_millis();

        self.storage.append_stock_audit(
            &txn,
            &StockAuditEntry {
                product_id: product_id.to_string(),
                action: StockAction::Add,
                quantity,
                previous_stock: previous,
                new_stock: product.stock,
                reason: reason.to_string(),
                actor: actor.user_id.clone(),
                timestamp: now_millis(),
            },
        )?;
        self.storage.store_product(&txn, &product)?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use rust_decimal::Decimal;
    use shared::models::{ProductKind, StockAction};

    fn test_actor() -> Actor {
        Actor::new("u-1", Role::Customer)
    }

    fn create_product(storage: &StoreStorage, id: &str, stock: i64, kind: ProductKind) {
        let product = Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sku: format!("SKU-{id}"),
            category: "c-1".to_string(),
            price: Decimal::new(1000, 2),
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            stock,
            low_stock_threshold: 2,
            low_stock: false,
            kind,
            digital: None,
            is_active: true,
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        storage.save_product(&product).unwrap();
    }

    fn order_item(product_id: &str, quantity: u32, kind: ProductKind) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            name: format!("Item {product_id}"),
            sku: format!("SKU-{product_id}"),
            unit_price: Decimal::new(1000, 2),
            quantity,
            kind,
            digital: None,
        }
    }

    #[test]
    fn test_reserve_decrements_and_audits() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 10, ProductKind::Physical);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![order_item("p-1", 2, ProductKind::Physical)];
        ledger.reserve(&items, "Reservation for order SV-1", &test_actor()).unwrap();

        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 8);

        let trail = storage.list_stock_audit("p-1").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, StockAction::Remove);
        assert_eq!(trail[0].previous_stock, 10);
        assert_eq!(trail[0].new_stock, 8);
    }

    #[test]
    fn test_reserve_skips_digital_items() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "d-1", 0, ProductKind::Digital);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![order_item("d-1", 3, ProductKind::Digital)];
        ledger.reserve(&items, "Reservation", &test_actor()).unwrap();

        // Digital kinds never decrement stock
        let product = storage.get_product("d-1").unwrap().unwrap();
        assert_eq!(product.stock, 0);
        assert!(storage.list_stock_audit("d-1").unwrap().is_empty());
    }

    #[test]
    fn test_reserve_insufficient_stock_fails() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 1, ProductKind::Physical);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![order_item("p-1", 2, ProductKind::Physical)];
        let result = ledger.reserve(&items, "Reservation", &test_actor());

        assert!(matches!(result, Err(AppError::Validation(_))));
        let product = storage.get_product("p-1").unwrap().unwrap();
        assert_eq!(product.stock, 1);
    }

    #[test]
    fn test_partial_reservation_rolls_back_prefix() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 10, ProductKind::Physical);
        create_product(&storage, "p-2", 1, ProductKind::Physical);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![
            order_item("p-1", 3, ProductKind::Physical),
            order_item("p-2", 5, ProductKind::Physical),
        ];
        let result = ledger.reserve(&items, "Reservation", &test_actor());
        assert!(result.is_err());

        // p-1 was reserved first, then rolled back
        assert_eq!(storage.get_product("p-1").unwrap().unwrap().stock, 10);
        assert_eq!(storage.get_product("p-2").unwrap().unwrap().stock, 1);

        let trail = storage.list_stock_audit("p-1").unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, StockAction::Remove);
        assert_eq!(trail[1].action, StockAction::Add);
    }

    #[test]
    fn test_reserve_restore_round_trip() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 10, ProductKind::Physical);
        create_product(&storage, "p-2", 7, ProductKind::Both);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![
            order_item("p-1", 4, ProductKind::Physical),
            order_item("p-2", 2, ProductKind::Both),
        ];
        ledger.reserve(&items, "Reservation", &test_actor()).unwrap();
        assert_eq!(storage.get_product("p-1").unwrap().unwrap().stock, 6);
        assert_eq!(storage.get_product("p-2").unwrap().unwrap().stock, 5);

        ledger.restore(&items, "Order cancelled", &test_actor()).unwrap();
        assert_eq!(storage.get_product("p-1").unwrap().unwrap().stock, 10);
        assert_eq!(storage.get_product("p-2").unwrap().unwrap().stock, 7);
    }

    #[test]
    fn test_adjust_sets_absolute_quantity() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 10, ProductKind::Physical);
        let ledger = StockLedger::new(storage.clone());

        let product = ledger
            .adjust("p-1", 50, "Annual stocktake", &test_actor())
            .unwrap();
        assert_eq!(product.stock, 50);

        let trail = storage.list_stock_audit("p-1").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, StockAction::Set);
        assert_eq!(trail[0].previous_stock, 10);
        assert_eq!(trail[0].new_stock, 50);

        assert!(matches!(
            ledger.adjust("p-1", -1, "bad", &test_actor()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ledger.adjust("missing", 5, "x", &test_actor()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_low_stock_flag_recomputed() {
        let storage = StoreStorage::open_in_memory().unwrap();
        create_product(&storage, "p-1", 3, ProductKind::Physical);
        let ledger = StockLedger::new(storage.clone());

        let items = vec![order_item("p-1", 1, ProductKind::Physical)];
        ledger.reserve(&items, "Reservation", &test_actor()).unwrap();

        // 2 left, threshold 2 - advisory flag set, reservation still allowed
        let product = storage.get_product("p-1").unwrap().unwrap();
        assert!(product.low_stock);

        ledger.reserve(&items, "Reservation", &test_actor()).unwrap();
        assert_eq!(storage.get_product("p-1").unwrap().unwrap().stock, 1);
    }
}
