//! redb-based storage layer
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalog documents |
//! | `categories` | `category_id` | `Category` | Category documents |
//! | `orders` | `order_id` | `Order` | Order aggregates |
//! | `transactions` | `transaction_id` | `Transaction` | Payment attempts |
//! | `provider_refs` | `(provider, reference)` | `transaction_id` | Webhook correlation index |
//! | `stock_audit` | `(product_id, sequence)` | `StockAuditEntry` | Append-only audit trail |
//! | `counters` | name | `u64` | Daily order sequence, audit sequence |
//!
//! Each commit covers a single document plus its indices; there are no
//! cross-aggregate transactions. A crash between an order save and a
//! stock commit can leave partially-applied state, which the services
//! compensate for explicitly (see the checkout reservation flow).

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{Category, Order, Product, StockAuditEntry, Transaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");
const CATEGORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
const TRANSACTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Secondary index: provider-assigned merchant reference -> transaction id
const PROVIDER_REFS_TABLE: TableDefinition<(&str, &str), &str> =
    TableDefinition::new("provider_refs");

/// Append-only stock audit trail, ordered per product by sequence
const STOCK_AUDIT_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("stock_audit");

/// Named counters (daily order sequence, stock audit sequence)
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const STOCK_AUDIT_SEQ_KEY: &str = "stock_audit_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::AppError {
    fn from(e: StorageError) -> Self {
        shared::AppError::database(e.to_string())
    }
}

/// Embedded document store backed by redb
#[derive(Clone)]
pub struct StoreStorage {
    db: Arc<Database>,
}

impl StoreStorage {
    /// Open or create the database at the given path.
    ///
    /// redb commits are durable as soon as `commit()` returns; the file
    /// is always in a consistent state after power loss.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(PROVIDER_REFS_TABLE)?;
            let _ = write_txn.open_table(STOCK_AUDIT_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Product Operations ==========

    /// Store a product (within transaction)
    pub fn store_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store a product in its own transaction
    pub fn save_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.store_product(&txn, product)?;
        txn.commit()?;
        Ok(())
    }

    /// Get a product by id
    pub fn get_product(&self, id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a product by id (within transaction)
    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        id: &str,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all products
    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            products.push(serde_json::from_slice(value.value())?);
        }
        Ok(products)
    }

    // ========== Category Operations ==========

    /// Store a category in its own transaction
    pub fn save_category(&self, category: &Category) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(CATEGORIES_TABLE)?;
            let value = serde_json::to_vec(category)?;
            table.insert(category.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get a category by id
    pub fn get_category(&self, id: &str) -> StorageResult<Option<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all categories
    pub fn list_categories(&self) -> StorageResult<Vec<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;

        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(serde_json::from_slice(value.value())?);
        }
        Ok(categories)
    }

    // ========== Order Operations ==========

    /// Store an order (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store an order in its own transaction
    pub fn save_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.store_order(&txn, order)?;
        txn.commit()?;
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all orders owned by a user, most recent first
    pub fn list_orders_for_user(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders: Vec<Order> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.user_id == user_id {
                orders.push(order);
            }
        }
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    // ========== Transaction Operations ==========

    /// Store a transaction (within transaction)
    pub fn store_transaction(
        &self,
        txn: &WriteTransaction,
        transaction: &Transaction,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
        let value = serde_json::to_vec(transaction)?;
        table.insert(transaction.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store a transaction in its own transaction
    pub fn save_transaction(&self, transaction: &Transaction) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.store_transaction(&txn, transaction)?;
        txn.commit()?;
        Ok(())
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: &str) -> StorageResult<Option<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all transactions for an order, oldest first
    pub fn list_transactions_for_order(&self, order_id: &str) -> StorageResult<Vec<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;

        let mut transactions: Vec<Transaction> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let transaction: Transaction = serde_json::from_slice(value.value())?;
            if transaction.order_id == order_id {
                transactions.push(transaction);
            }
        }
        transactions.sort_by_key(|t| t.created_at);
        Ok(transactions)
    }

    /// Index a provider-assigned merchant reference (within transaction)
    pub fn index_provider_ref(
        &self,
        txn: &WriteTransaction,
        provider: &str,
        reference: &str,
        transaction_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROVIDER_REFS_TABLE)?;
        table.insert((provider, reference), transaction_id)?;
        Ok(())
    }

    /// Resolve a provider merchant reference to a transaction id
    pub fn find_transaction_by_provider_ref(
        &self,
        provider: &str,
        reference: &str,
    ) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROVIDER_REFS_TABLE)?;
        Ok(table
            .get((provider, reference))?
            .map(|guard| guard.value().to_string()))
    }

    // ========== Stock Audit ==========

    /// Append a stock audit entry (within transaction, same commit as
    /// the stock mutation it records)
    pub fn append_stock_audit(
        &self,
        txn: &WriteTransaction,
        entry: &StockAuditEntry,
    ) -> StorageResult<()> {
        let seq = {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let current = counters
                .get(STOCK_AUDIT_SEQ_KEY)?
                .map(|g| g.value())
                .unwrap_or(0);
            let next = current + 1;
            counters.insert(STOCK_AUDIT_SEQ_KEY, next)?;
            next
        };

        let mut table = txn.open_table(STOCK_AUDIT_TABLE)?;
        let value = serde_json::to_vec(entry)?;
        table.insert((entry.product_id.as_str(), seq), value.as_slice())?;
        Ok(())
    }

    /// Get the audit trail for a product, oldest first
    pub fn list_stock_audit(&self, product_id: &str) -> StorageResult<Vec<StockAuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_AUDIT_TABLE)?;

        let mut entries = Vec::new();
        let range_start = (product_id, 0u64);
        let range_end = (product_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // ========== Counters ==========

    /// Atomically allocate the next order sequence number for a day
    /// bucket (`YYMMDD`). Returns the NEW count after increment.
    pub fn next_daily_order_seq(&self, day: &str) -> StorageResult<u64> {
        let key = format!("orders:{day}");
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let current = table.get(key.as_str())?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(key.as_str(), next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let products = read_txn.open_table(PRODUCTS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let transactions = read_txn.open_table(TRANSACTIONS_TABLE)?;
        let audit = read_txn.open_table(STOCK_AUDIT_TABLE)?;

        Ok(StorageStats {
            product_count: products.len()?,
            order_count: orders.len()?,
            transaction_count: transactions.len()?,
            stock_audit_count: audit.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub product_count: u64,
    pub order_count: u64,
    pub transaction_count: u64,
    pub stock_audit_count: u64,
}
