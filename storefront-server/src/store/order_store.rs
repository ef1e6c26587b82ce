//! redb-based order document store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order documents |
//! | `tx_refs` | `transaction_ref` | `order_id` | Unique reconciliation index |
//!
//! Every issued transaction reference stays in `tx_refs`, including ones
//! later superseded by a re-initialized payment, so a late provider
//! confirmation can still be traced to its order and a reference can never
//! be handed out twice.
//!
//! # Atomicity
//!
//! Each read-modify-write runs inside a single redb write transaction.
//! redb serializes writers, so two concurrent updates of the same order
//! are applied one after the other, never interleaved.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use shared::models::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = transaction reference, value = order_id
const TX_REFS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tx_refs");

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
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

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    #[error("Transaction reference already issued: {0}")]
    DuplicateTransactionRef(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore").finish_non_exhaustive()
    }
}

impl OrderStore {
    /// Open or create the database at the given path
    ///
    /// Commits are durable as soon as `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and local tooling)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(TX_REFS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Reads ==========

    /// Get an order by ID
    pub fn get(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List orders newest first, optionally restricted to one owner
    pub fn list(&self, owner_id: Option<&str>) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if owner_id.is_none_or(|owner| order.is_owned_by(owner)) {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    /// Find the order a transaction reference was issued for
    pub fn find_by_tx_ref(&self, tx_ref: &str) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let refs = read_txn.open_table(TX_REFS_TABLE)?;
        let order_id = match refs.get(tx_ref)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of stored orders
    pub fn count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Writes ==========

    /// Insert a new order; fails if the ID is taken
    pub fn insert(&self, order: &Order) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ORDERS_TABLE)?;
            if table.get(order.id.as_str())?.is_some() {
                return Err(StoreError::DuplicateOrder(order.id.clone()));
            }
            write_order(&mut table, order)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Atomically read, modify and write back one order.
    ///
    /// The closure sees the current document. If it returns an error nothing
    /// is written; if it leaves the document unchanged the transaction is
    /// aborted and the stored order is returned as-is.
    pub fn update_with<F, E>(&self, order_id: &str, f: F) -> Result<Order, E>
    where
        F: FnOnce(&mut Order) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.modify(order_id, None, f)?
    }

    /// Like [`update_with`](Self::update_with), additionally registering
    /// `tx_ref` in the unique reference index in the same transaction.
    ///
    /// The closure is expected to point `payment_result` at `tx_ref`.
    pub fn attach_transaction_ref<F, E>(&self, order_id: &str, tx_ref: &str, f: F) -> Result<Order, E>
    where
        F: FnOnce(&mut Order) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.modify(order_id, Some(tx_ref), f)?
    }

    fn modify<F, E>(&self, order_id: &str, new_ref: Option<&str>, f: F) -> StoreResult<Result<Order, E>>
    where
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        let write_txn = self.db.begin_write()?;
        let (order, changed) = {
            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            let mut refs = write_txn.open_table(TX_REFS_TABLE)?;

            if let Some(tx_ref) = new_ref
                && refs.get(tx_ref)?.is_some()
            {
                return Err(StoreError::DuplicateTransactionRef(tx_ref.to_string()));
            }

            let original: Order = match orders.get(order_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StoreError::OrderNotFound(order_id.to_string())),
            };

            let mut order = original.clone();
            if let Err(e) = f(&mut order) {
                // Dropping the transaction aborts it
                return Ok(Err(e));
            }

            let changed = order != original;
            if changed {
                write_order(&mut orders, &order)?;
            }
            if let Some(tx_ref) = new_ref {
                refs.insert(tx_ref, order_id)?;
            }
            (order, changed || new_ref.is_some())
        };

        if changed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(Ok(order))
    }
}

fn write_order(table: &mut Table<'_, &'static str, &'static [u8]>, order: &Order) -> StoreResult<()> {
    let value = serde_json::to_vec(order)?;
    table.insert(order.id.as_str(), value.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        OrderItem, OrderOwner, OrderStatus, PaymentMethod, PaymentResult, PaymentStatus,
    };

    fn create_test_order(id: &str, owner: &str, created_at: i64) -> Order {
        Order {
            id: id.to_string(),
            owner: OrderOwner {
                id: owner.to_string(),
                name: "Abebe Kebede".to_string(),
                email: Some("abebe@example.com".to_string()),
                phone: None,
            },
            items: vec![OrderItem {
                product_ref: "p1".to_string(),
                name: "Coffee".to_string(),
                image: String::new(),
                unit_price: 100.0,
                quantity: 2,
            }],
            shipping_address: "Bole".to_string(),
            total_price: 205.0,
            delivery_fee: 5.0,
            currency: "ETB".to_string(),
            payment_method: PaymentMethod::Chapa,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            status: OrderStatus::Pending,
            driver: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = OrderStore::open_in_memory().unwrap();
        let order = create_test_order("o1", "u1", 1);
        store.insert(&order).unwrap();

        assert_eq!(store.get("o1").unwrap(), Some(order));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_duplicate_id_rejected() {
        let store = OrderStore::open_in_memory().unwrap();
        let order = create_test_order("o1", "u1", 1);
        store.insert(&order).unwrap();

        let err = store.insert(&order).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrder(id) if id == "o1"));
    }

    #[test]
    fn test_list_newest_first_and_scoped() {
        let store = OrderStore::open_in_memory().unwrap();
        store.insert(&create_test_order("a", "u1", 100)).unwrap();
        store.insert(&create_test_order("b", "u2", 300)).unwrap();
        store.insert(&create_test_order("c", "u1", 200)).unwrap();

        let all: Vec<String> = store.list(None).unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(all, vec!["b", "c", "a"]);

        let mine: Vec<String> = store
            .list(Some("u1"))
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, vec!["c", "a"]);
        assert!(store.list(Some("nobody")).unwrap().is_empty());
    }

    #[test]
    fn test_update_with_commits_changes() {
        let store = OrderStore::open_in_memory().unwrap();
        store.insert(&create_test_order("o1", "u1", 1)).unwrap();

        let updated = store
            .update_with::<_, StoreError>("o1", |order| {
                order.driver = Some("Dawit".to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.driver.as_deref(), Some("Dawit"));
        assert_eq!(
            store.get("o1").unwrap().unwrap().driver.as_deref(),
            Some("Dawit")
        );
    }

    #[test]
    fn test_update_with_error_writes_nothing() {
        let store = OrderStore::open_in_memory().unwrap();
        store.insert(&create_test_order("o1", "u1", 1)).unwrap();

        let result = store.update_with("o1", |order| {
            order.status = OrderStatus::Cancelled;
            Err(StoreError::OrderNotFound("rejected".into()))
        });
        assert!(result.is_err());
        assert_eq!(
            store.get("o1").unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_update_missing_order() {
        let store = OrderStore::open_in_memory().unwrap();
        let err = store
            .update_with::<_, StoreError>("ghost", |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_attach_transaction_ref_is_unique() {
        let store = OrderStore::open_in_memory().unwrap();
        store.insert(&create_test_order("o1", "u1", 1)).unwrap();
        store.insert(&create_test_order("o2", "u1", 2)).unwrap();

        store
            .attach_transaction_ref::<_, StoreError>("o1", "TX-1", |order| {
                order.payment_result = Some(PaymentResult::pending("TX-1", 5));
                Ok(())
            })
            .unwrap();

        let found = store.find_by_tx_ref("TX-1").unwrap().unwrap();
        assert_eq!(found.id, "o1");
        assert_eq!(found.payment_status(), Some(PaymentStatus::Pending));

        let err = store
            .attach_transaction_ref::<_, StoreError>("o2", "TX-1", |order| {
                order.payment_result = Some(PaymentResult::pending("TX-1", 6));
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTransactionRef(_)));
        assert!(store.get("o2").unwrap().unwrap().payment_result.is_none());
    }

    #[test]
    fn test_superseded_ref_still_resolves() {
        let store = OrderStore::open_in_memory().unwrap();
        store.insert(&create_test_order("o1", "u1", 1)).unwrap();

        for tx in ["TX-old", "TX-new"] {
            store
                .attach_transaction_ref::<_, StoreError>("o1", tx, |order| {
                    order.payment_result = Some(PaymentResult::pending(tx, 5));
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(store.find_by_tx_ref("TX-old").unwrap().unwrap().id, "o1");
        assert_eq!(
            store
                .find_by_tx_ref("TX-new")
                .unwrap()
                .unwrap()
                .transaction_ref(),
            Some("TX-new")
        );
        assert!(store.find_by_tx_ref("TX-never").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");

        {
            let store = OrderStore::open(&path).unwrap();
            store.insert(&create_test_order("o1", "u1", 1)).unwrap();
        }

        let store = OrderStore::open(&path).unwrap();
        assert!(store.get("o1").unwrap().is_some());
    }
}
