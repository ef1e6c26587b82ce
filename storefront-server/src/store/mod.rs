//! Persistence layer
//!
//! - [`OrderStore`] - embedded redb document store for orders

pub mod order_store;

pub use order_store::{OrderStore, StoreError, StoreResult};

use shared::error::{AppError, ErrorCode};

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => AppError::order_not_found(&id),
            StoreError::DuplicateOrder(id) => {
                AppError::with_message(ErrorCode::AlreadyExists, format!("Order {id} already exists"))
            }
            StoreError::DuplicateTransactionRef(tx_ref) => {
                AppError::new(ErrorCode::TransactionRefConflict).with_detail("tx_ref", tx_ref)
            }
            other => AppError::database(other.to_string()),
        }
    }
}
