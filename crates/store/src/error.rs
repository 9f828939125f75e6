use thiserror::Error;

use common::{OrderId, ProductId};

/// Errors that can occur when interacting with the fulfillment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// One or more products lack the requested stock.
    ///
    /// Lists every insufficient product, not just the first one found.
    #[error("Insufficient stock for products: {}", format_products(.product_ids))]
    InsufficientStock { product_ids: Vec<ProductId> },

    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this ID already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

fn format_products(product_ids: &[ProductId]) -> String {
    product_ids
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
