//! Orchestrator error types.

use thiserror::Error;

use common::{Money, ProductId};
use store::StoreError;

use crate::queue::QueueError;

/// Errors that can occur while creating an order.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// One or more products lack the requested stock. Raised before any
    /// write is performed.
    #[error("Insufficient inventory for products: {}", .product_ids.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", "))]
    InsufficientInventory { product_ids: Vec<ProductId> },

    /// The request had no items.
    #[error("Order has no items")]
    NoItems,

    /// An item carried a zero quantity.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// An item carried a negative unit price.
    #[error("Invalid unit price for product {product_id}: {price} (must not be negative)")]
    InvalidPrice { product_id: ProductId, price: Money },

    /// The same product appeared in more than one line item.
    #[error("Duplicate product in order: {product_id}")]
    DuplicateProduct { product_id: ProductId },

    /// The caller-supplied total does not match the sum of the items.
    #[error("Order total {supplied} does not match item sum {computed}")]
    TotalMismatch { supplied: Money, computed: Money },

    /// The store failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The processing task could not be enqueued.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock { product_ids } => {
                OrchestratorError::InsufficientInventory { product_ids }
            }
            other => OrchestratorError::Store(other),
        }
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
