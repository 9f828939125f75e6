//! Inventory records and the version type used for optimistic concurrency.

use serde::{Deserialize, Serialize};

use common::ProductId;

/// Version number of an inventory record.
///
/// Starts at 1 when a product is first stocked and increments by exactly 1
/// on every successful decrement. A failed decrement never changes it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StockVersion(i64);

impl StockVersion {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version a freshly stocked product starts at.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Default for StockVersion {
    fn default() -> Self {
        Self::first()
    }
}

impl std::fmt::Display for StockVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StockVersion {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<StockVersion> for i64 {
    fn from(version: StockVersion) -> Self {
        version.0
    }
}

/// A single product's stock level and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// The product this record tracks.
    pub product_id: ProductId,

    /// Units currently available. Never negative.
    pub quantity: u32,

    /// Current record version.
    pub version: StockVersion,
}

impl InventoryRecord {
    /// Creates a record for a freshly stocked product at version 1.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            version: StockVersion::first(),
        }
    }
}

/// A stock requirement checked during order creation.
#[derive(Debug, Clone)]
pub struct StockRequest {
    /// The product being requested.
    pub product_id: ProductId,

    /// Units the order needs.
    pub quantity: u32,
}

impl StockRequest {
    /// Creates a new stock request.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A conditional decrement applied during order processing.
#[derive(Debug, Clone)]
pub struct StockDecrement {
    /// The product to decrement.
    pub product_id: ProductId,

    /// The version the caller observed at order-creation time.
    pub expected_version: StockVersion,

    /// Units to take.
    pub quantity: u32,
}

impl StockDecrement {
    /// Creates a new conditional decrement.
    pub fn new(
        product_id: impl Into<ProductId>,
        expected_version: StockVersion,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            expected_version,
            quantity,
        }
    }
}
