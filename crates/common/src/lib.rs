//! Shared domain types for the order fulfillment system.
//!
//! This crate holds the types every other crate agrees on: identifiers,
//! money, the order record, and the order status state machine. It has no
//! storage or transport concerns of its own.

pub mod money;
pub mod order;
pub mod status;
pub mod types;

pub use money::Money;
pub use order::{Order, OrderItem};
pub use status::{OrderStatus, OrderStatusParseError};
pub use types::{OrderId, ProductId, UserId};
