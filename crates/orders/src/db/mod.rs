//! Order persistence.
//!
//! # Stores
//!
//! - [`MemoryOrderStore`] - In-process store with a read cache, used by tests
//!   and single-process tools
//! - `PgOrderStore` - `PostgreSQL` store (feature `postgres`)
//!
//! # Tables
//!
//! - `orders` - One row per order; addresses and extension data as JSONB
//! - `order_products` - Ordered products
//! - `order_line_items` - Subtotal, tax, shipping and other adjustments
//! - `order_comments` - Administrative comments
//! - `order_log` - Append-only change log
//!
//! # Migrations
//!
//! Migrations are stored in `crates/orders/migrations/` and run via:
//! ```bash
//! storekeep migrate
//! ```

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use storekeep_core::OrderId;
use thiserror::Error;

use crate::models::Order;

pub use memory::MemoryOrderStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgOrderStore, create_pool};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store refused or failed the write.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Persistence collaborator for orders.
///
/// `save` is all-or-nothing: the order row, its products, line items,
/// comments and new log entries are written together or not at all. On
/// failure the caller's order is left exactly as it was passed in.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load an order, possibly from a read cache.
    async fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Load an order straight from storage, bypassing any cache.
    async fn load_unchanged(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Save an order, assigning its id on first save. Returns the id.
    async fn save(&self, order: &mut Order) -> Result<OrderId, RepositoryError>;

    /// Delete an order and everything attached to it.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
}
