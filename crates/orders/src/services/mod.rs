//! Business logic services.
//!
//! # Services
//!
//! - `orders` - Order creation, viewing, status changes, edits and deletion

pub mod orders;

pub use orders::{ADMIN_CREATED_COMMENT, OrderEdit, OrderService, OrderView};
