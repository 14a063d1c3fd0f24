//! Storekeep Orders library.
//!
//! Order lifecycle, checkout workflow and order access policy.
//!
//! # Components
//!
//! - [`registry`] - Order states and the statuses that map onto them
//! - [`models`] - The `Order` aggregate, its products, line items and change log
//! - [`checkout`] - Checkout panes, the pane pipeline and submission gates
//! - [`access`] - Which actor may view, invoice, edit or delete an order
//! - [`payment`] - Payment method callback contract and built-in methods
//! - [`db`] - Order persistence (in-memory and `PostgreSQL`)
//! - [`services`] - Order operations that combine policy, payment and storage
//!
//! A checkout runs entirely in memory against one order until the final
//! submit, which is the only step that writes through the store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod payment;
pub mod registry;
pub mod services;
pub mod state;
pub mod telemetry;

pub use access::{AccessDecision, AccessPolicy, Actor, DeletionEligibilityCheck, Operation};
pub use error::OrderError;
pub use models::Order;
pub use registry::{OrderState, OrderStatus, StateId, StatusId, StatusRegistry};
