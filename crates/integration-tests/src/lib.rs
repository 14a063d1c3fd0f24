//! Integration tests for Storekeep.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storekeep-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `status_registry` - Default status resolution and custom statuses
//! - `checkout_flow` - Pane processing, review, submission gates and saving
//! - `order_access` - View, invoice, update and delete decisions
//! - `order_service` - Administrative order operations over a store
//!
//! Every scenario runs against [`MemoryOrderStore`], so no database is
//! needed.

use std::sync::Arc;

use rust_decimal::Decimal;
use storekeep_core::UserId;
use storekeep_orders::checkout::{CheckoutInput, PaneInput};
use storekeep_orders::config::OrdersConfig;
use storekeep_orders::db::{MemoryOrderStore, OrderStore};
use storekeep_orders::models::OrderProduct;
use storekeep_orders::state::AppState;
use storekeep_orders::{Order, OrderError};

/// Wired application state over an in-memory store.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryOrderStore>,
}

impl TestContext {
    /// Built-in registry, payment methods and panes.
    ///
    /// # Errors
    ///
    /// Returns an error if the default wiring is rejected.
    pub fn new() -> Result<Self, OrderError> {
        Self::with_config(OrdersConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if `config` is rejected.
    pub fn with_config(config: OrdersConfig) -> Result<Self, OrderError> {
        let store = Arc::new(MemoryOrderStore::new());
        let state = AppState::new(config, Arc::clone(&store) as Arc<dyn OrderStore>)?;
        Ok(Self { state, store })
    }

    /// An unsaved checkout order holding one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout state has no statuses.
    pub fn cart_order(&self, customer: i32, price: Decimal, shippable: bool) -> Result<Order, OrderError> {
        let mut product = OrderProduct::new(100, "Pineapple", "PA-1", 1, price);
        product.shippable = shippable;
        self.state
            .orders()
            .start_checkout(UserId::new(customer), vec![product])
    }
}

/// A complete, valid US address form.
#[must_use]
pub fn address_input() -> PaneInput {
    PaneInput::new()
        .with("first_name", "Ada")
        .with("last_name", "Lovelace")
        .with("street1", "12 Analytical Way")
        .with("city", "Austin")
        .with("zone", "57")
        .with("country", "840")
        .with("postal_code", "73301")
        .with("phone", "555-0100")
}

/// Valid input for every built-in pane, paying by check.
#[must_use]
pub fn checkout_input(email: &str) -> CheckoutInput {
    CheckoutInput::new()
        .with("customer", PaneInput::new().with("email", email))
        .with("delivery", address_input())
        .with("billing", PaneInput::new().with("copy_address", "1"))
        .with("payment", PaneInput::new().with("payment_method", "check"))
        .with("comments", PaneInput::new().with("comments", "Leave at the door."))
}
