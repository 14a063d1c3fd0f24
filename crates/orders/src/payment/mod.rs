//! Payment methods.
//!
//! A payment method plugs into checkout and into order administration
//! through a fixed set of callbacks. Every callback has a no-op default, so a
//! method implements only the ones it cares about and callers never need to
//! ask whether a callback exists.
//!
//! # Built-in methods
//!
//! - [`Check`] - Check or money order mailed to the store
//! - [`Other`] - Generic method recorded by administrators
//! - [`FreeOrder`] - Offered only when nothing is owed

pub mod check;
pub mod free_order;
pub mod other;

use std::fmt;
use std::sync::Arc;

use crate::checkout::{PaneField, PaneInput, ReviewLine};
use crate::models::Order;

pub use check::{Check, CheckConfig};
pub use free_order::FreeOrder;
pub use other::Other;

/// `payment_details` key set once payment has been received for an order.
pub const RECEIVED_KEY: &str = "payment_received";

/// Display fragment a payment method contributes to a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    /// Plain text paragraphs.
    pub notes: Vec<String>,
    /// Input fields.
    pub fields: Vec<PaneField>,
}

impl PaymentDetails {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.fields.is_empty()
    }
}

/// Callback contract for payment methods.
#[allow(unused_variables)]
pub trait PaymentMethod: Send + Sync {
    /// Machine name stored on orders.
    fn id(&self) -> &str;

    /// Label shown to customers and administrators.
    fn name(&self) -> &str;

    /// Position in method lists.
    fn weight(&self) -> i32 {
        0
    }

    /// Whether customers may pick this method during checkout.
    fn checkout(&self) -> bool {
        true
    }

    /// Extra details shown under the method on the checkout form.
    fn cart_details(&self, order: &Order) -> PaymentDetails {
        PaymentDetails::default()
    }

    /// Validate and store checkout input. An error message keeps the
    /// customer on the checkout form.
    ///
    /// # Errors
    ///
    /// Returns a customer-facing message when the input is not acceptable.
    fn cart_process(&self, order: &mut Order, input: &PaneInput) -> Result<(), String> {
        Ok(())
    }

    /// Lines for the checkout review screen.
    fn cart_review(&self, order: &Order) -> Vec<ReviewLine> {
        Vec::new()
    }

    /// Lines for the administrative order view.
    fn order_view(&self, order: &Order) -> Vec<String> {
        Vec::new()
    }

    /// Lines for the customer's view of their order.
    fn customer_view(&self, order: &Order) -> Vec<String> {
        Vec::new()
    }

    /// Called after an order using this method is loaded.
    fn order_load(&self, order: &mut Order) {}

    /// Called before an order using this method is saved.
    fn order_save(&self, order: &mut Order) {}

    /// Called before an order using this method is deleted.
    fn order_delete(&self, order: &Order) {}

    /// Final say before checkout completes.
    ///
    /// # Errors
    ///
    /// Returns the message shown to the customer when submission must stop.
    fn order_submit(&self, order: &mut Order) -> Result<(), String> {
        Ok(())
    }

    /// Fields shown when an administrator edits the order's payment.
    fn order_edit_details(&self, order: &Order) -> PaymentDetails {
        PaymentDetails::default()
    }

    /// Apply an administrator's payment edit.
    ///
    /// # Errors
    ///
    /// Returns a message when the input is not acceptable.
    fn order_edit_process(&self, order: &mut Order, input: &PaneInput) -> Result<(), String> {
        Ok(())
    }

    /// Store-wide settings of this method.
    fn settings_form(&self) -> Vec<PaneField> {
        Vec::new()
    }
}

struct Registered {
    method: Arc<dyn PaymentMethod>,
    enabled: bool,
}

/// Registered payment methods, ordered by weight.
#[derive(Default)]
pub struct PaymentMethodRegistry {
    methods: Vec<Registered>,
}

impl fmt::Debug for PaymentMethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.methods.iter().map(|r| (r.method.id(), r.enabled)))
            .finish()
    }
}

impl PaymentMethodRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with check, other and free order registered and enabled.
    #[must_use]
    pub fn with_builtin(check: Check) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(check));
        registry.register(Arc::new(Other));
        registry.register(Arc::new(FreeOrder));
        registry
    }

    /// Register an enabled method. Equal weights keep registration order.
    pub fn register(&mut self, method: Arc<dyn PaymentMethod>) {
        let position = self
            .methods
            .iter()
            .position(|r| r.method.weight() > method.weight())
            .unwrap_or(self.methods.len());
        tracing::debug!(method = method.id(), "Registered payment method");
        self.methods.insert(
            position,
            Registered {
                method,
                enabled: true,
            },
        );
    }

    /// Enable or disable a method. Returns `false` for unknown ids.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        self.methods
            .iter_mut()
            .find(|r| r.method.id() == id)
            .map(|r| r.enabled = enabled)
            .is_some()
    }

    /// Look up a method, enabled or not.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn PaymentMethod>> {
        self.methods
            .iter()
            .find(|r| r.method.id() == id)
            .map(|r| &r.method)
    }

    /// The method an order uses, if it is registered.
    #[must_use]
    pub fn for_order(&self, order: &Order) -> Option<&Arc<dyn PaymentMethod>> {
        order.payment_method.as_deref().and_then(|id| self.get(id))
    }

    /// Enabled methods in weight order.
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn PaymentMethod>> {
        self.methods.iter().filter(|r| r.enabled).map(|r| &r.method)
    }

    /// Methods a customer may choose for this order.
    ///
    /// When nothing is owed only the free order method is offered; it is
    /// never offered otherwise.
    #[must_use]
    pub fn for_checkout(&self, order: &Order) -> Vec<&Arc<dyn PaymentMethod>> {
        let free = order.total().is_zero();
        self.enabled()
            .filter(|method| method.checkout())
            .filter(|method| (method.id() == free_order::ID) == free)
            .collect()
    }
}
