//! Built-in checkout panes.

pub mod address;
pub mod comments;
pub mod customer;
pub mod payment;

use std::sync::Arc;

use super::CheckoutPane;

pub use address::AddressPane;
pub use comments::CommentsPane;
pub use customer::CustomerPane;
pub use payment::PaymentPane;

/// Customer, delivery, billing, payment and comments panes.
#[must_use]
pub fn builtin() -> Vec<Arc<dyn CheckoutPane>> {
    vec![
        Arc::new(CustomerPane),
        Arc::new(AddressPane::delivery()),
        Arc::new(AddressPane::billing()),
        Arc::new(PaymentPane),
        Arc::new(CommentsPane),
    ]
}
