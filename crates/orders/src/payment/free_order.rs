//! Payment method for orders with nothing to pay.

use super::{PaymentDetails, PaymentMethod};
use crate::models::Order;

pub(crate) const ID: &str = "free_order";

/// Offered instead of every other method when the order total is zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeOrder;

impl PaymentMethod for FreeOrder {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "No payment required"
    }

    fn weight(&self) -> i32 {
        3
    }

    fn cart_details(&self, _order: &Order) -> PaymentDetails {
        PaymentDetails {
            notes: vec!["Continue with checkout to complete your order.".to_string()],
            fields: Vec::new(),
        }
    }

    fn order_submit(&self, order: &mut Order) -> Result<(), String> {
        if order.total().is_zero() {
            Ok(())
        } else {
            Err("This order is no longer free. Please select another payment method.".to_string())
        }
    }
}
