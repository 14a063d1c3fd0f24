//! Generic payment method recorded by administrators.

use super::{PaymentDetails, PaymentMethod};
use crate::checkout::{PaneField, PaneInput};
use crate::models::Order;

/// `payment_details` key holding the free-text description.
pub const DESCRIPTION_KEY: &str = "description";

/// Longest accepted description.
pub const MAX_DESCRIPTION_LENGTH: usize = 64;

/// Payment by some other means, described in free text. Not offered at
/// checkout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Other;

impl PaymentMethod for Other {
    fn id(&self) -> &str {
        "other"
    }

    fn name(&self) -> &str {
        "Other"
    }

    fn weight(&self) -> i32 {
        10
    }

    fn checkout(&self) -> bool {
        false
    }

    fn order_view(&self, order: &Order) -> Vec<String> {
        order
            .payment_details
            .text(DESCRIPTION_KEY)
            .filter(|description| !description.is_empty())
            .map(|description| vec![format!("Description: {description}")])
            .unwrap_or_default()
    }

    fn order_edit_details(&self, order: &Order) -> PaymentDetails {
        let current = order.payment_details.text(DESCRIPTION_KEY).unwrap_or_default();
        PaymentDetails {
            notes: Vec::new(),
            fields: vec![PaneField::text(DESCRIPTION_KEY, "Description", current)],
        }
    }

    fn order_edit_process(&self, order: &mut Order, input: &PaneInput) -> Result<(), String> {
        let description = input.get(DESCRIPTION_KEY).unwrap_or_default().trim();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(format!(
                "Description cannot be longer than {MAX_DESCRIPTION_LENGTH} characters."
            ));
        }
        if description.is_empty() {
            order.payment_details.remove(DESCRIPTION_KEY);
        } else {
            order.payment_details.insert(DESCRIPTION_KEY, description);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::StatusRegistry;
    use storekeep_core::{CurrencyCode, UserId};

    #[test]
    fn test_description_edit_and_view() {
        let mut order = Order::new(&StatusRegistry::builtin(), UserId::new(1), CurrencyCode::USD).unwrap();
        assert!(Other.order_view(&order).is_empty());

        let input = PaneInput::from_iter([(DESCRIPTION_KEY, "Paid at the market stall")]);
        Other.order_edit_process(&mut order, &input).unwrap();
        assert_eq!(Other.order_view(&order), vec!["Description: Paid at the market stall".to_string()]);

        let too_long = PaneInput::from_iter([(DESCRIPTION_KEY, "x".repeat(65))]);
        assert!(Other.order_edit_process(&mut order, &too_long).is_err());
        assert_eq!(order.payment_details.text(DESCRIPTION_KEY), Some("Paid at the market stall"));

        Other.order_edit_process(&mut order, &PaneInput::default()).unwrap();
        assert!(order.payment_details.text(DESCRIPTION_KEY).is_none());
    }

    #[test]
    fn test_not_offered_at_checkout() {
        assert!(!Other.checkout());
    }
}
