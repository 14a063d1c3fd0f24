//! Payment method pane.

use std::sync::Arc;

use crate::checkout::{CheckoutPane, PaneContext, PaneError, PaneField, PaneInput, PaneView, ReviewLine};
use crate::models::{ExtensionMap, Order};

/// Lets the customer pick a payment method and hands the rest of the pane to
/// that method's cart callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentPane;

impl CheckoutPane for PaymentPane {
    fn id(&self) -> &str {
        "payment"
    }

    fn title(&self) -> &str {
        "Payment method"
    }

    fn weight(&self) -> i32 {
        6
    }

    fn view(&self, order: &Order, ctx: &PaneContext<'_>) -> PaneView {
        let methods = ctx.payments.for_checkout(order);
        let selected = order
            .payment_method
            .as_deref()
            .filter(|id| methods.iter().any(|method| method.id() == *id))
            .or_else(|| methods.first().map(|method| method.id()));

        let mut notes = Vec::new();
        if methods.len() > 1 {
            notes.push("Select a payment method from the following options.".to_string());
        }
        let options = methods
            .iter()
            .map(|method| (method.id().to_string(), method.name().to_string()))
            .collect();
        let mut fields = vec![
            PaneField::text("payment_method", "Payment method", selected.unwrap_or_default())
                .required()
                .with_options(options),
        ];
        if let Some(method) = methods.iter().find(|method| Some(method.id()) == selected) {
            let details = method.cart_details(order);
            notes.extend(details.notes);
            fields.extend(details.fields);
        }

        PaneView {
            pane: self.id().to_string(),
            title: self.title().to_string(),
            notes,
            fields,
            errors: Vec::new(),
        }
    }

    fn process(&self, order: &mut Order, input: &PaneInput, ctx: &PaneContext<'_>) -> Result<(), PaneError> {
        let method = {
            let methods = ctx.payments.for_checkout(order);
            let chosen = match (input.value("payment_method"), methods.as_slice()) {
                (Some(id), _) => methods.iter().find(|method| method.id() == id),
                (None, [only]) => Some(only),
                (None, _) => None,
            };
            chosen.map(|method| Arc::clone(*method)).ok_or_else(|| {
                PaneError::field(self.id(), "payment_method", "Select a valid payment method.")
            })?
        };

        if order.payment_method.as_deref() != Some(method.id()) {
            order.payment_details = ExtensionMap::default();
        }
        order.payment_method = Some(method.id().to_string());
        method
            .cart_process(order, input)
            .map_err(|message| PaneError::pane(self.id(), message))
    }

    fn review(&self, order: &Order, ctx: &PaneContext<'_>) -> Option<Vec<ReviewLine>> {
        let method = ctx.payments.for_order(order)?;
        let mut lines = vec![ReviewLine::new("Paying by", method.name())];
        lines.extend(method.cart_review(order));
        Some(lines)
    }
}
