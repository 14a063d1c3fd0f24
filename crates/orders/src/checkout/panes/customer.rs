//! Customer information pane.

use storekeep_core::Email;

use crate::checkout::{CheckoutPane, PaneContext, PaneError, PaneField, PaneInput, PaneView, ReviewLine};
use crate::models::Order;

/// Collects the e-mail address order notices go to.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomerPane;

impl CheckoutPane for CustomerPane {
    fn id(&self) -> &str {
        "customer"
    }

    fn title(&self) -> &str {
        "Customer information"
    }

    fn weight(&self) -> i32 {
        2
    }

    fn view(&self, order: &Order, _ctx: &PaneContext<'_>) -> PaneView {
        let current = order.email.as_ref().map(Email::as_str).unwrap_or_default();
        PaneView {
            pane: self.id().to_string(),
            title: self.title().to_string(),
            notes: vec![
                "Order information will be sent to your e-mail address listed below.".to_string(),
            ],
            fields: vec![PaneField::text("email", "E-mail address", current).required()],
            errors: Vec::new(),
        }
    }

    fn process(&self, order: &mut Order, input: &PaneInput, _ctx: &PaneContext<'_>) -> Result<(), PaneError> {
        let Some(value) = input.value("email") else {
            return Err(PaneError::field(self.id(), "email", "E-mail address field is required."));
        };
        let email = Email::parse(value).map_err(|_| {
            PaneError::field(self.id(), "email", "You must enter a valid e-mail address.")
        })?;
        order.email = Some(email);
        Ok(())
    }

    fn review(&self, order: &Order, _ctx: &PaneContext<'_>) -> Option<Vec<ReviewLine>> {
        let email = order.email.as_ref()?;
        Some(vec![ReviewLine::new("E-mail", email.as_str())])
    }
}
