//! Check or money order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use storekeep_core::{Address, AddressFormatter, CountryDirectory, UserId};

use super::{PaymentDetails, PaymentMethod, RECEIVED_KEY};
use crate::checkout::{PaneField, ReviewLine};
use crate::models::{Changes, Order};

/// `payment_details` key holding the expected clear date.
pub const CLEAR_DATE_KEY: &str = "clear_date";

const DEFAULT_POLICY: &str = "Personal and business checks will be held for up to 10 business days to ensure payment clears before an order is shipped.";

/// Store settings for check payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Instructions shown on the checkout page.
    pub policy: String,
    /// Person or department checks are directed to.
    pub name: String,
    /// Where checks are mailed.
    pub address: Address,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            policy: DEFAULT_POLICY.to_string(),
            name: String::new(),
            address: Address::default(),
        }
    }
}

/// The check payment method.
#[derive(Debug, Clone)]
pub struct Check {
    config: CheckConfig,
    mail_to: String,
}

impl Check {
    /// Create the method, rendering the mailing address once.
    #[must_use]
    pub fn new<D: CountryDirectory + ?Sized>(config: CheckConfig, formatter: &AddressFormatter<'_, D>) -> Self {
        let payee = Address {
            first_name: config.name.clone(),
            last_name: String::new(),
            phone: String::new(),
            email: String::new(),
            ..config.address.clone()
        };
        let mail_to = formatter.format(&payee);
        Self { config, mail_to }
    }

    /// The rendered mailing address.
    #[must_use]
    pub fn mail_to(&self) -> &str {
        &self.mail_to
    }

    /// Record that a check was received and when it is expected to clear.
    pub fn receive_check(&self, order: &mut Order, clear_date: NaiveDate, actor: UserId) {
        let date = clear_date.format("%Y-%m-%d").to_string();
        order.payment_details.insert(CLEAR_DATE_KEY, date.as_str());
        order.payment_details.insert(RECEIVED_KEY, true);
        order.log_changes(
            actor,
            Changes::message(format!("Check received, expected clear date of {date}.")),
        );
        tracing::info!(order_id = ?order.id(), clear_date = %date, "Check received");
    }

    fn clear_date(order: &Order) -> Option<&str> {
        order.payment_details.text(CLEAR_DATE_KEY)
    }
}

impl PaymentMethod for Check {
    fn id(&self) -> &str {
        "check"
    }

    fn name(&self) -> &str {
        "Check or money order"
    }

    fn weight(&self) -> i32 {
        1
    }

    fn cart_details(&self, _order: &Order) -> PaymentDetails {
        let mut notes = vec!["Checks should be made out to:".to_string()];
        if !self.mail_to.is_empty() {
            notes.push(self.mail_to.clone());
        }
        if !self.config.policy.is_empty() {
            notes.push(self.config.policy.clone());
        }
        PaymentDetails {
            notes,
            fields: Vec::new(),
        }
    }

    fn cart_review(&self, _order: &Order) -> Vec<ReviewLine> {
        vec![ReviewLine::new("Mail to", self.mail_to.clone())]
    }

    fn order_view(&self, order: &Order) -> Vec<String> {
        match Self::clear_date(order) {
            Some(date) => vec![format!("Clear Date: {date}")],
            None => vec!["Receive Check".to_string()],
        }
    }

    fn customer_view(&self, order: &Order) -> Vec<String> {
        Self::clear_date(order).map_or_else(Vec::new, |date| {
            vec![
                "Check received".to_string(),
                "Expected clear date:".to_string(),
                date.to_string(),
            ]
        })
    }

    fn settings_form(&self) -> Vec<PaneField> {
        vec![
            PaneField::text("policy", "Check payment policy", &self.config.policy),
            PaneField::text("name", "Contact", &self.config.name),
        ]
    }
}
