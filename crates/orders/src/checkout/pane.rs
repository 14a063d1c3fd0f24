//! Checkout pane contract and the form data exchanged with panes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storekeep_core::{AddressFormatter, CountryDirectory};
use thiserror::Error;

use crate::models::Order;
use crate::payment::PaymentMethodRegistry;

/// What a pane takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneCapabilities {
    pub view: bool,
    pub process: bool,
    pub review: bool,
}

impl PaneCapabilities {
    /// View, process and review.
    pub const ALL: Self = Self {
        view: true,
        process: true,
        review: true,
    };
}

/// One input on a pane form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneField {
    pub name: String,
    pub label: String,
    /// Current value.
    pub value: String,
    pub required: bool,
    /// Choices for select-style fields, value to label.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<(String, String)>,
}

impl PaneField {
    /// An optional text field.
    #[must_use]
    pub fn text(name: &str, label: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            required: false,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }
}

/// What a pane shows on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaneView {
    pub pane: String,
    pub title: String,
    /// Help text and other paragraphs.
    pub notes: Vec<String>,
    pub fields: Vec<PaneField>,
    /// Validation messages from the last process attempt, this pane only.
    pub errors: Vec<String>,
}

/// A titled line on the review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewLine {
    pub title: String,
    pub data: String,
}

impl ReviewLine {
    #[must_use]
    pub fn new(title: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: data.into(),
        }
    }
}

/// Submitted form values of one pane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneInput(BTreeMap<String, String>);

impl PaneInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Raw value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Trimmed value, `None` when missing or blank.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|value| !value.is_empty())
    }

    /// Checkbox value.
    #[must_use]
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.value(field), Some("1" | "true" | "on" | "yes"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PaneInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Submitted form values of the whole checkout form, by pane id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutInput(BTreeMap<String, PaneInput>);

impl CheckoutInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, pane: impl Into<String>, input: PaneInput) -> Self {
        self.0.insert(pane.into(), input);
        self
    }

    #[must_use]
    pub fn pane(&self, pane: &str) -> Option<&PaneInput> {
        self.0.get(pane)
    }
}

/// A recoverable, pane-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{pane}: {message}")]
pub struct PaneError {
    /// Pane that rejected its input.
    pub pane: String,
    /// Offending field, when the error is about one field.
    pub field: Option<String>,
    /// Customer-facing message.
    pub message: String,
}

impl PaneError {
    /// Error about one field of a pane.
    #[must_use]
    pub fn field(pane: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            pane: pane.to_string(),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Error about the pane as a whole.
    #[must_use]
    pub fn pane(pane: &str, message: impl Into<String>) -> Self {
        Self {
            pane: pane.to_string(),
            field: None,
            message: message.into(),
        }
    }
}

/// Store services available to panes.
#[derive(Clone, Copy)]
pub struct PaneContext<'a> {
    pub payments: &'a PaymentMethodRegistry,
    pub countries: &'a dyn CountryDirectory,
    pub store_country: u16,
    pub capitalize_addresses: bool,
}

impl<'a> PaneContext<'a> {
    /// Address formatter for this store.
    #[must_use]
    pub fn formatter(&self) -> AddressFormatter<'a, dyn CountryDirectory + 'a> {
        AddressFormatter::new(self.countries, self.store_country).capitalize(self.capitalize_addresses)
    }
}

/// A section of the checkout form.
///
/// Panes read and write only their own part of the order: their own order
/// fields, or `pane_data` under their own id.
#[allow(unused_variables)]
pub trait CheckoutPane: Send + Sync {
    /// Stable id, also the pane's `pane_data` namespace.
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    /// Position in the pipeline, lower first.
    fn weight(&self) -> i32;

    fn capabilities(&self) -> PaneCapabilities {
        PaneCapabilities::ALL
    }

    /// Whether the pane takes part for this order at all.
    fn applies_to(&self, order: &Order) -> bool {
        true
    }

    /// Build the pane's part of the checkout form.
    fn view(&self, order: &Order, ctx: &PaneContext<'_>) -> PaneView;

    /// Validate input and write it to the order.
    ///
    /// # Errors
    ///
    /// Returns a [`PaneError`] when the customer must correct the input.
    fn process(&self, order: &mut Order, input: &PaneInput, ctx: &PaneContext<'_>) -> Result<(), PaneError>;

    /// Lines for the review screen, or `None` to stay off it.
    fn review(&self, order: &Order, ctx: &PaneContext<'_>) -> Option<Vec<ReviewLine>> {
        None
    }

    /// Called once the order has been submitted, before it is saved.
    fn complete(&self, order: &mut Order) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_values() {
        let input = PaneInput::new()
            .with("email", "  ada@example.com ")
            .with("copy_address", "1")
            .with("company", "   ");
        assert_eq!(input.value("email"), Some("ada@example.com"));
        assert_eq!(input.value("company"), None);
        assert!(input.flag("copy_address"));
        assert!(!input.flag("missing"));
    }

    #[test]
    fn test_pane_error_display() {
        let error = PaneError::field("billing", "postal_code", "Postal code field is required.");
        assert_eq!(error.to_string(), "billing: Postal code field is required.");
        assert_eq!(error.field.as_deref(), Some("postal_code"));
    }
}
