//! Order line items (subtotal, tax, shipping and other adjustments).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storekeep_core::LineItemId;

/// Line item type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineItemKind {
    Subtotal,
    Tax,
    Shipping,
    Generic,
    /// Collaborator-defined type.
    Other(String),
}

impl LineItemKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subtotal => "subtotal",
            Self::Tax => "tax",
            Self::Shipping => "shipping",
            Self::Generic => "generic",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for LineItemKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "subtotal" => Self::Subtotal,
            "tax" => Self::Tax,
            "shipping" => Self::Shipping,
            "generic" => Self::Generic,
            _ => Self::Other(kind),
        }
    }
}

impl From<LineItemKind> for String {
    fn from(kind: LineItemKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LineItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A titled amount that contributes to the order total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Assigned on save.
    pub id: Option<LineItemId>,
    pub kind: LineItemKind,
    pub title: String,
    pub amount: Decimal,
    /// Display position.
    pub weight: i32,
}

impl LineItem {
    #[must_use]
    pub fn new(kind: LineItemKind, title: impl Into<String>, amount: Decimal, weight: i32) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            amount,
            weight,
        }
    }
}
