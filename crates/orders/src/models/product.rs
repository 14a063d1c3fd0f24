//! Ordered products.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storekeep_core::OrderProductId;

/// Typed product data carried with an ordered product.
///
/// `attributes`, `module` and `shippable` are understood by the store;
/// anything else a collaborator adds lands in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductData {
    /// Selected attribute options, attribute name to option labels.
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Module that added the product to the cart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Per-line override of the product's shippable flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shippable: Option<bool>,
    /// Collaborator-defined keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A product line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    /// Assigned on save.
    pub id: Option<OrderProductId>,
    /// Catalog node id.
    pub product_id: i64,
    pub title: String,
    /// SKU.
    pub model: String,
    pub qty: u32,
    /// Unit cost to the store.
    pub cost: Decimal,
    /// Unit price to the customer.
    pub price: Decimal,
    /// Unit weight.
    pub weight: Decimal,
    pub weight_units: String,
    /// Catalog shippable flag.
    pub shippable: bool,
    #[serde(default)]
    pub data: ProductData,
}

impl OrderProduct {
    /// A new unsaved line with no cost, weight or data.
    #[must_use]
    pub fn new(product_id: i64, title: impl Into<String>, model: impl Into<String>, qty: u32, price: Decimal) -> Self {
        Self {
            id: None,
            product_id,
            title: title.into(),
            model: model.into(),
            qty,
            cost: Decimal::ZERO,
            price,
            weight: Decimal::ZERO,
            weight_units: "lb".to_string(),
            shippable: true,
            data: ProductData::default(),
        }
    }

    /// Whether this line needs shipping, honoring the data override.
    #[must_use]
    pub fn is_shippable(&self) -> bool {
        self.data.shippable.unwrap_or(self.shippable)
    }

    /// Price times quantity, saturating at the largest representable amount.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.qty))
    }
}
