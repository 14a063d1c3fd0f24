//! Typed extension data.
//!
//! Panes, payment methods and other collaborators attach their own keys to
//! an order. Values are a closed set of variants so they survive a round trip
//! through storage without losing their type.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single extension value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataValue {
    /// Boolean flag.
    Flag(bool),
    /// Whole number.
    Integer(i64),
    /// Exact decimal, e.g. an amount.
    Decimal(Decimal),
    /// Free text.
    Text(String),
    /// Ordered list of values.
    List(Vec<DataValue>),
    /// Nested map.
    Map(ExtensionMap),
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for DataValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// String-keyed map of [`DataValue`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionMap(BTreeMap<String, DataValue>);

impl ExtensionMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Option<DataValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        self.0.remove(key)
    }

    /// Raw value lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Text value, if present and text.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(DataValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Flag value, if present and a flag.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(DataValue::Flag(value)) => Some(*value),
            _ => None,
        }
    }

    /// Integer value, if present and an integer.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(DataValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Decimal value; integers are widened.
    #[must_use]
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        match self.0.get(key) {
            Some(DataValue::Decimal(value)) => Some(*value),
            Some(DataValue::Integer(value)) => Some(Decimal::from(*value)),
            _ => None,
        }
    }

    /// Nested map, if present and a map.
    #[must_use]
    pub fn map(&self, key: &str) -> Option<&Self> {
        match self.0.get(key) {
            Some(DataValue::Map(value)) => Some(value),
            _ => None,
        }
    }

    /// List, if present and a list.
    #[must_use]
    pub fn list(&self, key: &str) -> Option<&[DataValue]> {
        match self.0.get(key) {
            Some(DataValue::List(value)) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<ExtensionMap> for DataValue {
    fn from(value: ExtensionMap) -> Self {
        Self::Map(value)
    }
}

impl<K: Into<String>, V: Into<DataValue>> FromIterator<(K, V)> for ExtensionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut map = ExtensionMap::new();
        map.insert("description", "Paid in person");
        map.insert("received", true);
        map.insert("attempts", 3_i64);

        assert_eq!(map.text("description"), Some("Paid in person"));
        assert_eq!(map.flag("received"), Some(true));
        assert_eq!(map.decimal("attempts"), Some(Decimal::from(3)));
        assert_eq!(map.text("received"), None);
        assert_eq!(map.flag("missing"), None);
    }

    #[test]
    fn test_serialized_form_keeps_types() {
        let map: ExtensionMap = [("clear_date", DataValue::from("2026-03-01"))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"clear_date":{"text":"2026-03-01"}}"#);
        let back: ExtensionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
