//! Order status and state registry.
//!
//! An order carries a fine-grained *status* chosen by administrators
//! ("Pending", "Processing", ...). Every status belongs to exactly one coarse
//! lifecycle *state* (`in_checkout`, `post_checkout`, `completed`, ...), and
//! code reasons about states while people work with statuses.
//!
//! Statuses are ordered by weight. The default status of a state is the
//! lowest-weight status in it unless an administrator pinned another one.
//! Ties keep registration order.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Well-known state ids.
pub mod states {
    /// Orders that were abandoned or called off.
    pub const CANCELED: &str = "canceled";
    /// Orders still being filled in by the customer.
    pub const IN_CHECKOUT: &str = "in_checkout";
    /// Orders submitted by the customer, awaiting payment or fulfilment.
    pub const POST_CHECKOUT: &str = "post_checkout";
    /// Orders that have been paid for.
    pub const PAYMENT_RECEIVED: &str = "payment_received";
    /// Orders that are finished.
    pub const COMPLETED: &str = "completed";
}

macro_rules! string_id {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Identifier of an order ", $what, ".")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a ", $what, " id.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(StateId, "state");
string_id!(StatusId, "status");

/// A coarse lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    /// State id.
    pub id: StateId,
    /// Display title.
    pub title: String,
    /// Sort weight.
    #[serde(default)]
    pub weight: i32,
}

/// An administrator-facing order status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    /// Status id.
    pub id: StatusId,
    /// Display label.
    pub name: String,
    /// State this status belongs to.
    pub state: StateId,
    /// Sort weight; lower weights are preferred as state defaults.
    #[serde(default)]
    pub weight: i32,
    /// Built-in statuses are locked and cannot be removed.
    #[serde(default)]
    pub locked: bool,
}

impl OrderStatus {
    /// A custom (unlocked) status.
    #[must_use]
    pub fn custom(
        id: impl Into<StatusId>,
        name: impl Into<String>,
        state: impl Into<StateId>,
        weight: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
            weight,
            locked: false,
        }
    }
}

/// Custom registry definitions, usually read from YAML.
///
/// ```yaml
/// states:
///   - { id: on_hold, title: On hold, weight: 5 }
/// statuses:
///   - { id: awaiting_stock, name: Awaiting stock, state: on_hold, weight: 1 }
/// defaults:
///   post_checkout: processing
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Extra states.
    pub states: Vec<OrderState>,
    /// Extra statuses.
    pub statuses: Vec<OrderStatus>,
    /// Pinned defaults, state id to status id.
    pub defaults: HashMap<StateId, StatusId>,
}

impl RegistryConfig {
    /// Parse definitions from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the document is malformed.
    pub fn from_yaml(yaml: &str) -> Result<Self, OrderError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| OrderError::Configuration(format!("invalid status definitions: {e}")))
    }

    /// Read definitions from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, OrderError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            OrderError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }
}

/// Registry of order states and statuses.
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    states: Vec<OrderState>,
    statuses: Vec<OrderStatus>,
    pinned: HashMap<StateId, StatusId>,
}

impl StatusRegistry {
    /// An empty registry with no states.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in states and statuses.
    #[must_use]
    pub fn builtin() -> Self {
        let states = [
            (states::CANCELED, "Canceled", -20),
            (states::IN_CHECKOUT, "In checkout", -10),
            (states::POST_CHECKOUT, "Post checkout", 0),
            (states::PAYMENT_RECEIVED, "Payment received", 10),
            (states::COMPLETED, "Completed", 20),
        ];
        let statuses = [
            ("canceled", "Canceled", states::CANCELED, -20),
            ("in_checkout", "In checkout", states::IN_CHECKOUT, -10),
            ("pending", "Pending", states::POST_CHECKOUT, 1),
            ("processing", "Processing", states::POST_CHECKOUT, 5),
            ("payment_received", "Payment received", states::PAYMENT_RECEIVED, 10),
            ("completed", "Completed", states::COMPLETED, 20),
        ];

        Self {
            states: states
                .into_iter()
                .map(|(id, title, weight)| OrderState {
                    id: id.into(),
                    title: title.to_string(),
                    weight,
                })
                .collect(),
            statuses: statuses
                .into_iter()
                .map(|(id, name, state, weight)| OrderStatus {
                    id: id.into(),
                    name: name.to_string(),
                    state: state.into(),
                    weight,
                    locked: true,
                })
                .collect(),
            pinned: HashMap::new(),
        }
    }

    /// Built-in registry with custom definitions merged in.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if a definition clashes with an
    /// existing id or references an unknown state or status.
    pub fn with_config(config: RegistryConfig) -> Result<Self, OrderError> {
        let mut registry = Self::builtin();
        for state in config.states {
            registry.register_state(state)?;
        }
        for status in config.statuses {
            registry.register_status(status)?;
        }
        let mut defaults: Vec<_> = config.defaults.into_iter().collect();
        defaults.sort();
        for (state, status) in defaults {
            registry.set_state_default(&state, &status)?;
        }
        Ok(registry)
    }

    /// Register a new state.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the id is taken.
    pub fn register_state(&mut self, state: OrderState) -> Result<(), OrderError> {
        if self.state(&state.id).is_some() {
            return Err(OrderError::Configuration(format!(
                "order state {} is already registered",
                state.id
            )));
        }
        tracing::debug!(state = %state.id, weight = state.weight, "Registered order state");
        self.states.push(state);
        Ok(())
    }

    /// Register a new status, interleaved by weight with existing ones.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the id is taken or the state is
    /// unknown.
    pub fn register_status(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if self.find_status(&status.id).is_some() {
            return Err(OrderError::Configuration(format!(
                "order status {} is already registered",
                status.id
            )));
        }
        if self.state(&status.state).is_none() {
            return Err(OrderError::Configuration(format!(
                "order status {} references unknown state {}",
                status.id, status.state
            )));
        }
        tracing::info!(
            status = %status.id,
            state = %status.state,
            weight = status.weight,
            "Registered order status"
        );
        self.statuses.push(status);
        Ok(())
    }

    /// Change the display label of a status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is unknown.
    pub fn rename_status(&mut self, id: &StatusId, name: impl Into<String>) -> Result<(), OrderError> {
        let status = self
            .statuses
            .iter_mut()
            .find(|status| &status.id == id)
            .ok_or_else(|| status_not_found(id))?;
        status.name = name.into();
        Ok(())
    }

    /// Remove a custom status. Clears any default pinned to it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown statuses and
    /// `OrderError::Configuration` for locked ones.
    pub fn remove_status(&mut self, id: &StatusId) -> Result<OrderStatus, OrderError> {
        let position = self
            .statuses
            .iter()
            .position(|status| &status.id == id)
            .ok_or_else(|| status_not_found(id))?;
        if self.statuses.get(position).is_some_and(|status| status.locked) {
            return Err(OrderError::Configuration(format!(
                "order status {id} is locked and cannot be removed"
            )));
        }
        self.pinned.retain(|_, pinned| pinned != id);
        Ok(self.statuses.remove(position))
    }

    /// Pin the default status of a state.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is unknown and
    /// `OrderError::Configuration` if it belongs to a different state.
    pub fn set_state_default(&mut self, state: &StateId, status: &StatusId) -> Result<(), OrderError> {
        let found = self.status(status)?;
        if &found.state != state {
            return Err(OrderError::Configuration(format!(
                "order status {status} belongs to state {}, not {state}",
                found.state
            )));
        }
        self.pinned.insert(state.clone(), status.clone());
        Ok(())
    }

    /// Drop a pinned default so the lowest-weight rule applies again.
    pub fn clear_state_default(&mut self, state: &StateId) {
        self.pinned.remove(state);
    }

    /// All states ordered by weight.
    #[must_use]
    pub fn states(&self) -> Vec<&OrderState> {
        let mut states: Vec<&OrderState> = self.states.iter().collect();
        states.sort_by_key(|state| state.weight);
        states
    }

    /// Look up a state.
    #[must_use]
    pub fn state(&self, id: &StateId) -> Option<&OrderState> {
        self.states.iter().find(|state| &state.id == id)
    }

    /// All statuses ordered by weight, ties in registration order.
    #[must_use]
    pub fn statuses(&self) -> Vec<&OrderStatus> {
        let mut statuses: Vec<&OrderStatus> = self.statuses.iter().collect();
        statuses.sort_by_key(|status| status.weight);
        statuses
    }

    /// Look up a status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is unknown.
    pub fn status(&self, id: &StatusId) -> Result<&OrderStatus, OrderError> {
        self.find_status(id).ok_or_else(|| status_not_found(id))
    }

    /// Statuses of a state ordered by weight, ties in registration order.
    #[must_use]
    pub fn statuses_for_state(&self, state: &StateId) -> Vec<&OrderStatus> {
        let mut statuses: Vec<&OrderStatus> = self
            .statuses
            .iter()
            .filter(|status| &status.state == state)
            .collect();
        statuses.sort_by_key(|status| status.weight);
        statuses
    }

    /// The status new orders in `state` receive.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the state has no statuses.
    pub fn default_status(&self, state: &StateId) -> Result<&OrderStatus, OrderError> {
        if let Some(pinned) = self.pinned.get(state).and_then(|id| self.find_status(id)) {
            return Ok(pinned);
        }
        self.statuses_for_state(state)
            .into_iter()
            .next()
            .ok_or_else(|| {
                OrderError::Configuration(format!("order state {state} has no statuses"))
            })
    }

    /// Whether a state has a pinned default.
    #[must_use]
    pub fn is_pinned(&self, state: &StateId) -> bool {
        self.pinned.contains_key(state)
    }

    /// The state a status belongs to.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is unknown.
    pub fn state_of(&self, status: &StatusId) -> Result<&StateId, OrderError> {
        self.status(status).map(|status| &status.state)
    }

    fn find_status(&self, id: &StatusId) -> Option<&OrderStatus> {
        self.statuses.iter().find(|status| &status.id == id)
    }
}

fn status_not_found(id: &StatusId) -> OrderError {
    OrderError::NotFound {
        kind: "order status",
        id: id.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let registry = StatusRegistry::builtin();
        let default = registry.default_status(&states::IN_CHECKOUT.into()).unwrap();
        assert_eq!(default.id, "in_checkout");
        let default = registry.default_status(&states::POST_CHECKOUT.into()).unwrap();
        assert_eq!(default.id, "pending");
    }

    #[test]
    fn test_state_of() {
        let registry = StatusRegistry::builtin();
        assert_eq!(registry.state_of(&"processing".into()).unwrap(), "post_checkout");
        assert!(matches!(
            registry.state_of(&"shipped".into()),
            Err(OrderError::NotFound { kind: "order status", .. })
        ));
    }

    #[test]
    fn test_state_without_statuses_is_configuration_error() {
        let mut registry = StatusRegistry::builtin();
        registry
            .register_state(OrderState {
                id: "on_hold".into(),
                title: "On hold".to_string(),
                weight: 5,
            })
            .unwrap();
        assert!(matches!(
            registry.default_status(&"on_hold".into()),
            Err(OrderError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_status_with_lower_weight_becomes_default() {
        let mut registry = StatusRegistry::builtin();
        registry
            .register_status(OrderStatus::custom("quote", "Quote", states::IN_CHECKOUT, -15))
            .unwrap();
        assert_eq!(
            registry.default_status(&states::IN_CHECKOUT.into()).unwrap().id,
            "quote"
        );
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut registry = StatusRegistry::builtin();
        registry
            .register_status(OrderStatus::custom("first", "First", states::POST_CHECKOUT, 1))
            .unwrap();
        registry
            .register_status(OrderStatus::custom("second", "Second", states::POST_CHECKOUT, 1))
            .unwrap();
        let ids: Vec<&str> = registry
            .statuses_for_state(&states::POST_CHECKOUT.into())
            .iter()
            .map(|status| status.id.as_str())
            .collect();
        assert_eq!(ids, ["pending", "first", "second", "processing"]);
    }

    #[test]
    fn test_duplicate_and_unknown_state_rejected() {
        let mut registry = StatusRegistry::builtin();
        assert!(matches!(
            registry.register_status(OrderStatus::custom("pending", "Again", states::POST_CHECKOUT, 0)),
            Err(OrderError::Configuration(_))
        ));
        assert!(matches!(
            registry.register_status(OrderStatus::custom("x", "X", "nowhere", 0)),
            Err(OrderError::Configuration(_))
        ));
    }

    #[test]
    fn test_pinned_default() {
        let mut registry = StatusRegistry::builtin();
        let state: StateId = states::POST_CHECKOUT.into();
        registry.set_state_default(&state, &"processing".into()).unwrap();
        assert_eq!(registry.default_status(&state).unwrap().id, "processing");
        assert!(registry.is_pinned(&state));

        assert!(matches!(
            registry.set_state_default(&state, &"completed".into()),
            Err(OrderError::Configuration(_))
        ));

        registry.clear_state_default(&state);
        assert_eq!(registry.default_status(&state).unwrap().id, "pending");
    }

    #[test]
    fn test_remove_status() {
        let mut registry = StatusRegistry::builtin();
        let state: StateId = states::POST_CHECKOUT.into();
        registry
            .register_status(OrderStatus::custom("backorder", "Backorder", states::POST_CHECKOUT, 2))
            .unwrap();
        registry.set_state_default(&state, &"backorder".into()).unwrap();

        let removed = registry.remove_status(&"backorder".into()).unwrap();
        assert_eq!(removed.name, "Backorder");
        assert!(!registry.is_pinned(&state));
        assert!(matches!(
            registry.remove_status(&"pending".into()),
            Err(OrderError::Configuration(_))
        ));
    }

    #[test]
    fn test_rename_status() {
        let mut registry = StatusRegistry::builtin();
        registry.rename_status(&"pending".into(), "Awaiting review").unwrap();
        assert_eq!(registry.status(&"pending".into()).unwrap().name, "Awaiting review");
        assert!(registry.rename_status(&"missing".into(), "x").is_err());
    }

    #[test]
    fn test_with_yaml_config() {
        let config = RegistryConfig::from_yaml(
            r"
states:
  - { id: on_hold, title: On hold, weight: 5 }
statuses:
  - { id: awaiting_stock, name: Awaiting stock, state: on_hold, weight: 1 }
defaults:
  post_checkout: processing
",
        )
        .unwrap();
        let registry = StatusRegistry::with_config(config).unwrap();
        assert_eq!(
            registry.default_status(&"on_hold".into()).unwrap().id,
            "awaiting_stock"
        );
        assert_eq!(
            registry.default_status(&states::POST_CHECKOUT.into()).unwrap().id,
            "processing"
        );
        assert!(!registry.status(&"awaiting_stock".into()).unwrap().locked);
        let order: Vec<&str> = registry.states().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            order,
            ["canceled", "in_checkout", "post_checkout", "on_hold", "payment_received", "completed"]
        );
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            RegistryConfig::from_yaml("states: 12"),
            Err(OrderError::Configuration(_))
        ));
    }
}
