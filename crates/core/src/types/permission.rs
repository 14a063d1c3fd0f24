//! Order permissions granted to actors.
//!
//! The string form of each permission is the label administrators see when
//! assigning it, so it doubles as the persisted and command-line form.

use serde::{Deserialize, Serialize};

/// A permission an actor may hold over orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// View every order and invoice in the store.
    ViewAllOrders,
    /// View orders the actor placed.
    ViewOwnOrders,
    /// View invoices for orders the actor placed.
    ViewOwnInvoices,
    /// Edit any order.
    EditOrders,
    /// Delete orders that are not completed and that no collaborator protects.
    DeleteOrders,
    /// Delete any order regardless of its state.
    UnconditionallyDeleteOrders,
    /// Create orders on behalf of customers.
    CreateOrders,
}

impl Permission {
    /// All permissions, in display order.
    pub const ALL: [Self; 7] = [
        Self::ViewAllOrders,
        Self::ViewOwnOrders,
        Self::ViewOwnInvoices,
        Self::EditOrders,
        Self::DeleteOrders,
        Self::UnconditionallyDeleteOrders,
        Self::CreateOrders,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ViewAllOrders => "view all orders",
            Self::ViewOwnOrders => "view own orders",
            Self::ViewOwnInvoices => "view own invoices",
            Self::EditOrders => "edit orders",
            Self::DeleteOrders => "delete orders",
            Self::UnconditionallyDeleteOrders => "unconditionally delete orders",
            Self::CreateOrders => "create orders",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned for an unknown permission name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid permission: {0}")]
pub struct PermissionParseError(pub String);

impl std::str::FromStr for Permission {
    type Err = PermissionParseError;

    /// Accepts either the label (`view own orders`) or its snake_case form
    /// (`view_own_orders`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', " ").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|permission| permission.label() == normalized)
            .ok_or_else(|| PermissionParseError(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip() {
        for permission in Permission::ALL {
            let parsed: Permission = permission.to_string().parse().unwrap();
            assert_eq!(parsed, permission);
        }
    }

    #[test]
    fn test_parse_snake_case() {
        assert_eq!(
            "unconditionally_delete_orders".parse::<Permission>().unwrap(),
            Permission::UnconditionallyDeleteOrders
        );
        assert!("administer store".parse::<Permission>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Permission::ViewOwnInvoices).unwrap();
        assert_eq!(json, "\"view_own_invoices\"");
    }
}
