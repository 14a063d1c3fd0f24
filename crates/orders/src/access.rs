//! Order access policy.
//!
//! Decides whether an actor may view, invoice, update or delete an order.
//! Decisions depend only on the actor's permissions, the order's owner and
//! state, and the registered deletion checks, so asking twice gives the same
//! answer.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storekeep_core::{Permission, UserId};

use crate::error::OrderError;
use crate::models::Order;
use crate::payment::RECEIVED_KEY;
use crate::registry::states;

/// Something an actor may try to do with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Update,
    Delete,
    Invoice,
    Create,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::View => "view",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Invoice => "invoice",
            Self::Create => "create",
        })
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied,
}

impl AccessDecision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    const fn from_bool(allowed: bool) -> Self {
        if allowed { Self::Allowed } else { Self::Denied }
    }
}

/// A user acting on orders, with the permissions they hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub permissions: BTreeSet<Permission>,
}

impl Actor {
    #[must_use]
    pub fn new(id: UserId, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// An anonymous visitor with no permissions.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An actor holding every order permission.
    #[must_use]
    pub fn administrator(id: UserId) -> Self {
        Self::new(id, Permission::ALL)
    }

    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    fn owns(&self, order: &Order) -> bool {
        !self.id.is_anonymous() && self.id == order.user_id
    }
}

/// A collaborator that can protect an order from deletion.
pub trait DeletionEligibilityCheck: Send + Sync {
    /// Short name used in logs.
    fn id(&self) -> &str;

    /// Return `false` to veto deleting `order`.
    fn can_delete(&self, order: &Order) -> bool;
}

/// Protects orders that have a received check recorded against them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReceivedPaymentCheck;

impl DeletionEligibilityCheck for ReceivedPaymentCheck {
    fn id(&self) -> &str {
        "received_payment"
    }

    fn can_delete(&self, order: &Order) -> bool {
        order.payment_details.flag(RECEIVED_KEY) != Some(true)
    }
}

/// Access decision table plus the registered deletion checks.
#[derive(Clone, Default)]
pub struct AccessPolicy {
    deletion_checks: Vec<Arc<dyn DeletionEligibilityCheck>>,
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPolicy")
            .field(
                "deletion_checks",
                &self.deletion_checks.iter().map(|c| c.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AccessPolicy {
    /// A policy with no deletion checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with the built-in deletion checks registered.
    #[must_use]
    pub fn with_builtin_checks() -> Self {
        let mut policy = Self::new();
        policy.register_deletion_check(Arc::new(ReceivedPaymentCheck));
        policy
    }

    /// Add a deletion check. Checks run in registration order.
    pub fn register_deletion_check(&mut self, check: Arc<dyn DeletionEligibilityCheck>) {
        tracing::debug!(check = check.id(), "Registered deletion check");
        self.deletion_checks.push(check);
    }

    /// Decide whether `actor` may perform `operation` on `order`.
    #[must_use]
    pub fn can_perform(&self, actor: &Actor, order: &Order, operation: Operation) -> AccessDecision {
        let allowed = match operation {
            Operation::View => {
                actor.has(Permission::ViewAllOrders)
                    || (actor.owns(order) && actor.has(Permission::ViewOwnOrders))
            }
            Operation::Invoice => {
                actor.has(Permission::ViewAllOrders)
                    || (actor.owns(order) && actor.has(Permission::ViewOwnInvoices))
            }
            Operation::Update => actor.has(Permission::EditOrders),
            Operation::Delete => self.can_delete(actor, order),
            Operation::Create => actor.has(Permission::CreateOrders),
        };
        AccessDecision::from_bool(allowed)
    }

    /// Decide whether `actor` may create orders for customers.
    #[must_use]
    pub fn can_create(&self, actor: &Actor) -> AccessDecision {
        AccessDecision::from_bool(actor.has(Permission::CreateOrders))
    }

    /// Like [`can_perform`](Self::can_perform), as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::PolicyDenied` when the decision is a denial.
    pub fn ensure(&self, actor: &Actor, order: &Order, operation: Operation) -> Result<(), OrderError> {
        if self.can_perform(actor, order, operation).is_allowed() {
            return Ok(());
        }
        tracing::warn!(
            actor = %actor.id,
            order_id = ?order.id(),
            %operation,
            "Order access denied"
        );
        Err(OrderError::PolicyDenied { operation })
    }

    fn can_delete(&self, actor: &Actor, order: &Order) -> bool {
        if actor.has(Permission::UnconditionallyDeleteOrders) {
            return true;
        }
        if !actor.has(Permission::DeleteOrders) || order.state_id() == states::COMPLETED {
            return false;
        }
        match self.deletion_checks.iter().find(|check| !check.can_delete(order)) {
            Some(check) => {
                tracing::warn!(check = check.id(), order_id = ?order.id(), "Order deletion vetoed");
                false
            }
            None => true,
        }
    }
}
