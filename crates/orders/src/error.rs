//! Unified error handling for order operations.

use thiserror::Error;

use crate::access::Operation;
use crate::checkout::{CheckoutStage, PaneError};
use crate::db::RepositoryError;

/// Message shown when an actor is refused an operation.
pub const FORBIDDEN_MESSAGE: &str = "You are not authorized to perform this operation.";

/// Message shown when something failed that the user can retry.
pub const RETRY_MESSAGE: &str = "The order could not be saved. Please try again.";

/// Message shown when the store itself is misconfigured.
pub const UNAVAILABLE_MESSAGE: &str =
    "The store is unable to process orders right now. Please contact an administrator.";

/// Error type for order, checkout and access operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The status registry or checkout setup is misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An order, status or state id does not exist.
    #[error("Not found: {kind} {id}")]
    NotFound {
        /// What was looked up, e.g. `order status`.
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// A checkout pane rejected its input. Recoverable by the customer.
    #[error("Validation error: {0}")]
    Validation(#[from] PaneError),

    /// The access policy refused the operation.
    #[error("Forbidden: {operation}")]
    PolicyDenied {
        /// The refused operation.
        operation: Operation,
    },

    /// The store did not complete a save or delete.
    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// A checkout action was issued in a stage that does not allow it.
    #[error("Invalid checkout transition: cannot {action} while {from}")]
    InvalidTransition {
        /// Stage the session was in.
        from: CheckoutStage,
        /// Attempted action.
        action: &'static str,
    },
}

impl OrderError {
    /// Shorthand for a missing order.
    #[must_use]
    pub fn order_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "order",
            id: id.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Text safe to show to the customer or administrator.
    ///
    /// Server-side failures are logged here and replaced with a generic
    /// message; internal details never reach the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Configuration(_) => {
                tracing::error!(error = %self, "Order request error");
            }
            Self::PolicyDenied { operation } => {
                tracing::warn!(%operation, "Order operation denied");
            }
            _ => {}
        }

        match self {
            Self::Validation(error) => error.message.clone(),
            Self::PolicyDenied { .. } => FORBIDDEN_MESSAGE.to_string(),
            Self::Persistence(_) => RETRY_MESSAGE.to_string(),
            Self::Configuration(_) => UNAVAILABLE_MESSAGE.to_string(),
            Self::NotFound { kind, .. } => format!("The requested {kind} could not be found."),
            Self::InvalidTransition { .. } => {
                "Your checkout has changed. Please review your order and try again.".to_string()
            }
        }
    }
}
