//! Transient checkout state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storekeep_core::OrderId;
use uuid::Uuid;

use super::pane::PaneError;

/// Where a checkout is in its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    /// Panes are waiting for valid input.
    Collecting,
    /// Every pane accepted its input; the review screen is shown.
    Reviewing,
    /// Submission gates are running.
    Submitting,
    /// The order was submitted and saved.
    Complete,
    /// Submission hit an unrecoverable configuration problem.
    Failed,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collecting => "collecting",
            Self::Reviewing => "reviewing",
            Self::Submitting => "submitting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        })
    }
}

/// Checkout context for one order, created by
/// [`CheckoutPipeline::start`](super::CheckoutPipeline::start) and dropped
/// once the checkout completes or is abandoned.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: Uuid,
    /// The order being checked out, once it has been saved.
    pub order_id: Option<OrderId>,
    pub(crate) stage: CheckoutStage,
    pub(crate) errors: Vec<PaneError>,
    pub(crate) messages: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub(crate) fn new(order_id: Option<OrderId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            stage: CheckoutStage::Collecting,
            errors: Vec::new(),
            messages: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// Validation errors from the last process attempt.
    #[must_use]
    pub fn errors(&self) -> &[PaneError] {
        &self.errors
    }

    /// Errors reported by one pane.
    pub fn errors_for<'a>(&'a self, pane: &'a str) -> impl Iterator<Item = &'a PaneError> {
        self.errors.iter().filter(move |error| error.pane == pane)
    }

    /// Status and error messages to show the customer.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Take the pending messages, leaving none behind.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    pub(crate) fn transition(&mut self, stage: CheckoutStage) {
        if self.stage != stage {
            tracing::debug!(
                session = %self.id,
                order_id = ?self.order_id,
                from = %self.stage,
                to = %stage,
                "Checkout stage changed"
            );
        }
        self.stage = stage;
        self.updated_at = Utc::now();
    }
}
