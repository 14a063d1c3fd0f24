//! Pre-submission checks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Order;
use crate::payment::PaymentMethodRegistry;

/// Result of a submission gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub pass: bool,
    /// Shown to the customer either way.
    pub message: Option<String>,
}

impl GateOutcome {
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            pass: true,
            message: None,
        }
    }

    #[must_use]
    pub fn pass_with(message: impl Into<String>) -> Self {
        Self {
            pass: true,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            pass: false,
            message: Some(message.into()),
        }
    }
}

/// A collaborator that may stop an order from being submitted.
///
/// Gates run in registration order and the first rejection stops the rest.
/// A gate may adjust the order; its changes are kept only if every gate
/// passes.
#[async_trait]
pub trait SubmissionGate: Send + Sync {
    /// Short name used in logs.
    fn id(&self) -> &str;

    async fn check(&self, order: &mut Order) -> GateOutcome;
}

/// Gives the order's payment method its `order_submit` callback.
#[derive(Debug, Clone)]
pub struct PaymentSubmissionGate {
    payments: Arc<PaymentMethodRegistry>,
}

impl PaymentSubmissionGate {
    #[must_use]
    pub const fn new(payments: Arc<PaymentMethodRegistry>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl SubmissionGate for PaymentSubmissionGate {
    fn id(&self) -> &str {
        "payment"
    }

    async fn check(&self, order: &mut Order) -> GateOutcome {
        let Some(method) = self.payments.for_order(order) else {
            return GateOutcome::pass();
        };
        match method.order_submit(order) {
            Ok(()) => GateOutcome::pass(),
            Err(message) => GateOutcome::reject(message),
        }
    }
}
