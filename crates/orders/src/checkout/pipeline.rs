//! The checkout pane pipeline.
//!
//! One pipeline is built at startup and shared by every checkout. Per-order
//! progress lives in a [`CheckoutSession`] that the caller keeps between
//! requests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use storekeep_core::{CountryDirectory, OrderId};

use super::gate::{PaymentSubmissionGate, SubmissionGate};
use super::pane::{CheckoutInput, CheckoutPane, PaneContext, PaneError, PaneInput, PaneView, ReviewLine};
use super::panes;
use super::session::{CheckoutSession, CheckoutStage};
use crate::db::OrderStore;
use crate::error::OrderError;
use crate::models::{ExtensionMap, Order};
use crate::payment::PaymentMethodRegistry;
use crate::registry::{StateId, StatusRegistry, states};

const NO_PAYMENT_METHODS: &str = "Checkout cannot be completed without any payment methods enabled. \
     Please contact an administrator to resolve the issue.";

/// One pane's contribution to the review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSection {
    pub pane: String,
    pub title: String,
    pub lines: Vec<ReviewLine>,
}

/// Result of a submit attempt that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The order was submitted and saved.
    Completed { order_id: OrderId },
    /// A gate refused the order; the session is back in review.
    Rejected { gate: String, message: Option<String> },
}

struct PaneSlot {
    pane: Arc<dyn CheckoutPane>,
    enabled: bool,
}

/// Ordered checkout panes plus the gates that guard submission.
pub struct CheckoutPipeline {
    panes: Vec<PaneSlot>,
    gates: Vec<Arc<dyn SubmissionGate>>,
    registry: Arc<StatusRegistry>,
    payments: Arc<PaymentMethodRegistry>,
    countries: Arc<dyn CountryDirectory + Send + Sync>,
    store_country: u16,
    capitalize_addresses: bool,
    completion_state: StateId,
}

impl fmt::Debug for CheckoutPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutPipeline")
            .field(
                "panes",
                &self
                    .panes
                    .iter()
                    .map(|slot| (slot.pane.id(), slot.enabled))
                    .collect::<Vec<_>>(),
            )
            .field("gates", &self.gates.iter().map(|gate| gate.id()).collect::<Vec<_>>())
            .field("payments", &self.payments)
            .field("store_country", &self.store_country)
            .field("completion_state", &self.completion_state)
            .finish_non_exhaustive()
    }
}

impl CheckoutPipeline {
    /// An empty pipeline: no panes, no gates.
    #[must_use]
    pub fn new(
        registry: Arc<StatusRegistry>,
        payments: Arc<PaymentMethodRegistry>,
        countries: Arc<dyn CountryDirectory + Send + Sync>,
        store_country: u16,
    ) -> Self {
        Self {
            panes: Vec::new(),
            gates: Vec::new(),
            registry,
            payments,
            countries,
            store_country,
            capitalize_addresses: false,
            completion_state: StateId::new(states::POST_CHECKOUT),
        }
    }

    /// Add the built-in panes and the payment submission gate.
    #[must_use]
    pub fn with_builtin_panes(mut self) -> Self {
        for pane in panes::builtin() {
            self.add_pane(pane);
        }
        self.add_gate(Arc::new(PaymentSubmissionGate::new(Arc::clone(&self.payments))));
        self
    }

    /// State whose default status a completed checkout moves the order to.
    #[must_use]
    pub fn completion_state(mut self, state: impl Into<StateId>) -> Self {
        self.completion_state = state.into();
        self
    }

    #[must_use]
    pub const fn capitalize_addresses(mut self, capitalize: bool) -> Self {
        self.capitalize_addresses = capitalize;
        self
    }

    /// Add an enabled pane. Equal weights keep insertion order.
    pub fn add_pane(&mut self, pane: Arc<dyn CheckoutPane>) {
        let position = self
            .panes
            .partition_point(|slot| slot.pane.weight() <= pane.weight());
        tracing::debug!(pane = pane.id(), weight = pane.weight(), "Registered checkout pane");
        self.panes.insert(position, PaneSlot { pane, enabled: true });
    }

    /// Add a gate after those already registered.
    pub fn add_gate(&mut self, gate: Arc<dyn SubmissionGate>) {
        tracing::debug!(gate = gate.id(), "Registered submission gate");
        self.gates.push(gate);
    }

    /// Disable a pane. Returns `false` for unknown ids.
    pub fn disable_pane(&mut self, id: &str) -> bool {
        self.set_pane_enabled(id, false)
    }

    /// Enable a pane. Returns `false` for unknown ids.
    pub fn enable_pane(&mut self, id: &str) -> bool {
        self.set_pane_enabled(id, true)
    }

    fn set_pane_enabled(&mut self, id: &str, enabled: bool) -> bool {
        self.panes
            .iter_mut()
            .find(|slot| slot.pane.id() == id)
            .map(|slot| slot.enabled = enabled)
            .is_some()
    }

    /// Ids of enabled panes in pipeline order.
    #[must_use]
    pub fn pane_ids(&self) -> Vec<&str> {
        self.panes
            .iter()
            .filter(|slot| slot.enabled)
            .map(|slot| slot.pane.id())
            .collect()
    }

    #[must_use]
    pub const fn payments(&self) -> &Arc<PaymentMethodRegistry> {
        &self.payments
    }

    fn context(&self) -> PaneContext<'_> {
        PaneContext {
            payments: &self.payments,
            countries: self.countries.as_ref(),
            store_country: self.store_country,
            capitalize_addresses: self.capitalize_addresses,
        }
    }

    fn active<'a>(&'a self, order: &'a Order) -> impl Iterator<Item = &'a Arc<dyn CheckoutPane>> {
        self.panes
            .iter()
            .filter(move |slot| slot.enabled && slot.pane.applies_to(order))
            .map(|slot| &slot.pane)
    }

    /// Begin checking out an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the order is no longer in
    /// checkout, or `OrderError::Configuration` if no payment method can be
    /// offered.
    pub fn start(&self, order: &mut Order) -> Result<CheckoutSession, OrderError> {
        if order.state_id() != states::IN_CHECKOUT {
            return Err(OrderError::InvalidTransition {
                from: CheckoutStage::Complete,
                action: "start checkout",
            });
        }
        order.sync_subtotal_line();
        if self.payments.for_checkout(order).is_empty() {
            tracing::error!(order_id = ?order.id(), "No payment methods available for checkout");
            return Err(OrderError::Configuration(NO_PAYMENT_METHODS.to_string()));
        }

        let session = CheckoutSession::new(order.id());
        tracing::info!(session = %session.id, order_id = ?order.id(), "Checkout started");
        Ok(session)
    }

    /// The checkout form. Each pane shows only its own errors.
    #[must_use]
    pub fn view(&self, session: &CheckoutSession, order: &Order) -> Vec<PaneView> {
        let ctx = self.context();
        self.active(order)
            .filter(|pane| pane.capabilities().view)
            .map(|pane| {
                let mut view = pane.view(order, &ctx);
                view.errors = session
                    .errors_for(pane.id())
                    .map(|error| error.message.clone())
                    .collect();
                view
            })
            .collect()
    }

    /// Run every pane against the submitted form.
    ///
    /// All panes run even after one fails. The order is only updated when
    /// every pane accepts its input, which moves the session to review.
    /// Otherwise the order is left untouched and the session keeps the
    /// failing panes' errors.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` unless the session is
    /// collecting input.
    pub fn process(
        &self,
        session: &mut CheckoutSession,
        order: &mut Order,
        input: &CheckoutInput,
    ) -> Result<CheckoutStage, OrderError> {
        if session.stage != CheckoutStage::Collecting {
            return Err(OrderError::InvalidTransition {
                from: session.stage,
                action: "process",
            });
        }

        let ctx = self.context();
        let empty = PaneInput::new();
        let mut working = order.clone();
        working.sync_subtotal_line();
        let panes: Vec<Arc<dyn CheckoutPane>> = self
            .active(&working)
            .filter(|pane| pane.capabilities().process)
            .cloned()
            .collect();

        let mut errors: Vec<PaneError> = Vec::new();
        for pane in &panes {
            let before = working.all_pane_data().clone();
            let result = pane.process(&mut working, input.pane(pane.id()).unwrap_or(&empty), &ctx);

            for namespace in foreign_writes(&before, working.all_pane_data(), pane.id()) {
                tracing::warn!(
                    pane = pane.id(),
                    namespace = %namespace,
                    "Checkout pane wrote outside its own namespace"
                );
            }

            match result {
                Ok(()) => tracing::debug!(pane = pane.id(), "Checkout pane accepted input"),
                Err(error) => {
                    tracing::debug!(pane = pane.id(), field = ?error.field, "Checkout pane rejected input");
                    errors.push(error);
                }
            }
        }
        working.sync_subtotal_line();

        if errors.is_empty() {
            *order = working;
            session.errors.clear();
            session.transition(CheckoutStage::Reviewing);
        } else {
            session.errors = errors;
            session.transition(CheckoutStage::Collecting);
        }
        Ok(session.stage)
    }

    /// Lines for the review screen from every pane that contributes.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` unless the session is in
    /// review.
    pub fn review(&self, session: &CheckoutSession, order: &Order) -> Result<Vec<ReviewSection>, OrderError> {
        if session.stage != CheckoutStage::Reviewing {
            return Err(OrderError::InvalidTransition {
                from: session.stage,
                action: "review",
            });
        }
        let ctx = self.context();
        Ok(self
            .active(order)
            .filter(|pane| pane.capabilities().review)
            .filter_map(|pane| {
                pane.review(order, &ctx).map(|lines| ReviewSection {
                    pane: pane.id().to_string(),
                    title: pane.title().to_string(),
                    lines,
                })
            })
            .collect())
    }

    /// Return from review to editing. No validation runs.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` once the checkout has been
    /// submitted.
    pub fn back(&self, session: &mut CheckoutSession) -> Result<(), OrderError> {
        match session.stage {
            CheckoutStage::Collecting | CheckoutStage::Reviewing => {
                session.transition(CheckoutStage::Collecting);
                Ok(())
            }
            from => Err(OrderError::InvalidTransition { from, action: "go back" }),
        }
    }

    /// Submit the reviewed order.
    ///
    /// Gates run in registration order and the first rejection ends the
    /// attempt with the session back in review. When every gate passes the
    /// order moves to the completion state's default status, panes finish
    /// up, and the order is saved. A failed save leaves the order as it was
    /// and the session in review. Messages from an earlier attempt are
    /// dropped when a new one starts.
    ///
    /// # Errors
    ///
    /// - `OrderError::InvalidTransition` unless the session is in review
    /// - `OrderError::Configuration` if the completion status cannot be
    ///   resolved; the session is marked failed
    /// - `OrderError::Persistence` if the save failed
    pub async fn submit(
        &self,
        session: &mut CheckoutSession,
        order: &mut Order,
        store: &dyn OrderStore,
    ) -> Result<SubmitOutcome, OrderError> {
        if session.stage != CheckoutStage::Reviewing {
            return Err(OrderError::InvalidTransition {
                from: session.stage,
                action: "submit",
            });
        }
        session.transition(CheckoutStage::Submitting);
        session.messages.clear();

        let mut working = order.clone();
        for gate in &self.gates {
            let outcome = gate.check(&mut working).await;
            if let Some(message) = &outcome.message {
                session.messages.push(message.clone());
            }
            if !outcome.pass {
                tracing::warn!(
                    session = %session.id,
                    order_id = ?order.id(),
                    gate = gate.id(),
                    "Order submission rejected"
                );
                session.transition(CheckoutStage::Reviewing);
                return Ok(SubmitOutcome::Rejected {
                    gate: gate.id().to_string(),
                    message: outcome.message,
                });
            }
        }

        let target = match self.registry.default_status(&self.completion_state) {
            Ok(status) => status.id.clone(),
            Err(error) => {
                tracing::error!(
                    session = %session.id,
                    state = %self.completion_state,
                    error = %error,
                    "Checkout completion status unavailable"
                );
                session.transition(CheckoutStage::Failed);
                return Err(error);
            }
        };
        let actor = working.user_id;
        if let Err(error) = working.change_status(&self.registry, &target, actor) {
            session.transition(CheckoutStage::Failed);
            return Err(error);
        }

        let completing: Vec<Arc<dyn CheckoutPane>> = self.active(&working).cloned().collect();
        for pane in &completing {
            pane.complete(&mut working);
        }
        if let Some(method) = self.payments.for_order(&working).cloned() {
            method.order_save(&mut working);
        }

        match store.save(&mut working).await {
            Ok(order_id) => {
                *order = working;
                session.order_id = Some(order_id);
                session.errors.clear();
                session.transition(CheckoutStage::Complete);
                tracing::info!(session = %session.id, %order_id, status = %target, "Checkout complete");
                Ok(SubmitOutcome::Completed { order_id })
            }
            Err(error) => {
                tracing::warn!(session = %session.id, order_id = ?order.id(), error = %error, "Order save failed");
                session.transition(CheckoutStage::Reviewing);
                Err(OrderError::Persistence(error))
            }
        }
    }
}

/// Pane namespaces other than `own` whose data changed.
fn foreign_writes<'a>(
    before: &'a BTreeMap<String, ExtensionMap>,
    after: &'a BTreeMap<String, ExtensionMap>,
    own: &str,
) -> Vec<&'a str> {
    let mut changed: Vec<&str> = after
        .iter()
        .filter(|(namespace, data)| before.get(*namespace) != Some(*data))
        .map(|(namespace, _)| namespace.as_str())
        .collect();
    changed.extend(
        before
            .keys()
            .filter(|namespace| !after.contains_key(*namespace))
            .map(String::as_str),
    );
    changed.retain(|namespace| *namespace != own);
    changed
}
