//! Integration tests for the checkout workflow.
//!
//! Runs the built-in panes end to end: form view, processing, review,
//! submission gates and the final save.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use storekeep_core::StaticCountryDirectory;
use storekeep_integration_tests::{TestContext, address_input, checkout_input};
use storekeep_orders::checkout::{
    CheckoutInput, CheckoutPipeline, CheckoutStage, GateOutcome, PaneInput, SubmissionGate, SubmitOutcome,
};
use storekeep_orders::db::OrderStore;
use storekeep_orders::registry::states;
use storekeep_orders::{Order, OrderError, StatusId};

struct Veto {
    id: &'static str,
    message: &'static str,
}

#[async_trait]
impl SubmissionGate for Veto {
    fn id(&self) -> &str {
        self.id
    }

    async fn check(&self, _order: &mut Order) -> GateOutcome {
        GateOutcome::reject(self.message)
    }
}

fn pipeline_with_gates(ctx: &TestContext, gates: Vec<Arc<dyn SubmissionGate>>) -> CheckoutPipeline {
    let mut pipeline = CheckoutPipeline::new(
        Arc::clone(ctx.state.registry()),
        Arc::clone(ctx.state.payments()),
        Arc::new(StaticCountryDirectory::with_defaults()),
        840,
    )
    .with_builtin_panes();
    for gate in gates {
        pipeline.add_gate(gate);
    }
    pipeline
}

#[tokio::test]
async fn test_full_checkout() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::new(1999, 2), true).unwrap();

    let mut session = checkout.start(&mut order).unwrap();
    let panes: Vec<String> = checkout
        .view(&session, &order)
        .into_iter()
        .map(|view| view.pane)
        .collect();
    assert_eq!(panes, ["customer", "delivery", "billing", "payment", "comments"]);

    let stage = checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();
    assert_eq!(stage, CheckoutStage::Reviewing);
    assert!(order.billing().is_same_physical_location(order.delivery()));

    let review = checkout.review(&session, &order).unwrap();
    let titles: Vec<&str> = review.iter().map(|section| section.pane.as_str()).collect();
    assert_eq!(titles, ["customer", "delivery", "billing", "payment", "comments"]);
    let payment = &review[3];
    assert_eq!(payment.lines[0].title, "Paying by");
    assert_eq!(payment.lines[0].data, "Check or money order");
    assert_eq!(payment.lines[1].title, "Mail to");

    let outcome = checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap();
    let SubmitOutcome::Completed { order_id } = outcome else {
        panic!("checkout did not complete: {outcome:?}");
    };
    assert_eq!(session.stage(), CheckoutStage::Complete);
    assert!(session.errors().is_empty());

    let saved = ctx.store.load_unchanged(order_id).await.unwrap().unwrap();
    assert_eq!(saved.status_id(), &StatusId::new("pending"));
    assert_eq!(saved.email.as_ref().unwrap().as_str(), "ada@example.com");
    assert_eq!(saved.payment_method.as_deref(), Some("check"));
    assert_eq!(saved.comments.len(), 1);
    assert_eq!(saved.comments[0].message, "Leave at the door.");
    assert!(saved.comments[0].notified);
    assert_eq!(
        saved.change_log().entries()[0].describe(),
        "Order status changed from \"In checkout\" to \"Pending\"."
    );
}

#[tokio::test]
async fn test_invalid_panes_keep_order_and_report_own_errors() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();
    let before = order.clone();

    let mut input = checkout_input("not an email");
    input = input.with("delivery", address_input().with("city", "  "));
    let stage = checkout.process(&mut session, &mut order, &input).unwrap();

    assert_eq!(stage, CheckoutStage::Collecting);
    assert!(order.email.is_none());
    assert_eq!(order.payment_method, before.payment_method);
    assert_eq!(order.delivery(), before.delivery());
    assert!(order.pane_data("comments").is_none());

    let failing: Vec<&str> = session.errors().iter().map(|error| error.pane.as_str()).collect();
    assert_eq!(failing, ["customer", "delivery"]);
    for view in checkout.view(&session, &order) {
        match view.pane.as_str() {
            "customer" => assert_eq!(view.errors, ["You must enter a valid e-mail address."]),
            "delivery" => assert_eq!(view.errors, ["City field is required."]),
            _ => assert!(view.errors.is_empty(), "{} has errors", view.pane),
        }
    }

    assert!(matches!(
        checkout.review(&session, &order),
        Err(OrderError::InvalidTransition { from: CheckoutStage::Collecting, .. })
    ));
}

#[tokio::test]
async fn test_digital_order_skips_delivery() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::TEN, false).unwrap();
    let mut session = checkout.start(&mut order).unwrap();

    let panes: Vec<String> = checkout
        .view(&session, &order)
        .into_iter()
        .map(|view| view.pane)
        .collect();
    assert_eq!(panes, ["customer", "billing", "payment", "comments"]);

    let input = CheckoutInput::new()
        .with("customer", PaneInput::new().with("email", "ada@example.com"))
        .with("billing", address_input())
        .with("payment", PaneInput::new().with("payment_method", "check"));
    let stage = checkout.process(&mut session, &mut order, &input).unwrap();
    assert_eq!(stage, CheckoutStage::Reviewing);
    assert!(order.delivery().is_empty());
    assert_eq!(order.billing().city, "Austin");
}

#[tokio::test]
async fn test_free_order_uses_free_payment() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::ZERO, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();

    let payment = checkout
        .view(&session, &order)
        .into_iter()
        .find(|view| view.pane == "payment")
        .unwrap();
    assert_eq!(payment.fields[0].options.len(), 1);
    assert_eq!(payment.fields[0].options[0].0, "free_order");

    let input = checkout_input("ada@example.com").with("payment", PaneInput::new());
    checkout.process(&mut session, &mut order, &input).unwrap();
    assert_eq!(order.payment_method.as_deref(), Some("free_order"));

    let outcome = checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_first_failing_gate_is_the_only_one_reported() {
    let ctx = TestContext::new().unwrap();
    let checkout = pipeline_with_gates(
        &ctx,
        vec![
            Arc::new(Veto {
                id: "stock",
                message: "One of your items is out of stock.",
            }),
            Arc::new(Veto {
                id: "fraud",
                message: "Your order was flagged for review.",
            }),
        ],
    );
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();
    checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();

    let outcome = checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected {
            gate: "stock".to_string(),
            message: Some("One of your items is out of stock.".to_string()),
        }
    );
    assert_eq!(session.stage(), CheckoutStage::Reviewing);
    assert_eq!(session.messages(), ["One of your items is out of stock."]);
    assert_eq!(order.state_id(), states::IN_CHECKOUT);
    assert!(ctx.store.is_empty().await);
}

#[tokio::test]
async fn test_back_to_editing_and_resubmit() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();
    checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();

    checkout.back(&mut session).unwrap();
    assert_eq!(session.stage(), CheckoutStage::Collecting);

    let stage = checkout
        .process(&mut session, &mut order, &checkout_input("grace@example.com"))
        .unwrap();
    assert_eq!(stage, CheckoutStage::Reviewing);
    assert_eq!(order.email.as_ref().unwrap().as_str(), "grace@example.com");
}

#[tokio::test]
async fn test_failed_save_can_be_retried() {
    let ctx = TestContext::new().unwrap();
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();
    checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();

    ctx.store.fail_next_saves(1);
    let err = checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Persistence(_)));
    assert_eq!(err.user_message(), storekeep_orders::error::RETRY_MESSAGE);
    assert_eq!(session.stage(), CheckoutStage::Reviewing);
    assert_eq!(order.state_id(), states::IN_CHECKOUT);
    assert!(order.comments.is_empty());

    let outcome = checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    assert_eq!(order.comments.len(), 1);
}

#[tokio::test]
async fn test_disabled_pane_is_skipped() {
    let ctx = TestContext::new().unwrap();
    let mut checkout = pipeline_with_gates(&ctx, Vec::new());
    assert!(checkout.disable_pane("comments"));
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();

    checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();
    assert!(order.pane_data("comments").is_none());
    checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap();
    assert!(order.comments.is_empty());
}

#[tokio::test]
async fn test_billing_location_ignores_names_and_spacing() {
    let ctx = TestContext::new().unwrap();
    let pipeline = ctx.state.checkout();
    let mut order = ctx.cart_order(42, Decimal::TEN, true).unwrap();
    let mut session = pipeline.start(&mut order).unwrap();

    let billing = address_input()
        .with("first_name", "Charles")
        .with("city", " AUS tin ");
    let input = checkout_input("ada@example.com").with("billing", billing);
    pipeline.process(&mut session, &mut order, &input).unwrap();

    assert_eq!(order.billing().first_name, "Charles");
    assert!(order.billing().is_same_physical_location(order.delivery()));

    let mut elsewhere = order.billing().clone();
    elsewhere.postal_code = "73344".to_string();
    assert!(!elsewhere.is_same_physical_location(order.delivery()));
}
