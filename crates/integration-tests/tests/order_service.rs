//! Integration tests for administrative order operations.
//!
//! Orders are placed through the checkout first, then managed through the
//! order service the way the administration would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use storekeep_core::{OrderId, Permission, UserId};
use storekeep_integration_tests::{TestContext, checkout_input};
use storekeep_orders::checkout::SubmitOutcome;
use storekeep_orders::error::{FORBIDDEN_MESSAGE, RETRY_MESSAGE};
use storekeep_orders::registry::states;
use storekeep_orders::services::OrderEdit;
use storekeep_orders::{Actor, Operation, OrderError, StatusId};

async fn place_order(ctx: &TestContext, customer: i32) -> OrderId {
    let checkout = ctx.state.checkout();
    let mut order = ctx.cart_order(customer, Decimal::new(2500, 2), true).unwrap();
    let mut session = checkout.start(&mut order).unwrap();
    checkout
        .process(&mut session, &mut order, &checkout_input("ada@example.com"))
        .unwrap();
    match checkout
        .submit(&mut session, &mut order, ctx.store.as_ref())
        .await
        .unwrap()
    {
        SubmitOutcome::Completed { order_id } => order_id,
        SubmitOutcome::Rejected { gate, .. } => panic!("rejected by {gate}"),
    }
}

fn admin() -> Actor {
    Actor::administrator(UserId::new(1))
}

#[tokio::test]
async fn test_admin_and_customer_views_differ() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();

    let view = orders.view(&admin(), id).await.unwrap();
    assert_eq!(view.status_name, "Pending");
    assert_eq!(view.payment_method_name.as_deref(), Some("Check or money order"));
    assert_eq!(view.payment_lines, ["Receive Check"]);
    assert_eq!(
        view.history.first().map(String::as_str),
        Some("Order status changed from \"In checkout\" to \"Pending\".")
    );

    let customer = Actor::new(UserId::new(42), [Permission::ViewOwnOrders]);
    let view = orders.view(&customer, id).await.unwrap();
    assert!(view.payment_lines.is_empty());
    assert!(view.history.is_empty());
    assert_eq!(view.order.total(), Decimal::new(2500, 2));
}

#[tokio::test]
async fn test_anonymous_checkout_is_admin_only() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 0).await;
    let orders = ctx.state.orders();

    let visitor = Actor::new(UserId::ANONYMOUS, [Permission::ViewOwnOrders]);
    let err = orders.view(&visitor, id).await.unwrap_err();
    assert!(matches!(err, OrderError::PolicyDenied { operation: Operation::View }));
    assert_eq!(err.user_message(), FORBIDDEN_MESSAGE);
    assert!(orders.view(&admin(), id).await.is_ok());
}

#[tokio::test]
async fn test_status_comment_and_address_edits_are_logged() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();

    orders
        .update_status(&admin(), id, &StatusId::new("processing"))
        .await
        .unwrap();
    let order = orders
        .add_comment(&admin(), id, "  Packed and ready.  ", true)
        .await
        .unwrap();
    let comment = order.comments.last().unwrap();
    assert_eq!(comment.message, "Packed and ready.");
    assert_eq!(comment.status_id, StatusId::new("processing"));
    assert!(comment.notified);

    let mut delivery = order.delivery().clone();
    delivery.city = "Dallas".to_string();
    let edit = OrderEdit {
        delivery: Some(delivery),
        ..OrderEdit::default()
    };
    let order = orders.edit(&admin(), id, edit).await.unwrap();
    assert_eq!(order.delivery().city, "Dallas");

    let history = orders.view(&admin(), id).await.unwrap().history;
    assert!(history.contains(&"Order status changed from \"Pending\" to \"Processing\".".to_string()));
    assert!(history.contains(&"Delivery city changed from \"Austin\" to \"Dallas\".".to_string()));
}

#[tokio::test]
async fn test_clerk_permissions() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();

    let viewer = Actor::new(UserId::new(5), [Permission::ViewAllOrders]);
    assert!(orders.load(&viewer, id).await.is_ok());
    assert!(matches!(
        orders.cancel(&viewer, id).await.unwrap_err(),
        OrderError::PolicyDenied { operation: Operation::Update }
    ));
    assert!(matches!(
        orders.create(&viewer, UserId::new(42)).await.unwrap_err(),
        OrderError::PolicyDenied { operation: Operation::Create }
    ));
}

#[tokio::test]
async fn test_completed_order_survives_plain_delete() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();

    let order = orders
        .update_status(&admin(), id, &StatusId::new("completed"))
        .await
        .unwrap();
    assert_eq!(order.state_id(), states::COMPLETED);

    let clerk = Actor::new(UserId::new(5), [Permission::DeleteOrders]);
    assert!(orders.delete(&clerk, id).await.is_err());
    assert_eq!(ctx.store.len().await, 1);

    orders.delete(&admin(), id).await.unwrap();
    assert!(ctx.store.is_empty().await);
}

#[tokio::test]
async fn test_cancel_and_delete_plain_order() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();

    let order = orders.cancel(&admin(), id).await.unwrap();
    assert_eq!(order.state_id(), states::CANCELED);

    let clerk = Actor::new(UserId::new(5), [Permission::DeleteOrders]);
    orders.delete(&clerk, id).await.unwrap();
    assert!(matches!(
        orders.load(&admin(), id).await.unwrap_err(),
        OrderError::NotFound { kind: "order", .. }
    ));
}

#[tokio::test]
async fn test_failed_save_reports_retry_message() {
    let ctx = TestContext::new().unwrap();
    let id = place_order(&ctx, 42).await;
    let orders = ctx.state.orders();
    ctx.store.fail_next_saves(1);

    let err = orders
        .update_status(&admin(), id, &StatusId::new("processing"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.user_message(), RETRY_MESSAGE);

    let order = orders.load(&admin(), id).await.unwrap();
    assert_eq!(order.status_id(), &StatusId::new("pending"));

    orders
        .update_status(&admin(), id, &StatusId::new("processing"))
        .await
        .unwrap();
}
