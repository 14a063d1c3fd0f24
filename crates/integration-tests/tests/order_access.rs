//! Integration tests for order access decisions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use storekeep_core::{AddressFormatter, Permission, UserId};
use storekeep_integration_tests::TestContext;
use storekeep_orders::payment::{Check, CheckConfig};
use storekeep_orders::{
    AccessDecision, AccessPolicy, Actor, DeletionEligibilityCheck, Operation, Order, StatusId,
};

fn placed_order(ctx: &TestContext, customer: i32) -> Order {
    let mut order = ctx.cart_order(customer, Decimal::TEN, true).unwrap();
    order
        .set_status(ctx.state.registry(), &StatusId::new("pending"))
        .unwrap();
    order
}

struct Frozen;

impl DeletionEligibilityCheck for Frozen {
    fn id(&self) -> &str {
        "frozen"
    }

    fn can_delete(&self, order: &Order) -> bool {
        order.pane_data("audit").is_none()
    }
}

#[test]
fn test_view_own_order_only() {
    let ctx = TestContext::new().unwrap();
    let policy = ctx.state.policy();
    let order = placed_order(&ctx, 42);

    let owner = Actor::new(UserId::new(42), [Permission::ViewOwnOrders]);
    let stranger = Actor::new(UserId::new(7), [Permission::ViewOwnOrders]);
    assert_eq!(policy.can_perform(&owner, &order, Operation::View), AccessDecision::Allowed);
    assert_eq!(policy.can_perform(&stranger, &order, Operation::View), AccessDecision::Denied);
    assert_eq!(policy.can_perform(&owner, &order, Operation::Invoice), AccessDecision::Denied);

    let staff = Actor::new(UserId::new(7), [Permission::ViewAllOrders]);
    assert!(policy.can_perform(&staff, &order, Operation::View).is_allowed());
    assert!(policy.can_perform(&staff, &order, Operation::Invoice).is_allowed());
}

#[test]
fn test_anonymous_orders_belong_to_nobody() {
    let ctx = TestContext::new().unwrap();
    let order = placed_order(&ctx, 0);
    let visitor = Actor::new(UserId::ANONYMOUS, [Permission::ViewOwnOrders]);
    assert_eq!(
        ctx.state.policy().can_perform(&visitor, &order, Operation::View),
        AccessDecision::Denied
    );
}

#[test]
fn test_update_needs_edit_permission_not_ownership() {
    let ctx = TestContext::new().unwrap();
    let policy = ctx.state.policy();
    let order = placed_order(&ctx, 42);

    let owner = Actor::new(UserId::new(42), [Permission::ViewOwnOrders]);
    let clerk = Actor::new(UserId::new(7), [Permission::EditOrders]);
    assert!(!policy.can_perform(&owner, &order, Operation::Update).is_allowed());
    assert!(policy.can_perform(&clerk, &order, Operation::Update).is_allowed());
}

#[test]
fn test_completed_orders_need_unconditional_delete() {
    let ctx = TestContext::new().unwrap();
    let policy = ctx.state.policy();
    let mut order = placed_order(&ctx, 42);

    let clerk = Actor::new(UserId::new(7), [Permission::DeleteOrders]);
    let owner_of_store = Actor::new(UserId::new(1), [Permission::UnconditionallyDeleteOrders]);
    assert!(policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());

    order
        .set_status(ctx.state.registry(), &StatusId::new("completed"))
        .unwrap();
    assert!(!policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());
    assert!(policy.can_perform(&owner_of_store, &order, Operation::Delete).is_allowed());
}

#[test]
fn test_received_payment_vetoes_plain_delete() {
    let ctx = TestContext::new().unwrap();
    let policy = ctx.state.policy();
    let mut order = placed_order(&ctx, 42);
    order.payment_method = Some("check".to_string());

    let clerk = Actor::new(UserId::new(7), [Permission::DeleteOrders]);
    assert!(policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());

    let formatter = AddressFormatter::new(ctx.state.countries(), 840);
    let check = Check::new(CheckConfig::default(), &formatter);
    check.receive_check(&mut order, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(), UserId::new(7));
    assert!(!policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());
}

#[test]
fn test_custom_deletion_check_runs_after_builtin() {
    let ctx = TestContext::new().unwrap();
    let mut policy = AccessPolicy::with_builtin_checks();
    policy.register_deletion_check(Arc::new(Frozen));
    let mut order = placed_order(&ctx, 42);

    let clerk = Actor::new(UserId::new(7), [Permission::DeleteOrders]);
    assert!(policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());
    order.pane_data_mut("audit").insert("hold", true);
    assert!(!policy.can_perform(&clerk, &order, Operation::Delete).is_allowed());
}

#[test]
fn test_decisions_are_repeatable() {
    let ctx = TestContext::new().unwrap();
    let policy = ctx.state.policy();
    let order = placed_order(&ctx, 42);

    for permission in Permission::ALL {
        for actor_id in [0, 7, 42] {
            let actor = Actor::new(UserId::new(actor_id), [permission]);
            for operation in [
                Operation::View,
                Operation::Invoice,
                Operation::Update,
                Operation::Delete,
            ] {
                let first = policy.can_perform(&actor, &order, operation);
                let second = policy.can_perform(&actor, &order, operation);
                assert_eq!(first, second, "{permission} {actor_id} {operation}");
            }
        }
    }
}
