//! Order operations for customers and administrators.
//!
//! Every operation that touches a stored order checks the access policy
//! first, and gives the order's payment method its load, save and delete
//! callbacks around persistence.

use std::sync::Arc;

use serde::Serialize;
use storekeep_core::{Address, CurrencyCode, Email, OrderId, Permission, UserId};
use tracing::{debug, info, instrument, warn};

use crate::access::{AccessPolicy, Actor, Operation};
use crate::checkout::{PaneError, PaneInput};
use crate::db::OrderStore;
use crate::error::OrderError;
use crate::models::{AddressKind, Changes, ExtensionMap, FieldChange, Order, OrderComment, OrderProduct};
use crate::payment::PaymentMethodRegistry;
use crate::registry::{StateId, StatusId, StatusRegistry, states};

/// Comment left on orders created from the administration.
pub const ADMIN_CREATED_COMMENT: &str = "Order created by the administration.";

/// An administrative edit. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct OrderEdit {
    pub email: Option<Email>,
    pub billing: Option<Address>,
    pub delivery: Option<Address>,
    /// Switch to another registered payment method.
    pub payment_method: Option<String>,
    /// Input for the payment method's edit form.
    pub payment_input: Option<PaneInput>,
}

/// An order with the display details a viewer is allowed to see.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub status_name: String,
    pub state_title: String,
    pub payment_method_name: Option<String>,
    /// Admin or customer payment summary, depending on the viewer.
    pub payment_lines: Vec<String>,
    /// Rendered change log, administrators only.
    pub history: Vec<String>,
}

/// Order lifecycle operations over a store.
#[derive(Clone)]
pub struct OrderService {
    registry: Arc<StatusRegistry>,
    payments: Arc<PaymentMethodRegistry>,
    policy: Arc<AccessPolicy>,
    store: Arc<dyn OrderStore>,
    currency: CurrencyCode,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("payments", &self.payments)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl OrderService {
    #[must_use]
    pub fn new(
        registry: Arc<StatusRegistry>,
        payments: Arc<PaymentMethodRegistry>,
        policy: Arc<AccessPolicy>,
        store: Arc<dyn OrderStore>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            registry,
            payments,
            policy,
            store,
            currency,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<StatusRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }

    /// A fresh, unsaved order for a customer about to check out.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if the checkout state has no
    /// statuses.
    pub fn start_checkout(&self, customer: UserId, products: Vec<OrderProduct>) -> Result<Order, OrderError> {
        let mut order = Order::new(&self.registry, customer, self.currency)?;
        order.products = products;
        order.sync_subtotal_line();
        debug!(customer = %customer, products = order.products.len(), "Checkout order created");
        Ok(order)
    }

    /// Create an order from the administration, already past checkout.
    ///
    /// # Errors
    ///
    /// - `OrderError::PolicyDenied` without the create orders permission
    /// - `OrderError::Configuration` if the post checkout state has no statuses
    /// - `OrderError::Persistence` if the save fails
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn create(&self, actor: &Actor, customer: UserId) -> Result<Order, OrderError> {
        if !self.policy.can_create(actor).is_allowed() {
            warn!(actor = %actor.id, "Order creation denied");
            return Err(OrderError::PolicyDenied {
                operation: Operation::Create,
            });
        }

        let mut order = Order::new(&self.registry, customer, self.currency)?;
        let status = self
            .registry
            .default_status(&StateId::new(states::POST_CHECKOUT))?
            .id
            .clone();
        order.set_status(&self.registry, &status)?;
        order.sync_subtotal_line();
        order
            .comments
            .push(OrderComment::new(actor.id, ADMIN_CREATED_COMMENT, status));

        let order_id = self.save(&mut order).await?;
        info!(%order_id, customer = %customer, "Order created");
        Ok(order)
    }

    /// Load an order the actor may view.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown ids and
    /// `OrderError::PolicyDenied` when the actor may not view it.
    pub async fn load(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        let order = self.fetch(id, false).await?;
        self.policy.ensure(actor, &order, Operation::View)?;
        Ok(order)
    }

    /// Load an order with the details shown on its page.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn view(&self, actor: &Actor, id: OrderId) -> Result<OrderView, OrderError> {
        let order = self.load(actor, id).await?;
        let admin = actor.has(Permission::ViewAllOrders);
        let method = self.payments.for_order(&order);
        let payment_lines = method.map_or_else(Vec::new, |method| {
            if admin {
                method.order_view(&order)
            } else {
                method.customer_view(&order)
            }
        });
        let history = if admin {
            order.change_log().entries().iter().map(|entry| entry.describe()).collect()
        } else {
            Vec::new()
        };

        Ok(OrderView {
            status_name: self.registry.status(order.status_id())?.name.clone(),
            state_title: self
                .registry
                .state(order.state_id())
                .map_or_else(|| order.state_id().to_string(), |state| state.title.clone()),
            payment_method_name: method.map(|method| method.name().to_string()),
            payment_lines,
            history,
            order,
        })
    }

    /// Move an order to another status.
    ///
    /// # Errors
    ///
    /// - `OrderError::NotFound` for unknown orders or statuses
    /// - `OrderError::PolicyDenied` without the edit orders permission
    /// - `OrderError::Persistence` if the save fails
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_status(&self, actor: &Actor, id: OrderId, status: &StatusId) -> Result<Order, OrderError> {
        let mut order = self.fetch(id, true).await?;
        self.policy.ensure(actor, &order, Operation::Update)?;
        if order.change_status(&self.registry, status, actor.id)? {
            self.save(&mut order).await?;
        }
        Ok(order)
    }

    /// Apply an administrative edit, logging each changed field.
    ///
    /// # Errors
    ///
    /// - `OrderError::PolicyDenied` without the edit orders permission
    /// - `OrderError::NotFound` for unknown orders or payment methods
    /// - `OrderError::Validation` if the payment method rejects its input
    /// - `OrderError::Persistence` if the save fails
    #[instrument(skip(self, actor, edit), fields(actor = %actor.id))]
    pub async fn edit(&self, actor: &Actor, id: OrderId, edit: OrderEdit) -> Result<Order, OrderError> {
        let mut order = self.fetch(id, true).await?;
        self.policy.ensure(actor, &order, Operation::Update)?;

        let mut changes: Vec<(String, FieldChange)> = Vec::new();
        if let Some(email) = edit.email {
            let old = order.email.replace(email.clone());
            changes.push((
                "E-mail address".to_string(),
                FieldChange::new(old.as_ref().map(Email::as_str).unwrap_or_default(), email.as_str()),
            ));
        }
        for (kind, address) in [(AddressKind::Billing, edit.billing), (AddressKind::Delivery, edit.delivery)] {
            if let Some(address) = address {
                let old = order.set_address(kind, address);
                changes.extend(address_changes(kind, &old, order.address(kind)));
            }
        }
        if let Some(method_id) = edit.payment_method {
            let method = self.payments.get(&method_id).ok_or_else(|| OrderError::NotFound {
                kind: "payment method",
                id: method_id.clone(),
            })?;
            let old = order.payment_method.replace(method_id.clone());
            if old.as_deref() != Some(method.id()) {
                order.payment_details = ExtensionMap::default();
                changes.push((
                    "Payment method".to_string(),
                    FieldChange::new(old.unwrap_or_default(), method_id),
                ));
            }
        }
        if let Some(input) = edit.payment_input {
            if let Some(method) = self.payments.for_order(&order).cloned() {
                method
                    .order_edit_process(&mut order, &input)
                    .map_err(|message| PaneError::pane("payment", message))?;
            }
        }

        order.log_changes(actor.id, Changes::fields(changes));
        self.save(&mut order).await?;
        Ok(order)
    }

    /// Leave a comment on an order, tagged with its current status.
    ///
    /// # Errors
    ///
    /// - `OrderError::PolicyDenied` without the edit orders permission
    /// - `OrderError::Persistence` if the save fails
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: OrderId,
        message: &str,
        notify: bool,
    ) -> Result<Order, OrderError> {
        let mut order = self.fetch(id, true).await?;
        self.policy.ensure(actor, &order, Operation::Update)?;
        let mut comment = OrderComment::new(actor.id, message.trim(), order.status_id().clone());
        comment.notified = notify;
        order.comments.push(comment);
        self.save(&mut order).await?;
        debug!(order_id = %id, notify, "Order comment added");
        Ok(order)
    }

    /// Cancel an order by moving it to the canceled state's default status.
    ///
    /// # Errors
    ///
    /// Same as [`update_status`](Self::update_status), plus
    /// `OrderError::Configuration` if the canceled state has no statuses.
    pub async fn cancel(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        let status = self
            .registry
            .default_status(&StateId::new(states::CANCELED))?
            .id
            .clone();
        let order = self.update_status(actor, id, &status).await?;
        info!(order_id = %id, actor = %actor.id, "Order canceled");
        Ok(order)
    }

    /// Delete an order and everything attached to it.
    ///
    /// # Errors
    ///
    /// - `OrderError::NotFound` for unknown orders
    /// - `OrderError::PolicyDenied` when deletion is not allowed
    /// - `OrderError::Persistence` if the delete fails
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: &Actor, id: OrderId) -> Result<(), OrderError> {
        let order = self.fetch(id, true).await?;
        self.policy.ensure(actor, &order, Operation::Delete)?;
        if let Some(method) = self.payments.for_order(&order) {
            method.order_delete(&order);
        }
        self.store.delete(id).await?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Save an order after giving its payment method a chance to update it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Persistence` if the store fails; `order` is left
    /// as it was.
    pub async fn save(&self, order: &mut Order) -> Result<OrderId, OrderError> {
        let mut working = order.clone();
        if let Some(method) = self.payments.for_order(&working).cloned() {
            method.order_save(&mut working);
        }
        match self.store.save(&mut working).await {
            Ok(order_id) => {
                *order = working;
                debug!(%order_id, status = %order.status_id(), "Order saved");
                Ok(order_id)
            }
            Err(error) => {
                warn!(order_id = ?order.id(), error = %error, "Order save failed");
                Err(error.into())
            }
        }
    }

    async fn fetch(&self, id: OrderId, unchanged: bool) -> Result<Order, OrderError> {
        let loaded = if unchanged {
            self.store.load_unchanged(id).await?
        } else {
            self.store.load(id).await?
        };
        let mut order = loaded.ok_or_else(|| OrderError::order_not_found(id))?;
        if let Some(method) = self.payments.for_order(&order).cloned() {
            method.order_load(&mut order);
        }
        Ok(order)
    }
}

fn address_changes(kind: AddressKind, old: &Address, new: &Address) -> Vec<(String, FieldChange)> {
    let prefix = match kind {
        AddressKind::Billing => "Billing",
        AddressKind::Delivery => "Delivery",
    };
    let fields: [(&str, String, String); 11] = [
        ("first name", old.first_name.clone(), new.first_name.clone()),
        ("last name", old.last_name.clone(), new.last_name.clone()),
        ("company", old.company.clone(), new.company.clone()),
        ("street address", old.street1.clone(), new.street1.clone()),
        ("street address 2", old.street2.clone(), new.street2.clone()),
        ("city", old.city.clone(), new.city.clone()),
        ("zone", old.zone.to_string(), new.zone.to_string()),
        ("country", old.country.to_string(), new.country.to_string()),
        ("postal code", old.postal_code.clone(), new.postal_code.clone()),
        ("phone number", old.phone.clone(), new.phone.clone()),
        ("e-mail", old.email.clone(), new.email.clone()),
    ];
    fields
        .into_iter()
        .filter(|(_, old, new)| old != new)
        .map(|(label, old, new)| (format!("{prefix} {label}"), FieldChange::new(old, new)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::MemoryOrderStore;
    use crate::payment::{Check, CheckConfig};
    use chrono::NaiveDate;
    use storekeep_core::{AddressFormatter, StaticCountryDirectory};

    fn service() -> (OrderService, Arc<MemoryOrderStore>, Arc<Check>) {
        let countries = StaticCountryDirectory::with_defaults();
        let check = Check::new(CheckConfig::default(), &AddressFormatter::new(&countries, 840));
        let payments = PaymentMethodRegistry::with_builtin(check.clone());
        let store = Arc::new(MemoryOrderStore::new());
        let service = OrderService::new(
            Arc::new(StatusRegistry::builtin()),
            Arc::new(payments),
            Arc::new(AccessPolicy::with_builtin_checks()),
            Arc::clone(&store) as Arc<dyn OrderStore>,
            CurrencyCode::USD,
        );
        (service, store, Arc::new(check))
    }

    fn admin() -> Actor {
        Actor::administrator(UserId::new(1))
    }

    #[tokio::test]
    async fn test_create_requires_permission() {
        let (service, store, _) = service();
        let clerk = Actor::new(UserId::new(5), [Permission::EditOrders]);
        let err = service.create(&clerk, UserId::new(42)).await.unwrap_err();
        assert!(matches!(err, OrderError::PolicyDenied { operation: Operation::Create }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_starts_post_checkout() {
        let (service, _, _) = service();
        let order = service.create(&admin(), UserId::new(42)).await.unwrap();
        assert!(order.id().is_some());
        assert_eq!(order.state_id(), states::POST_CHECKOUT);
        assert_eq!(order.comments.len(), 1);
        assert_eq!(order.comments[0].message, ADMIN_CREATED_COMMENT);
    }

    #[tokio::test]
    async fn test_update_status_logs_change() {
        let (service, _, _) = service();
        let id = service.create(&admin(), UserId::new(42)).await.unwrap().id().unwrap();

        let order = service
            .update_status(&admin(), id, &StatusId::new("processing"))
            .await
            .unwrap();
        assert_eq!(
            order.change_log().entries()[0].describe(),
            "Order status changed from \"Pending\" to \"Processing\"."
        );

        let err = service
            .update_status(&admin(), id, &StatusId::new("lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_customer_sees_own_order_only() {
        let (service, _, _) = service();
        let id = service.create(&admin(), UserId::new(42)).await.unwrap().id().unwrap();

        let owner = Actor::new(UserId::new(42), [Permission::ViewOwnOrders]);
        let view = service.view(&owner, id).await.unwrap();
        assert_eq!(view.status_name, "Pending");
        assert!(view.history.is_empty());

        let stranger = Actor::new(UserId::new(7), [Permission::ViewOwnOrders]);
        assert!(matches!(
            service.view(&stranger, id).await.unwrap_err(),
            OrderError::PolicyDenied { operation: Operation::View }
        ));
    }

    #[tokio::test]
    async fn test_edit_logs_each_field() {
        let (service, _, _) = service();
        let id = service.create(&admin(), UserId::new(42)).await.unwrap().id().unwrap();

        let mut billing = Address::new(840);
        billing.first_name = "Ada".to_string();
        let edit = OrderEdit {
            email: Some(Email::parse("ada@example.com").unwrap()),
            billing: Some(billing),
            payment_method: Some("other".to_string()),
            payment_input: Some(PaneInput::new().with("description", "Wire transfer")),
            ..OrderEdit::default()
        };
        let order = service.edit(&admin(), id, edit).await.unwrap();

        let described: Vec<String> = order.change_log().entries().iter().map(|e| e.describe()).collect();
        assert!(described.contains(&"E-mail address changed from \"\" to \"ada@example.com\".".to_string()));
        assert!(described.contains(&"Billing first name changed from \"\" to \"Ada\".".to_string()));
        assert!(described.contains(&"Payment method changed from \"\" to \"other\".".to_string()));
        assert_eq!(order.payment_details.text("description"), Some("Wire transfer"));

        let bad = OrderEdit {
            payment_method: Some("barter".to_string()),
            ..OrderEdit::default()
        };
        assert!(matches!(
            service.edit(&admin(), id, bad).await.unwrap_err(),
            OrderError::NotFound { kind: "payment method", .. }
        ));
    }

    #[tokio::test]
    async fn test_cancel_then_delete() {
        let (service, store, _) = service();
        let id = service.create(&admin(), UserId::new(42)).await.unwrap().id().unwrap();

        let order = service.cancel(&admin(), id).await.unwrap();
        assert_eq!(order.state_id(), states::CANCELED);

        service.delete(&admin(), id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            service.delete(&admin(), id).await.unwrap_err(),
            OrderError::NotFound { kind: "order", .. }
        ));
    }

    #[tokio::test]
    async fn test_received_check_blocks_plain_delete() {
        let (service, _, check) = service();
        let mut order = service.create(&admin(), UserId::new(42)).await.unwrap();
        let id = order.id().unwrap();
        order.payment_method = Some("check".to_string());
        check.receive_check(&mut order, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), UserId::new(1));
        service.save(&mut order).await.unwrap();

        let clerk = Actor::new(UserId::new(5), [Permission::DeleteOrders]);
        assert!(matches!(
            service.delete(&clerk, id).await.unwrap_err(),
            OrderError::PolicyDenied { operation: Operation::Delete }
        ));
        service.delete(&admin(), id).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_save_is_retryable() {
        let (service, store, _) = service();
        let id = service.create(&admin(), UserId::new(42)).await.unwrap().id().unwrap();
        store.fail_next_saves(1);

        let err = service.add_comment(&admin(), id, "Called customer", false).await.unwrap_err();
        assert!(err.is_retryable());
        let order = service.load(&admin(), id).await.unwrap();
        assert_eq!(order.comments.len(), 1);
    }
}
