//! The order aggregate.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use storekeep_core::{Address, CurrencyCode, Email, OrderId, UserId};

use super::change_log::{ChangeLog, ChangeLogEntry, Changes, FieldChange};
use super::comment::OrderComment;
use super::data::ExtensionMap;
use super::line_item::{LineItem, LineItemKind};
use super::product::OrderProduct;
use crate::error::OrderError;
use crate::registry::{StateId, StatusId, StatusRegistry, states};

/// Which of the order's two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Billing,
    Delivery,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Billing => f.write_str("billing"),
            Self::Delivery => f.write_str("delivery"),
        }
    }
}

/// A customer order.
///
/// The state is never set on its own: it is resolved from the status
/// whenever the status changes, so the two always agree.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: Option<OrderId>,
    /// Owning customer; anonymous for guest checkouts.
    pub user_id: UserId,
    pub email: Option<Email>,
    status_id: StatusId,
    state_id: StateId,
    pub currency: CurrencyCode,
    billing: Address,
    delivery: Address,
    /// Selected payment method id.
    pub payment_method: Option<String>,
    /// Data owned by the selected payment method.
    pub payment_details: ExtensionMap,
    pub products: Vec<OrderProduct>,
    pub line_items: Vec<LineItem>,
    pub comments: Vec<OrderComment>,
    /// Client address the order was placed from.
    pub host: Option<String>,
    pane_data: BTreeMap<String, ExtensionMap>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    log: ChangeLog,
}

/// Stored order fields, as read back by a store.
#[cfg_attr(not(feature = "postgres"), allow(dead_code))]
pub(crate) struct OrderParts {
    pub id: OrderId,
    pub user_id: UserId,
    pub email: Option<Email>,
    pub status_id: StatusId,
    pub currency: CurrencyCode,
    pub billing: Address,
    pub delivery: Address,
    pub payment_method: Option<String>,
    pub payment_details: ExtensionMap,
    pub products: Vec<OrderProduct>,
    pub line_items: Vec<LineItem>,
    pub comments: Vec<OrderComment>,
    pub host: Option<String>,
    pub pane_data: BTreeMap<String, ExtensionMap>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub log: Vec<ChangeLogEntry>,
}

impl Order {
    /// A new unsaved order in the `in_checkout` state's default status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Configuration` if `in_checkout` has no statuses.
    pub fn new(registry: &StatusRegistry, user_id: UserId, currency: CurrencyCode) -> Result<Self, OrderError> {
        let state_id = StateId::from(states::IN_CHECKOUT);
        let status_id = registry.default_status(&state_id)?.id.clone();
        let now = Utc::now();
        Ok(Self {
            id: None,
            user_id,
            email: None,
            status_id,
            state_id,
            currency,
            billing: Address::default(),
            delivery: Address::default(),
            payment_method: None,
            payment_details: ExtensionMap::new(),
            products: Vec::new(),
            line_items: Vec::new(),
            comments: Vec::new(),
            host: None,
            pane_data: BTreeMap::new(),
            created_at: now,
            modified_at: now,
            log: ChangeLog::default(),
        })
    }

    /// Rebuild a stored order, resolving its state from the registry.
    #[cfg_attr(not(feature = "postgres"), allow(dead_code))]
    pub(crate) fn from_parts(registry: &StatusRegistry, parts: OrderParts) -> Result<Self, OrderError> {
        let state_id = registry.state_of(&parts.status_id)?.clone();
        Ok(Self {
            id: Some(parts.id),
            user_id: parts.user_id,
            email: parts.email,
            status_id: parts.status_id,
            state_id,
            currency: parts.currency,
            billing: parts.billing,
            delivery: parts.delivery,
            payment_method: parts.payment_method,
            payment_details: parts.payment_details,
            products: parts.products,
            line_items: parts.line_items,
            comments: parts.comments,
            host: parts.host,
            pane_data: parts.pane_data,
            created_at: parts.created_at,
            modified_at: parts.modified_at,
            log: ChangeLog::from_persisted(parts.log),
        })
    }

    /// Id assigned by the store on first save.
    #[must_use]
    pub const fn id(&self) -> Option<OrderId> {
        self.id
    }

    pub(crate) const fn set_id(&mut self, id: OrderId) {
        self.id = Some(id);
    }

    #[must_use]
    pub const fn status_id(&self) -> &StatusId {
        &self.status_id
    }

    #[must_use]
    pub const fn state_id(&self) -> &StateId {
        &self.state_id
    }

    /// Move the order to another status, updating the state with it.
    ///
    /// Returns the previous and new status ids.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is not registered.
    pub fn set_status(&mut self, registry: &StatusRegistry, status: &StatusId) -> Result<(StatusId, StatusId), OrderError> {
        let state = registry.state_of(status)?.clone();
        let old = std::mem::replace(&mut self.status_id, status.clone());
        self.state_id = state;
        Ok((old, status.clone()))
    }

    /// Set the status and log the change by display name.
    ///
    /// Returns whether the status actually changed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the status is not registered.
    pub fn change_status(&mut self, registry: &StatusRegistry, status: &StatusId, actor: UserId) -> Result<bool, OrderError> {
        let (old, new) = self.set_status(registry, status)?;
        if old == new {
            return Ok(false);
        }
        let name = |id: &StatusId| {
            registry
                .status(id)
                .map_or_else(|_| id.to_string(), |status| status.name.clone())
        };
        self.log_changes(
            actor,
            Changes::fields([("Order status", FieldChange::new(name(&old), name(&new)))]),
        );
        tracing::info!(
            order_id = ?self.id,
            old_status = %old,
            status = %new,
            state = %self.state_id,
            "Order status changed"
        );
        Ok(true)
    }

    #[must_use]
    pub const fn address(&self, kind: AddressKind) -> &Address {
        match kind {
            AddressKind::Billing => &self.billing,
            AddressKind::Delivery => &self.delivery,
        }
    }

    #[must_use]
    pub const fn billing(&self) -> &Address {
        &self.billing
    }

    #[must_use]
    pub const fn delivery(&self) -> &Address {
        &self.delivery
    }

    /// Replace an address, returning the previous one.
    pub fn set_address(&mut self, kind: AddressKind, address: Address) -> Address {
        match kind {
            AddressKind::Billing => std::mem::replace(&mut self.billing, address),
            AddressKind::Delivery => std::mem::replace(&mut self.delivery, address),
        }
    }

    /// Data stored under a pane's namespace.
    #[must_use]
    pub fn pane_data(&self, pane: &str) -> Option<&ExtensionMap> {
        self.pane_data.get(pane)
    }

    /// Mutable pane namespace, created on first use.
    pub fn pane_data_mut(&mut self, pane: &str) -> &mut ExtensionMap {
        self.pane_data.entry(pane.to_string()).or_default()
    }

    /// All pane namespaces.
    #[must_use]
    pub const fn all_pane_data(&self) -> &BTreeMap<String, ExtensionMap> {
        &self.pane_data
    }

    /// Append to the change log.
    pub fn log_changes(&mut self, actor: UserId, changes: Changes) {
        let added = self.log.append(actor, changes);
        if added > 0 {
            tracing::debug!(order_id = ?self.id, entries = added, "Order changes logged");
        }
    }

    #[must_use]
    pub const fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    pub(crate) const fn change_log_mut(&mut self) -> &mut ChangeLog {
        &mut self.log
    }

    /// Sum of product price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.products
            .iter()
            .map(OrderProduct::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Sum of line item amounts.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.line_items
            .iter()
            .map(|item| item.amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Number of product units.
    #[must_use]
    pub fn product_count(&self) -> u64 {
        self.products.iter().map(|product| u64::from(product.qty)).sum()
    }

    /// Whether any product needs shipping.
    #[must_use]
    pub fn is_shippable(&self) -> bool {
        self.products.iter().any(OrderProduct::is_shippable)
    }

    /// Keep the subtotal line item equal to the product subtotal, adding it
    /// when missing.
    pub fn sync_subtotal_line(&mut self) {
        let subtotal = self.subtotal();
        match self
            .line_items
            .iter_mut()
            .find(|item| item.kind == LineItemKind::Subtotal)
        {
            Some(item) => item.amount = subtotal,
            None => self
                .line_items
                .push(LineItem::new(LineItemKind::Subtotal, "Subtotal", subtotal, 0)),
        }
    }

    /// Line items in display order.
    #[must_use]
    pub fn display_line_items(&self) -> Vec<&LineItem> {
        let mut items: Vec<&LineItem> = self.line_items.iter().collect();
        items.sort_by_key(|item| item.weight);
        items
    }
}
