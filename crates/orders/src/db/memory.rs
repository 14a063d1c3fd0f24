//! In-memory order store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use storekeep_core::{CommentId, LineItemId, OrderId, OrderProductId};
use tokio::sync::RwLock;

use super::{OrderStore, RepositoryError};
use crate::models::Order;

/// Order store backed by process memory.
///
/// Committed rows and a read cache are kept apart: `load` serves from the
/// cache when it can, `load_unchanged` always reads the committed row.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    rows: RwLock<HashMap<OrderId, Order>>,
    cache: RwLock<HashMap<OrderId, Order>>,
    next_id: AtomicI32,
    next_child_id: AtomicI32,
    failing_saves: AtomicUsize,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail with a storage error.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Number of committed orders.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Replace a cached copy without committing it.
    pub async fn prime_cache(&self, order: Order) {
        if let Some(id) = order.id() {
            self.cache.write().await.insert(id, order);
        }
    }

    fn take_failure(&self) -> bool {
        self.failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn child_id(&self) -> i32 {
        self.next_child_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        if let Some(order) = self.cache.read().await.get(&id) {
            return Ok(Some(order.clone()));
        }
        let order = self.rows.read().await.get(&id).cloned();
        if let Some(order) = &order {
            self.cache.write().await.insert(id, order.clone());
        }
        Ok(order)
    }

    async fn load_unchanged(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, order: &mut Order) -> Result<OrderId, RepositoryError> {
        if self.take_failure() {
            tracing::warn!(order_id = ?order.id(), "Order save failed");
            return Err(RepositoryError::Storage("injected save failure".to_string()));
        }

        let mut rows = self.rows.write().await;
        let mut saved = order.clone();
        let id = match saved.id() {
            Some(id) if rows.contains_key(&id) => id,
            Some(_) => return Err(RepositoryError::NotFound),
            None => {
                let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                saved.set_id(id);
                id
            }
        };
        for product in &mut saved.products {
            product.id.get_or_insert_with(|| OrderProductId::new(self.child_id()));
        }
        for item in &mut saved.line_items {
            item.id.get_or_insert_with(|| LineItemId::new(self.child_id()));
        }
        for comment in &mut saved.comments {
            comment.id.get_or_insert_with(|| CommentId::new(self.child_id()));
        }
        saved.modified_at = Utc::now();
        saved.change_log_mut().mark_persisted();

        rows.insert(id, saved.clone());
        self.cache.write().await.insert(id, saved.clone());
        drop(rows);

        tracing::debug!(order_id = %id, "Order saved");
        *order = saved;
        Ok(id)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let removed = self.rows.write().await.remove(&id);
        self.cache.write().await.remove(&id);
        if removed.is_none() {
            return Err(RepositoryError::NotFound);
        }
        tracing::debug!(order_id = %id, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::{Changes, OrderProduct};
    use crate::registry::StatusRegistry;
    use rust_decimal::Decimal;
    use storekeep_core::{CurrencyCode, UserId};

    fn new_order() -> Order {
        Order::new(&StatusRegistry::builtin(), UserId::new(5), CurrencyCode::USD).unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        order.products.push(OrderProduct::new(1, "Pineapple", "PA", 1, Decimal::ONE));
        order.log_changes(UserId::new(5), Changes::message("Created."));

        let id = store.save(&mut order).await.unwrap();
        assert_eq!(order.id(), Some(id));
        assert!(order.products[0].id.is_some());
        assert!(order.change_log().pending().is_empty());

        let again = store.save(&mut order).await.unwrap();
        assert_eq!(again, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_order_unchanged() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        order.log_changes(UserId::new(5), Changes::message("Created."));
        store.fail_next_saves(1);

        assert!(matches!(store.save(&mut order).await, Err(RepositoryError::Storage(_))));
        assert!(order.id().is_none());
        assert_eq!(order.change_log().pending().len(), 1);
        assert!(store.is_empty().await);

        assert!(store.save(&mut order).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_unchanged_bypasses_cache() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        let id = store.save(&mut order).await.unwrap();

        let mut cached = order.clone();
        cached.host = Some("10.0.0.1".to_string());
        store.prime_cache(cached).await;

        let loaded = store.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.host.as_deref(), Some("10.0.0.1"));
        let unchanged = store.load_unchanged(id).await.unwrap().unwrap();
        assert!(unchanged.host.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        let id = store.save(&mut order).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.load(id).await.unwrap().is_none());
        assert!(matches!(store.delete(id).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_saving_deleted_order_is_not_found() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        let id = store.save(&mut order).await.unwrap();
        store.delete(id).await.unwrap();

        order.host = Some("10.0.0.1".to_string());
        assert!(matches!(store.save(&mut order).await, Err(RepositoryError::NotFound)));
        assert!(store.is_empty().await);
        assert!(order.host.is_some());
    }
}
