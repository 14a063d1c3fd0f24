//! Order management commands.
//!
//! # Usage
//!
//! ```bash
//! storekeep order --actor 1 --permission view_all_orders show 42
//! storekeep order --actor 1 --permission edit_orders status 42 processing
//! storekeep order --actor 1 --permission edit_orders cancel 42
//! storekeep order --actor 1 --permission delete_orders delete 42
//! ```
//!
//! Every command goes through the order access policy as the given actor.

use storekeep_core::OrderId;
use storekeep_orders::services::OrderService;
use storekeep_orders::{Actor, OrderError, StatusId};

/// Print an order as JSON.
///
/// # Errors
///
/// Returns an error if the order is missing, access is denied, or it
/// cannot be serialized.
pub async fn show(orders: &OrderService, actor: &Actor, id: OrderId) -> Result<(), Box<dyn std::error::Error>> {
    let view = orders.view(actor, id).await?;
    let json = serde_json::to_string_pretty(&view)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

/// Move an order to another status.
///
/// # Errors
///
/// Returns an error if the order or status is unknown, access is denied, or
/// the save fails.
pub async fn set_status(orders: &OrderService, actor: &Actor, id: OrderId, status: &str) -> Result<(), OrderError> {
    let order = orders.update_status(actor, id, &StatusId::new(status)).await?;
    tracing::info!(order_id = %id, status = %order.status_id(), state = %order.state_id(), "Order status updated");
    Ok(())
}

/// Cancel an order.
///
/// # Errors
///
/// Returns an error if the order is unknown, access is denied, or the save
/// fails.
pub async fn cancel(orders: &OrderService, actor: &Actor, id: OrderId) -> Result<(), OrderError> {
    let order = orders.cancel(actor, id).await?;
    tracing::info!(order_id = %id, status = %order.status_id(), "Order canceled");
    Ok(())
}

/// Delete an order.
///
/// # Errors
///
/// Returns an error if the order is unknown, deletion is not allowed, or
/// the delete fails.
pub async fn delete(orders: &OrderService, actor: &Actor, id: OrderId) -> Result<(), OrderError> {
    orders.delete(actor, id).await
}
