//! `PostgreSQL` order store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use storekeep_core::{
    Address, CommentId, CurrencyCode, Email, LineItemId, OrderId, OrderProductId,
};

use super::{OrderStore, RepositoryError};
use crate::models::{
    ChangeLogEntry, ExtensionMap, LineItem, LineItemKind, Order, OrderComment, OrderParts,
    OrderProduct, ProductData,
};
use crate::registry::{StatusId, StatusRegistry};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Order store backed by `PostgreSQL`.
///
/// There is no read cache, so `load` and `load_unchanged` both read the
/// committed rows.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
    registry: Arc<StatusRegistry>,
}

impl PgOrderStore {
    /// Create a store. The registry resolves each loaded order's state.
    #[must_use]
    pub const fn new(pool: PgPool, registry: Arc<StatusRegistry>) -> Self {
        Self { pool, registry }
    }

    async fn fetch(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = sqlx::query(
            r"
            SELECT order_id, user_id, email, status_id, currency, billing, delivery,
                   payment_method, payment_details, pane_data, host, created_at, modified_at
            FROM orders
            WHERE order_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let products = sqlx::query(
            r"
            SELECT order_product_id, product_id, title, model, qty, cost, price,
                   weight, weight_units, shippable, data
            FROM order_products
            WHERE order_id = $1
            ORDER BY position, order_product_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(product_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let line_items = sqlx::query(
            r"
            SELECT line_item_id, kind, title, amount, weight
            FROM order_line_items
            WHERE order_id = $1
            ORDER BY line_item_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok::<_, RepositoryError>(LineItem {
                id: Some(row.try_get::<LineItemId, _>("line_item_id")?),
                kind: LineItemKind::from(row.try_get::<String, _>("kind")?),
                title: row.try_get("title")?,
                amount: row.try_get("amount")?,
                weight: row.try_get("weight")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        let comments = sqlx::query(
            r"
            SELECT comment_id, user_id, message, status_id, notified, created_at
            FROM order_comments
            WHERE order_id = $1
            ORDER BY created_at, comment_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok::<_, RepositoryError>(OrderComment {
                id: Some(row.try_get::<CommentId, _>("comment_id")?),
                user_id: row.try_get("user_id")?,
                message: row.try_get("message")?,
                status_id: StatusId::new(row.try_get::<String, _>("status_id")?),
                notified: row.try_get("notified")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        let log = sqlx::query("SELECT entry FROM order_log WHERE order_id = $1 ORDER BY log_id")
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| Ok::<_, RepositoryError>(row.try_get::<Json<ChangeLogEntry>, _>("entry")?.0))
            .collect::<Result<Vec<_>, _>>()?;

        let email = row
            .try_get::<Option<String>, _>("email")?
            .map(|email| Email::parse(&email))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {id} email: {e}")))?;
        let currency = row
            .try_get::<String, _>("currency")?
            .parse::<CurrencyCode>()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {id}: {e}")))?;

        let parts = OrderParts {
            id,
            user_id: row.try_get("user_id")?,
            email,
            status_id: StatusId::new(row.try_get::<String, _>("status_id")?),
            currency,
            billing: row.try_get::<Json<Address>, _>("billing")?.0,
            delivery: row.try_get::<Json<Address>, _>("delivery")?.0,
            payment_method: row.try_get("payment_method")?,
            payment_details: row.try_get::<Json<ExtensionMap>, _>("payment_details")?.0,
            products,
            line_items,
            comments,
            host: row.try_get("host")?,
            pane_data: row
                .try_get::<Json<BTreeMap<String, ExtensionMap>>, _>("pane_data")?
                .0,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            modified_at: row.try_get::<DateTime<Utc>, _>("modified_at")?,
            log,
        };

        Order::from_parts(&self.registry, parts)
            .map(Some)
            .map_err(|e| RepositoryError::DataCorruption(format!("order {id}: {e}")))
    }
}

fn product_from_row(row: &PgRow) -> Result<OrderProduct, RepositoryError> {
    let qty: i32 = row.try_get("qty")?;
    Ok(OrderProduct {
        id: Some(row.try_get::<OrderProductId, _>("order_product_id")?),
        product_id: row.try_get("product_id")?,
        title: row.try_get("title")?,
        model: row.try_get("model")?,
        qty: u32::try_from(qty)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {qty}")))?,
        cost: row.try_get::<Decimal, _>("cost")?,
        price: row.try_get::<Decimal, _>("price")?,
        weight: row.try_get::<Decimal, _>("weight")?,
        weight_units: row.try_get("weight_units")?,
        shippable: row.try_get("shippable")?,
        data: row.try_get::<Json<ProductData>, _>("data")?.0,
    })
}

async fn write_order_row(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    now: DateTime<Utc>,
) -> Result<OrderId, RepositoryError> {
    let email = order.email.as_ref().map(Email::as_str);
    let billing = Json(order.billing());
    let delivery = Json(order.delivery());
    let payment_details = Json(&order.payment_details);
    let pane_data = Json(order.all_pane_data());

    if let Some(id) = order.id() {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET user_id = $2, email = $3, status_id = $4, currency = $5, billing = $6,
                delivery = $7, payment_method = $8, payment_details = $9, pane_data = $10,
                host = $11, modified_at = $12
            WHERE order_id = $1
            ",
        )
        .bind(id)
        .bind(order.user_id)
        .bind(email)
        .bind(order.status_id().as_str())
        .bind(order.currency.code())
        .bind(billing)
        .bind(delivery)
        .bind(order.payment_method.as_deref())
        .bind(payment_details)
        .bind(pane_data)
        .bind(order.host.as_deref())
        .bind(now)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        return Ok(id);
    }

    let id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO orders (user_id, email, status_id, currency, billing, delivery,
                            payment_method, payment_details, pane_data, host,
                            created_at, modified_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING order_id
        ",
    )
    .bind(order.user_id)
    .bind(email)
    .bind(order.status_id().as_str())
    .bind(order.currency.code())
    .bind(billing)
    .bind(delivery)
    .bind(order.payment_method.as_deref())
    .bind(payment_details)
    .bind(pane_data)
    .bind(order.host.as_deref())
    .bind(order.created_at)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

async fn write_products(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    products: &mut [OrderProduct],
) -> Result<(), RepositoryError> {
    let kept: Vec<i32> = products
        .iter()
        .filter_map(|product| product.id.map(i32::from))
        .collect();
    sqlx::query("DELETE FROM order_products WHERE order_id = $1 AND NOT (order_product_id = ANY($2))")
        .bind(id)
        .bind(&kept)
        .execute(&mut **tx)
        .await?;

    for (position, product) in products.iter_mut().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| RepositoryError::Conflict("too many products".to_string()))?;
        let qty = i32::try_from(product.qty)
            .map_err(|_| RepositoryError::Conflict(format!("quantity {} too large", product.qty)))?;
        let product_id = sqlx::query_scalar::<_, OrderProductId>(
            r"
            INSERT INTO order_products (order_product_id, order_id, position, product_id, title,
                                        model, qty, cost, price, weight, weight_units,
                                        shippable, data)
            VALUES (COALESCE($1, nextval('order_products_order_product_id_seq')), $2, $3, $4,
                    $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (order_product_id) DO UPDATE
            SET position = EXCLUDED.position, product_id = EXCLUDED.product_id,
                title = EXCLUDED.title, model = EXCLUDED.model, qty = EXCLUDED.qty,
                cost = EXCLUDED.cost, price = EXCLUDED.price, weight = EXCLUDED.weight,
                weight_units = EXCLUDED.weight_units, shippable = EXCLUDED.shippable,
                data = EXCLUDED.data
            RETURNING order_product_id
            ",
        )
        .bind(product.id)
        .bind(id)
        .bind(position)
        .bind(product.product_id)
        .bind(&product.title)
        .bind(&product.model)
        .bind(qty)
        .bind(product.cost)
        .bind(product.price)
        .bind(product.weight)
        .bind(&product.weight_units)
        .bind(product.shippable)
        .bind(Json(&product.data))
        .fetch_one(&mut **tx)
        .await?;
        product.id = Some(product_id);
    }
    Ok(())
}

async fn write_line_items(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    line_items: &mut [LineItem],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM order_line_items WHERE order_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    for item in line_items.iter_mut() {
        let item_id = sqlx::query_scalar::<_, LineItemId>(
            r"
            INSERT INTO order_line_items (line_item_id, order_id, kind, title, amount, weight)
            VALUES (COALESCE($1, nextval('order_line_items_line_item_id_seq')), $2, $3, $4, $5, $6)
            RETURNING line_item_id
            ",
        )
        .bind(item.id)
        .bind(id)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(item.amount)
        .bind(item.weight)
        .fetch_one(&mut **tx)
        .await?;
        item.id = Some(item_id);
    }
    Ok(())
}

async fn write_comments(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    comments: &mut [OrderComment],
) -> Result<(), RepositoryError> {
    for comment in comments.iter_mut().filter(|comment| comment.id.is_none()) {
        let comment_id = sqlx::query_scalar::<_, CommentId>(
            r"
            INSERT INTO order_comments (order_id, user_id, message, status_id, notified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING comment_id
            ",
        )
        .bind(id)
        .bind(comment.user_id)
        .bind(&comment.message)
        .bind(comment.status_id.as_str())
        .bind(comment.notified)
        .bind(comment.created_at)
        .fetch_one(&mut **tx)
        .await?;
        comment.id = Some(comment_id);
    }
    Ok(())
}

async fn append_log(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    entries: &[ChangeLogEntry],
) -> Result<(), RepositoryError> {
    for entry in entries {
        sqlx::query("INSERT INTO order_log (order_id, actor, created_at, entry) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(entry.actor)
            .bind(entry.created_at)
            .bind(Json(entry))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn load(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.fetch(id).await
    }

    async fn load_unchanged(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.fetch(id).await
    }

    async fn save(&self, order: &mut Order) -> Result<OrderId, RepositoryError> {
        let mut saved = order.clone();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let id = write_order_row(&mut tx, &saved, now).await?;
        write_products(&mut tx, id, &mut saved.products).await?;
        write_line_items(&mut tx, id, &mut saved.line_items).await?;
        write_comments(&mut tx, id, &mut saved.comments).await?;
        append_log(&mut tx, id, saved.change_log().pending()).await?;
        tx.commit().await?;

        saved.set_id(id);
        saved.modified_at = now;
        saved.change_log_mut().mark_persisted();
        *order = saved;

        tracing::debug!(order_id = %id, "Order saved");
        Ok(id)
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::debug!(order_id = %id, "Order deleted");
        Ok(())
    }
}

