use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, UsdAmount},
    traits::ShopStoreError,
};

/// Inserts a new `Pending` order. This is not atomic on its own; callers embed it in a transaction together with
/// the product read that produced `total`, and pass `&mut *tx` as the connection argument.
///
/// A unique-constraint violation on the order id surfaces as [`ShopStoreError::StoreConflict`] so that the
/// lifecycle controller can retry with a freshly generated id.
pub async fn insert(
    order_id: OrderId,
    product_id: i64,
    total: UsdAmount,
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<Order, ShopStoreError> {
    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (order_id, product_id, qty, total, pay_method, txid, contact)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(order.qty)
    .bind(total)
    .bind(order.pay_method)
    .bind(order.txid)
    .bind(order.contact)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => ShopStoreError::StoreConflict,
        e => ShopStoreError::from(e),
    })?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_by_order_id(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// The most recent orders, newest first.
pub async fn fetch_recent(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders ORDER BY id DESC LIMIT $1").bind(limit).fetch_all(conn).await?;
    Ok(orders)
}

/// Transitions the order `Pending` -> `Approved` and stamps the approval time.
///
/// The status guard in the WHERE clause makes the transition one-directional even under concurrency: if another
/// unit of work moved the order out of `Pending` first, zero rows come back and the caller must abandon its
/// transaction.
pub async fn mark_approved(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Order, ShopStoreError> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = 'Approved', approved_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND status = \
         'Pending' RETURNING *",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    order.ok_or(ShopStoreError::StoreConflict)
}

/// Transitions the order `Pending` -> `Rejected`, guarded the same way as [`mark_approved`].
pub async fn mark_rejected(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Order, ShopStoreError> {
    let order: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = 'Rejected' WHERE order_id = $1 AND status = 'Pending' RETURNING *")
            .bind(order_id.as_str())
            .fetch_optional(conn)
            .await?;
    order.ok_or(ShopStoreError::StoreConflict)
}
