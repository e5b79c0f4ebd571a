use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CodeUnit, OrderId},
    traits::ShopStoreError,
};

/// Count of unsold code units for the product. Outside a transaction this is an advisory, possibly-stale hint;
/// inside the allocation transaction it is the authoritative count.
pub async fn unsold_count(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM code_units WHERE product_id = $1 AND sold = 0")
        .bind(product_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// The full unsold pool for the product, oldest first. Callers select from this set inside the same transaction
/// that consumes the chosen units.
pub async fn fetch_unsold(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CodeUnit>, sqlx::Error> {
    let units = sqlx::query_as("SELECT * FROM code_units WHERE product_id = $1 AND sold = 0 ORDER BY id")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(units)
}

/// Appends unsold code units to the product's inventory. The batch is not deduplicated against existing codes -
/// duplicate payloads are permitted.
pub async fn bulk_insert(
    product_id: i64,
    codes: &[String],
    conn: &mut SqliteConnection,
) -> Result<i64, ShopStoreError> {
    for code in codes {
        sqlx::query("INSERT INTO code_units (product_id, code) VALUES ($1, $2)")
            .bind(product_id)
            .bind(code)
            .execute(&mut *conn)
            .await?;
    }
    trace!("📝️ Inserted {} code units for product {product_id}", codes.len());
    Ok(codes.len() as i64)
}

/// Consumes a single unsold unit: sets the sold flag, the consumption timestamp and the owning order id together.
///
/// The `sold = 0` guard makes the flip strictly monotonic: if a concurrent allocation consumed the unit between
/// our pool read and this write, zero rows are affected and the whole transaction must be abandoned.
pub async fn consume(unit_id: i64, order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), ShopStoreError> {
    let result = sqlx::query(
        "UPDATE code_units SET sold = 1, sold_at = CURRENT_TIMESTAMP, order_id = $1 WHERE id = $2 AND sold = 0",
    )
    .bind(order_id.as_str())
    .bind(unit_id)
    .execute(conn)
    .await?;
    if result.rows_affected() != 1 {
        trace!("📝️ Code unit {unit_id} was consumed by a concurrent allocation");
        return Err(ShopStoreError::StoreConflict);
    }
    Ok(())
}

/// Records one order-code binding. Bindings are append-only; insertion order is the retrieval order.
pub async fn bind_to_order(order_id: &OrderId, code: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_code_bindings (order_id, code) VALUES ($1, $2)")
        .bind(order_id.as_str())
        .bind(code)
        .execute(conn)
        .await?;
    Ok(())
}

/// The code payloads bound to the order, in binding order.
pub async fn codes_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let codes = sqlx::query_scalar("SELECT code FROM order_code_bindings WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(codes)
}
