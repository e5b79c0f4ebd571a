use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product, UsdAmount},
    shop_api::order_objects::ProductListing,
    traits::ShopStoreError,
};

/// Fetches a product by slug, provided it is active.
pub async fn fetch_active_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE slug = $1 AND active = 1")
        .bind(slug)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

/// Fetches a product by slug regardless of its active flag. Bulk code intake uses this so that admins can restock
/// a product that is temporarily hidden from buyers.
pub async fn fetch_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(conn).await?;
    Ok(product)
}

/// All active products, newest first, each annotated with its unsold-unit count at read time.
pub async fn active_products_with_stock(conn: &mut SqliteConnection) -> Result<Vec<ProductListing>, sqlx::Error> {
    let listings = sqlx::query_as(
        r#"
        SELECT p.*, COUNT(c.id) FILTER (WHERE c.sold = 0) AS stock
        FROM products p LEFT JOIN code_units c ON c.product_id = p.id
        WHERE p.active = 1
        GROUP BY p.id
        ORDER BY p.id DESC
        "#,
    )
    .fetch_all(conn)
    .await?;
    trace!("📝️ Fetched {} active product listings", listings.len());
    Ok(listings)
}

/// Inserts a new catalog entry. Catalog administration is outside the engine proper; this exists for provisioning
/// and test fixtures.
pub async fn insert(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, ShopStoreError> {
    let product = sqlx::query_as(
        r#"
        INSERT INTO products (slug, title, category, unit_price, image_key)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
        "#,
    )
    .bind(product.slug)
    .bind(product.title)
    .bind(product.category)
    .bind(product.unit_price)
    .bind(product.image_key)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Updates a product's unit price. Orders created before the change keep the total computed at their creation.
pub async fn set_price(
    slug: &str,
    new_price: UsdAmount,
    conn: &mut SqliteConnection,
) -> Result<Product, ShopStoreError> {
    let product = sqlx::query_as("UPDATE products SET unit_price = $1 WHERE slug = $2 RETURNING *")
        .bind(new_price)
        .bind(slug)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ShopStoreError::ProductNotFound(slug.to_string()))?;
    Ok(product)
}
