//! `SqliteDatabase` is a concrete implementation of a code shop engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`ShopStore`] trait. All coordination between
//! concurrent operations is delegated to SQLite's transaction isolation: the allocation unit of work re-reads the
//! unsold pool inside its own transaction, and every state-changing write carries a guard clause so that a lost
//! race surfaces as a retryable conflict rather than a double-spend.
use std::{fmt::Debug, sync::Arc};

use log::*;
use sqlx::SqlitePool;

use super::db::{codes, db_url, new_pool, orders, products};
use crate::{
    db_types::{NewOrder, NewProduct, Order, OrderId, OrderStatusType, Product, UsdAmount},
    shop_api::order_objects::{AllocationResult, OrderWithCodes, ProductListing, StockAdded},
    traits::{CodeSelector, ShopStore, ShopStoreError, UniformRandomSelector},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    selector: Arc<dyn CodeSelector>,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ShopStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_active_products(&self) -> Result<Vec<ProductListing>, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let listings = products::active_products_with_stock(&mut conn).await?;
        Ok(listings)
    }

    async fn fetch_active_product_by_slug(&self, slug: &str) -> Result<Option<Product>, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_active_by_slug(slug, &mut conn).await?;
        Ok(product)
    }

    async fn available_count(&self, product_id: i64) -> Result<i64, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = codes::unsold_count(product_id, &mut conn).await?;
        Ok(count)
    }

    async fn bulk_insert_codes(&self, slug: &str, codes_batch: &[String]) -> Result<StockAdded, ShopStoreError> {
        let cleaned: Vec<String> =
            codes_batch.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).map(String::from).collect();
        if cleaned.is_empty() {
            return Err(ShopStoreError::EmptyCodeBatch);
        }
        let mut tx = self.pool.begin().await?;
        let product = products::fetch_by_slug(slug, &mut tx)
            .await?
            .ok_or_else(|| ShopStoreError::ProductNotFound(slug.to_string()))?;
        let added = codes::bulk_insert(product.id, &cleaned, &mut tx).await?;
        let stock = codes::unsold_count(product.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {added} code units added to product '{slug}'. Unsold count is now {stock}");
        Ok(StockAdded { added, stock })
    }

    /// Stores a new `Pending` order. The product read, the total computation and the insert share one transaction,
    /// so the total always reflects the price at the instant of creation.
    ///
    /// The zero-stock check here is an advisory courtesy to buyers. It reserves nothing: an order may legitimately
    /// request more units than are currently unsold (the admin can restock before approving), and approval always
    /// re-checks the pool authoritatively inside its own unit of work.
    async fn insert_order(&self, order_id: OrderId, order: NewOrder) -> Result<Order, ShopStoreError> {
        let mut tx = self.pool.begin().await?;
        let product = products::fetch_active_by_slug(&order.product_slug, &mut tx)
            .await?
            .ok_or_else(|| ShopStoreError::ProductNotFound(order.product_slug.clone()))?;
        let available = codes::unsold_count(product.id, &mut tx).await?;
        if available == 0 {
            return Err(ShopStoreError::InsufficientStock { available: 0, requested: order.qty });
        }
        let total = product.unit_price * order.qty;
        let order = orders::insert(order_id, product.id, total, order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] saved with status {} and total {}", order.order_id, order.status, order.total);
        Ok(order)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_with_codes(&self, order_id: &OrderId) -> Result<Option<OrderWithCodes>, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_by_order_id(order_id, &mut conn).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let bound = codes::codes_for_order(order_id, &mut conn).await?;
        let remaining = codes::unsold_count(order.product_id, &mut conn).await?;
        Ok(Some(OrderWithCodes { order, codes: bound, remaining }))
    }

    async fn fetch_recent_orders(&self, limit: i64) -> Result<Vec<Order>, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_recent(limit, &mut conn).await?;
        Ok(orders)
    }

    /// The allocation unit of work. See [`ShopStore::allocate_codes`] for the contract.
    ///
    /// Everything from the status check to the approval stamp happens inside one transaction. The unsold pool is
    /// re-read here, never taken from an advisory count, and each consumed unit carries a `sold = 0` guard, so a
    /// concurrent allocation that won a unit forces this transaction to roll back with a retryable conflict.
    async fn allocate_codes(&self, order_id: &OrderId) -> Result<AllocationResult, ShopStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| ShopStoreError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::Approved => {
                // Replay: return the bindings recorded by the original allocation, touch nothing.
                let bound = codes::codes_for_order(order_id, &mut tx).await?;
                let remaining = codes::unsold_count(order.product_id, &mut tx).await?;
                tx.commit().await?;
                return Ok(AllocationResult { order, codes: bound, remaining, already: true });
            },
            OrderStatusType::Rejected => {
                return Err(ShopStoreError::InvalidTransition {
                    from: OrderStatusType::Rejected,
                    to: OrderStatusType::Approved,
                });
            },
            OrderStatusType::Pending => {},
        }
        let pool = codes::fetch_unsold(order.product_id, &mut tx).await?;
        let available = pool.len() as i64;
        if available < order.qty {
            debug!(
                "🗃️ Order [{order_id}] cannot be fulfilled: {available} units available, {} requested",
                order.qty
            );
            return Err(ShopStoreError::InsufficientStock { available, requested: order.qty });
        }
        let picks = self.selector.select(pool.len(), order.qty as usize);
        let mut bound = Vec::with_capacity(picks.len());
        for idx in picks {
            let unit = &pool[idx];
            codes::consume(unit.id, order_id, &mut tx).await?;
            codes::bind_to_order(order_id, &unit.code, &mut tx).await?;
            bound.push(unit.code.clone());
        }
        let order = orders::mark_approved(order_id, &mut tx).await?;
        let remaining = codes::unsold_count(order.product_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] approved. {} units consumed, {remaining} remaining", bound.len());
        Ok(AllocationResult { order, codes: bound, remaining, already: false })
    }

    async fn reject_order(&self, order_id: &OrderId) -> Result<Order, ShopStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| ShopStoreError::OrderNotFound(order_id.clone()))?;
        let order = match order.status {
            OrderStatusType::Approved => {
                return Err(ShopStoreError::InvalidTransition {
                    from: OrderStatusType::Approved,
                    to: OrderStatusType::Rejected,
                });
            },
            OrderStatusType::Rejected => {
                debug!("🗃️ Order [{order_id}] is already rejected. No action to take");
                order
            },
            OrderStatusType::Pending => orders::mark_rejected(order_id, &mut tx).await?,
        };
        tx.commit().await?;
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), ShopStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment, with uniform-random code selection.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, selector: Arc::new(UniformRandomSelector) })
    }

    /// Replaces the code selection strategy. Tests use this to inject a deterministic selector.
    pub fn with_selector(mut self, selector: Arc<dyn CodeSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Adds a product to the catalog. Catalog administration sits outside the engine; this exists for provisioning
    /// and test fixtures.
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert(product, &mut conn).await?;
        debug!("🗃️ Product '{}' added to the catalog at {}", product.slug, product.unit_price);
        Ok(product)
    }

    /// Changes a product's unit price. Totals of existing orders are never recomputed.
    pub async fn update_product_price(&self, slug: &str, new_price: UsdAmount) -> Result<Product, ShopStoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::set_price(slug, new_price, &mut conn).await?;
        debug!("🗃️ Product '{slug}' is now priced at {}", product.unit_price);
        Ok(product)
    }
}
