use std::fmt::Debug;

use log::*;

use crate::{
    db_types::Product,
    shop_api::order_objects::{ProductListing, StockAdded},
    traits::{ShopStore, ShopStoreError},
};

/// `CatalogApi` provides the read-mostly product and stock queries shown to buyers, plus the bulk code intake used
/// by admins.
///
/// The stock counts it reports are advisory: they are instantaneous joins against live inventory and may be stale
/// by the time a buyer acts on them. They are never a reservation - the authoritative check happens inside the
/// allocation unit of work at approval time.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: ShopStore
{
    /// All active products, newest first, each annotated with its advisory stock count.
    pub async fn active_products(&self) -> Result<Vec<ProductListing>, ShopStoreError> {
        self.db.fetch_active_products().await
    }

    /// Fetches an active product by slug.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, ShopStoreError> {
        self.db.fetch_active_product_by_slug(slug).await
    }

    /// Advisory count of unsold units for an active product.
    pub async fn available_stock(&self, slug: &str) -> Result<i64, ShopStoreError> {
        let product = self
            .db
            .fetch_active_product_by_slug(slug)
            .await?
            .ok_or_else(|| ShopStoreError::ProductNotFound(slug.to_string()))?;
        self.db.available_count(product.id).await
    }

    /// Appends a batch of codes to the product's inventory. The (external) bulk-upload utility has already split
    /// the operator's paste into lines; the store trims them and drops blanks.
    pub async fn add_codes(&self, slug: &str, codes: &[String]) -> Result<StockAdded, ShopStoreError> {
        let result = self.db.bulk_insert_codes(slug, codes).await?;
        debug!("🛒️ {} codes added to '{slug}'. Advisory stock is now {}", result.added, result.stock);
        Ok(result)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
