use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    helpers::new_order_id,
    shop_api::order_objects::{AllocationResult, OrderWithCodes},
    traits::{ShopStore, ShopStoreError, MAX_ORDER_QTY},
};

/// How many times a transient [`ShopStoreError::StoreConflict`] is retried before being surfaced to the caller.
const MAX_STORE_ATTEMPTS: usize = 3;

/// `OrderFlowApi` is the order lifecycle controller.
///
/// It owns the `Pending` -> `Approved` / `Rejected` state machine and delegates the atomic code allocation to the
/// storage backend. The API holds no mutable state of its own; any number of instances may run concurrently
/// against the same store.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: ShopStore
{
    /// Creates a new `Pending` order for the given purchase request.
    ///
    /// The order id is generated here, at creation time; the total is computed by the store from the product price
    /// at this instant and never recomputed. No inventory is reserved - stock shown to the buyer remains advisory
    /// until approval.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, ShopStoreError> {
        if order.qty < 1 || order.qty > MAX_ORDER_QTY {
            return Err(ShopStoreError::InvalidQuantity(order.qty));
        }
        let mut attempts = 0;
        loop {
            let order_id = new_order_id(Utc::now());
            match self.db.insert_order(order_id, order.clone()).await {
                Ok(order) => {
                    debug!(
                        "🔄️📦️ Order [{}] created for product {} x{}, total {}",
                        order.order_id, order.product_id, order.qty, order.total
                    );
                    return Ok(order);
                },
                // An order-id collision or a busy store both surface as a conflict; a fresh id and a new attempt
                // resolve either.
                Err(e) if e.is_retryable() && attempts + 1 < MAX_STORE_ATTEMPTS => {
                    attempts += 1;
                    warn!("🔄️📦️ Order insert hit a store conflict (attempt {attempts}). Retrying with a fresh id");
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Approves the order, allocating exactly `qty` unsold codes to it.
    ///
    /// * Unknown order -> [`ShopStoreError::OrderNotFound`].
    /// * Already `Approved` -> idempotent success; the previously bound codes are returned with `already` set and
    ///   inventory is not touched.
    /// * `Rejected` -> [`ShopStoreError::InvalidTransition`].
    /// * Not enough stock -> [`ShopStoreError::InsufficientStock`]; the order stays `Pending`. This is an expected
    ///   outcome, not a bug: the admin restocks and approves again.
    ///
    /// Transient serialisation conflicts are retried here a bounded number of times; each retry re-runs the whole
    /// allocation from scratch against fresh state.
    pub async fn approve_order(&self, order_id: &OrderId) -> Result<AllocationResult, ShopStoreError> {
        let mut attempts = 0;
        loop {
            match self.db.allocate_codes(order_id).await {
                Ok(result) => {
                    if result.already {
                        debug!("🔄️✅️ Order [{order_id}] was already approved. Returning its {} bound codes", result.codes.len());
                    } else {
                        debug!(
                            "🔄️✅️ Order [{order_id}] approved. {} codes allocated, {} remaining",
                            result.codes.len(),
                            result.remaining
                        );
                    }
                    return Ok(result);
                },
                Err(e) if e.is_retryable() && attempts + 1 < MAX_STORE_ATTEMPTS => {
                    attempts += 1;
                    warn!("🔄️✅️ Allocation for order [{order_id}] hit a store conflict (attempt {attempts}). Retrying");
                },
                Err(e) => {
                    debug!("🔄️✅️ Order [{order_id}] could not be approved: {e}");
                    return Err(e);
                },
            }
        }
    }

    /// Rejects the order. Never touches inventory.
    ///
    /// Rejecting a `Rejected` order is an idempotent no-op; rejecting an `Approved` order fails with
    /// [`ShopStoreError::InvalidTransition`].
    pub async fn reject_order(&self, order_id: &OrderId) -> Result<Order, ShopStoreError> {
        let order = self.db.reject_order(order_id).await?;
        debug!("🔄️❌️ Order [{order_id}] is rejected");
        Ok(order)
    }

    /// The order together with its bound codes and the product's advisory remaining stock.
    pub async fn order_summary(&self, order_id: &OrderId) -> Result<OrderWithCodes, ShopStoreError> {
        self.db
            .fetch_order_with_codes(order_id)
            .await?
            .ok_or_else(|| ShopStoreError::OrderNotFound(order_id.clone()))
    }

    /// The most recent orders, newest first. Administrative read only.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, ShopStoreError> {
        self.db.fetch_recent_orders(limit).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
