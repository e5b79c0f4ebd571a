use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, Product},
    shop_api::order_objects::{AllocationResult, OrderWithCodes, ProductListing, StockAdded},
};

/// Orders may not request more than this many codes at once. The request layer clamps user input to the same bound.
pub const MAX_ORDER_QTY: i64 = 999;

/// The storage port for the code shop engine.
///
/// This trait defines every durable read and write the engine performs. Backends must guarantee that each method
/// executes as a single atomic unit of work: either all of its writes are durable, or none are. The one
/// correctness-critical guarantee of the whole system lives in [`Self::allocate_codes`]: two concurrent allocations
/// touching the same product's inventory must never both observe the same unsold unit as available and both
/// consume it.
///
/// Reads with weaker guarantees are called out explicitly; in particular [`Self::available_count`] is an advisory,
/// possibly-stale hint that is never synchronised with a concurrent allocation and must never be treated as a
/// reservation.
#[allow(async_fn_in_trait)]
pub trait ShopStore: Clone {
    /// The URL of the underlying database.
    fn url(&self) -> &str;

    /// All active products, newest first, each annotated with its advisory unsold-unit count at read time.
    /// The count is a join against live inventory, never a cached value.
    async fn fetch_active_products(&self) -> Result<Vec<ProductListing>, ShopStoreError>;

    /// Fetches the product with the given slug, provided it is active.
    async fn fetch_active_product_by_slug(&self, slug: &str) -> Result<Option<Product>, ShopStoreError>;

    /// Advisory count of unsold code units for the product. Possibly stale by the time the caller acts on it;
    /// the authoritative count is re-taken inside [`Self::allocate_codes`]'s unit of work.
    async fn available_count(&self, product_id: i64) -> Result<i64, ShopStoreError>;

    /// Appends new unsold code units to the product's inventory.
    ///
    /// Entries are trimmed and blank entries dropped; if nothing remains, [`ShopStoreError::EmptyCodeBatch`] is
    /// returned. The batch is **not** deduplicated against codes already in the store - duplicate payloads are
    /// permitted.
    async fn bulk_insert_codes(&self, slug: &str, codes: &[String]) -> Result<StockAdded, ShopStoreError>;

    /// Stores a new `Pending` order under the given (caller-generated) order id.
    ///
    /// The total is computed from the product price read in the same unit of work and is never recomputed
    /// afterwards. Fails with [`ShopStoreError::ProductNotFound`] if the product is missing or inactive, and with
    /// [`ShopStoreError::InsufficientStock`] if the product has no unsold units at all. The latter is an advisory
    /// courtesy to buyers; it reserves nothing, and approval always re-checks stock authoritatively.
    async fn insert_order(&self, order_id: OrderId, order: NewOrder) -> Result<Order, ShopStoreError>;

    /// Fetches the order with the given external order id.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ShopStoreError>;

    /// Fetches the order together with its bound codes (in binding order) and the product's advisory remaining
    /// stock.
    async fn fetch_order_with_codes(&self, order_id: &OrderId) -> Result<Option<OrderWithCodes>, ShopStoreError>;

    /// The most recent orders, newest first. Administrative read only.
    async fn fetch_recent_orders(&self, limit: i64) -> Result<Vec<Order>, ShopStoreError>;

    /// Atomically and exclusively allocates unsold code units to the order, transitioning it `Pending` ->
    /// `Approved`.
    ///
    /// The entire operation is one unit of work, serialised against any concurrent allocation touching the same
    /// product's inventory:
    /// 1. the unsold pool is re-read *inside* the unit of work; fewer than `qty` units aborts with
    ///    [`ShopStoreError::InsufficientStock`], leaving the order `Pending` and inventory untouched;
    /// 2. exactly `qty` distinct units are chosen by the backend's [`crate::traits::CodeSelector`];
    /// 3. each chosen unit is consumed (sold flag, sold-at timestamp, owning order id set together) and one binding
    ///    row is recorded per unit, in selection order;
    /// 4. the order becomes `Approved` with its approval timestamp set.
    ///
    /// Replaying the call on an already-`Approved` order performs no inventory mutation and returns the previously
    /// bound codes with the `already` marker set. Calling it on a `Rejected` order fails with
    /// [`ShopStoreError::InvalidTransition`].
    async fn allocate_codes(&self, order_id: &OrderId) -> Result<AllocationResult, ShopStoreError>;

    /// Transitions the order `Pending` -> `Rejected` without touching inventory.
    ///
    /// Rejecting a `Rejected` order is an idempotent no-op; rejecting an `Approved` order fails with
    /// [`ShopStoreError::InvalidTransition`].
    async fn reject_order(&self, order_id: &OrderId) -> Result<Order, ShopStoreError>;

    /// Closes the connection pool.
    async fn close(&mut self) -> Result<(), ShopStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum ShopStoreError {
    #[error("We have an internal database engine problem (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The code batch is empty after trimming blank entries")]
    EmptyCodeBatch,
    #[error("Quantity {0} is outside the accepted range (1-{MAX_ORDER_QTY})")]
    InvalidQuantity(i64),
    #[error("The requested product '{0}' does not exist or is inactive")]
    ProductNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Not enough stock to fulfil the order. {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },
    #[error("Illegal order status change from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("The unit of work could not be serialised with concurrent activity. It is safe to retry")]
    StoreConflict,
}

impl ShopStoreError {
    /// Transient failures for which retrying the whole operation from scratch is safe and likely to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShopStoreError::StoreConflict)
    }
}

// SQLite reports lock contention as BUSY (5), LOCKED (6) or BUSY_SNAPSHOT (517). All of them mean the unit of work
// could not be serialised and should be retried from scratch.
const LOCK_CONTENTION_CODES: [&str; 3] = ["5", "6", "517"];

impl From<sqlx::Error> for ShopStoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().map_or(false, |c| LOCK_CONTENTION_CODES.contains(&c.as_ref())) {
                return ShopStoreError::StoreConflict;
            }
        }
        ShopStoreError::DatabaseError(e.to_string())
    }
}
