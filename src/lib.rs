//! # Code Shop Engine
//!
//! The Code Shop Engine is the order fulfilment and inventory allocation core of a store that sells finite,
//! single-use digital codes against manually-verified cryptocurrency payments. This library contains the core
//! logic only; HTTP routing, static assets, admin authentication and the payment-method catalog are external
//! collaborators that talk to the engine through its public API.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API provided by the engine. The exception is the data types used in the database.
//!    These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@shop_api`]). This provides the public-facing functionality: creating orders,
//!    approving them (which atomically and exclusively allocates unsold codes to the order), rejecting them, and
//!    the read-mostly catalog and stock queries. Specific backends need to implement the traits in the [`traits`]
//!    module in order to act as a store for the engine.
//!
//! The engine reserves nothing when an order is created. Approval is the moment of truth: inside a single atomic
//! unit of work the unsold pool is re-read, exactly the requested quantity of units is selected, consumed and
//! bound to the order, and the order becomes `Approved`. No code is ever assigned to two orders, and approval is
//! idempotent under concurrent administrative action.
pub mod db_types;
pub mod helpers;
pub mod shop_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use shop_api::{
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects::{AllocationResult, OrderWithCodes, ProductListing, StockAdded},
};
pub use traits::{CodeSelector, OldestFirstSelector, ShopStore, ShopStoreError, UniformRandomSelector, MAX_ORDER_QTY};
