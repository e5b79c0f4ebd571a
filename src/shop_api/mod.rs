//! # Code shop engine public API
//!
//! The `shop_api` module exposes the programmatic API for the engine. The excluded collaborators (HTTP routing,
//! admin authentication, the bulk-upload text parser) talk to the engine exclusively through these types.
//!
//! * [`order_flow_api`] is the order lifecycle controller: it creates orders, approves them (delegating the atomic
//!   allocation to the storage backend) and rejects them, enforcing the legal `Pending` -> `Approved` / `Rejected`
//!   transitions.
//! * [`catalog_api`] provides the read-mostly product and stock queries shown to buyers, plus the bulk code intake
//!   used by admins.
//! * [`order_objects`] holds the serialisable result objects shared between the APIs and the storage port.
//!
//! # API usage
//!
//! The pattern for both APIs is the same: an instance is created by supplying a storage backend that implements
//! [`crate::traits::ShopStore`].
//!
//! ```rust,ignore
//! use codeshop_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/shop.db", 10).await?;
//! let api = OrderFlowApi::new(db);
//! let outcome = api.approve_order(&order_id).await?;
//! ```
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
