//! # Storage-port contracts.
//!
//! This module defines the interface contracts that storage *backends* must satisfy in order to drive the engine.
//!
//! The engine itself holds no ambient global database handle and no in-process locks. All coordination between
//! concurrent operations is delegated to the atomicity and isolation guarantees of the backend's unit-of-work
//! primitive, which is why the whole storage surface is expressed as a trait: property tests can substitute a
//! backend with controllable concurrency without touching the engine.
//!
//! ## Traits
//! * [`ShopStore`] is the storage port proper. Every durable read and write the engine performs goes through it,
//!   including the single correctness-critical operation, [`ShopStore::allocate_codes`].
//! * [`CodeSelector`] is the pluggable strategy for choosing which unsold units fulfil an order. Production uses
//!   uniform-random selection; tests inject a deterministic selector.
mod code_selector;
mod shop_store;

pub use code_selector::{CodeSelector, OldestFirstSelector, UniformRandomSelector};
pub use shop_store::{ShopStore, ShopStoreError, MAX_ORDER_QTY};
