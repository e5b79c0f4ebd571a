//! # SQLite database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an atomic transaction
//! as the need arises and call through to the functions without any other changes.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod codes;
pub mod orders;
pub mod products;

const SQLITE_DB_URL: &str = "sqlite://data/shop_store.db";

pub fn db_url() -> String {
    let result = env::var("SHOP_DATABASE_URL").unwrap_or_else(|_| {
        info!("SHOP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Creates a connection pool in WAL mode.
///
/// WAL keeps advisory reads (stock counts shown to buyers) from blocking behind allocation transactions, while
/// writers still serialise on the single write lock. A write that loses the race against a concurrently-committed
/// allocation surfaces as BUSY/BUSY_SNAPSHOT, which the engine maps to a retryable conflict.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
