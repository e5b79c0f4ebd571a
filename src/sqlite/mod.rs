mod sqlite_impl;

pub(crate) mod db;

pub use sqlite_impl::SqliteDatabase;
