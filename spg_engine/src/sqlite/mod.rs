//! SQLite backend for the storefront payment gateway.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::{SqliteDatabase, DEFAULT_TRANSACTION_TIMEOUT};
