//! Database backend implementations
//!
//! This module contains concrete implementations of the Database trait,
//! one per supported dialect.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, TransactionBehavior};

#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
