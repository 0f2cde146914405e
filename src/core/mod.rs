//! Core record-mapping types and traits
//!
//! This module provides the fundamental building blocks of the layer:
//! error types, the database contract, value and record types, column
//! registries, the search condition builder, and validation aggregation.

pub mod column;
pub mod condition;
pub mod database;
pub mod database_types;
pub mod error;
pub mod transaction;
pub mod validation;
pub mod value;

// Re-export commonly used types
pub use column::{Column, Columns};
pub use condition::{Comparison, Where, WhereSet};
pub use database::{ConnectionBuilder, Database};
pub use database_types::DatabaseType;
pub use error::{DatabaseError, Result};
pub use transaction::TransactionGuard;
pub use validation::{ValidationCause, ValidationError};
pub use value::{DatabaseValue, Record, Records};
