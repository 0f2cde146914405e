//! # Rust Record Mapper
//!
//! A record-mapping layer for SQL databases: tables are declared as typed
//! column registries, queries are scoped with composable search conditions,
//! and rows move between application memory and the store through an
//! explicit edit → mutate → update lifecycle instead of ad-hoc query
//! strings.
//!
//! ## Features
//!
//! - **Composable conditions**: [`WhereSet`] builds parameterized clauses
//!   whose placeholders always pair 1:1 with the positional parameter list
//! - **Typed columns**: per-table [`Columns`] registries declared at compile
//!   time, shared read-only by every mapper for that table
//! - **Explicit lifecycles**: single-row [`RecordMapper`] and multi-row
//!   [`RecordsMapper`] state machines with typed failure modes
//! - **Injection-safe by construction**: values bind at the driver level;
//!   string concatenation of values into SQL is not possible through this API
//! - **Async support**: async/await with Tokio; blocking SQLite work runs on
//!   the blocking thread pool
//! - **Multiple dialects**: SQLite (embedded) and PostgreSQL (client-server)
//!   behind cargo features
//!
//! ## Supported Databases
//!
//! | Database | Feature | Notes |
//! |----------|---------|-------|
//! | SQLite | `sqlite` (default) | Bundled, selectable transaction lock mode |
//! | PostgreSQL | `postgres` | tokio-postgres, `?` → `$n` placeholder rewrite |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_record_mapper::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = SqliteDatabase::new();
//!     db.connect(":memory:").await?;
//!
//!     db.execute("CREATE TABLE staff (id INTEGER PRIMARY KEY, name TEXT, status TEXT)")
//!         .await?;
//!
//!     // Scope a query with a condition set
//!     let mut condition = WhereSet::new();
//!     condition.add_equal("status", "active", false);
//!
//!     let rows = db
//!         .fetch_records(
//!             "SELECT * FROM staff WHERE status = ?",
//!             &condition.build_parameters(),
//!         )
//!         .await?;
//!     for row in rows {
//!         if let Some(name) = row.get("name") {
//!             println!("Staff: {}", name.as_string());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## The mapper lifecycle
//!
//! Applications implement [`TableMapper`] plus [`RecordMapper`] (or
//! [`RecordsMapper`]) for each table, supplying the table name, the column
//! registry, a default-record factory, and the `is_deleted` /
//! `validate` / `normalize` hooks. The lifecycle is then:
//!
//! ```text
//! set_where_set(condition)     choose the row(s)
//! edit()                       fetch into memory
//! record_mut()                 mutate in memory
//! update()                     persist (caller owns the transaction)
//! ```
//!
//! `RecordsMapper::update` has **replace semantics**: it deletes every row
//! in the matched scope and re-inserts the in-memory collection. Rows
//! dropped from memory since `edit()` are permanently gone.
//!
//! ## Project Structure
//!
//! ```text
//! rust_record_mapper/
//! ├── src/
//! │   ├── core/              # Core types and traits
//! │   │   ├── column.rs      # Column registries
//! │   │   ├── condition.rs   # WhereSet condition builder
//! │   │   ├── database.rs    # Database trait
//! │   │   ├── error.rs       # Error types
//! │   │   ├── transaction.rs # RAII transaction guard
//! │   │   ├── validation.rs  # Validation aggregation
//! │   │   └── value.rs       # Value and record types
//! │   ├── mapper/            # Lifecycle traits
//! │   │   ├── table.rs       # Table binding + generic search
//! │   │   ├── record.rs      # Single-row lifecycle
//! │   │   └── records.rs     # Multi-row lifecycle
//! │   ├── backends/          # Dialect implementations
//! │   │   ├── sqlite.rs
//! │   │   └── postgres.rs
//! │   └── lib.rs
//! ├── tests/                 # Integration and property tests
//! ├── benches/               # Criterion benchmarks
//! └── demos/                 # Runnable walkthroughs
//! ```

/// Core record-mapping types and traits
pub mod core;

/// Record-mapper lifecycle traits
pub mod mapper;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_record_mapper::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     # #[cfg(feature = "sqlite")]
///     # {
///     let db = SqliteDatabase::new();
///     db.connect(":memory:").await?;
///     # }
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        Column, Columns, Comparison, ConnectionBuilder, Database, DatabaseError, DatabaseType,
        DatabaseValue, Record, Records, Result, TransactionGuard, ValidationCause,
        ValidationError, Where, WhereSet,
    };
    pub use crate::mapper::{RecordMapper, RecordsMapper, TableMapper};

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{SqliteDatabase, TransactionBehavior};

    #[cfg(feature = "postgres")]
    pub use crate::backends::PostgresDatabase;
}

// Re-export at root level for convenience
pub use crate::core::{
    Column, Columns, Comparison, ConnectionBuilder, Database, DatabaseError, DatabaseType,
    DatabaseValue, Record, Records, Result, TransactionGuard, ValidationCause, ValidationError,
    Where, WhereSet,
};
pub use crate::mapper::{RecordMapper, RecordsMapper, TableMapper};

#[cfg(feature = "sqlite")]
pub use backends::{SqliteDatabase, TransactionBehavior};

#[cfg(feature = "postgres")]
pub use backends::PostgresDatabase;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use prelude::*;

        let db_type = DatabaseType::Sqlite;
        assert_eq!(db_type.to_str(), "sqlite");
        assert!(db_type.is_embedded());
    }

    #[test]
    fn test_condition_scenario() {
        let mut set = WhereSet::new();
        set.add_equal("id", 5, false);
        set.add_not_equal("status", "archived", false);

        assert_eq!(set.build_parameter_clause(), "id = ? AND status != ?");
        assert_eq!(
            set.build_parameters(),
            vec![DatabaseValue::Int(5), DatabaseValue::from("archived")]
        );
    }
}
