//! SQLite database backend implementation
//!
//! The embedded single-file dialect. Blocking rusqlite calls are offloaded
//! to the blocking thread pool and guarded with a timeout.

use crate::core::{
    database::Database, database_types::DatabaseType, error::DatabaseError, error::Result,
    value::DatabaseValue, value::Record, value::Records,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use rusqlite::{params_from_iter, Connection, Row};
use std::time::Duration;

/// Default timeout for database operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Lock-acquisition mode used when a transaction begins
///
/// SQLite decides when to take the database lock based on the `BEGIN`
/// variant: `DEFERRED` postpones it to the first read/write, `IMMEDIATE`
/// takes a reserved lock up front, `EXCLUSIVE` locks out readers too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// Take no lock until the first read or write
    Deferred,
    /// Take a RESERVED lock when the transaction begins
    #[default]
    Immediate,
    /// Take an EXCLUSIVE lock when the transaction begins
    Exclusive,
}

impl TransactionBehavior {
    fn as_sql(&self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "DEFERRED",
            TransactionBehavior::Immediate => "IMMEDIATE",
            TransactionBehavior::Exclusive => "EXCLUSIVE",
        }
    }
}

/// SQLite database implementation
pub struct SqliteDatabase {
    connection: Arc<Mutex<Option<Connection>>>,
    in_transaction: Arc<Mutex<bool>>,
    transaction_behavior: Arc<Mutex<TransactionBehavior>>,
}

impl SqliteDatabase {
    /// SQLite has no boolean type; INTEGER 1 stands for true
    pub const BOOLEAN_TRUE: i64 = 1;

    /// SQLite has no boolean type; INTEGER 0 stands for false
    pub const BOOLEAN_FALSE: i64 = 0;

    /// Create a new SQLite database instance
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
            in_transaction: Arc::new(Mutex::new(false)),
            transaction_behavior: Arc::new(Mutex::new(TransactionBehavior::default())),
        }
    }

    /// Choose the lock-acquisition mode for subsequent transactions
    pub async fn set_transaction_behavior(&self, behavior: TransactionBehavior) {
        let mut current = self.transaction_behavior.lock().await;
        *current = behavior;
    }

    /// Convert a rusqlite Row to a Record
    fn row_to_record(row: &Row) -> rusqlite::Result<Record> {
        let mut record = Record::new();
        let column_count = row.as_ref().column_count();

        for i in 0..column_count {
            let column_name = row.as_ref().column_name(i)?.to_string();
            let value = match row.get_ref(i)? {
                rusqlite::types::ValueRef::Null => DatabaseValue::Null,
                rusqlite::types::ValueRef::Integer(v) => DatabaseValue::Long(v),
                rusqlite::types::ValueRef::Real(v) => DatabaseValue::Double(v),
                rusqlite::types::ValueRef::Text(v) => {
                    DatabaseValue::String(String::from_utf8_lossy(v).to_string())
                }
                rusqlite::types::ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
            };
            record.insert(column_name, value);
        }

        Ok(record)
    }

    /// Convert DatabaseValue to rusqlite parameter
    fn value_to_param(value: &DatabaseValue) -> Box<dyn rusqlite::ToSql> {
        match value {
            DatabaseValue::Null => Box::new(None::<i64>),
            DatabaseValue::Bool(v) => Box::new(*v),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) => Box::new(*v),
            DatabaseValue::Float(v) => Box::new(*v),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::String(v) => Box::new(v.clone()),
            DatabaseValue::Bytes(v) => Box::new(v.clone()),
            DatabaseValue::Timestamp(v) => Box::new(*v),
        }
    }
}

impl Default for SqliteDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        // Clean up any existing connection first
        {
            let mut connection = self.connection.lock().await;
            *connection = None;
        }

        // Reset transaction flag to handle failed/aborted attempts
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let connection_string = connection_string.to_string();
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&connection_string)?;

            // Enable foreign keys
            conn.execute("PRAGMA foreign_keys = ON", [])?;

            let mut connection = connection_arc.blocking_lock();
            *connection = Some(conn);

            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))??
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::connection_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection
            .try_lock()
            .map(|conn| conn.is_some())
            .unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<()> {
        // Clear transaction flag to prevent stale state after reconnect
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let mut connection = self.connection.lock().await;
        *connection = None;
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<u64> {
        let query = query.to_string();
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<u64> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            debug!(sql = %query, "execute");
            let affected = conn.execute(&query, [])?;
            Ok(affected as u64)
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    async fn query(&self, query: &str) -> Result<Records> {
        self.query_with_params(query, &[]).await
    }

    async fn query_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<Records> {
        let query = query.to_string();
        let params = params.to_vec();
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<Records> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            let rusqlite_params: Vec<Box<dyn rusqlite::ToSql>> =
                params.iter().map(Self::value_to_param).collect();

            debug!(sql = %query, params = params.len(), "query");
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(
                params_from_iter(rusqlite_params.iter()),
                Self::row_to_record,
            )?;

            let mut results = Vec::new();
            for row_result in rows {
                results.push(row_result?);
            }

            Ok(results)
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64> {
        let query = query.to_string();
        let params = params.to_vec();
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<u64> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            let rusqlite_params: Vec<Box<dyn rusqlite::ToSql>> =
                params.iter().map(Self::value_to_param).collect();

            debug!(sql = %query, params = params.len(), "execute");
            let mut stmt = conn.prepare(&query)?;
            let affected = stmt.execute(params_from_iter(rusqlite_params.iter()))?;

            Ok(affected as u64)
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    async fn begin_transaction(&self) -> Result<()> {
        let behavior = *self.transaction_behavior.lock().await;
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            // Acquire both locks together so the flag matches reality
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();

            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            if *in_transaction {
                return Err(DatabaseError::transaction("Already in a transaction"));
            }

            // Execute SQL first, only set flag on success
            conn.execute(&format!("BEGIN {} TRANSACTION", behavior.as_sql()), [])?;
            *in_transaction = true;

            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    async fn commit(&self) -> Result<()> {
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();

            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            if !*in_transaction {
                return Err(DatabaseError::transaction("Not in a transaction"));
            }

            // Execute SQL first, only clear flag on success
            conn.execute("COMMIT", [])?;
            *in_transaction = false;

            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    async fn rollback(&self) -> Result<()> {
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();

            let conn = connection
                .as_ref()
                .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

            if !*in_transaction {
                return Err(DatabaseError::transaction("Not in a transaction"));
            }

            conn.execute("ROLLBACK", [])?;
            *in_transaction = false;

            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64));
            }
        }
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
            .try_lock()
            .map(|guard| *guard)
            .unwrap_or(false)
    }

    async fn exists_table(&self, table_name: &str) -> Result<bool> {
        let count = self
            .fetch_one(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[DatabaseValue::from(table_name)],
            )
            .await?;
        Ok(count.as_long() == Some(1))
    }

    async fn fetch_column_names(&self, table_name: &str) -> Result<Vec<String>> {
        // pragma_table_info is the table-valued form of PRAGMA table_info,
        // which cannot bind parameters
        let records = self
            .query_with_params(
                "SELECT name FROM pragma_table_info(?)",
                &[DatabaseValue::from(table_name)],
            )
            .await?;
        if records.is_empty() {
            return Err(DatabaseError::TableNotFound(table_name.to_string()));
        }
        Ok(records
            .iter()
            .filter_map(|record| record.get("name").map(|value| value.as_string()))
            .collect())
    }

    async fn last_auto_increment_id(&self) -> Result<DatabaseValue> {
        self.fetch_one("SELECT last_insert_rowid()", &[]).await
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        // Best-effort rollback of an open transaction; Drop cannot be async
        if let Ok(in_trans) = self.in_transaction.try_lock() {
            if *in_trans {
                if let Ok(connection) = self.connection.try_lock() {
                    if let Some(conn) = connection.as_ref() {
                        let _ = conn.execute("ROLLBACK", []);
                    }
                }
            }
        }
        // Connection will be closed automatically when dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_connect() {
        let db = SqliteDatabase::new();
        assert!(db.connect(":memory:").await.is_ok());
        assert!(db.is_connected());
        assert!(db.disconnect().await.is_ok());
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_sqlite_execute() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;

        let result = db
            .execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .await;
        assert!(result.is_ok());

        let affected = db
            .execute_with_params(
                "INSERT INTO test (name) VALUES (?)",
                &[DatabaseValue::from("Alice")],
            )
            .await?;
        assert_eq!(affected, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_query_preserves_column_order() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;

        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
            .await?;
        db.execute("INSERT INTO test (name, age) VALUES ('Alice', 30)")
            .await?;

        let results = db.query("SELECT * FROM test").await?;
        assert_eq!(results.len(), 1);

        let keys: Vec<&String> = results[0].keys().collect();
        assert_eq!(keys, ["id", "name", "age"]);

        let name = results[0]
            .get("name")
            .ok_or_else(|| DatabaseError::ColumnNotFound("name".to_string()))?
            .as_string();
        assert_eq!(name, "Alice");

        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_fetch_record_not_found() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;

        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .await?;

        let result = db
            .fetch_record(
                "SELECT * FROM test WHERE id = ?",
                &[DatabaseValue::Int(99)],
            )
            .await;
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_transaction() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;

        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .await?;

        // Test commit
        db.begin_transaction().await?;
        assert!(db.in_transaction());

        db.execute("INSERT INTO test (name) VALUES ('Alice')")
            .await?;
        db.commit().await?;
        assert!(!db.in_transaction());

        let results = db.query("SELECT * FROM test").await?;
        assert_eq!(results.len(), 1);

        // Test rollback
        db.begin_transaction().await?;
        db.execute("INSERT INTO test (name) VALUES ('Bob')").await?;
        db.rollback().await?;
        assert!(!db.in_transaction());

        let results = db.query("SELECT * FROM test").await?;
        assert_eq!(results.len(), 1); // Still only Alice

        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_transaction_behavior_modes() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;
        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)")
            .await?;

        for behavior in [
            TransactionBehavior::Deferred,
            TransactionBehavior::Immediate,
            TransactionBehavior::Exclusive,
        ] {
            db.set_transaction_behavior(behavior).await;
            db.begin_transaction().await?;
            assert!(db.in_transaction());
            db.commit().await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_introspection() -> Result<()> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await?;

        db.execute("CREATE TABLE staff (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, status TEXT)")
            .await?;

        assert!(db.exists_table("staff").await?);
        assert!(!db.exists_table("missing").await?);

        let columns = db.fetch_column_names("staff").await?;
        assert_eq!(columns, ["id", "name", "status"]);

        db.execute("INSERT INTO staff (name, status) VALUES ('Alice', 'active')")
            .await?;
        let id = db.last_auto_increment_id().await?;
        assert_eq!(id.as_long(), Some(1));

        Ok(())
    }
}
