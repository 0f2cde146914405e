//! Database trait and connection management
//!
//! This module defines the core database contract that all dialect backends
//! implement: parameterized execute/fetch, record-level insert/update
//! helpers, transaction control, and dialect introspection.

use super::condition::WhereSet;
use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::value::{DatabaseValue, Record, Records};
use async_trait::async_trait;
use tracing::debug;

/// Core database contract implemented by every dialect backend
///
/// The trait is object-safe; mappers hold connections as
/// `Arc<dyn Database>`. A single instance owns one native connection and is
/// not safe for interleaved transactions from multiple callers without
/// external serialization.
#[async_trait]
pub trait Database: Send + Sync {
    /// Get the database dialect
    fn database_type(&self) -> DatabaseType;

    /// Connect to the database with the given connection string
    async fn connect(&self, connection_string: &str) -> Result<()>;

    /// Check if connected to the database
    fn is_connected(&self) -> bool;

    /// Disconnect from the database
    async fn disconnect(&self) -> Result<()>;

    /// Execute a statement without parameters, returning the affected row
    /// count
    ///
    /// Intended for DDL and other statements that carry no untrusted input.
    /// Statements with values must go through
    /// [`execute_with_params`](Self::execute_with_params) so the driver
    /// binds them positionally.
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Execute a SELECT without parameters and return all rows
    async fn query(&self, query: &str) -> Result<Records>;

    /// Execute a parameterized SELECT and return all rows
    ///
    /// Parameters bind positionally to `?` placeholders at the driver
    /// level; values are never spliced into the SQL text.
    async fn query_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<Records>;

    /// Execute a parameterized statement, returning the affected row count
    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64>;

    /// Begin a transaction
    ///
    /// Transactions are explicit and non-nested; beginning while one is
    /// active is an error.
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Rollback the current transaction
    async fn rollback(&self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;

    /// Check whether a table exists (dialect-specific lookup)
    async fn exists_table(&self, table_name: &str) -> Result<bool>;

    /// Fetch the ordered column names of a table (dialect-specific lookup)
    async fn fetch_column_names(&self, table_name: &str) -> Result<Vec<String>>;

    /// Fetch the auto-increment id assigned by the last INSERT on this
    /// connection
    async fn last_auto_increment_id(&self) -> Result<DatabaseValue>;

    /// Fetch the first column of the first row of a SELECT
    ///
    /// Fails with [`DatabaseError::NotFound`] when the query returns zero
    /// rows.
    async fn fetch_one(&self, query: &str, params: &[DatabaseValue]) -> Result<DatabaseValue> {
        let record = self.fetch_record(query, params).await?;
        match record.into_iter().next() {
            Some((_, value)) => Ok(value),
            None => Err(DatabaseError::not_found()),
        }
    }

    /// Fetch the first row of a SELECT
    ///
    /// Fails with [`DatabaseError::NotFound`] when the query returns zero
    /// rows.
    async fn fetch_record(&self, query: &str, params: &[DatabaseValue]) -> Result<Record> {
        let mut records = self.query_with_params(query, params).await?;
        if records.is_empty() {
            return Err(DatabaseError::not_found());
        }
        Ok(records.swap_remove(0))
    }

    /// Fetch all rows of a SELECT; an empty result is not an error
    async fn fetch_records(&self, query: &str, params: &[DatabaseValue]) -> Result<Records> {
        self.query_with_params(query, params).await
    }

    /// Count the rows of a table
    async fn count(&self, table_name: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table_name);
        let value = self.fetch_one(&sql, &[]).await?;
        value.as_long().map(|count| count as u64).ok_or_else(|| {
            DatabaseError::type_mismatch("integer count", value.type_name())
        })
    }

    /// Insert a record into a table
    ///
    /// Builds `INSERT INTO table (col1, col2, …) VALUES (?, ?, …)` from the
    /// record's keys in their stored order.
    async fn insert(&self, record: &Record, table_name: &str) -> Result<u64> {
        let mut columns = String::new();
        let mut placeholders = String::new();
        for key in record.keys() {
            if !columns.is_empty() {
                columns.push_str(", ");
                placeholders.push_str(", ");
            }
            columns.push_str(key);
            placeholders.push('?');
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_name, columns, placeholders
        );
        let params: Vec<DatabaseValue> = record.values().cloned().collect();
        debug!(table = table_name, columns = record.len(), "insert record");
        self.execute_with_params(&sql, &params).await
    }

    /// Update table rows matched by a condition with a record's values
    ///
    /// Builds `UPDATE table SET col1 = ?, … WHERE <clause>`; the positional
    /// parameters are the record's values followed by the condition's
    /// parameters. Fails with [`DatabaseError::MissingCondition`] when the
    /// condition set is empty.
    async fn update(
        &self,
        record: &Record,
        table_name: &str,
        where_set: &WhereSet,
    ) -> Result<u64> {
        if where_set.is_empty() {
            return Err(DatabaseError::MissingCondition);
        }
        let mut assignments = String::new();
        for key in record.keys() {
            if !assignments.is_empty() {
                assignments.push_str(", ");
            }
            assignments.push_str(key);
            assignments.push_str(" = ?");
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table_name,
            assignments,
            where_set.build_parameter_clause()
        );
        let mut params: Vec<DatabaseValue> = record.values().cloned().collect();
        params.extend(where_set.build_parameters());
        debug!(table = table_name, columns = record.len(), "update record");
        self.execute_with_params(&sql, &params).await
    }
}

/// Database connection builder
///
/// Collects dialect credentials and produces the connection string the
/// matching backend's `connect` expects.
pub struct ConnectionBuilder {
    db_type: DatabaseType,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    options: std::collections::HashMap<String, String>,
}

impl ConnectionBuilder {
    /// Create a new connection builder for the specified dialect
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            options: std::collections::HashMap::new(),
        }
    }

    /// Set the database host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the database port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name (for SQLite, the file path)
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the username
    pub fn username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a custom option
    pub fn option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Build the connection string
    pub fn build_connection_string(&self) -> String {
        match self.db_type {
            DatabaseType::Sqlite => self
                .database
                .clone()
                .unwrap_or_else(|| ":memory:".to_string()),
            DatabaseType::Postgres => {
                let mut parts = Vec::new();
                if let Some(host) = &self.host {
                    parts.push(format!("host={}", host));
                }
                if let Some(port) = self.port {
                    parts.push(format!("port={}", port));
                }
                if let Some(database) = &self.database {
                    parts.push(format!("dbname={}", database));
                }
                if let Some(username) = &self.username {
                    parts.push(format!("user={}", username));
                }
                if let Some(password) = &self.password {
                    parts.push(format!("password={}", password));
                }
                for (key, value) in &self.options {
                    parts.push(format!("{}={}", key, value));
                }
                parts.join(" ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_builder_sqlite() {
        let builder = ConnectionBuilder::new(DatabaseType::Sqlite).database("test.db");
        assert_eq!(builder.build_connection_string(), "test.db");

        let builder = ConnectionBuilder::new(DatabaseType::Sqlite);
        assert_eq!(builder.build_connection_string(), ":memory:");
    }

    #[test]
    fn test_connection_builder_postgres() {
        let builder = ConnectionBuilder::new(DatabaseType::Postgres)
            .host("localhost")
            .port(5432)
            .database("mydb")
            .username("user")
            .password("pass");

        let conn_str = builder.build_connection_string();
        assert!(conn_str.contains("host=localhost"));
        assert!(conn_str.contains("port=5432"));
        assert!(conn_str.contains("dbname=mydb"));
        assert!(conn_str.contains("user=user"));
        assert!(conn_str.contains("password=pass"));
    }
}
