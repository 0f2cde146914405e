//! PostgreSQL database backend implementation
//!
//! The client-server dialect, built on tokio-postgres. Statements arrive
//! from the condition layer with `?` placeholders and are rewritten to the
//! `$n` form PostgreSQL expects before execution.

use crate::core::{
    database::Database, database_types::DatabaseType, error::DatabaseError, error::Result,
    value::DatabaseValue, value::Record, value::Records,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::debug;

/// Default timeout for database operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL database implementation
pub struct PostgresDatabase {
    client: Arc<Mutex<Option<Client>>>,
    in_transaction: Arc<Mutex<bool>>,
}

impl PostgresDatabase {
    /// Create a new PostgreSQL database instance
    pub fn new() -> Self {
        Self {
            client: Arc::new(Mutex::new(None)),
            in_transaction: Arc::new(Mutex::new(false)),
        }
    }

    /// Rewrite `?` placeholders to `$1`, `$2`, …
    ///
    /// Sound for SQL generated by this layer: values are always bound, never
    /// spliced into the text, so a `?` can only be a placeholder.
    fn numbered_placeholders(query: &str) -> String {
        let mut rewritten = String::with_capacity(query.len() + 8);
        let mut index = 0usize;
        for ch in query.chars() {
            if ch == '?' {
                index += 1;
                rewritten.push('$');
                rewritten.push_str(&index.to_string());
            } else {
                rewritten.push(ch);
            }
        }
        rewritten
    }

    /// Convert a tokio_postgres Row to a Record
    fn row_to_record(row: &Row) -> Record {
        let mut record = Record::new();

        for (idx, column) in row.columns().iter().enumerate() {
            let column_name = column.name().to_string();
            let value = match column.type_().name() {
                "bool" => row
                    .get::<_, Option<bool>>(idx)
                    .map(DatabaseValue::Bool)
                    .unwrap_or(DatabaseValue::Null),
                "int2" | "int4" => row
                    .get::<_, Option<i32>>(idx)
                    .map(DatabaseValue::Int)
                    .unwrap_or(DatabaseValue::Null),
                "int8" => row
                    .get::<_, Option<i64>>(idx)
                    .map(DatabaseValue::Long)
                    .unwrap_or(DatabaseValue::Null),
                "float4" => row
                    .get::<_, Option<f32>>(idx)
                    .map(DatabaseValue::Float)
                    .unwrap_or(DatabaseValue::Null),
                "float8" => row
                    .get::<_, Option<f64>>(idx)
                    .map(DatabaseValue::Double)
                    .unwrap_or(DatabaseValue::Null),
                "text" | "varchar" | "char" | "bpchar" | "name" => row
                    .get::<_, Option<String>>(idx)
                    .map(DatabaseValue::String)
                    .unwrap_or(DatabaseValue::Null),
                "bytea" => row
                    .get::<_, Option<Vec<u8>>>(idx)
                    .map(DatabaseValue::Bytes)
                    .unwrap_or(DatabaseValue::Null),
                "timestamp" | "timestamptz" => row
                    .get::<_, Option<i64>>(idx)
                    .map(DatabaseValue::Timestamp)
                    .unwrap_or(DatabaseValue::Null),
                _ => {
                    // Fall back to text for unknown types
                    row.get::<_, Option<String>>(idx)
                        .map(DatabaseValue::String)
                        .unwrap_or(DatabaseValue::Null)
                }
            };
            record.insert(column_name, value);
        }

        record
    }

    /// Convert DatabaseValue to postgres parameter
    fn value_to_param(
        value: &DatabaseValue,
    ) -> Box<dyn tokio_postgres::types::ToSql + Sync + Send> {
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

impl Default for PostgresDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        // Clean up any existing connection first
        {
            let mut client = self.client.lock().await;
            *client = None;
        }

        // Reset transaction flag
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let connection_string = connection_string.to_string();
        let client_arc = Arc::clone(&self.client);

        let connect_future = async move {
            let (client, connection) = tokio_postgres::connect(&connection_string, NoTls)
                .await
                .map_err(|e| DatabaseError::connection(e.to_string()))?;

            // Drive the connection in the background
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "PostgreSQL connection error");
                }
            });

            let mut client_guard = client_arc.lock().await;
            *client_guard = Some(client);

            Ok::<(), DatabaseError>(())
        };

        tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, connect_future)
            .await
            .map_err(|_| {
                DatabaseError::connection_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })??;

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .try_lock()
            .map(|client| {
                if let Some(ref c) = *client {
                    !c.is_closed()
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<()> {
        // Clear transaction flag
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let mut client = self.client.lock().await;
        *client = None;
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<u64> {
        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        debug!(sql = %query, "execute");
        let execute_future = client.execute(query, &[]);

        let affected = tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, execute_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::query(e.to_string()))?;

        Ok(affected)
    }

    async fn query(&self, query: &str) -> Result<Records> {
        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        debug!(sql = %query, "query");
        let query_future = client.query(query, &[]);

        let rows = tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, query_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::query(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn query_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<Records> {
        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let rewritten = Self::numbered_placeholders(query);
        let postgres_params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> =
            params.iter().map(Self::value_to_param).collect();
        let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = postgres_params
            .iter()
            .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        debug!(sql = %rewritten, params = params.len(), "query");
        let query_future = client.query(&rewritten, &param_refs);

        let rows = tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, query_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::query(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64> {
        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let rewritten = Self::numbered_placeholders(query);
        let postgres_params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> =
            params.iter().map(Self::value_to_param).collect();
        let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = postgres_params
            .iter()
            .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        debug!(sql = %rewritten, params = params.len(), "execute");
        let execute_future = client.execute(&rewritten, &param_refs);

        let affected = tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, execute_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::query(e.to_string()))?;

        Ok(affected)
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock().await;

        if *in_transaction {
            return Err(DatabaseError::transaction("Already in a transaction"));
        }

        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let begin_future = client.execute("BEGIN", &[]);

        tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, begin_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::transaction(e.to_string()))?;

        *in_transaction = true;

        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock().await;

        if !*in_transaction {
            return Err(DatabaseError::transaction("Not in a transaction"));
        }

        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let commit_future = client.execute("COMMIT", &[]);

        tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, commit_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::transaction(e.to_string()))?;

        *in_transaction = false;

        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock().await;

        if !*in_transaction {
            return Err(DatabaseError::transaction("Not in a transaction"));
        }

        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| DatabaseError::connection("Not connected to database"))?;

        let rollback_future = client.execute("ROLLBACK", &[]);

        tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, rollback_future)
            .await
            .map_err(|_| {
                DatabaseError::query_timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64)
            })?
            .map_err(|e| DatabaseError::transaction(e.to_string()))?;

        *in_transaction = false;

        Ok(())
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
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                &[DatabaseValue::from(table_name)],
            )
            .await?;
        Ok(count.as_long() == Some(1))
    }

    async fn fetch_column_names(&self, table_name: &str) -> Result<Vec<String>> {
        let records = self
            .query_with_params(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_name = ? ORDER BY ordinal_position",
                &[DatabaseValue::from(table_name)],
            )
            .await?;
        if records.is_empty() {
            return Err(DatabaseError::TableNotFound(table_name.to_string()));
        }
        Ok(records
            .iter()
            .filter_map(|record| record.get("column_name").map(|value| value.as_string()))
            .collect())
    }

    async fn last_auto_increment_id(&self) -> Result<DatabaseValue> {
        // LASTVAL errors server-side when no sequence was used in this
        // session
        self.fetch_one("SELECT LASTVAL()", &[]).await
    }
}

impl Drop for PostgresDatabase {
    fn drop(&mut self) {
        // Drop cannot run the async rollback; the server discards any open
        // transaction when the connection closes
    }
}
