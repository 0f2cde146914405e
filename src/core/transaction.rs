//! Transaction guard for automatic rollback on drop
//!
//! This module provides RAII-style transaction management with automatic
//! rollback. The mapper layer never opens transactions on its own; callers
//! wrap lifecycle calls in a guard (or the raw begin/commit/rollback trio)
//! and decide rollback policy themselves.

use super::database::Database;
use super::error::Result;
use super::value::{DatabaseValue, Records};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Transaction guard that automatically rolls back on drop if not committed
///
/// If the guard is dropped without calling `commit()`, the transaction is
/// rolled back, so an early `?` return cannot leak an open transaction.
///
/// # Example
///
/// ```ignore
/// let tx = TransactionGuard::begin(Arc::clone(&db)).await?;
/// mapper.update().await?;
/// tx.commit().await?;
/// ```
pub struct TransactionGuard {
    db: Arc<dyn Database>,
    committed: AtomicBool,
    rolled_back: AtomicBool,
}

impl TransactionGuard {
    /// Begin a new transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not connected, a transaction is
    /// already active, or the underlying operation fails.
    pub async fn begin(db: Arc<dyn Database>) -> Result<Self> {
        db.begin_transaction().await?;

        Ok(Self {
            db,
            committed: AtomicBool::new(false),
            rolled_back: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.committed.load(Ordering::Acquire) {
            return Err(crate::core::DatabaseError::transaction(
                "Cannot operate on committed transaction",
            ));
        }
        if self.rolled_back.load(Ordering::Acquire) {
            return Err(crate::core::DatabaseError::transaction(
                "Cannot operate on rolled back transaction",
            ));
        }
        Ok(())
    }

    /// Execute a statement within the transaction
    pub async fn execute(&self, query: &str) -> Result<u64> {
        self.check_open()?;
        self.db.execute(query).await
    }

    /// Execute a parameterized statement within the transaction
    pub async fn execute_with_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<u64> {
        self.check_open()?;
        self.db.execute_with_params(query, params).await
    }

    /// Query within the transaction
    pub async fn query(&self, query: &str) -> Result<Records> {
        self.check_open()?;
        self.db.query(query).await
    }

    /// Query with parameters within the transaction
    pub async fn query_with_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Records> {
        self.check_open()?;
        self.db.query_with_params(query, params).await
    }

    /// Commit the transaction
    ///
    /// After this the guard will not roll back on drop.
    pub async fn commit(self) -> Result<()> {
        if self.rolled_back.load(Ordering::Acquire) {
            return Err(crate::core::DatabaseError::transaction(
                "Cannot commit a rolled back transaction",
            ));
        }

        self.db.commit().await?;
        self.committed.store(true, Ordering::Release);
        Ok(())
    }

    /// Explicitly rollback the transaction
    ///
    /// Rollback also happens automatically on drop; this form surfaces the
    /// rollback result.
    pub async fn rollback(self) -> Result<()> {
        if self.committed.load(Ordering::Acquire) {
            return Err(crate::core::DatabaseError::transaction(
                "Cannot rollback a committed transaction",
            ));
        }

        self.db.rollback().await?;
        self.rolled_back.store(true, Ordering::Release);
        Ok(())
    }

    /// Check if the transaction has been committed
    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    /// Check if the transaction has been rolled back
    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back.load(Ordering::Acquire)
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.committed.load(Ordering::Acquire) || self.rolled_back.load(Ordering::Acquire) {
            return;
        }
        self.rolled_back.store(true, Ordering::Release);
        let db = Arc::clone(&self.db);

        // Drop cannot be async; schedule the rollback on the blocking pool
        // when a runtime is available, otherwise the database rolls the
        // transaction back itself when the connection closes.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            warn!(
                "transaction guard dropped without commit or rollback; \
                 rolling back"
            );
            let inner = handle.clone();
            handle.spawn_blocking(move || {
                if let Err(e) = inner.block_on(db.rollback()) {
                    warn!(error = %e, "automatic rollback failed");
                }
            });
        } else {
            warn!(
                "transaction guard dropped outside a runtime; transaction \
                 will be rolled back when the connection closes"
            );
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::SqliteDatabase;

    async fn connected_db() -> Arc<dyn Database> {
        let db = Arc::new(SqliteDatabase::new());
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_transaction_guard_commit() {
        let db = connected_db().await;

        {
            let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')")
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_transaction_guard_rollback_on_drop() {
        let db = connected_db().await;

        {
            let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')")
                .await
                .unwrap();
            // dropped without commit
        }

        // give the scheduled rollback time to run
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 0);
    }

    #[tokio::test]
    async fn test_transaction_guard_explicit_rollback() {
        let db = connected_db().await;

        {
            let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')")
                .await
                .unwrap();
            tx.rollback().await.unwrap();
        }

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 0);
    }
}
