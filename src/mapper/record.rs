//! Single-row record lifecycle
//!
//! A [`RecordMapper`] holds exactly one in-memory [`Record`], default-
//! initialized at construction and replaced wholesale by `edit`. The
//! lifecycle is explicit: set a condition, `edit` to fetch the row, mutate
//! the record, `update` to persist it. Each step is a separate,
//! caller-driven call, and transaction boundaries belong to the caller.

use async_trait::async_trait;
use tracing::debug;

use crate::core::error::{DatabaseError, Result};
use crate::core::value::Record;
use crate::mapper::table::TableMapper;

/// Mapper binding one table row to one in-memory record
#[async_trait]
pub trait RecordMapper: TableMapper {
    /// The record currently held in memory
    fn record(&self) -> &Record;

    /// Mutable access to the held record
    fn record_mut(&mut self) -> &mut Record;

    /// Replace the held record wholesale
    fn set_record(&mut self, record: Record);

    /// Reset the held record to the table's default record
    fn set_default_record(&mut self) {
        self.set_record(self.create_default_record());
    }

    /// Whether a record counts as soft-deleted for this table
    ///
    /// Called by [`edit`](Self::edit) on the freshly fetched record;
    /// soft-deleted rows are treated as absent for editing even though they
    /// are physically present. Each concrete mapper decides against its own
    /// schema (typically a status or deleted-at column).
    fn is_deleted(&self, record: &Record) -> bool;

    /// Delete the row identified by the current condition
    ///
    /// Concrete mappers choose the strategy: set a soft-delete marker and
    /// call [`update`](Self::update), or remove the row with
    /// [`physical_delete`](Self::physical_delete).
    async fn delete(&mut self) -> Result<()>;

    /// Insert the held record as a new row
    ///
    /// Only declared columns present in the record are written, in
    /// column-registry order. No condition is required and the held record
    /// is left untouched.
    async fn insert(&self) -> Result<()> {
        let record = self.extract_declared_columns(self.record());
        debug!(table = self.table_name(), "insert single record");
        self.database().insert(&record, self.table_name()).await?;
        Ok(())
    }

    /// Fetch the row matching the current condition and start editing it
    ///
    /// Replaces the held record with the fetched one. Fails with
    /// [`DatabaseError::MissingCondition`] when no condition is set,
    /// [`DatabaseError::NotFound`] when no row matches or the fetched row
    /// is flagged deleted by [`is_deleted`](Self::is_deleted).
    async fn edit(&mut self) -> Result<()> {
        let where_set = self.required_where_set()?;
        let sql = format!(
            "SELECT * FROM {} WHERE {}",
            self.table_name(),
            where_set.build_parameter_clause()
        );
        debug!(table = self.table_name(), "edit single record");
        let record = self
            .database()
            .fetch_record(&sql, &where_set.build_parameters())
            .await?;
        self.set_record(record);
        if self.is_deleted(self.record()) {
            return Err(DatabaseError::not_found_with("row is flagged as deleted"));
        }
        Ok(())
    }

    /// Overwrite the row matching the current condition with the held
    /// record
    ///
    /// Only declared columns present in the record are written. Fails with
    /// [`DatabaseError::MissingCondition`] when no condition is set.
    async fn update(&self) -> Result<()> {
        let where_set = self.required_where_set()?;
        let record = self.extract_declared_columns(self.record());
        debug!(table = self.table_name(), "update single record");
        self.database()
            .update(&record, self.table_name(), &where_set)
            .await?;
        Ok(())
    }

    /// Physically delete the row matching the current condition
    async fn physical_delete(&self) -> Result<()> {
        let where_set = self.required_where_set()?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table_name(),
            where_set.build_parameter_clause()
        );
        debug!(table = self.table_name(), "physical delete");
        self.database()
            .execute_with_params(&sql, &where_set.build_parameters())
            .await?;
        Ok(())
    }

    /// Probe whether a row matches the current condition
    ///
    /// Performs the same fetch as [`edit`](Self::edit) but backs the held
    /// record up first and restores it on every exit path, so the mapper's
    /// state is identical before and after the call. Returns `Ok(false)`
    /// for "no row found" instead of an error; the missing-condition
    /// precondition and driver failures still surface as errors. The
    /// soft-delete hook is not consulted.
    async fn exists(&mut self) -> Result<bool> {
        let where_set = self.required_where_set()?;
        let sql = format!(
            "SELECT * FROM {} WHERE {}",
            self.table_name(),
            where_set.build_parameter_clause()
        );
        let backup = self.record().clone();
        let outcome = self
            .database()
            .fetch_record(&sql, &where_set.build_parameters())
            .await;
        match outcome {
            Ok(record) => {
                self.set_record(record);
                self.set_record(backup);
                Ok(true)
            }
            Err(error) => {
                self.set_record(backup);
                if error.is_not_found() {
                    Ok(false)
                } else {
                    Err(error)
                }
            }
        }
    }
}
