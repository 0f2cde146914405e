//! Multi-row record lifecycle
//!
//! A [`RecordsMapper`] holds zero or more in-memory [`Record`]s and
//! persists them with replace semantics: `update` deletes every row in the
//! matched scope and re-inserts the in-memory collection, so the database
//! ends up exactly mirroring memory for that scope. Whole-table operations
//! (no condition set) are gated behind an explicit permission hook.

use async_trait::async_trait;
use tracing::debug;

use crate::core::error::{DatabaseError, Result};
use crate::core::value::{Record, Records};
use crate::mapper::table::TableMapper;

/// Mapper binding a set of table rows to an in-memory record collection
#[async_trait]
pub trait RecordsMapper: TableMapper {
    /// The records currently held in memory, in order
    fn records(&self) -> &[Record];

    /// Mutable access to the held records
    fn records_mut(&mut self) -> &mut Records;

    /// Replace the held records wholesale
    fn set_records(&mut self, records: Records);

    /// Whether whole-table (empty-condition) edit/update/exists is allowed
    ///
    /// Defaults should be conservative; returning `true` lets `update`
    /// replace the entire table.
    fn is_permitted_empty_condition_update(&self) -> bool;

    /// Append one record to the collection
    fn add_record(&mut self, record: Record) {
        self.records_mut().push(record);
    }

    /// Remove the first record equal to the given one, if present
    fn remove_record(&mut self, record: &Record) {
        let records = self.records_mut();
        if let Some(position) = records.iter().position(|held| held == record) {
            records.remove(position);
        }
    }

    /// Clear the held records
    fn clear_records(&mut self) {
        self.records_mut().clear();
    }

    /// Fetch all rows in the current scope and start editing them
    ///
    /// Clears the held records first. With a condition set, fetches the
    /// matching rows; with none, fetches the whole table, which requires
    /// [`is_permitted_empty_condition_update`](Self::is_permitted_empty_condition_update)
    /// and otherwise fails with [`DatabaseError::PermissionDenied`].
    ///
    /// `order_by_columns` entries may carry direction suffixes
    /// (`"created_at DESC"`); they are joined verbatim with `", "` into the
    /// `ORDER BY` clause. No column-existence validation happens here.
    async fn edit(&mut self, order_by_columns: &[&str]) -> Result<()> {
        let mut after_where_part = String::new();
        if !order_by_columns.is_empty() {
            after_where_part.push_str("ORDER BY ");
            after_where_part.push_str(&order_by_columns.join(", "));
        }
        self.clear_records();
        let condition = self.where_set().filter(|ws| !ws.is_empty()).cloned();
        let mut sql = format!("SELECT * FROM {}", self.table_name());
        let records = match condition {
            Some(where_set) => {
                sql.push_str(" WHERE ");
                sql.push_str(&where_set.build_parameter_clause());
                if !after_where_part.is_empty() {
                    sql.push(' ');
                    sql.push_str(&after_where_part);
                }
                debug!(table = self.table_name(), "edit records");
                self.database()
                    .fetch_records(&sql, &where_set.build_parameters())
                    .await?
            }
            None => {
                if !self.is_permitted_empty_condition_update() {
                    return Err(DatabaseError::permission_denied(
                        "editing all records of the table",
                    ));
                }
                if !after_where_part.is_empty() {
                    sql.push(' ');
                    sql.push_str(&after_where_part);
                }
                debug!(table = self.table_name(), "edit all records");
                self.database().fetch_records(&sql, &[]).await?
            }
        };
        self.set_records(records);
        Ok(())
    }

    /// Replace the rows in the current scope with the held records
    ///
    /// **Replace semantics, not diff/merge**: every row matching the
    /// current condition (or the whole table, when permitted and no
    /// condition is set) is deleted, then each held record is inserted as a
    /// fresh row restricted to the declared columns. Rows removed from the
    /// collection since the last [`edit`](Self::edit) are permanently
    /// dropped. The delete and the inserts are separate statements; run
    /// them inside a caller-owned transaction for atomicity.
    async fn update(&self) -> Result<()> {
        let condition = self.where_set().filter(|ws| !ws.is_empty()).cloned();
        let mut sql = format!("DELETE FROM {}", self.table_name());
        match condition {
            Some(where_set) => {
                sql.push_str(" WHERE ");
                sql.push_str(&where_set.build_parameter_clause());
                debug!(table = self.table_name(), "replace records in scope");
                self.database()
                    .execute_with_params(&sql, &where_set.build_parameters())
                    .await?;
            }
            None => {
                if !self.is_permitted_empty_condition_update() {
                    return Err(DatabaseError::permission_denied(
                        "updating all records of the table",
                    ));
                }
                debug!(table = self.table_name(), "replace all records");
                self.database().execute(&sql).await?;
            }
        }
        for record in self.records() {
            let declared = self.extract_declared_columns(record);
            self.database().insert(&declared, self.table_name()).await?;
        }
        Ok(())
    }

    /// Probe whether any row matches the current scope
    ///
    /// With a condition set, counts via
    /// `SELECT COUNT(<first predicate column>)`; if that column is nullable
    /// the count skips its NULL rows, so the probe can undercount. That is
    /// a long-standing contract of this layer, kept as is. With no condition
    /// (and permission granted) the whole table is counted with
    /// `COUNT(*)`; without permission the probe fails with
    /// [`DatabaseError::MissingCondition`].
    async fn exists(&self) -> Result<bool> {
        let condition = self.where_set().filter(|ws| !ws.is_empty()).cloned();
        match condition {
            Some(where_set) => {
                let sql = format!(
                    "SELECT COUNT({}) FROM {} WHERE {}",
                    where_set.wheres()[0].column(),
                    self.table_name(),
                    where_set.build_parameter_clause()
                );
                let count = self
                    .database()
                    .fetch_one(&sql, &where_set.build_parameters())
                    .await?;
                Ok(count.as_long().unwrap_or(0) > 0)
            }
            None => {
                if !self.is_permitted_empty_condition_update() {
                    return Err(DatabaseError::MissingCondition);
                }
                let count = self.database().count(self.table_name()).await?;
                Ok(count > 0)
            }
        }
    }
}
