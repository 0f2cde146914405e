//! Table binding and the generic multi-set search
//!
//! A [`TableMapper`] binds a table name, its column registry, a
//! default-record factory, and a shared database connection, plus the
//! optional [`WhereSet`] that scopes edit/update/delete operations. The
//! single- and multi-row lifecycles in [`record`](crate::mapper::record) and
//! [`records`](crate::mapper::records) build on this trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::column::Columns;
use crate::core::condition::WhereSet;
use crate::core::database::Database;
use crate::core::error::{DatabaseError, Result};
use crate::core::validation::ValidationError;
use crate::core::value::{Record, Records};

/// Binding of one table to a database connection
///
/// The connection is shared, not owned: many mappers may hold the same
/// `Arc<dyn Database>`, and its lifetime is managed by the caller. A mapper
/// instance itself is single-owner state; its condition and records must
/// not be mutated concurrently.
#[async_trait]
pub trait TableMapper: Send + Sync {
    /// The connection this mapper operates through
    fn database(&self) -> &Arc<dyn Database>;

    /// The bound table's name
    fn table_name(&self) -> &'static str;

    /// The bound table's column registry
    fn columns(&self) -> Columns;

    /// Produce a record holding every declared column's initial value
    fn create_default_record(&self) -> Record;

    /// The condition that scopes edit/update/delete, if one is set
    fn where_set(&self) -> Option<&WhereSet>;

    /// Set the condition that scopes edit/update/delete
    ///
    /// Must be called before any operation that requires one.
    fn set_where_set(&mut self, where_set: WhereSet);

    /// Remove and return the current condition
    fn take_where_set(&mut self) -> Option<WhereSet>;

    /// Verify that a record is valid for this table
    ///
    /// Implementations collect every failing column into the returned
    /// [`ValidationError`].
    fn validate(&self, record: &Record) -> std::result::Result<(), ValidationError>;

    /// Canonicalize a record's values (case folding, width folding, …)
    fn normalize(&self, record: &mut Record);

    /// True when a usable condition is set
    ///
    /// A present-but-empty [`WhereSet`] counts as no condition; operations
    /// that require one fail fast instead of matching everything.
    fn has_condition(&self) -> bool {
        self.where_set().map(|ws| !ws.is_empty()).unwrap_or(false)
    }

    /// The current condition, cloned, or [`DatabaseError::MissingCondition`]
    fn required_where_set(&self) -> Result<WhereSet> {
        match self.where_set() {
            Some(ws) if !ws.is_empty() => Ok(ws.clone()),
            _ => Err(DatabaseError::MissingCondition),
        }
    }

    /// Restrict a record to this table's declared columns
    ///
    /// The result holds the intersection of the record's keys and the
    /// column registry, in registry declaration order.
    fn extract_declared_columns(&self, record: &Record) -> Record {
        let mut extracted = Record::new();
        for column in self.columns().iter() {
            if let Some(value) = record.get(column.physical_name()) {
                extracted.insert(column.physical_name().to_string(), value.clone());
            }
        }
        extracted
    }

    /// Search the table with any number of complete conditions
    ///
    /// Conditions are combined with `OR` against each other while each
    /// set's predicates stay ANDed internally, expressing "rows matching
    /// any one of these filter combinations". Empty sets contribute
    /// nothing. `select` overrides the `SELECT * FROM table` head when
    /// non-empty; `after_where_part` (ORDER BY and the like) is appended
    /// verbatim.
    async fn search(
        &self,
        where_sets: &[WhereSet],
        select: &str,
        after_where_part: &str,
    ) -> Result<Records> {
        let mut sql = if select.is_empty() {
            format!("SELECT * FROM {}", self.table_name())
        } else {
            select.to_string()
        };
        let mut clause = String::new();
        let mut parameters = Vec::new();
        for where_set in where_sets {
            if where_set.is_empty() {
                continue;
            }
            if !clause.is_empty() {
                clause.push_str(" OR ");
            }
            clause.push_str(&where_set.build_parameter_clause());
            parameters.extend(where_set.build_parameters());
        }
        if !clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        if !after_where_part.is_empty() {
            sql.push(' ');
            sql.push_str(after_where_part);
        }
        debug!(table = self.table_name(), sets = where_sets.len(), "search");
        self.database().fetch_records(&sql, &parameters).await
    }
}
