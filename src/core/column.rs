//! Table column identities and the per-table column registry
//!
//! Columns are declared once per table as `const` values and grouped into an
//! immutable [`Columns`] registry that mappers share by reference. There is
//! no runtime registration and no global state; a table's registry is a
//! `'static` slice baked in at compile time.
//!
//! ```
//! use rust_record_mapper::core::column::{Column, Columns};
//!
//! struct StaffColumn;
//!
//! impl StaffColumn {
//!     pub const ID: Column = Column::new("staff", "id");
//!     pub const NAME: Column = Column::new("staff", "name");
//!
//!     pub const fn columns() -> Columns {
//!         Columns::new(&[Self::ID, Self::NAME])
//!     }
//! }
//!
//! assert_eq!(StaffColumn::ID.full_physical_name(), "staff.id");
//! assert_eq!(StaffColumn::columns().len(), 2);
//! ```

/// One column of one table: a physical name qualified by its table name
///
/// Immutable and freely copyable; shared read-only across all mappers bound
/// to the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    table_name: &'static str,
    physical_name: &'static str,
}

impl Column {
    /// Declare a column. Physical names are lowercase identifiers by
    /// convention; they are interpolated into SQL as trusted identifiers.
    pub const fn new(table_name: &'static str, physical_name: &'static str) -> Self {
        Self {
            table_name,
            physical_name,
        }
    }

    /// The table this column belongs to
    pub const fn table_name(&self) -> &'static str {
        self.table_name
    }

    /// The column's physical name
    pub const fn physical_name(&self) -> &'static str {
        self.physical_name
    }

    /// The physical name qualified with the table name, `"table.column"`
    pub fn full_physical_name(&self) -> String {
        format!("{}.{}", self.table_name, self.physical_name)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.physical_name)
    }
}

/// Immutable registry of a table's columns, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    columns: &'static [Column],
}

impl Columns {
    /// Wrap a static column slice as a registry
    pub const fn new(columns: &'static [Column]) -> Self {
        Self { columns }
    }

    /// All columns, in declaration order
    pub const fn as_slice(&self) -> &'static [Column] {
        self.columns
    }

    /// Number of declared columns
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when no columns are declared
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over the declared columns
    pub fn iter(&self) -> std::slice::Iter<'static, Column> {
        self.columns.iter()
    }

    /// Look up a column by physical name
    pub fn find(&self, physical_name: &str) -> Option<&'static Column> {
        self.columns
            .iter()
            .find(|c| c.physical_name() == physical_name)
    }

    /// True when a column with this physical name is declared
    pub fn contains(&self, physical_name: &str) -> bool {
        self.find(physical_name).is_some()
    }

    /// The physical names of all declared columns, in declaration order
    pub fn physical_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.physical_name()).collect()
    }
}

impl IntoIterator for Columns {
    type Item = &'static Column;
    type IntoIter = std::slice::Iter<'static, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'static Column;
    type IntoIter = std::slice::Iter<'static, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: Column = Column::new("users", "id");
    const NAME: Column = Column::new("users", "name");
    const STATUS: Column = Column::new("users", "status");
    const USERS: Columns = Columns::new(&[ID, NAME, STATUS]);

    #[test]
    fn test_column_names() {
        assert_eq!(ID.physical_name(), "id");
        assert_eq!(ID.table_name(), "users");
        assert_eq!(ID.full_physical_name(), "users.id");
        assert_eq!(ID.to_string(), "id");
    }

    #[test]
    fn test_registry_order_and_lookup() {
        assert_eq!(USERS.len(), 3);
        assert_eq!(USERS.physical_names(), ["id", "name", "status"]);
        assert!(USERS.contains("status"));
        assert!(!USERS.contains("missing"));
        assert_eq!(USERS.find("name"), Some(&NAME));
    }

    #[test]
    fn test_registry_iteration() {
        let collected: Vec<&Column> = USERS.iter().collect();
        assert_eq!(collected, [&ID, &NAME, &STATUS]);

        let mut seen = 0;
        for column in &USERS {
            assert_eq!(column.table_name(), "users");
            seen += 1;
        }
        assert_eq!(seen, 3);
    }
}
