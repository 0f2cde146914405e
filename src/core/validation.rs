//! Validation failure aggregation
//!
//! Mapper implementations inspect a record in their `validate` hook and
//! collect every column that fails into one [`ValidationError`] before a
//! commit is attempted. Callers can stop at the first cause or present all
//! of them; this type only accumulates.

use indexmap::IndexMap;

use super::column::Column;

/// One column that failed validation, with its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationCause {
    column: Column,
    message: String,
}

impl ValidationCause {
    /// Create a cause for one column
    pub fn new(column: Column, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }

    /// The column that failed
    pub fn column(&self) -> Column {
        self.column
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Aggregate of column-level validation failures for one record
///
/// Causes are kept in insertion order. The overall message is distinct from
/// any single cause, so a caller can report "the record is invalid" and the
/// per-column details separately.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    causes: Vec<ValidationCause>,
}

impl ValidationError {
    /// Create an aggregate with an overall message and no causes yet
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// The overall message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Record one failed column
    pub fn add_cause(&mut self, column: Column, message: impl Into<String>) {
        self.causes.push(ValidationCause::new(column, message));
    }

    /// All causes, in insertion order
    pub fn causes(&self) -> &[ValidationCause] {
        &self.causes
    }

    /// True when at least one cause has been recorded
    pub fn has_causes(&self) -> bool {
        !self.causes.is_empty()
    }

    /// Project the causes to column physical name -> message
    ///
    /// When a column was validated more than once, the last recorded message
    /// wins.
    pub fn cause_messages(&self) -> IndexMap<String, String> {
        let mut messages = IndexMap::new();
        for cause in &self.causes {
            messages.insert(
                cause.column().physical_name().to_string(),
                cause.message().to_string(),
            );
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: Column = Column::new("staff", "name");
    const AGE: Column = Column::new("staff", "age");

    #[test]
    fn test_causes_keep_insertion_order() {
        let mut error = ValidationError::new("staff record is invalid");
        assert!(!error.has_causes());

        error.add_cause(NAME, "name is required");
        error.add_cause(AGE, "age must be positive");

        assert!(error.has_causes());
        assert_eq!(error.causes().len(), 2);
        assert_eq!(error.causes()[0].column(), NAME);
        assert_eq!(error.causes()[1].message(), "age must be positive");
        assert_eq!(error.to_string(), "staff record is invalid");
    }

    #[test]
    fn test_cause_messages_last_wins_per_column() {
        let mut error = ValidationError::new("invalid");
        error.add_cause(NAME, "too short");
        error.add_cause(AGE, "not a number");
        error.add_cause(NAME, "contains control characters");

        let messages = error.cause_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages.get("name").map(String::as_str),
            Some("contains control characters")
        );
        assert_eq!(
            messages.get("age").map(String::as_str),
            Some("not a number")
        );

        // projection preserves first-seen column order
        let keys: Vec<&String> = messages.keys().collect();
        assert_eq!(keys, ["name", "age"]);
    }
}
