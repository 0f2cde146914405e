//! Search condition builder
//!
//! A [`WhereSet`] is an ordered set of column predicates joined with `AND`.
//! It renders a parameterized clause (`"col1 = ? AND col2 != ?"`) and the
//! matching positional parameter list. The Nth `?` in the clause always
//! pairs with the Nth value in the parameter list; values are never
//! interpolated into the SQL text.
//!
//! Several complete `WhereSet`s can be combined with `OR` by the mapper
//! layer's generic search: predicates are ANDed within a set, sets are ORed
//! against each other.

use std::str::FromStr;

use super::value::DatabaseValue;

/// SQL comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Equal to (=)
    Eq,
    /// Not equal to (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// IN set membership
    In,
    /// IS NULL
    IsNull,
    /// LIKE pattern matching
    Like,
    /// BETWEEN two bounds (inclusive)
    Between,
    /// SIMILAR TO regular-expression matching (PostgreSQL)
    SimilarTo,
    /// REGEXP regular-expression matching
    Regexp,
}

impl Comparison {
    /// SQL text of the operator, uppercase
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::In => "IN",
            Comparison::IsNull => "IS NULL",
            Comparison::Like => "LIKE",
            Comparison::Between => "BETWEEN",
            Comparison::SimilarTo => "SIMILAR TO",
            Comparison::Regexp => "REGEXP",
        }
    }

    /// Number of `?` placeholders this operator renders for a predicate
    /// holding `value_count` values
    fn placeholder_count(&self, value_count: usize) -> usize {
        match self {
            Comparison::IsNull => 0,
            Comparison::Between => 2,
            Comparison::In => value_count,
            _ => 1,
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

impl FromStr for Comparison {
    type Err = String;

    /// Parse an operator, case-insensitively and ignoring surrounding
    /// whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "=" => Ok(Comparison::Eq),
            "!=" | "<>" => Ok(Comparison::Ne),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            "IN" => Ok(Comparison::In),
            "IS NULL" => Ok(Comparison::IsNull),
            "LIKE" => Ok(Comparison::Like),
            "BETWEEN" => Ok(Comparison::Between),
            "SIMILAR TO" => Ok(Comparison::SimilarTo),
            "REGEXP" => Ok(Comparison::Regexp),
            _ => Err(format!("Invalid comparison operator: '{}'", s)),
        }
    }
}

/// One column comparison: column name, operator, values, negation flag
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    column: String,
    comparison: Comparison,
    values: Vec<DatabaseValue>,
    is_not: bool,
}

impl Where {
    /// Create a predicate
    pub fn new(
        column: impl Into<String>,
        comparison: Comparison,
        values: Vec<DatabaseValue>,
        is_not: bool,
    ) -> Self {
        Self {
            column: column.into(),
            comparison,
            values,
            is_not,
        }
    }

    /// The column name being compared
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The comparison operator
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// All supplied comparison values
    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    /// Whether the predicate is negated with `NOT`
    pub fn is_not(&self) -> bool {
        self.is_not
    }

    /// The values that actually bind to this predicate's placeholders
    ///
    /// `IS NULL` binds none, `BETWEEN` binds exactly the first two supplied
    /// values, `IN` binds all of them, and every other operator binds the
    /// first. The slice length always equals the number of `?` occurrences
    /// rendered by [`build_parameter_clause`](Self::build_parameter_clause).
    pub fn effective_values(&self) -> &[DatabaseValue] {
        let count = self.comparison.placeholder_count(self.values.len());
        &self.values[..count.min(self.values.len())]
    }

    /// Render this predicate as a parameterized clause, e.g. `"column = ?"`
    pub fn build_parameter_clause(&self) -> String {
        let mut clause = String::new();
        if self.is_not {
            clause.push_str("NOT ");
        }
        clause.push_str(&self.column);
        clause.push(' ');
        clause.push_str(self.comparison.as_sql());
        match self.comparison {
            Comparison::IsNull => {}
            Comparison::Between => clause.push_str(" ? AND ?"),
            Comparison::In => {
                clause.push_str(" (");
                for i in 0..self.values.len() {
                    if i > 0 {
                        clause.push_str(", ");
                    }
                    clause.push('?');
                }
                clause.push(')');
            }
            _ => clause.push_str(" ?"),
        }
        clause
    }
}

/// Ordered set of predicates joined with `AND`
///
/// An empty set is a distinct, meaningful state ("no condition specified");
/// operations that require a condition treat it the same as no set at all
/// and fail fast instead of emitting a match-everything clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereSet {
    wheres: Vec<Where>,
}

impl WhereSet {
    /// Create an empty condition set
    pub fn new() -> Self {
        Self::default()
    }

    /// The predicates added so far, in order
    pub fn wheres(&self) -> &[Where] {
        &self.wheres
    }

    /// True when no predicates have been added
    pub fn is_empty(&self) -> bool {
        self.wheres.is_empty()
    }

    /// Number of predicates
    pub fn len(&self) -> usize {
        self.wheres.len()
    }

    /// Add a predicate with an explicit operator and value list
    pub fn add(
        &mut self,
        column: impl Into<String>,
        comparison: Comparison,
        values: Vec<DatabaseValue>,
        is_not: bool,
    ) {
        self.wheres
            .push(Where::new(column, comparison, values, is_not));
    }

    /// Add a `column = ?` predicate
    pub fn add_equal(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Eq, vec![value.into()], is_not);
    }

    /// Add a `column != ?` predicate
    pub fn add_not_equal(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Ne, vec![value.into()], is_not);
    }

    /// Add a `column < ?` predicate
    pub fn add_less(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Lt, vec![value.into()], is_not);
    }

    /// Add a `column <= ?` predicate
    pub fn add_less_equal(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Le, vec![value.into()], is_not);
    }

    /// Add a `column > ?` predicate
    pub fn add_greater(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Gt, vec![value.into()], is_not);
    }

    /// Add a `column >= ?` predicate
    pub fn add_greater_equal(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Ge, vec![value.into()], is_not);
    }

    /// Add a `column IN (?, ?, …)` predicate with one placeholder per value
    ///
    /// An empty value list renders `IN ()`; avoiding that is the caller's
    /// responsibility.
    pub fn add_in(
        &mut self,
        column: impl Into<String>,
        values: Vec<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::In, values, is_not);
    }

    /// Add a `column IS NULL` predicate (no placeholder)
    pub fn add_is_null(&mut self, column: impl Into<String>, is_not: bool) {
        self.add(column, Comparison::IsNull, Vec::new(), is_not);
    }

    /// Add a `column LIKE ?` predicate
    pub fn add_like(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Like, vec![value.into()], is_not);
    }

    /// Add a `column BETWEEN ? AND ?` predicate
    pub fn add_between(
        &mut self,
        column: impl Into<String>,
        value_from: impl Into<DatabaseValue>,
        value_to: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(
            column,
            Comparison::Between,
            vec![value_from.into(), value_to.into()],
            is_not,
        );
    }

    /// Add a `column SIMILAR TO ?` predicate
    pub fn add_similar_to(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::SimilarTo, vec![value.into()], is_not);
    }

    /// Add a `column REGEXP ?` predicate
    pub fn add_regexp(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
        is_not: bool,
    ) {
        self.add(column, Comparison::Regexp, vec![value.into()], is_not);
    }

    /// Render all predicates as one parameterized clause joined with ` AND `
    pub fn build_parameter_clause(&self) -> String {
        let mut clause = String::new();
        for where_item in &self.wheres {
            if !clause.is_empty() {
                clause.push_str(" AND ");
            }
            clause.push_str(&where_item.build_parameter_clause());
        }
        clause
    }

    /// Flatten the effective values of every predicate, in predicate order
    ///
    /// The result pairs positionally with the `?` occurrences of
    /// [`build_parameter_clause`](Self::build_parameter_clause); predicates
    /// without placeholders contribute nothing.
    pub fn build_parameters(&self) -> Vec<DatabaseValue> {
        let mut parameters = Vec::new();
        for where_item in &self.wheres {
            parameters.extend_from_slice(where_item.effective_values());
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_count(clause: &str) -> usize {
        clause.matches('?').count()
    }

    #[test]
    fn test_equal_and_not_equal() {
        let mut set = WhereSet::new();
        set.add_equal("id", 5, false);
        set.add_not_equal("status", "archived", false);

        assert_eq!(set.build_parameter_clause(), "id = ? AND status != ?");
        assert_eq!(
            set.build_parameters(),
            vec![
                DatabaseValue::Int(5),
                DatabaseValue::String("archived".to_string())
            ]
        );
    }

    #[test]
    fn test_in_placeholders_match_value_count() {
        let mut set = WhereSet::new();
        set.add_in(
            "id",
            vec![
                DatabaseValue::Int(1),
                DatabaseValue::Int(2),
                DatabaseValue::Int(3),
            ],
            false,
        );

        assert_eq!(set.build_parameter_clause(), "id IN (?, ?, ?)");
        assert_eq!(set.build_parameters().len(), 3);
    }

    #[test]
    fn test_in_with_no_values() {
        let mut set = WhereSet::new();
        set.add_in("id", Vec::new(), false);

        assert_eq!(set.build_parameter_clause(), "id IN ()");
        assert!(set.build_parameters().is_empty());
    }

    #[test]
    fn test_between_exactly_two_placeholders() {
        let mut set = WhereSet::new();
        set.add_between("age", 18, 65, false);
        assert_eq!(set.build_parameter_clause(), "age BETWEEN ? AND ?");
        assert_eq!(set.build_parameters().len(), 2);

        // extra values beyond the two bounds are ignored on both sides
        let mut raw = WhereSet::new();
        raw.add(
            "age",
            Comparison::Between,
            vec![
                DatabaseValue::Int(18),
                DatabaseValue::Int(65),
                DatabaseValue::Int(99),
            ],
            false,
        );
        assert_eq!(raw.build_parameter_clause(), "age BETWEEN ? AND ?");
        assert_eq!(
            raw.build_parameters(),
            vec![DatabaseValue::Int(18), DatabaseValue::Int(65)]
        );
    }

    #[test]
    fn test_is_null_has_no_placeholder() {
        let mut set = WhereSet::new();
        set.add_is_null("deleted_at", false);
        assert_eq!(set.build_parameter_clause(), "deleted_at IS NULL");
        assert!(set.build_parameters().is_empty());

        // a stray value supplied through the raw adder is ignored
        let mut raw = WhereSet::new();
        raw.add(
            "deleted_at",
            Comparison::IsNull,
            vec![DatabaseValue::Int(1)],
            false,
        );
        assert!(raw.build_parameters().is_empty());
    }

    #[test]
    fn test_not_prefixes_whole_predicate() {
        let mut set = WhereSet::new();
        set.add_equal("name", "alice", true);
        assert_eq!(set.build_parameter_clause(), "NOT name = ?");

        let mut set = WhereSet::new();
        set.add_is_null("deleted_at", true);
        assert_eq!(set.build_parameter_clause(), "NOT deleted_at IS NULL");
    }

    #[test]
    fn test_clause_placeholders_pair_with_parameters() {
        let mut set = WhereSet::new();
        set.add_equal("a", 1, false);
        set.add_in(
            "b",
            vec![DatabaseValue::Int(2), DatabaseValue::Int(3)],
            false,
        );
        set.add_is_null("c", false);
        set.add_between("d", 4, 5, true);
        set.add_like("e", "%x%", false);

        let clause = set.build_parameter_clause();
        let parameters = set.build_parameters();
        assert_eq!(placeholder_count(&clause), parameters.len());
        assert_eq!(parameters.len(), 6);
    }

    #[test]
    fn test_comparison_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(" between ".parse::<Comparison>(), Ok(Comparison::Between));
        assert_eq!("In".parse::<Comparison>(), Ok(Comparison::In));
        assert_eq!("is null".parse::<Comparison>(), Ok(Comparison::IsNull));
        assert_eq!("similar to".parse::<Comparison>(), Ok(Comparison::SimilarTo));
        assert_eq!("<>".parse::<Comparison>(), Ok(Comparison::Ne));
        assert!("almost".parse::<Comparison>().is_err());
    }

    #[test]
    fn test_comparison_renders_uppercase() {
        assert_eq!(Comparison::Like.as_sql(), "LIKE");
        assert_eq!(Comparison::Regexp.as_sql(), "REGEXP");
        assert_eq!(Comparison::SimilarTo.to_string(), "SIMILAR TO");
    }

    #[test]
    fn test_similar_to_and_regexp_render() {
        let mut set = WhereSet::new();
        set.add_similar_to("code", "[A-Z]{3}", false);
        set.add_regexp("name", "^a", false);
        assert_eq!(
            set.build_parameter_clause(),
            "code SIMILAR TO ? AND name REGEXP ?"
        );
    }

    #[test]
    fn test_empty_set_is_distinct_state() {
        let set = WhereSet::new();
        assert!(set.is_empty());
        assert_eq!(set.build_parameter_clause(), "");
        assert!(set.build_parameters().is_empty());
    }
}
