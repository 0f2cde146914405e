//! Property-based tests for the condition builder using proptest

use proptest::prelude::*;
use rust_record_mapper::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn arb_value() -> impl Strategy<Value = DatabaseValue> {
    prop_oneof![
        Just(DatabaseValue::Null),
        any::<bool>().prop_map(DatabaseValue::Bool),
        any::<i32>().prop_map(DatabaseValue::Int),
        any::<i64>().prop_map(DatabaseValue::Long),
        "[a-zA-Z0-9 _%-]{0,16}".prop_map(DatabaseValue::String),
    ]
}

fn arb_column() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

#[derive(Debug, Clone)]
enum PredicateSpec {
    Scalar(Comparison, String, DatabaseValue, bool),
    In(String, Vec<DatabaseValue>, bool),
    IsNull(String, bool),
    Between(String, DatabaseValue, DatabaseValue, bool),
}

fn arb_scalar_comparison() -> impl Strategy<Value = Comparison> {
    prop_oneof![
        Just(Comparison::Eq),
        Just(Comparison::Ne),
        Just(Comparison::Lt),
        Just(Comparison::Le),
        Just(Comparison::Gt),
        Just(Comparison::Ge),
        Just(Comparison::Like),
        Just(Comparison::SimilarTo),
        Just(Comparison::Regexp),
    ]
}

fn arb_predicate() -> impl Strategy<Value = PredicateSpec> {
    prop_oneof![
        (arb_scalar_comparison(), arb_column(), arb_value(), any::<bool>())
            .prop_map(|(op, col, value, not)| PredicateSpec::Scalar(op, col, value, not)),
        (
            arb_column(),
            prop::collection::vec(arb_value(), 0..6),
            any::<bool>()
        )
            .prop_map(|(col, values, not)| PredicateSpec::In(col, values, not)),
        (arb_column(), any::<bool>()).prop_map(|(col, not)| PredicateSpec::IsNull(col, not)),
        (arb_column(), arb_value(), arb_value(), any::<bool>())
            .prop_map(|(col, from, to, not)| PredicateSpec::Between(col, from, to, not)),
    ]
}

fn build_where_set(specs: &[PredicateSpec]) -> WhereSet {
    let mut set = WhereSet::new();
    for spec in specs {
        match spec {
            PredicateSpec::Scalar(op, col, value, not) => {
                set.add(col.clone(), *op, vec![value.clone()], *not)
            }
            PredicateSpec::In(col, values, not) => set.add_in(col.clone(), values.clone(), *not),
            PredicateSpec::IsNull(col, not) => set.add_is_null(col.clone(), *not),
            PredicateSpec::Between(col, from, to, not) => {
                set.add_between(col.clone(), from.clone(), to.clone(), *not)
            }
        }
    }
    set
}

// ============================================================================
// Placeholder / Parameter Parity
// ============================================================================

proptest! {
    /// The clause always contains exactly as many `?` as the parameter
    /// list has values, for every predicate mix
    #[test]
    fn placeholders_pair_with_parameters(specs in prop::collection::vec(arb_predicate(), 0..12)) {
        let set = build_where_set(&specs);
        let clause = set.build_parameter_clause();
        let parameters = set.build_parameters();
        prop_assert_eq!(clause.matches('?').count(), parameters.len());
    }

    /// Parameters flatten in predicate order: concatenating each
    /// predicate's effective values reproduces the flat list
    #[test]
    fn parameters_preserve_predicate_order(specs in prop::collection::vec(arb_predicate(), 0..12)) {
        let set = build_where_set(&specs);
        let expected: Vec<DatabaseValue> = set
            .wheres()
            .iter()
            .flat_map(|w| w.effective_values().to_vec())
            .collect();
        prop_assert_eq!(set.build_parameters(), expected);
    }

    /// `IN` renders one placeholder per value inside one pair of
    /// parentheses
    #[test]
    fn in_placeholder_count_matches_values(
        col in arb_column(),
        values in prop::collection::vec(arb_value(), 0..10),
        not in any::<bool>(),
    ) {
        let mut set = WhereSet::new();
        set.add_in(col, values.clone(), not);
        let clause = set.build_parameter_clause();
        prop_assert_eq!(clause.matches('?').count(), values.len());
        prop_assert_eq!(clause.matches('(').count(), 1);
        prop_assert_eq!(clause.matches(')').count(), 1);
        prop_assert_eq!(set.build_parameters().len(), values.len());
    }

    /// `BETWEEN` always renders exactly two placeholders, whatever was
    /// supplied
    #[test]
    fn between_always_two_placeholders(
        col in arb_column(),
        values in prop::collection::vec(arb_value(), 2..6),
        not in any::<bool>(),
    ) {
        let mut set = WhereSet::new();
        set.add(col, Comparison::Between, values, not);
        let clause = set.build_parameter_clause();
        prop_assert_eq!(clause.matches('?').count(), 2);
        prop_assert_eq!(set.build_parameters().len(), 2);
    }

    /// `IS NULL` contributes no placeholder and no parameter
    #[test]
    fn is_null_contributes_nothing(col in arb_column(), not in any::<bool>()) {
        let mut set = WhereSet::new();
        set.add_is_null(col, not);
        prop_assert_eq!(set.build_parameter_clause().matches('?').count(), 0);
        prop_assert!(set.build_parameters().is_empty());
    }

    /// A negated predicate leads with `NOT ` before the column reference
    #[test]
    fn negation_prefixes_predicate(col in arb_column(), value in arb_value()) {
        let mut set = WhereSet::new();
        set.add_equal(col.clone(), value, true);
        let clause = set.build_parameter_clause();
        prop_assert!(clause.starts_with("NOT "));
        prop_assert!(clause.contains(&col));
    }

    /// Predicates join with ` AND ` exactly n-1 times
    #[test]
    fn and_joins_count(specs in prop::collection::vec(arb_predicate(), 1..10)) {
        let set = build_where_set(&specs);
        let clause = set.build_parameter_clause();
        prop_assert_eq!(clause.matches(" AND ").count(), specs.len().saturating_sub(1)
            + specs.iter().filter(|s| matches!(s, PredicateSpec::Between(..))).count());
    }
}

// ============================================================================
// Value Roundtrip Tests
// ============================================================================

proptest! {
    /// Bool values roundtrip correctly
    #[test]
    fn bool_roundtrip(value in any::<bool>()) {
        let db_val = DatabaseValue::from(value);
        prop_assert_eq!(db_val.as_bool(), Some(value));
        prop_assert!(!db_val.is_null());
        prop_assert_eq!(db_val.type_name(), "bool");
    }

    /// Int values roundtrip correctly
    #[test]
    fn int_roundtrip(value in any::<i32>()) {
        let db_val = DatabaseValue::from(value);
        prop_assert_eq!(db_val.as_int(), Some(value));
        prop_assert_eq!(db_val.type_name(), "int");
    }

    /// Long values roundtrip correctly
    #[test]
    fn long_roundtrip(value in any::<i64>()) {
        let db_val = DatabaseValue::from(value);
        prop_assert_eq!(db_val.as_long(), Some(value));
        prop_assert_eq!(db_val.type_name(), "long");
    }

    /// String values roundtrip correctly
    #[test]
    fn string_roundtrip(value in ".*") {
        let db_val = DatabaseValue::from(value.clone());
        prop_assert_eq!(db_val.as_string(), value);
        prop_assert_eq!(db_val.type_name(), "string");
    }

    /// Records keep keys in insertion order regardless of key content
    #[test]
    fn record_key_order_is_stable(keys in prop::collection::vec("[a-z][a-z0-9_]{0,10}", 1..8)) {
        let mut record = Record::new();
        for (i, key) in keys.iter().enumerate() {
            record.insert(key.clone(), DatabaseValue::Int(i as i32));
        }
        let mut expected: Vec<String> = Vec::new();
        for key in &keys {
            if !expected.contains(key) {
                expected.push(key.clone());
            }
        }
        let actual: Vec<String> = record.keys().cloned().collect();
        prop_assert_eq!(actual, expected);
    }
}
