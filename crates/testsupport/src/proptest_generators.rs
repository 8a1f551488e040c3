//! Property-based test generators using proptest.
//!
//! `Strategy` implementations for generating random `types::Value`/
//! `common::Row` instances, feeding the universal invariants on visibility,
//! buffer pool accounting, and storage round-trips.

use common::Row;
use proptest::prelude::*;
use types::{SqlType, Value};

/// Strategy for generating random `Value` instances, covering every variant.
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        any::<f64>().prop_map(Value::Double),
        "[a-z]{1,20}".prop_map(Value::Char),
        any::<i32>().prop_map(Value::Date),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

/// Strategy for generating random `Row` instances with 1-10 columns.
///
/// # Example
///
/// ```
/// use proptest::prelude::*;
/// use testsupport::proptest_generators::arb_row;
///
/// proptest! {
///     #[test]
///     fn test_row_property(row in arb_row()) {
///         assert!(!row.values.is_empty());
///     }
/// }
/// ```
pub fn arb_row() -> impl Strategy<Value = Row> {
    prop::collection::vec(arb_value(), 1..10).prop_map(Row::new)
}

/// Strategy for generating random `Row` instances with a fixed column count.
///
/// # Example
///
/// ```
/// use proptest::prelude::*;
/// use testsupport::proptest_generators::arb_row_with_len;
///
/// proptest! {
///     #[test]
///     fn test_fixed_row(row in arb_row_with_len(3)) {
///         assert_eq!(row.values.len(), 3);
///     }
/// }
/// ```
pub fn arb_row_with_len(len: usize) -> impl Strategy<Value = Row> {
    prop::collection::vec(arb_value(), len).prop_map(Row::new)
}

/// Strategy for generating random `SqlType` instances.
pub fn arb_sql_type() -> impl Strategy<Value = SqlType> {
    prop_oneof![
        Just(SqlType::Int32),
        Just(SqlType::Int64),
        Just(SqlType::Double),
        (1u16..=255).prop_map(SqlType::Char),
        Just(SqlType::Date),
        Just(SqlType::Bool),
    ]
}
