//! Common test fixtures and data generators.
//!
//! Reusable row builders, expression builders, and sample schemas, mirroring
//! the shapes used by the executor's own in-crate test helpers.

use common::Row;
use expr::{BinaryOp, UnaryOp};
use planner::ResolvedExpr;
use types::Value;

/// Build a row of `Int64` values.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let row = int_row(&[1, 2, 3]);
/// assert_eq!(row.values.len(), 3);
/// ```
pub fn int_row(values: &[i64]) -> Row {
    Row::new(values.iter().map(|&v| Value::Int64(v)).collect())
}

/// Build a row of `Char` values.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let row = text_row(&["alice", "bob"]);
/// assert_eq!(row.values.len(), 2);
/// ```
pub fn text_row(values: &[&str]) -> Row {
    Row::new(values.iter().map(|&v| Value::Char(v.to_string())).collect())
}

/// Build a row of `Bool` values.
pub fn bool_row(values: &[bool]) -> Row {
    Row::new(values.iter().map(|&v| Value::Bool(v)).collect())
}

/// Build a row from an explicit value list.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
/// use types::Value;
///
/// let row = mixed_row(vec![Value::Int64(1), Value::Char("alice".into()), Value::Bool(true)]);
/// assert_eq!(row.values.len(), 3);
/// ```
pub fn mixed_row(values: Vec<Value>) -> Row {
    Row::new(values)
}

/// Build a row of `count` `Null` values.
pub fn null_row(count: usize) -> Row {
    Row::new(vec![Value::Null; count])
}

// Expression builders for executor/planner tests.

/// A literal `Int64` expression.
pub fn lit_int(value: i64) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Int64(value))
}

/// A literal `Char` expression.
pub fn lit_text(value: &str) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Char(value.to_string()))
}

/// A literal `Bool` expression.
pub fn lit_bool(value: bool) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Bool(value))
}

/// A literal `Null` expression.
pub fn lit_null() -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Null)
}

/// A literal expression wrapping an arbitrary value.
pub fn lit(value: Value) -> ResolvedExpr {
    ResolvedExpr::Literal(value)
}

/// A column reference expression.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let expr = col(0); // references the first column
/// ```
pub fn col(id: u16) -> ResolvedExpr {
    ResolvedExpr::Column(common::ColumnId(id))
}

/// A binary operation expression.
pub fn binary(left: ResolvedExpr, op: BinaryOp, right: ResolvedExpr) -> ResolvedExpr {
    ResolvedExpr::Binary { left: Box::new(left), op, right: Box::new(right) }
}

/// A unary operation expression.
pub fn unary(op: UnaryOp, operand: ResolvedExpr) -> ResolvedExpr {
    ResolvedExpr::Unary { op, expr: Box::new(operand) }
}

/// Common table schemas for testing.
pub mod schemas {
    use catalog::{Column, TableSchema};
    use types::SqlType;

    /// `id BIGINT, name CHAR(32), age INT32`.
    pub fn users_schema() -> TableSchema {
        TableSchema::try_new(vec![
            Column::new("id", SqlType::Int64, false),
            Column::new("name", SqlType::Char(32), false),
            Column::new("age", SqlType::Int32, true),
        ])
        .expect("valid schema")
    }

    /// `id BIGINT, name CHAR(64), price INT32`.
    pub fn products_schema() -> TableSchema {
        TableSchema::try_new(vec![
            Column::new("id", SqlType::Int64, false),
            Column::new("name", SqlType::Char(64), false),
            Column::new("price", SqlType::Int32, false),
        ])
        .expect("valid schema")
    }

    /// `id BIGINT, user_id BIGINT, product_id BIGINT, quantity INT32`.
    pub fn orders_schema() -> TableSchema {
        TableSchema::try_new(vec![
            Column::new("id", SqlType::Int64, false),
            Column::new("user_id", SqlType::Int64, false),
            Column::new("product_id", SqlType::Int64, false),
            Column::new("quantity", SqlType::Int32, false),
        ])
        .expect("valid schema")
    }
}

/// Sample test data generators.
pub mod data {
    use super::*;

    /// `(1, "alice", 30)`, `(2, "bob", 25)`, `(3, "charlie", 35)`.
    pub fn sample_users() -> Vec<Row> {
        vec![
            mixed_row(vec![Value::Int64(1), Value::Char("alice".into()), Value::Int32(30)]),
            mixed_row(vec![Value::Int64(2), Value::Char("bob".into()), Value::Int32(25)]),
            mixed_row(vec![Value::Int64(3), Value::Char("charlie".into()), Value::Int32(35)]),
        ]
    }

    /// `(1, "laptop", 1000)`, `(2, "mouse", 25)`, `(3, "keyboard", 75)`.
    pub fn sample_products() -> Vec<Row> {
        vec![
            mixed_row(vec![Value::Int64(1), Value::Char("laptop".into()), Value::Int32(1000)]),
            mixed_row(vec![Value::Int64(2), Value::Char("mouse".into()), Value::Int32(25)]),
            mixed_row(vec![Value::Int64(3), Value::Char("keyboard".into()), Value::Int32(75)]),
        ]
    }

    /// `(1,1,1,1)`, `(2,1,2,2)`, `(3,2,3,1)`.
    pub fn sample_orders() -> Vec<Row> {
        vec![int_row(&[1, 1, 1, 1]), int_row(&[2, 1, 2, 2]), int_row(&[3, 2, 3, 1])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_row_builds_int64_values() {
        let row = int_row(&[1, 2, 3]);
        assert_eq!(row.values, vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
    }

    #[test]
    fn text_row_builds_char_values() {
        let row = text_row(&["a", "b"]);
        assert_eq!(row.values, vec![Value::Char("a".into()), Value::Char("b".into())]);
    }

    #[test]
    fn bool_row_builds_bool_values() {
        let row = bool_row(&[true, false]);
        assert_eq!(row.values, vec![Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn null_row_builds_n_nulls() {
        let row = null_row(3);
        assert_eq!(row.values, vec![Value::Null, Value::Null, Value::Null]);
    }

    #[test]
    fn lit_builders_wrap_expected_values() {
        assert!(matches!(lit_int(42), ResolvedExpr::Literal(Value::Int64(42))));
        assert!(matches!(lit_bool(true), ResolvedExpr::Literal(Value::Bool(true))));
        assert!(matches!(lit_null(), ResolvedExpr::Literal(Value::Null)));
    }

    #[test]
    fn col_builder_wraps_column_id() {
        assert!(matches!(col(5), ResolvedExpr::Column(common::ColumnId(5))));
    }

    #[test]
    fn sample_data_has_expected_row_counts() {
        assert_eq!(data::sample_users().len(), 3);
        assert_eq!(data::sample_products().len(), 3);
        assert_eq!(data::sample_orders().len(), 3);
    }

    #[test]
    fn schemas_have_expected_column_counts() {
        assert_eq!(schemas::users_schema().columns.len(), 3);
        assert_eq!(schemas::products_schema().columns.len(), 3);
        assert_eq!(schemas::orders_schema().columns.len(), 4);
    }
}
