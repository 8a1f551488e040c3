//! Custom assertion helpers for testing.
//!
//! Specialized assertion functions for common database testing patterns:
//! executor row-by-row comparisons, row-set comparisons, and error-shape
//! checks against [`BeeDbError`].

use common::{BeeDbError, BeeDbResult, Row};
use executor::Executor;
use types::Value;

/// Assert that an executor returns a specific row next.
///
/// # Example
///
/// ```no_run
/// use testsupport::prelude::*;
/// use executor::Executor;
/// use types::Value;
///
/// # fn example(mut exec: impl Executor, mut ctx: executor::ExecutionContext) {
/// assert_next_row(&mut exec, &mut ctx, &[Value::Int64(1), Value::Char("alice".into())]);
/// # }
/// ```
pub fn assert_next_row<E: Executor + ?Sized>(executor: &mut E, ctx: &mut executor::ExecutionContext, expected: &[Value]) {
    let row = executor.next(ctx).expect("executor next failed").expect("expected row but got None");
    assert_eq!(&row.values, expected, "row mismatch: expected {:?}, got {:?}", expected, row.values);
}

/// Assert that an executor is exhausted (returns `None`).
pub fn assert_exhausted<E: Executor + ?Sized>(executor: &mut E, ctx: &mut executor::ExecutionContext) {
    let result = executor.next(ctx).expect("executor next failed");
    assert!(result.is_none(), "expected executor to be exhausted, but got row: {:?}", result);
}

/// Assert that a result is an error whose message contains `expected_msg`.
///
/// # Example
///
/// ```no_run
/// use testsupport::prelude::*;
///
/// let result: Result<(), common::BeeDbError> = Err(common::BeeDbError::Executor("table not found".into()));
/// assert_error_contains(result, "table not found");
/// ```
pub fn assert_error_contains<T>(result: BeeDbResult<T>, expected_msg: &str) {
    match result {
        Ok(_) => panic!("expected error containing '{}', but got Ok", expected_msg),
        Err(e) => {
            let error_string = e.to_string();
            assert!(
                error_string.contains(expected_msg),
                "expected error to contain '{}', but got: {}",
                expected_msg,
                error_string
            );
        }
    }
}

/// Assert that a result is an `Executor` error whose message contains `expected_msg`.
pub fn assert_executor_error<T>(result: BeeDbResult<T>, expected_msg: &str) {
    match result {
        Ok(_) => panic!("expected executor error '{}', but got Ok", expected_msg),
        Err(BeeDbError::Executor(msg)) => {
            assert!(msg.contains(expected_msg), "expected executor error to contain '{}', but got: {}", expected_msg, msg);
        }
        Err(other) => panic!("expected executor error '{}', but got a different error: {}", expected_msg, other),
    }
}

/// Assert that two rows have equal values.
pub fn assert_rows_equal(actual: &Row, expected: &Row) {
    assert_eq!(actual.values, expected.values, "rows not equal:\nexpected: {:?}\nactual:   {:?}", expected.values, actual.values);
}

/// Assert that two row sets are equal, element-wise, in order.
pub fn assert_row_sets_equal(actual: &[Row], expected: &[Row]) {
    assert_eq!(actual.len(), expected.len(), "row count mismatch: expected {} rows, got {}", expected.len(), actual.len());
    for (i, (actual_row, expected_row)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            actual_row.values, expected_row.values,
            "row {} mismatch:\nexpected: {:?}\nactual:   {:?}",
            i, expected_row.values, actual_row.values
        );
    }
}

/// Assert that a value matches an expected value, attaching a context label
/// to the panic message.
pub fn assert_value_eq(actual: &Value, expected: &Value, context: &str) {
    assert_eq!(actual, expected, "{}: expected {:?}, got {:?}", context, expected, actual);
}
