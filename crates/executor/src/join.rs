//! Join operators: combines rows from multiple tables.

use crate::filter::eval_resolved_expr;
use crate::{ExecutionContext, Executor};
use common::{BeeDbError, BeeDbResult, ExecutionStats, Row};
use expr::BinaryOp;
use planner::ResolvedExpr;
use std::collections::HashMap;
use std::time::Instant;
use types::Value;

/// Nested loop join operator - simple O(n*m) join algorithm.
///
/// For each row from the left table, iterates all rows from the right table,
/// evaluating the join condition on combined rows.
///
/// 1. `open()`: materialize all right-side rows into memory, fetch first left row.
/// 2. `next()`: for each left row, iterate through all right rows, evaluate condition.
/// 3. When all right rows exhausted for current left, advance to next left row.
/// 4. `close()`: release materialized rows and close children.
pub struct NestedLoopJoinExec {
    left_input: Box<dyn Executor>,
    right_input: Box<dyn Executor>,
    condition: ResolvedExpr,
    schema: Vec<String>,

    current_left_row: Option<Row>,
    right_materialized: Vec<Row>,
    right_cursor: usize,
    stats: ExecutionStats,
}

impl NestedLoopJoinExec {
    pub fn new(left: Box<dyn Executor>, right: Box<dyn Executor>, condition: ResolvedExpr, schema: Vec<String>) -> Self {
        Self {
            left_input: left,
            right_input: right,
            condition,
            schema,
            current_left_row: None,
            right_materialized: Vec::new(),
            right_cursor: 0,
            stats: ExecutionStats::default(),
        }
    }

    /// Combine a left and right row into a single row: left columns first,
    /// then right columns. The join's RID is meaningless, so it's dropped.
    fn combine_rows(&self, left: &Row, right: &Row) -> Row {
        let mut combined_values = left.values.clone();
        combined_values.extend(right.values.clone());
        Row::new(combined_values)
    }

    fn eval_condition(&self, row: &Row) -> BeeDbResult<bool> {
        match eval_resolved_expr(&self.condition, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(BeeDbError::Executor(format!("join condition must evaluate to boolean, got {other:?}"))),
        }
    }
}

impl Executor for NestedLoopJoinExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();

        self.left_input.open(ctx)?;
        self.right_input.open(ctx)?;

        self.right_materialized.clear();
        while let Some(row) = self.right_input.next(ctx)? {
            self.right_materialized.push(row);
        }

        self.current_left_row = self.left_input.next(ctx)?;
        self.right_cursor = 0;

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();

        loop {
            let left_row = match &self.current_left_row {
                Some(r) => r.clone(),
                None => {
                    self.stats.total_next_time += start.elapsed();
                    return Ok(None);
                }
            };

            while self.right_cursor < self.right_materialized.len() {
                let right_row = &self.right_materialized[self.right_cursor];
                self.right_cursor += 1;

                let combined = self.combine_rows(&left_row, right_row);

                if self.eval_condition(&combined)? {
                    self.stats.rows_produced += 1;
                    self.stats.total_next_time += start.elapsed();
                    return Ok(Some(combined));
                }
            }

            self.current_left_row = self.left_input.next(ctx)?;
            self.right_cursor = 0;
        }
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();

        self.right_materialized.clear();
        self.current_left_row = None;
        self.left_input.close(ctx)?;
        self.right_input.close(ctx)?;

        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }
}

/// Hash join - builds an in-memory hash table over the right input's join
/// key, then probes it once per left row instead of rescanning the right
/// side for every left row.
///
/// 1. `open()`: materialize the right side, bucketing each row under
///    `hash::hash_key` of its join-key value.
/// 2. `next()`: for each left row, probe the bucket its key hashes to and
///    re-check the join condition against each candidate (the hash only
///    narrows the search; it doesn't by itself rule out collisions).
/// 3. `close()`: drop the hash table and close both children.
///
/// Only substituted in by the optimizer for a single equi-join condition
/// (`left.col = right.col`); anything else is rejected in `new`.
pub struct HashJoinExec {
    left_input: Box<dyn Executor>,
    right_input: Box<dyn Executor>,
    condition: ResolvedExpr,
    schema: Vec<String>,
    left_key: usize,
    right_key: usize,

    build_table: HashMap<u64, Vec<Row>>,
    current_left_row: Option<Row>,
    current_matches: Vec<Row>,
    match_cursor: usize,
    stats: ExecutionStats,
}

impl HashJoinExec {
    pub fn new(left: Box<dyn Executor>, right: Box<dyn Executor>, condition: ResolvedExpr, schema: Vec<String>) -> BeeDbResult<Self> {
        let left_len = left.schema().len();
        let (left_key, right_key) = split_equality_keys(&condition, left_len)?;
        Ok(Self {
            left_input: left,
            right_input: right,
            condition,
            schema,
            left_key,
            right_key,
            build_table: HashMap::new(),
            current_left_row: None,
            current_matches: Vec::new(),
            match_cursor: 0,
            stats: ExecutionStats::default(),
        })
    }

    fn combine_rows(&self, left: &Row, right: &Row) -> Row {
        let mut combined_values = left.values.clone();
        combined_values.extend(right.values.clone());
        Row::new(combined_values)
    }

    fn eval_condition(&self, row: &Row) -> BeeDbResult<bool> {
        match eval_resolved_expr(&self.condition, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(BeeDbError::Executor(format!("join condition must evaluate to boolean, got {other:?}"))),
        }
    }

    fn probe_bucket(&self, left_row: &Row) -> Vec<Row> {
        let key = &left_row.values[self.left_key];
        if key.is_null() {
            return Vec::new();
        }
        self.build_table.get(&hash::hash_key(std::slice::from_ref(key))).cloned().unwrap_or_default()
    }
}

/// Resolve a single `left.col = right.col` equality condition to the
/// (left-local, right-local) ordinals its two operands name, given the
/// combined schema is left columns followed by right columns.
fn split_equality_keys(condition: &ResolvedExpr, left_len: usize) -> BeeDbResult<(usize, usize)> {
    let ResolvedExpr::Binary { left, op: BinaryOp::Eq, right } = condition else {
        return Err(BeeDbError::Executor("hash join requires a single equality condition".into()));
    };
    let (Some(l), Some(r)) = (column_ordinal(left), column_ordinal(right)) else {
        return Err(BeeDbError::Executor("hash join equality operands must be plain columns".into()));
    };
    if l < left_len && r >= left_len {
        Ok((l, r - left_len))
    } else if r < left_len && l >= left_len {
        Ok((r, l - left_len))
    } else {
        Err(BeeDbError::Executor("hash join condition must compare a left column to a right column".into()))
    }
}

fn column_ordinal(expr: &ResolvedExpr) -> Option<usize> {
    match expr {
        ResolvedExpr::Column(id) => Some(id.0 as usize),
        _ => None,
    }
}

impl Executor for HashJoinExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();

        self.left_input.open(ctx)?;
        self.right_input.open(ctx)?;

        self.build_table.clear();
        while let Some(row) = self.right_input.next(ctx)? {
            let key = &row.values[self.right_key];
            if key.is_null() {
                continue;
            }
            self.build_table.entry(hash::hash_key(std::slice::from_ref(key))).or_default().push(row);
        }

        self.current_left_row = self.left_input.next(ctx)?;
        self.current_matches = self.current_left_row.as_ref().map(|r| self.probe_bucket(r)).unwrap_or_default();
        self.match_cursor = 0;

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();

        loop {
            let left_row = match &self.current_left_row {
                Some(r) => r.clone(),
                None => {
                    self.stats.total_next_time += start.elapsed();
                    return Ok(None);
                }
            };

            while self.match_cursor < self.current_matches.len() {
                let right_row = self.current_matches[self.match_cursor].clone();
                self.match_cursor += 1;

                let combined = self.combine_rows(&left_row, &right_row);
                if self.eval_condition(&combined)? {
                    self.stats.rows_produced += 1;
                    self.stats.total_next_time += start.elapsed();
                    return Ok(Some(combined));
                }
            }

            self.current_left_row = self.left_input.next(ctx)?;
            self.current_matches = self.current_left_row.as_ref().map(|r| self.probe_bucket(r)).unwrap_or_default();
            self.match_cursor = 0;
        }
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();

        self.build_table.clear();
        self.current_matches.clear();
        self.current_left_row = None;
        self.left_input.close(ctx)?;
        self.right_input.close(ctx)?;

        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{assert_exhausted, assert_next_row, binary, col, int_row, lit_bool, Harness, MockExecutor};

    #[test]
    fn join_empty_left_returns_none() {
        let left = Box::new(MockExecutor::new(vec![], vec!["id".into()]));
        let right = Box::new(MockExecutor::new(vec![int_row(&[1])], vec!["value".into()]));
        let condition = lit_bool(true);
        let schema = vec!["left.id".into(), "right.value".into()];

        let mut join = NestedLoopJoinExec::new(left, right, condition, schema);
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        assert_exhausted(&mut join, &mut ctx);
        join.close(&mut ctx).unwrap();
    }

    #[test]
    fn join_cross_product_with_always_true() {
        let left = Box::new(MockExecutor::new(vec![int_row(&[1]), int_row(&[2])], vec!["a".into()]));
        let right = Box::new(MockExecutor::new(vec![int_row(&[10]), int_row(&[20])], vec!["b".into()]));
        let condition = lit_bool(true);
        let schema = vec!["left.a".into(), "right.b".into()];

        let mut join = NestedLoopJoinExec::new(left, right, condition, schema);
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        assert_next_row(&mut join, &mut ctx, int_row(&[1, 10]));
        assert_next_row(&mut join, &mut ctx, int_row(&[1, 20]));
        assert_next_row(&mut join, &mut ctx, int_row(&[2, 10]));
        assert_next_row(&mut join, &mut ctx, int_row(&[2, 20]));
        assert_exhausted(&mut join, &mut ctx);
        join.close(&mut ctx).unwrap();
    }

    #[test]
    fn join_with_equality_condition() {
        let left = Box::new(MockExecutor::new(vec![int_row(&[1, 100]), int_row(&[2, 200])], vec!["id".into(), "value".into()]));
        let right = Box::new(MockExecutor::new(
            vec![int_row(&[101, 1]), int_row(&[102, 2]), int_row(&[103, 1])],
            vec!["order_id".into(), "user_id".into()],
        ));

        let condition = binary(col(0), BinaryOp::Eq, col(3));
        let schema = vec!["u.id".into(), "u.value".into(), "o.order_id".into(), "o.user_id".into()];

        let mut join = NestedLoopJoinExec::new(left, right, condition, schema);
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        assert_next_row(&mut join, &mut ctx, int_row(&[1, 100, 101, 1]));
        assert_next_row(&mut join, &mut ctx, int_row(&[1, 100, 103, 1]));
        assert_next_row(&mut join, &mut ctx, int_row(&[2, 200, 102, 2]));
        assert_exhausted(&mut join, &mut ctx);
        join.close(&mut ctx).unwrap();
    }

    #[test]
    fn join_no_matches_returns_none() {
        let left = Box::new(MockExecutor::new(vec![int_row(&[1])], vec!["a".into()]));
        let right = Box::new(MockExecutor::new(vec![int_row(&[2])], vec!["b".into()]));

        let condition = binary(col(0), BinaryOp::Eq, col(1));
        let schema = vec!["left.a".into(), "right.b".into()];

        let mut join = NestedLoopJoinExec::new(left, right, condition, schema);
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        assert_exhausted(&mut join, &mut ctx);
        join.close(&mut ctx).unwrap();
    }

    #[test]
    fn join_schema_is_combined() {
        let left = Box::new(MockExecutor::new(vec![], vec!["a".into(), "b".into()]));
        let right = Box::new(MockExecutor::new(vec![], vec!["c".into(), "d".into()]));
        let condition = lit_bool(true);
        let schema = vec!["l.a".into(), "l.b".into(), "r.c".into(), "r.d".into()];

        let join = NestedLoopJoinExec::new(left, right, condition, schema);
        assert_eq!(join.schema(), &["l.a".to_string(), "l.b".to_string(), "r.c".to_string(), "r.d".to_string()]);
    }

    #[test]
    fn hash_join_matches_equal_keys() {
        let left = Box::new(MockExecutor::new(vec![int_row(&[1, 100]), int_row(&[2, 200])], vec!["id".into(), "value".into()]));
        let right = Box::new(MockExecutor::new(
            vec![int_row(&[101, 1]), int_row(&[102, 2]), int_row(&[103, 1])],
            vec!["order_id".into(), "user_id".into()],
        ));

        let condition = binary(col(0), BinaryOp::Eq, col(3));
        let schema = vec!["u.id".into(), "u.value".into(), "o.order_id".into(), "o.user_id".into()];

        let mut join = HashJoinExec::new(left, right, condition, schema).unwrap();
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = join.next(&mut ctx).unwrap() {
            rows.push(row);
        }
        join.close(&mut ctx).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&int_row(&[1, 100, 101, 1])));
        assert!(rows.contains(&int_row(&[1, 100, 103, 1])));
    }

    #[test]
    fn hash_join_no_matches_returns_none() {
        let left = Box::new(MockExecutor::new(vec![int_row(&[1])], vec!["a".into()]));
        let right = Box::new(MockExecutor::new(vec![int_row(&[2])], vec!["b".into()]));

        let condition = binary(col(0), BinaryOp::Eq, col(1));
        let schema = vec!["left.a".into(), "right.b".into()];

        let mut join = HashJoinExec::new(left, right, condition, schema).unwrap();
        let mut harness = Harness::new();
        let mut ctx = harness.context();

        join.open(&mut ctx).unwrap();
        assert_exhausted(&mut join, &mut ctx);
        join.close(&mut ctx).unwrap();
    }

    #[test]
    fn hash_join_rejects_non_equality_condition() {
        let left = Box::new(MockExecutor::new(vec![], vec!["a".into()]));
        let right = Box::new(MockExecutor::new(vec![], vec!["b".into()]));
        let condition = binary(col(0), BinaryOp::Lt, col(1));
        let schema = vec!["left.a".into(), "right.b".into()];

        assert!(HashJoinExec::new(left, right, condition, schema).is_err());
    }
}
