//! Filter operator: applies WHERE predicates (selection).

use crate::{ExecutionContext, Executor};
use common::{BeeDbError, BeeDbResult, ExecutionStats, Row};
use planner::ResolvedExpr;
use std::cmp::Ordering;
use std::time::Instant;
use types::Value;

/// Filter operator - applies a predicate to rows from a child operator.
///
/// Only passes through rows where the predicate evaluates to true. A NULL
/// predicate result is treated as false, same as every comparison that
/// touches NULL.
pub struct FilterExec {
    input: Box<dyn Executor>,
    predicate: ResolvedExpr,
    stats: ExecutionStats,
}

impl FilterExec {
    pub fn new(input: Box<dyn Executor>, predicate: ResolvedExpr) -> Self {
        Self { input, predicate, stats: ExecutionStats::default() }
    }

    fn eval_predicate(&self, row: &Row) -> BeeDbResult<bool> {
        match eval_resolved_expr(&self.predicate, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(BeeDbError::Executor(format!("predicate must evaluate to boolean, got {other:?}"))),
        }
    }
}

impl Executor for FilterExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.input.open(ctx)?;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();
        loop {
            let row = match self.input.next(ctx)? {
                Some(r) => r,
                None => {
                    self.stats.total_next_time += start.elapsed();
                    return Ok(None);
                }
            };

            if self.eval_predicate(&row)? {
                self.stats.rows_produced += 1;
                self.stats.total_next_time += start.elapsed();
                return Ok(Some(row));
            }
            self.stats.rows_filtered += 1;
        }
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.input.close(ctx)?;
        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        self.input.schema()
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }
}

/// Evaluate a resolved (column-ordinal) expression against a row.
///
/// Shared by `FilterExec`, join conditions, and the DML operators'
/// assignment/value expressions.
pub fn eval_resolved_expr(expr: &ResolvedExpr, row: &Row) -> BeeDbResult<Value> {
    match expr {
        ResolvedExpr::Literal(v) => Ok(v.clone()),
        ResolvedExpr::Column(col_id) => {
            let idx = col_id.0 as usize;
            row.values.get(idx).cloned().ok_or_else(|| {
                BeeDbError::Executor(format!(
                    "column index {} out of bounds (row has {} columns)",
                    idx,
                    row.values.len()
                ))
            })
        }
        ResolvedExpr::Unary { op, expr } => eval_unary_op(*op, eval_resolved_expr(expr, row)?),
        ResolvedExpr::Binary { left, op, right } => {
            eval_binary_op(eval_resolved_expr(left, row)?, *op, eval_resolved_expr(right, row)?)
        }
    }
}

fn eval_unary_op(op: expr::UnaryOp, val: Value) -> BeeDbResult<Value> {
    use expr::UnaryOp;
    match (op, val) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, val) => Err(BeeDbError::Executor(format!("NOT requires a boolean, got {val:?}"))),
    }
}

fn eval_binary_op(left: Value, op: expr::BinaryOp, right: Value) -> BeeDbResult<Value> {
    use expr::BinaryOp;

    match op {
        BinaryOp::And | BinaryOp::Or => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let (Value::Bool(a), Value::Bool(b)) = (left, right) else {
                return Err(BeeDbError::Executor("AND/OR require booleans".into()));
            };
            return Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b }));
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let arith_op = match op {
                BinaryOp::Add => types::ArithOp::Add,
                BinaryOp::Sub => types::ArithOp::Sub,
                BinaryOp::Mul => types::ArithOp::Mul,
                BinaryOp::Div => types::ArithOp::Div,
                _ => unreachable!(),
            };
            return left.checked_arith(arith_op, &right).map_err(|e| BeeDbError::Executor(e.to_string()));
        }
        _ => {}
    }

    // Any comparison touching NULL evaluates to false, never an error.
    if left.is_null() || right.is_null() {
        return Ok(Value::Bool(false));
    }

    let ord = left
        .cmp_same_type(&right)
        .ok_or_else(|| BeeDbError::Executor(format!("incompatible types for {op:?}: {left:?}, {right:?}")))?;

    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{assert_exhausted, assert_next_row, int_row, Harness, MockExecutor};
    use common::ColumnId;
    use expr::BinaryOp;

    fn col(i: u16) -> ResolvedExpr {
        ResolvedExpr::Column(ColumnId(i))
    }

    fn lit_int(v: i64) -> ResolvedExpr {
        ResolvedExpr::Literal(Value::Int64(v))
    }

    #[test]
    fn filter_passes_matching_rows() {
        let rows = vec![int_row(&[1, 10]), int_row(&[2, 20]), int_row(&[3, 30])];
        let input = Box::new(MockExecutor::new(rows, vec!["id".into(), "value".into()]));
        let predicate = ResolvedExpr::Binary { left: Box::new(col(1)), op: BinaryOp::Gt, right: Box::new(lit_int(15)) };
        let mut filter = FilterExec::new(input, predicate);

        let mut harness = Harness::new();
        let mut ctx = harness.context();

        filter.open(&mut ctx).unwrap();
        assert_next_row(&mut filter, &mut ctx, int_row(&[2, 20]));
        assert_next_row(&mut filter, &mut ctx, int_row(&[3, 30]));
        assert_exhausted(&mut filter, &mut ctx);
        filter.close(&mut ctx).unwrap();
    }

    #[test]
    fn null_comparison_is_false_not_error() {
        let row = Row::new(vec![Value::Null]);
        let predicate = ResolvedExpr::Binary { left: Box::new(col(0)), op: BinaryOp::Eq, right: Box::new(lit_int(1)) };
        assert_eq!(eval_resolved_expr(&predicate, &row).unwrap(), Value::Bool(false));
    }

    #[test]
    fn arithmetic_computes_correctly() {
        let row = Row::new(vec![Value::Int64(4)]);
        let expr = ResolvedExpr::Binary { left: Box::new(col(0)), op: BinaryOp::Add, right: Box::new(lit_int(1)) };
        assert_eq!(eval_resolved_expr(&expr, &row).unwrap(), Value::Int64(5));
    }
}
