//! DML operators: Insert, Update, Delete.
//!
//! Each operator is a "blocking" node: it fully drives its work in a single
//! `next()` call and returns one row carrying the affected-row count, the
//! same shape `execute_dml` expects for every statement kind.

use crate::{filter::eval_resolved_expr, ExecutionContext, Executor};
use catalog::IndexMeta;
use common::{BeeDbError, BeeDbResult, ColumnId, Row, TableId};
use planner::ResolvedExpr;
use types::Value;

fn index_key(meta: &IndexMeta, values: &[Value]) -> Vec<Value> {
    meta.columns.iter().map(|c| values[c.0 as usize].clone()).collect()
}

fn check_unique(ctx: &mut ExecutionContext, table_id: TableId, meta: &IndexMeta, key: &[Value]) -> BeeDbResult<()> {
    if !meta.unique {
        return Ok(());
    }
    let handle = ctx.tables.index(ctx.catalog, ctx.config, table_id, &meta.name)?;
    if !handle.search(key)?.is_empty() {
        return Err(BeeDbError::Constraint(format!("unique constraint '{}' violated", meta.name)));
    }
    Ok(())
}

/// Insert operator - evaluates literal row expressions and appends them to
/// the table, maintaining every covering index and rejecting duplicates on
/// unique indexes.
pub struct InsertExec {
    table_id: TableId,
    schema: Vec<String>,
    rows: Vec<Vec<ResolvedExpr>>,
    executed: bool,
}

impl InsertExec {
    pub fn new(table_id: TableId, schema: Vec<String>, rows: Vec<Vec<ResolvedExpr>>) -> Self {
        Self { table_id, schema, rows, executed: false }
    }
}

impl Executor for InsertExec {
    fn open(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.executed = false;
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let table_meta = ctx.catalog.table_by_id(self.table_id)?.clone();
        let empty_row = Row::new(Vec::new());
        let mut count: i64 = 0;

        for row_exprs in &self.rows {
            let mut values = Vec::with_capacity(row_exprs.len());
            for expr in row_exprs {
                values.push(eval_resolved_expr(expr, &empty_row)?);
            }

            for index_meta in &table_meta.indexes {
                let key = index_key(index_meta, &values);
                check_unique(ctx, self.table_id, index_meta, &key)?;
            }

            let txn_id = ctx.txn.id;
            let rid = {
                let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
                table.append(txn_id, &values)?
            };
            ctx.txn_mgr.record_insert(ctx.txn, self.table_id, rid);

            for index_meta in &table_meta.indexes {
                let key = index_key(index_meta, &values);
                let handle = ctx.tables.index(ctx.catalog, ctx.config, self.table_id, &index_meta.name)?;
                handle.insert(key, rid)?;
            }

            count += 1;
        }

        Ok(Some(Row::new(vec![Value::Int64(count)])))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

/// Update operator - applies assignments to every row its input produces,
/// routing the actual mutation through the transaction manager's MVCC
/// update path and keeping every covering index in sync.
pub struct UpdateExec {
    table_id: TableId,
    schema: Vec<String>,
    input: Box<dyn Executor>,
    assignments: Vec<(ColumnId, ResolvedExpr)>,
    executed: bool,
}

impl UpdateExec {
    pub fn new(table_id: TableId, schema: Vec<String>, input: Box<dyn Executor>, assignments: Vec<(ColumnId, ResolvedExpr)>) -> Self {
        Self { table_id, schema, input, assignments, executed: false }
    }

    fn apply_assignments(&self, old_row: &Row) -> BeeDbResult<Vec<Value>> {
        let mut new_values = old_row.values.clone();
        for (col_id, expr) in &self.assignments {
            let idx = col_id.0 as usize;
            if idx >= new_values.len() {
                return Err(BeeDbError::Executor(format!(
                    "column index {idx} out of bounds (row has {} columns)",
                    new_values.len()
                )));
            }
            new_values[idx] = eval_resolved_expr(expr, old_row)?;
        }
        Ok(new_values)
    }
}

impl Executor for UpdateExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.executed = false;
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let table_meta = ctx.catalog.table_by_id(self.table_id)?.clone();
        let mut count: i64 = 0;

        while let Some(old_row) = self.input.next(ctx)? {
            let head_rid = old_row.rid().ok_or_else(|| BeeDbError::Executor("UPDATE input row has no RID".into()))?;
            let new_values = self.apply_assignments(&old_row)?;

            for index_meta in &table_meta.indexes {
                let old_key = index_key(index_meta, &old_row.values);
                let new_key = index_key(index_meta, &new_values);
                if old_key != new_key {
                    check_unique(ctx, self.table_id, index_meta, &new_key)?;
                }
            }

            {
                let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
                ctx.txn_mgr.update(ctx.txn, self.table_id, table, head_rid, &new_values)?;
            }

            for index_meta in &table_meta.indexes {
                let old_key = index_key(index_meta, &old_row.values);
                let new_key = index_key(index_meta, &new_values);
                if old_key == new_key {
                    continue;
                }
                let handle = ctx.tables.index(ctx.catalog, ctx.config, self.table_id, &index_meta.name)?;
                handle.delete(&old_key, head_rid)?;
                handle.insert(new_key, head_rid)?;
            }

            count += 1;
        }

        Ok(Some(Row::new(vec![Value::Int64(count)])))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

/// Delete operator - removes every row its input produces via the
/// transaction manager's MVCC delete path, retiring matching index entries.
pub struct DeleteExec {
    table_id: TableId,
    schema: Vec<String>,
    input: Box<dyn Executor>,
    executed: bool,
}

impl DeleteExec {
    pub fn new(table_id: TableId, schema: Vec<String>, input: Box<dyn Executor>) -> Self {
        Self { table_id, schema, input, executed: false }
    }
}

impl Executor for DeleteExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.executed = false;
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let table_meta = ctx.catalog.table_by_id(self.table_id)?.clone();
        let mut count: i64 = 0;

        while let Some(row) = self.input.next(ctx)? {
            let head_rid = row.rid().ok_or_else(|| BeeDbError::Executor("DELETE input row has no RID".into()))?;

            {
                let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
                ctx.txn_mgr.delete(ctx.txn, self.table_id, table, head_rid)?;
            }

            for index_meta in &table_meta.indexes {
                let key = index_key(index_meta, &row.values);
                let handle = ctx.tables.index(ctx.catalog, ctx.config, self.table_id, &index_meta.name)?;
                handle.delete(&key, head_rid)?;
            }

            count += 1;
        }

        Ok(Some(Row::new(vec![Value::Int64(count)])))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}
