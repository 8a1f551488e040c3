//! Query executor: executes physical plans using a Volcano-style iterator model.
//!
//! The executor bridges the planner's physical operators with the table disk
//! manager and transaction manager to perform actual query execution. It
//! implements a pull-based iterator model where each operator pulls rows
//! from its children, against an [`ExecutionContext`] that carries the
//! catalog, the lazily-opened table/index cache, the running transaction,
//! and runtime configuration.
//!
//! ```text
//! Physical Plan
//!     ↓
//! build_executor() → Executor tree
//!     ↓
//! open() → Initialize resources
//!     ↓
//! next() → Pull rows iteratively
//!     ↓
//! close() → Release resources
//! ```

mod aggregate;
mod builder;
mod dml;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod sort;
mod tables;

#[cfg(test)]
mod tests;

pub use builder::build_executor;
pub use filter::eval_resolved_expr;
pub use tables::TableCache;

use catalog::Catalog;
use common::{BeeDbError, BeeDbResult, Config, ExecutionStats, Row};
use planner::PhysicalPlan;
use txn::{Transaction, TransactionManager};

/// A single operator in the execution tree. Every operator pulls rows from
/// its children via `next()`, following the Volcano iterator model.
pub trait Executor {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()>;
    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>>;
    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()>;
    fn schema(&self) -> &[String];

    /// Per-operator timing/row-count instrumentation, for EXPLAIN ANALYZE-style
    /// surfaces. Operators that don't track stats can leave the default.
    fn stats(&self) -> Option<&ExecutionStats> {
        None
    }
}

/// Everything an executor tree needs to run one statement: the catalog, the
/// process-lifetime table/index cache, and the transaction this statement is
/// running under.
pub struct ExecutionContext<'a> {
    pub catalog: &'a Catalog,
    pub tables: &'a mut TableCache,
    pub txn: &'a mut Transaction,
    pub txn_mgr: &'a TransactionManager,
    pub config: &'a Config,
}

/// Run a read-only plan to completion and collect every row it produces.
pub fn execute_query(plan: PhysicalPlan, ctx: &mut ExecutionContext) -> BeeDbResult<Vec<Row>> {
    let mut executor = build_executor(plan, ctx.catalog)?;
    executor.open(ctx)?;
    let mut rows = Vec::new();
    while let Some(row) = executor.next(ctx)? {
        rows.push(row);
    }
    executor.close(ctx)?;
    Ok(rows)
}

/// Run an INSERT/UPDATE/DELETE plan to completion and return the number of
/// rows it affected.
pub fn execute_dml(plan: PhysicalPlan, ctx: &mut ExecutionContext) -> BeeDbResult<u64> {
    let mut executor = build_executor(plan, ctx.catalog)?;
    executor.open(ctx)?;
    let result = executor.next(ctx)?;
    executor.close(ctx)?;

    match result {
        Some(row) => match row.values.first() {
            Some(types::Value::Int64(n)) => Ok(*n as u64),
            other => Err(BeeDbError::Executor(format!("expected DML row count, got {other:?}"))),
        },
        None => Ok(0),
    }
}
