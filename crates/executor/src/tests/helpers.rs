//! Test helpers and utilities for executor tests.

use crate::tables::TableCache;
use crate::{ExecutionContext, Executor};
use catalog::{Catalog, Column};
use common::{BeeDbError, BeeDbResult, ColumnId, Config, Row, TableId};
use expr::{BinaryOp, UnaryOp};
use planner::ResolvedExpr;
use std::collections::VecDeque;
use tempfile::TempDir;
use txn::{Transaction, TransactionManager};
use types::{SqlType, Value};

/// Mock executor for testing operators in isolation.
///
/// Allows controlled row iteration and error injection for testing.
pub struct MockExecutor {
    rows: VecDeque<Row>,
    schema: Vec<String>,
    next_error: Option<BeeDbError>,
    open_called: bool,
    close_called: bool,
    open_error: Option<BeeDbError>,
    close_error: Option<BeeDbError>,
}

impl MockExecutor {
    pub fn new(rows: Vec<Row>, schema: Vec<String>) -> Self {
        Self {
            rows: rows.into(),
            schema,
            next_error: None,
            open_called: false,
            close_called: false,
            open_error: None,
            close_error: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_next_error(error: BeeDbError) -> Self {
        Self {
            rows: VecDeque::new(),
            schema: vec![],
            next_error: Some(error),
            open_called: false,
            close_called: false,
            open_error: None,
            close_error: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_open_error(error: BeeDbError) -> Self {
        Self {
            rows: VecDeque::new(),
            schema: vec![],
            next_error: None,
            open_called: false,
            close_called: false,
            open_error: Some(error),
            close_error: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_close_error(error: BeeDbError) -> Self {
        Self {
            rows: VecDeque::new(),
            schema: vec![],
            next_error: None,
            open_called: false,
            close_called: false,
            open_error: None,
            close_error: Some(error),
        }
    }

    #[allow(dead_code)]
    pub fn was_opened(&self) -> bool {
        self.open_called
    }

    #[allow(dead_code)]
    pub fn was_closed(&self) -> bool {
        self.close_called
    }
}

impl Executor for MockExecutor {
    fn open(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.open_called = true;
        if let Some(error) = self.open_error.take() {
            return Err(error);
        }
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        if let Some(error) = self.next_error.take() {
            return Err(error);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        self.close_called = true;
        if let Some(error) = self.close_error.take() {
            return Err(error);
        }
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

/// Bundles everything an executor test needs: a temp-dir-backed catalog, a
/// table cache, a transaction manager, and one active transaction. Lives for
/// the duration of a single test; `context()` borrows from it to build the
/// `ExecutionContext` operators actually take.
pub struct Harness {
    _dir: TempDir,
    pub catalog: Catalog,
    pub tables: TableCache,
    pub config: Config,
    pub txn_mgr: TransactionManager,
    pub txn: Transaction,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let catalog = Catalog::open(dir.path()).expect("open catalog");
        let config = Config::builder().data_dir(dir.path().to_path_buf()).build();
        let txn_mgr = TransactionManager::new();
        let txn = txn_mgr.begin();
        Self { _dir: dir, catalog, tables: TableCache::new(), config, txn_mgr, txn }
    }

    /// Create a simple users(id, name, active) table and return its id.
    pub fn create_users_table(&mut self) -> TableId {
        let columns = vec![
            Column::new("id", SqlType::Int64, false),
            Column::new("name", SqlType::Char(64), false),
            Column::new("active", SqlType::Bool, false),
        ];
        self.catalog.create_table("users", columns).expect("create_table")
    }

    pub fn context(&mut self) -> ExecutionContext<'_> {
        ExecutionContext {
            catalog: &self.catalog,
            tables: &mut self.tables,
            txn: &mut self.txn,
            txn_mgr: &self.txn_mgr,
            config: &self.config,
        }
    }
}

// Row builders

pub fn int_row(values: &[i64]) -> Row {
    Row::new(values.iter().map(|&v| Value::Int64(v)).collect())
}

pub fn text_row(values: &[&str]) -> Row {
    Row::new(values.iter().map(|&v| Value::Char(v.to_string())).collect())
}

#[allow(dead_code)]
pub fn bool_row(values: &[bool]) -> Row {
    Row::new(values.iter().map(|&v| Value::Bool(v)).collect())
}

#[allow(dead_code)]
pub fn make_row(values: Vec<Value>) -> Row {
    Row::new(values)
}

// Expression builders

#[allow(dead_code)]
pub fn lit(value: Value) -> ResolvedExpr {
    ResolvedExpr::Literal(value)
}

pub fn lit_int(value: i64) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Int64(value))
}

pub fn lit_text(value: &str) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Char(value.to_string()))
}

#[allow(dead_code)]
pub fn lit_bool(value: bool) -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Bool(value))
}

#[allow(dead_code)]
pub fn lit_null() -> ResolvedExpr {
    ResolvedExpr::Literal(Value::Null)
}

pub fn col(id: u16) -> ResolvedExpr {
    ResolvedExpr::Column(ColumnId(id))
}

pub fn binary(left: ResolvedExpr, op: BinaryOp, right: ResolvedExpr) -> ResolvedExpr {
    ResolvedExpr::Binary { left: Box::new(left), op, right: Box::new(right) }
}

#[allow(dead_code)]
pub fn unary(op: UnaryOp, expr: ResolvedExpr) -> ResolvedExpr {
    ResolvedExpr::Unary { op, expr: Box::new(expr) }
}

// Assertion helpers

pub fn assert_next_row(exec: &mut dyn Executor, ctx: &mut ExecutionContext, expected: Row) {
    match exec.next(ctx) {
        Ok(Some(row)) => assert_eq!(row.values, expected.values, "row mismatch"),
        Ok(None) => panic!("expected row, got None"),
        Err(e) => panic!("expected row, got error: {}", e),
    }
}

pub fn assert_exhausted(exec: &mut dyn Executor, ctx: &mut ExecutionContext) {
    match exec.next(ctx) {
        Ok(None) => {}
        Ok(Some(row)) => panic!("expected exhausted, got row: {:?}", row),
        Err(e) => panic!("expected exhausted, got error: {}", e),
    }
}

#[allow(dead_code)]
pub fn assert_error_contains<T: std::fmt::Debug>(result: BeeDbResult<T>, expected_msg: &str) {
    match result {
        Ok(val) => panic!("expected error containing '{}', got Ok({:?})", expected_msg, val),
        Err(e) => {
            let error_str = format!("{}", e);
            assert!(error_str.contains(expected_msg), "expected error containing '{}', got '{}'", expected_msg, error_str);
        }
    }
}

#[allow(dead_code)]
pub fn assert_executor_error<T: std::fmt::Debug>(result: BeeDbResult<T>) {
    match result {
        Ok(val) => panic!("expected Executor error, got Ok({:?})", val),
        Err(BeeDbError::Executor(_)) => {}
        Err(e) => panic!("expected Executor error, got {}", e),
    }
}
