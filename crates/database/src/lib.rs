//! Database facade: wires the catalog, buffer/table layer, transaction
//! manager, planner/optimizer, and executor behind a single entry point.
//!
//! Callers open a [`Database`], start a [`Transaction`] with [`Database::begin`],
//! drive statements through [`Database::run`] (SQL text) or [`Database::execute`]
//! (a pre-planned [`PhysicalPlan`]), and close the transaction with
//! [`Database::commit`] or [`Database::abort`].

use catalog::{Catalog, Column};
use common::{BeeDbError, BeeDbResult, Config, Row};
use executor::{execute_dml, execute_query, ExecutionContext, Executor, TableCache};
use parking_lot::{Mutex, RwLock};
use parser::{parse_sql, IndexKind, Statement};
use planner::{explain_physical, Planner, PlanningContext, PhysicalPlan};
use std::sync::Arc;
use txn::{Transaction, TransactionManager};

/// Outcome of running one statement through the facade.
#[derive(Debug)]
pub enum QueryResult {
    /// A query returned rows, under the given output schema.
    Rows { schema: Vec<String>, rows: Vec<Row> },
    /// A DDL or DML statement affected N rows (0 for DDL/transaction control).
    Count { affected: u64 },
}

/// The single entry point wiring catalog, table/index cache, transaction
/// manager, and executor together.
pub struct Database {
    config: Config,
    catalog: Arc<RwLock<Catalog>>,
    tables: Mutex<TableCache>,
    txn_mgr: TransactionManager,
}

impl Database {
    /// Open (or create) a database rooted at `config.data_dir`.
    ///
    /// Loads the catalog by scanning its system-table page chains, or
    /// initializes them if the directory is new. Installs a `tracing`
    /// subscriber only if the host process hasn't already set one, so the
    /// crate behaves as a well-mannered library dependency.
    pub fn open(config: Config) -> BeeDbResult<Self> {
        let _ = tracing_subscriber::fmt::try_init();

        std::fs::create_dir_all(&config.data_dir)?;
        let catalog = Catalog::open(&config.data_dir)?;
        tracing::info!(data_dir = %config.data_dir.display(), "database opened");

        Ok(Self {
            config,
            catalog: Arc::new(RwLock::new(catalog)),
            tables: Mutex::new(TableCache::new()),
            txn_mgr: TransactionManager::new(),
        })
    }

    /// Start a new transaction under this database's transaction manager.
    pub fn begin(&self) -> Transaction {
        tracing::info!("transaction begin");
        self.txn_mgr.begin()
    }

    /// Commit a transaction. Write-write conflicts are detected eagerly at
    /// each `UPDATE`/`DELETE` call, so by the time a transaction reaches
    /// commit there is nothing left to validate; this always returns
    /// `Ok(true)` unless finalizing the write set itself errors.
    pub fn commit(&self, txn: &mut Transaction) -> BeeDbResult<bool> {
        let mut tables = self.tables.lock();
        let committed = self.txn_mgr.commit(txn, &mut *tables)?;
        if committed {
            tracing::info!(txn = txn.id, "transaction committed");
        } else {
            tracing::warn!(txn = txn.id, "commit failed validation, transaction aborted");
        }
        Ok(committed)
    }

    /// Abort a transaction, undoing its write set.
    pub fn abort(&self, txn: &mut Transaction) -> BeeDbResult<()> {
        let mut tables = self.tables.lock();
        self.txn_mgr.abort(txn, &mut *tables)?;
        tracing::info!(txn = txn.id, "transaction aborted");
        Ok(())
    }

    /// Execute a pre-planned physical plan under an active transaction.
    pub fn execute(&self, txn: &mut Transaction, plan: PhysicalPlan) -> BeeDbResult<QueryResult> {
        let catalog = self.catalog.read();
        let mut tables = self.tables.lock();
        let mut ctx = ExecutionContext {
            catalog: &*catalog,
            tables: &mut *tables,
            txn,
            txn_mgr: &self.txn_mgr,
            config: &self.config,
        };

        match &plan {
            PhysicalPlan::Insert { .. } | PhysicalPlan::Update { .. } | PhysicalPlan::Delete { .. } => {
                let affected = execute_dml(plan, &mut ctx)?;
                Ok(QueryResult::Count { affected })
            }
            other => {
                let schema = infer_schema(other);
                let rows = execute_query(plan, &mut ctx)?;
                Ok(QueryResult::Rows { schema, rows })
            }
        }
    }

    /// Parse, plan, optimize, and execute a single SQL statement under an
    /// active transaction. `BEGIN`/`COMMIT`/`ABORT` replace or close `txn` in
    /// place rather than going through the executor.
    pub fn run(&self, txn: &mut Transaction, sql: &str) -> BeeDbResult<QueryResult> {
        let mut statements = parse_sql(sql)?;
        if statements.len() > 1 {
            return Err(BeeDbError::Executor("multiple statements per call not supported".into()));
        }
        let stmt = statements.pop().ok_or_else(|| BeeDbError::Executor("empty statement".into()))?;
        self.run_statement(txn, stmt)
    }

    fn run_statement(&self, txn: &mut Transaction, stmt: Statement) -> BeeDbResult<QueryResult> {
        match stmt {
            Statement::CreateTable { name, columns, primary_key } => self.create_table(name, columns, primary_key),
            Statement::CreateIndex { name, table, column, unique, kind } => self.create_index(name, table, column, unique, kind),
            Statement::Begin => {
                *txn = self.begin();
                Ok(QueryResult::Count { affected: 0 })
            }
            Statement::Commit => {
                self.commit(txn)?;
                Ok(QueryResult::Count { affected: 0 })
            }
            Statement::Abort => {
                self.abort(txn)?;
                Ok(QueryResult::Count { affected: 0 })
            }
            Statement::Explain { query, analyze } => self.explain(txn, *query, analyze),
            other => self.plan_and_execute(txn, other),
        }
    }

    fn plan_and_execute(&self, txn: &mut Transaction, stmt: Statement) -> BeeDbResult<QueryResult> {
        let logical = Planner::to_logical(stmt)?;
        let physical = {
            let catalog = self.catalog.read();
            let optimized = optimizer::optimize(logical, &catalog, &self.config.optimization)?;
            let mut planning_ctx = PlanningContext::new(&catalog);
            Planner::plan(optimized, &mut planning_ctx)?
        };
        self.execute(txn, physical)
    }

    /// `CREATE TABLE`. A single-column `primary_key` becomes a unique BTree
    /// index; the catalog only models single-column indexes, so a multi-
    /// column primary key keeps only its first column as the enforced key.
    fn create_table(&self, name: String, columns: Vec<parser::ColumnDef>, primary_key: Option<Vec<String>>) -> BeeDbResult<QueryResult> {
        let catalog_columns: Vec<Column> = columns.into_iter().map(|c| Column::new(c.name, c.ty, c.nullable)).collect();

        let mut catalog = self.catalog.write();
        catalog.create_table(&name, catalog_columns)?;

        if let Some(pk_columns) = primary_key.as_ref().and_then(|cols| cols.first()) {
            let index_name = format!("pk_{name}");
            catalog.create_index(&name, &index_name, pk_columns, catalog::IndexKind::BTree, true)?;
        }

        catalog.flush()?;
        tracing::info!(table = %name, "table created");
        Ok(QueryResult::Count { affected: 0 })
    }

    /// `CREATE [UNIQUE] INDEX`.
    fn create_index(&self, name: String, table: String, column: String, unique: bool, kind: IndexKind) -> BeeDbResult<QueryResult> {
        let catalog_kind = match kind {
            IndexKind::BTree => catalog::IndexKind::BTree,
            IndexKind::Hash => catalog::IndexKind::Hash,
        };

        let mut catalog = self.catalog.write();
        catalog.create_index(&table, &name, &column, catalog_kind, unique)?;
        catalog.flush()?;
        tracing::info!(index = %name, table = %table, "index created");
        Ok(QueryResult::Count { affected: 0 })
    }

    /// `EXPLAIN [ANALYZE]`: prints the physical plan, and for `ANALYZE`, runs
    /// it and reports the root operator's own timing/row-count stats.
    fn explain(&self, txn: &mut Transaction, query: Statement, analyze: bool) -> BeeDbResult<QueryResult> {
        let logical = Planner::to_logical(query)?;
        let physical = {
            let catalog = self.catalog.read();
            let optimized = optimizer::optimize(logical, &catalog, &self.config.optimization)?;
            let mut planning_ctx = PlanningContext::new(&catalog);
            Planner::plan(optimized, &mut planning_ctx)?
        };

        let mut output = explain_physical(&physical);
        if analyze {
            let catalog = self.catalog.read();
            let mut tables = self.tables.lock();
            let mut ctx = ExecutionContext {
                catalog: &*catalog,
                tables: &mut *tables,
                txn,
                txn_mgr: &self.txn_mgr,
                config: &self.config,
            };
            let mut root = executor::build_executor(physical, ctx.catalog)?;
            root.open(&mut ctx)?;
            let mut row_count = 0u64;
            while root.next(&mut ctx)?.is_some() {
                row_count += 1;
            }
            root.close(&mut ctx)?;

            output.push_str("\n\nExecution statistics:\n");
            if let Some(stats) = root.stats() {
                output.push_str(&format!(
                    "  rows produced: {}\n  open: {:?}  next: {:?}  close: {:?}\n",
                    stats.rows_produced, stats.open_time, stats.total_next_time, stats.close_time
                ));
            }
            output.push_str(&format!("  total rows: {row_count}"));
        }

        Ok(QueryResult::Rows { schema: vec!["plan".into()], rows: vec![Row::new(vec![types::Value::Char(output)])] })
    }
}

/// Derive the output schema a physical plan produces, for [`QueryResult::Rows`].
fn infer_schema(plan: &PhysicalPlan) -> Vec<String> {
    match plan {
        PhysicalPlan::SeqScan { schema, .. } => schema.clone(),
        PhysicalPlan::IndexScan { schema, .. } => schema.clone(),
        PhysicalPlan::Filter { input, .. } => infer_schema(input),
        PhysicalPlan::Project { columns, .. } => columns.iter().map(|(name, _)| name.clone()).collect(),
        PhysicalPlan::Aggregate { schema, .. } => schema.clone(),
        PhysicalPlan::Sort { input, .. } => infer_schema(input),
        PhysicalPlan::Limit { input, .. } => infer_schema(input),
        PhysicalPlan::NestedLoopJoin { schema, .. } => schema.clone(),
        PhysicalPlan::HashJoin { schema, .. } => schema.clone(),
        PhysicalPlan::Insert { .. } | PhysicalPlan::Update { .. } | PhysicalPlan::Delete { .. } => vec![],
    }
}
