//! Scan operators: full table scans and index-assisted scans.

use crate::{ExecutionContext, Executor};
use bon::bon;
use common::{BeeDbError, BeeDbResult, ExecutionStats, PageId, RecordId, Row};
use planner::IndexPredicate;
use std::collections::VecDeque;
use std::time::Instant;

/// Sequential scan over a table's main page chain, decoding every tuple
/// visible to the running transaction.
pub struct SeqScanExec {
    table_id: common::TableId,
    schema: Vec<String>,
    current_page: PageId,
    buffer: VecDeque<Row>,
    stats: ExecutionStats,
}

impl SeqScanExec {
    pub fn new(table_id: common::TableId, schema: Vec<String>) -> Self {
        Self {
            table_id,
            schema,
            current_page: common::INVALID_PAGE_ID,
            buffer: VecDeque::new(),
            stats: ExecutionStats::default(),
        }
    }

    fn fill_buffer(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<bool> {
        if !self.current_page.is_valid() {
            return Ok(false);
        }
        let is_visible = ctx.txn.visibility(ctx.txn_mgr);
        let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
        let (rows, extra_pages) = table.read_rows(self.current_page, &is_visible)?;
        table.unpin_extra(&extra_pages)?;
        self.stats.pages_scanned += 1;
        drop(is_visible);

        for row in &rows {
            if let Some(rid) = row.rid() {
                ctx.txn.record_read(self.table_id, rid, rid);
            }
        }
        self.buffer.extend(rows);
        self.current_page = table.next_page(self.current_page)?;
        Ok(true)
    }
}

impl Executor for SeqScanExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.buffer.clear();
        let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
        self.current_page = table.main_chain_head()?;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();
        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.stats.rows_produced += 1;
                self.stats.total_next_time += start.elapsed();
                return Ok(Some(row));
            }
            if !self.fill_buffer(ctx)? {
                self.stats.total_next_time += start.elapsed();
                return Ok(None);
            }
        }
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.buffer.clear();
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

/// Scan through a secondary index, fetching only the rows the predicate
/// resolves rather than the whole table.
pub struct IndexScanExec {
    table_id: common::TableId,
    index_name: String,
    predicate: IndexPredicate,
    schema: Vec<String>,
    buffer: VecDeque<RecordId>,
    stats: ExecutionStats,
}

#[bon]
impl IndexScanExec {
    #[builder]
    pub fn new(
        table_id: common::TableId,
        index_name: String,
        predicate: IndexPredicate,
        schema: Vec<String>,
    ) -> Self {
        Self {
            table_id,
            index_name,
            predicate,
            schema,
            buffer: VecDeque::new(),
            stats: ExecutionStats::default(),
        }
    }

    fn eval_literal(expr: &planner::ResolvedExpr) -> BeeDbResult<types::Value> {
        match expr {
            planner::ResolvedExpr::Literal(v) => Ok(v.clone()),
            other => Err(BeeDbError::Executor(format!("index predicate must be a literal, got {other:?}"))),
        }
    }

    fn resolve_rids(&self, ctx: &mut ExecutionContext) -> BeeDbResult<Vec<RecordId>> {
        let index = ctx.tables.index(ctx.catalog, ctx.config, self.table_id, &self.index_name)?;
        match &self.predicate {
            IndexPredicate::Eq { value, .. } => {
                let key = Self::eval_literal(value)?;
                index.search(&[key])
            }
            IndexPredicate::CompositeEq { values, .. } => {
                let key = values.iter().map(Self::eval_literal).collect::<BeeDbResult<Vec<_>>>()?;
                index.search(&key)
            }
            IndexPredicate::Range { low, high, .. } => {
                let low = Self::eval_literal(low)?;
                let high = Self::eval_literal(high)?;
                index.range_scan(Some(&[low]), Some(&[high]))
            }
        }
    }
}

impl Executor for IndexScanExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.buffer = self.resolve_rids(ctx)?.into();
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();
        while let Some(rid) = self.buffer.pop_front() {
            let is_visible = ctx.txn.visibility(ctx.txn_mgr);
            let table = ctx.tables.table(ctx.catalog, ctx.config, self.table_id)?;
            let row = table.read_row(rid, &is_visible)?;
            drop(is_visible);
            if let Some(row) = row {
                if let Some(observed) = row.rid() {
                    ctx.txn.record_read(self.table_id, rid, observed);
                }
                self.stats.rows_produced += 1;
                self.stats.total_next_time += start.elapsed();
                return Ok(Some(row));
            }
        }
        self.stats.total_next_time += start.elapsed();
        Ok(None)
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.buffer.clear();
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
