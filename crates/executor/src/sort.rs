//! Sort operator: orders rows based on specified columns.

use crate::{ExecutionContext, Executor};
use common::{ColumnId, BeeDbResult, ExecutionStats, Row};
use planner::SortDirection;
use std::cmp::Ordering;
use std::time::Instant;
use types::Value;

/// Resolved ORDER BY clause with column ID and direction.
#[derive(Clone, Debug)]
pub struct SortKey {
    pub column_id: ColumnId,
    pub direction: SortDirection,
}

/// Sort operator - materializes input and returns rows in sorted order.
///
/// This is a blocking operator that must consume all input rows before
/// returning the first sorted row. Uses a stable sort to preserve insertion
/// order for equal keys.
pub struct SortExec {
    input: Box<dyn Executor>,
    sort_keys: Vec<SortKey>,
    sorted_rows: Option<Vec<Row>>,
    current_index: usize,
    stats: ExecutionStats,
}

impl SortExec {
    pub fn new(input: Box<dyn Executor>, sort_keys: Vec<SortKey>) -> Self {
        Self { input, sort_keys, sorted_rows: None, current_index: 0, stats: ExecutionStats::default() }
    }

    fn materialize_and_sort(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let mut rows = Vec::new();
        while let Some(row) = self.input.next(ctx)? {
            rows.push(row);
        }
        let sort_keys = self.sort_keys.clone();
        rows.sort_by(|a, b| compare_rows(a, b, &sort_keys));
        self.sorted_rows = Some(rows);
        self.current_index = 0;
        Ok(())
    }
}

impl Executor for SortExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.input.open(ctx)?;
        self.materialize_and_sort(ctx)?;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();
        let rows = self.sorted_rows.as_ref().expect("sort not opened");
        if self.current_index >= rows.len() {
            self.stats.total_next_time += start.elapsed();
            return Ok(None);
        }
        let row = rows[self.current_index].clone();
        self.current_index += 1;
        self.stats.rows_produced += 1;
        self.stats.total_next_time += start.elapsed();
        Ok(Some(row))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.input.close(ctx)?;
        self.sorted_rows = None;
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

fn compare_rows(a: &Row, b: &Row, sort_keys: &[SortKey]) -> Ordering {
    for key in sort_keys {
        let idx = key.column_id.0 as usize;
        let ord = compare_values(a.values.get(idx), b.values.get(idx));
        let ord = if key.direction == SortDirection::Desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Total order over two optional column values: NULLs sort first, same-type
/// values compare by value, and mismatched types fall back to a fixed type
/// rank (this last case shouldn't occur within a single typed column).
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.cmp_same_type(b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
        },
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int32(_) => 2,
        Value::Int64(_) => 3,
        Value::Double(_) => 4,
        Value::Date(_) => 5,
        Value::Char(_) => 6,
    }
}
