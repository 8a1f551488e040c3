//! Project operator: selects and reorders columns.

use crate::{ExecutionContext, Executor};
use common::{BeeDbError, BeeDbResult, ColumnId, ExecutionStats, Row};
use std::time::Instant;

/// Project operator - selects/reorders columns from input rows.
///
/// Produces rows with a subset of columns in a specified order.
/// Each projection is an (output_name, column_id) pair.
pub struct ProjectExec {
    input: Box<dyn Executor>,
    projections: Vec<(String, ColumnId)>,
    schema: Vec<String>,
    stats: ExecutionStats,
}

impl ProjectExec {
    pub fn new(input: Box<dyn Executor>, projections: Vec<(String, ColumnId)>) -> Self {
        let schema = projections.iter().map(|(name, _)| name.clone()).collect();
        Self { input, projections, schema, stats: ExecutionStats::default() }
    }
}

impl Executor for ProjectExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.input.open(ctx)?;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();

        let row = match self.input.next(ctx)? {
            Some(r) => r,
            None => {
                self.stats.total_next_time += start.elapsed();
                return Ok(None);
            }
        };

        let mut values = Vec::with_capacity(self.projections.len());
        for (name, col_id) in &self.projections {
            let idx = col_id.0 as usize;
            let value = row.values.get(idx).cloned().ok_or_else(|| {
                BeeDbError::Executor(format!("projection column '{name}' (index {idx}) out of bounds"))
            })?;
            values.push(value);
        }

        let mut projected = Row::new(values);
        if let Some(rid) = row.rid() {
            projected.set_rid(rid);
        }

        self.stats.rows_produced += 1;
        self.stats.total_next_time += start.elapsed();
        Ok(Some(projected))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.input.close(ctx)?;
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
    use crate::tests::helpers::{assert_exhausted, int_row, Harness, MockExecutor};

    #[test]
    fn project_selects_and_reorders_columns() {
        let rows = vec![int_row(&[1, 10, 100])];
        let input = Box::new(MockExecutor::new(rows, vec!["a".into(), "b".into(), "c".into()]));
        let projections = vec![("c".to_string(), ColumnId(2)), ("a".to_string(), ColumnId(0))];
        let mut project = ProjectExec::new(input, projections);

        let mut harness = Harness::new();
        let mut ctx = harness.context();
        assert_eq!(project.schema(), &["c".to_string(), "a".to_string()]);

        project.open(&mut ctx).unwrap();
        let row = project.next(&mut ctx).unwrap().expect("row");
        assert_eq!(row.values, vec![types::Value::Int64(100), types::Value::Int64(1)]);
        assert_exhausted(&mut project, &mut ctx);
        project.close(&mut ctx).unwrap();
    }
}
