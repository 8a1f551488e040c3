//! Aggregate operator: GROUP BY and whole-table aggregates (COUNT, SUM, AVG, MIN, MAX).

use crate::{ExecutionContext, Executor};
use common::{BeeDbError, BeeDbResult, ColumnId, ExecutionStats, Row};
use parser::AggFunc;
use std::collections::HashMap;
use std::time::Instant;
use types::Value;

/// Running state for a single aggregate function over a single group.
#[derive(Clone)]
enum AggState {
    Count(i64),
    Sum { total: f64, is_float: bool, any: bool },
    Avg { total: f64, count: i64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl AggState {
    fn new(func: AggFunc) -> Self {
        match func {
            AggFunc::Count => AggState::Count(0),
            AggFunc::Sum => AggState::Sum { total: 0.0, is_float: false, any: false },
            AggFunc::Avg => AggState::Avg { total: 0.0, count: 0 },
            AggFunc::Min => AggState::Min(None),
            AggFunc::Max => AggState::Max(None),
        }
    }

    fn update(&mut self, value: Option<&Value>) {
        match self {
            AggState::Count(n) => {
                if value.map(|v| !v.is_null()).unwrap_or(true) {
                    *n += 1;
                }
            }
            AggState::Sum { total, is_float, any } => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    *any = true;
                    match v {
                        Value::Double(d) => {
                            *is_float = true;
                            *total += d;
                        }
                        Value::Int32(i) => *total += *i as f64,
                        Value::Int64(i) => *total += *i as f64,
                        _ => {}
                    }
                }
            }
            AggState::Avg { total, count } => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    let f = match v {
                        Value::Double(d) => *d,
                        Value::Int32(i) => *i as f64,
                        Value::Int64(i) => *i as f64,
                        _ => return,
                    };
                    *total += f;
                    *count += 1;
                }
            }
            AggState::Min(current) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    let replace = match current {
                        None => true,
                        Some(c) => v.cmp_same_type(c).map(|o| o.is_lt()).unwrap_or(false),
                    };
                    if replace {
                        *current = Some(v.clone());
                    }
                }
            }
            AggState::Max(current) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    let replace = match current {
                        None => true,
                        Some(c) => v.cmp_same_type(c).map(|o| o.is_gt()).unwrap_or(false),
                    };
                    if replace {
                        *current = Some(v.clone());
                    }
                }
            }
        }
    }

    fn finish(self, is_float: bool) -> Value {
        match self {
            AggState::Count(n) => Value::Int64(n),
            AggState::Sum { total, is_float: was_float, any } => {
                if !any {
                    Value::Null
                } else if was_float {
                    Value::Double(total)
                } else {
                    Value::Int64(total as i64)
                }
            }
            AggState::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Double(total / count as f64)
                }
            }
            AggState::Min(v) | AggState::Max(v) => {
                let _ = is_float;
                v.unwrap_or(Value::Null)
            }
        }
    }
}

/// Blocking aggregate operator. Materializes and groups all input rows,
/// then emits one output row per group.
pub struct AggregateExec {
    input: Box<dyn Executor>,
    group_by: Vec<ColumnId>,
    aggregates: Vec<(AggFunc, Option<ColumnId>)>,
    schema: Vec<String>,
    output: Option<Vec<Row>>,
    cursor: usize,
    stats: ExecutionStats,
}

impl AggregateExec {
    pub fn new(
        input: Box<dyn Executor>,
        group_by: Vec<ColumnId>,
        aggregates: Vec<(AggFunc, Option<ColumnId>)>,
        schema: Vec<String>,
    ) -> Self {
        Self { input, group_by, aggregates, schema, output: None, cursor: 0, stats: ExecutionStats::default() }
    }

    fn compute(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let mut groups: HashMap<Vec<Value>, Vec<AggState>> = HashMap::new();
        let mut group_order: Vec<Vec<Value>> = Vec::new();

        while let Some(row) = self.input.next(ctx)? {
            let key: Vec<Value> = self
                .group_by
                .iter()
                .map(|c| row.values.get(c.0 as usize).cloned())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| BeeDbError::Executor("GROUP BY column out of bounds".into()))?;

            let states = groups.entry(key.clone()).or_insert_with(|| {
                group_order.push(key.clone());
                self.aggregates.iter().map(|(f, _)| AggState::new(*f)).collect()
            });

            for (state, (_, col)) in states.iter_mut().zip(self.aggregates.iter()) {
                let value = match col {
                    Some(c) => row.values.get(c.0 as usize),
                    None => None,
                };
                state.update(value);
            }
        }

        if group_order.is_empty() && self.group_by.is_empty() {
            group_order.push(Vec::new());
            groups.insert(Vec::new(), self.aggregates.iter().map(|(f, _)| AggState::new(*f)).collect());
        }

        let mut rows = Vec::with_capacity(group_order.len());
        for key in group_order {
            let states = groups.remove(&key).expect("group present");
            let mut values = key;
            for state in states {
                values.push(state.finish(false));
            }
            rows.push(Row::new(values));
        }

        self.output = Some(rows);
        self.cursor = 0;
        Ok(())
    }
}

impl Executor for AggregateExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        self.input.open(ctx)?;
        self.compute(ctx)?;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> BeeDbResult<Option<Row>> {
        let start = Instant::now();
        let rows = self.output.as_ref().expect("aggregate not opened");
        if self.cursor >= rows.len() {
            self.stats.total_next_time += start.elapsed();
            return Ok(None);
        }
        let row = rows[self.cursor].clone();
        self.cursor += 1;
        self.stats.rows_produced += 1;
        self.stats.total_next_time += start.elapsed();
        Ok(Some(row))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> BeeDbResult<()> {
        let start = Instant::now();
        self.input.close(ctx)?;
        self.output = None;
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
    use crate::tests::helpers::{int_row, Harness, MockExecutor};

    #[test]
    fn count_star_with_no_group_by() {
        let rows = vec![int_row(&[1]), int_row(&[2]), int_row(&[3])];
        let input = Box::new(MockExecutor::new(rows, vec!["id".into()]));
        let mut agg = AggregateExec::new(input, vec![], vec![(AggFunc::Count, None)], vec!["count".into()]);

        let mut harness = Harness::new();
        let mut ctx = harness.context();
        agg.open(&mut ctx).unwrap();
        let row = agg.next(&mut ctx).unwrap().expect("row");
        assert_eq!(row.values, vec![Value::Int64(3)]);
        assert!(agg.next(&mut ctx).unwrap().is_none());
    }

    #[test]
    fn sum_grouped_by_column() {
        let rows = vec![int_row(&[1, 10]), int_row(&[1, 20]), int_row(&[2, 5])];
        let input = Box::new(MockExecutor::new(rows, vec!["g".into(), "v".into()]));
        let mut agg = AggregateExec::new(
            input,
            vec![ColumnId(0)],
            vec![(AggFunc::Sum, Some(ColumnId(1)))],
            vec!["g".into(), "sum_v".into()],
        );

        let mut harness = Harness::new();
        let mut ctx = harness.context();
        agg.open(&mut ctx).unwrap();
        let mut seen = HashMap::new();
        while let Some(row) = agg.next(&mut ctx).unwrap() {
            seen.insert(row.values[0].clone(), row.values[1].clone());
        }
        assert_eq!(seen.get(&Value::Int64(1)), Some(&Value::Int64(30)));
        assert_eq!(seen.get(&Value::Int64(2)), Some(&Value::Int64(5)));
    }
}
