//! Builder: constructs executor trees from physical plans.

use crate::{
    aggregate::AggregateExec,
    dml::{DeleteExec, InsertExec, UpdateExec},
    filter::FilterExec,
    join::{HashJoinExec, NestedLoopJoinExec},
    limit::LimitExec,
    project::ProjectExec,
    scan::{IndexScanExec, SeqScanExec},
    sort::{SortExec, SortKey},
    Executor,
};
use catalog::Catalog;
use common::BeeDbResult;
use planner::PhysicalPlan;

/// Build an executor tree from a physical plan.
///
/// Recursively constructs operator instances, wiring up child inputs. A
/// `Catalog` reference is needed only to resolve the implicit scan schema
/// for `Update`/`Delete` plans, which name a table but not its columns.
pub fn build_executor(plan: PhysicalPlan, catalog: &Catalog) -> BeeDbResult<Box<dyn Executor>> {
    match plan {
        PhysicalPlan::SeqScan { table_id, schema } => Ok(Box::new(SeqScanExec::new(table_id, schema))),

        PhysicalPlan::IndexScan { table_id, index_name, predicate, schema } => Ok(Box::new(
            IndexScanExec::builder().table_id(table_id).index_name(index_name).predicate(predicate).schema(schema).build(),
        )),

        PhysicalPlan::Filter { input, predicate } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(FilterExec::new(child, predicate)))
        }

        PhysicalPlan::Project { input, columns } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(ProjectExec::new(child, columns)))
        }

        PhysicalPlan::Aggregate { input, group_by, aggregates, schema } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(AggregateExec::new(child, group_by, aggregates, schema)))
        }

        PhysicalPlan::Sort { input, order_by } => {
            let child = build_executor(*input, catalog)?;
            let keys = order_by.into_iter().map(|o| SortKey { column_id: o.column_id, direction: o.direction }).collect();
            Ok(Box::new(SortExec::new(child, keys)))
        }

        PhysicalPlan::Limit { input, limit, offset } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(LimitExec::new(child, limit, offset)))
        }

        PhysicalPlan::NestedLoopJoin { left, right, condition, schema } => {
            let left = build_executor(*left, catalog)?;
            let right = build_executor(*right, catalog)?;
            Ok(Box::new(NestedLoopJoinExec::new(left, right, condition, schema)))
        }

        PhysicalPlan::HashJoin { left, right, condition, schema } => {
            let left = build_executor(*left, catalog)?;
            let right = build_executor(*right, catalog)?;
            Ok(Box::new(HashJoinExec::new(left, right, condition, schema)?))
        }

        PhysicalPlan::Insert { table_id, rows } => Ok(Box::new(InsertExec::new(table_id, vec![], rows))),

        PhysicalPlan::Update { table_id, assignments, predicate } => {
            let mut input: Box<dyn Executor> = Box::new(SeqScanExec::new(table_id, implicit_scan_schema(catalog, table_id)?));
            if let Some(pred) = predicate {
                input = Box::new(FilterExec::new(input, pred));
            }
            Ok(Box::new(UpdateExec::new(table_id, vec![], input, assignments)))
        }

        PhysicalPlan::Delete { table_id, predicate } => {
            let mut input: Box<dyn Executor> = Box::new(SeqScanExec::new(table_id, implicit_scan_schema(catalog, table_id)?));
            if let Some(pred) = predicate {
                input = Box::new(FilterExec::new(input, pred));
            }
            Ok(Box::new(DeleteExec::new(table_id, vec![], input)))
        }
    }
}

fn implicit_scan_schema(catalog: &Catalog, table_id: common::TableId) -> BeeDbResult<Vec<String>> {
    Ok(catalog.table_by_id(table_id)?.schema.names())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::Harness;
    use common::{ColumnId, TableId};
    use expr::BinaryOp;
    use planner::{IndexPredicate, ResolvedExpr};
    use types::Value;

    #[test]
    fn build_seq_scan() {
        let harness = Harness::new();
        let plan = PhysicalPlan::SeqScan { table_id: TableId(1), schema: vec!["id".into(), "name".into()] };

        let executor = build_executor(plan, &harness.catalog).unwrap();
        assert_eq!(executor.schema(), &["id", "name"]);
    }

    #[test]
    fn build_index_scan() {
        let harness = Harness::new();
        let plan = PhysicalPlan::IndexScan {
            table_id: TableId(1),
            index_name: "idx_users_id".into(),
            predicate: IndexPredicate::Eq { col: ColumnId(0), value: ResolvedExpr::Literal(Value::Int64(42)) },
            schema: vec!["id".into()],
        };

        assert!(build_executor(plan, &harness.catalog).is_ok());
    }

    #[test]
    fn build_filter_over_scan() {
        let harness = Harness::new();
        let input = PhysicalPlan::SeqScan { table_id: TableId(1), schema: vec!["id".into()] };
        let plan = PhysicalPlan::Filter { input: Box::new(input), predicate: ResolvedExpr::Literal(Value::Bool(true)) };

        assert!(build_executor(plan, &harness.catalog).is_ok());
    }

    #[test]
    fn build_project_multiple_columns() {
        let harness = Harness::new();
        let input = PhysicalPlan::SeqScan { table_id: TableId(1), schema: vec!["id".into(), "name".into(), "age".into()] };
        let plan = PhysicalPlan::Project {
            input: Box::new(input),
            columns: vec![("name".to_string(), ColumnId(1)), ("id".to_string(), ColumnId(0))],
        };

        assert!(build_executor(plan, &harness.catalog).is_ok());
    }

    #[test]
    fn build_insert() {
        let harness = Harness::new();
        let plan = PhysicalPlan::Insert {
            table_id: TableId(1),
            rows: vec![vec![ResolvedExpr::Literal(Value::Int64(1)), ResolvedExpr::Literal(Value::Char("alice".into()))]],
        };

        let executor = build_executor(plan, &harness.catalog).unwrap();
        assert_eq!(executor.schema().len(), 0);
    }

    #[test]
    fn build_update_and_delete_resolve_implicit_scan_schema() {
        let mut harness = Harness::new();
        let table_id = harness.create_users_table();

        let update_plan = PhysicalPlan::Update {
            table_id,
            assignments: vec![(ColumnId(0), ResolvedExpr::Literal(Value::Int64(100)))],
            predicate: None,
        };
        assert!(build_executor(update_plan, &harness.catalog).is_ok());

        let delete_plan = PhysicalPlan::Delete {
            table_id,
            predicate: Some(ResolvedExpr::Binary {
                left: Box::new(ResolvedExpr::Column(ColumnId(2))),
                op: BinaryOp::Eq,
                right: Box::new(ResolvedExpr::Literal(Value::Bool(false))),
            }),
        };
        assert!(build_executor(delete_plan, &harness.catalog).is_ok());
    }

    #[test]
    fn build_nested_project_over_filter_over_scan() {
        let harness = Harness::new();
        let scan = PhysicalPlan::SeqScan { table_id: TableId(1), schema: vec!["id".into(), "name".into(), "active".into()] };
        let filter = PhysicalPlan::Filter { input: Box::new(scan), predicate: ResolvedExpr::Column(ColumnId(2)) };
        let project = PhysicalPlan::Project { input: Box::new(filter), columns: vec![("name".to_string(), ColumnId(1))] };

        assert!(build_executor(project, &harness.catalog).is_ok());
    }
}
