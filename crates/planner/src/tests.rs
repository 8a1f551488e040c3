use catalog::{Catalog, Column, IndexKind};
use parser::parse_sql;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use types::SqlType;

use super::*;

fn sample_catalog(dir: &std::path::Path) -> Catalog {
    let mut catalog = Catalog::open(dir).unwrap();
    catalog
        .create_table(
            "users",
            vec![
                Column::new("id", SqlType::Int64, false),
                Column::new("name", SqlType::Char(32), true),
                Column::new("age", SqlType::Int32, true),
            ],
        )
        .unwrap();
    catalog
        .create_index("users", "idx_users_id", "id", IndexKind::BTree, true)
        .unwrap();
    catalog
        .create_table(
            "orders",
            vec![
                Column::new("id", SqlType::Int64, false),
                Column::new("user_id", SqlType::Int64, false),
                Column::new("total", SqlType::Int32, false),
            ],
        )
        .unwrap();
    catalog
}

fn plan_sql(catalog: &Catalog, sql: &str) -> PhysicalPlan {
    let stmt = parse_sql(sql).unwrap().remove(0);
    let logical = Planner::to_logical(stmt).unwrap();
    let mut ctx = PlanningContext::new(catalog);
    Planner::plan(logical, &mut ctx).unwrap()
}

#[test]
fn seq_scan_with_wildcard_projection() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "SELECT * FROM users;");
    match physical {
        PhysicalPlan::Project { input, columns } => {
            assert_eq!(columns.len(), 3);
            assert!(matches!(*input, PhysicalPlan::SeqScan { .. }));
        }
        other => panic!("expected Project over SeqScan, got {other:?}"),
    }
}

#[test]
fn equality_on_indexed_column_becomes_index_scan() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "SELECT name FROM users WHERE id = 5;");
    match physical {
        PhysicalPlan::Project { input, .. } => match *input {
            PhysicalPlan::Filter { input, .. } => {
                assert!(matches!(*input, PhysicalPlan::IndexScan { .. }));
            }
            other => panic!("expected Filter, got {other:?}"),
        },
        other => panic!("expected Project, got {other:?}"),
    }
}

#[test]
fn non_indexed_predicate_stays_a_seq_scan() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "SELECT name FROM users WHERE age = 30;");
    match physical {
        PhysicalPlan::Project { input, .. } => match *input {
            PhysicalPlan::Filter { input, .. } => {
                assert!(matches!(*input, PhysicalPlan::SeqScan { .. }));
            }
            other => panic!("expected Filter, got {other:?}"),
        },
        other => panic!("expected Project, got {other:?}"),
    }
}

#[test]
fn multi_row_insert_binds_every_row_in_schema_order() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "INSERT INTO users VALUES (1, 'a', 10), (2, 'b', 20);");
    match physical {
        PhysicalPlan::Insert { table_id, rows } => {
            assert_eq!(table_id, TableId(1));
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].len(), 3);
            assert_eq!(rows[1][0], ResolvedExpr::Literal(Value::Int32(2)));
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn insert_with_explicit_column_list_fills_unspecified_columns_with_null() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "INSERT INTO users (id) VALUES (9);");
    match physical {
        PhysicalPlan::Insert { rows, .. } => {
            assert_eq!(rows[0][0], ResolvedExpr::Literal(Value::Int32(9)));
            assert_eq!(rows[0][1], ResolvedExpr::Literal(Value::Null));
            assert_eq!(rows[0][2], ResolvedExpr::Literal(Value::Null));
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn update_binds_assignment_and_predicate_columns() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "UPDATE users SET age = 31 WHERE id = 1;");
    match physical {
        PhysicalPlan::Update { table_id, assignments, predicate } => {
            assert_eq!(table_id, TableId(1));
            assert_eq!(assignments[0].0, ColumnId(2));
            assert!(predicate.is_some());
        }
        other => panic!("expected Update, got {other:?}"),
    }
}

#[test]
fn delete_binds_predicate() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "DELETE FROM users WHERE id = 1;");
    assert!(matches!(physical, PhysicalPlan::Delete { .. }));
}

#[test]
fn join_qualifies_combined_schema_by_table_name() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(
        &catalog,
        "SELECT * FROM users JOIN orders ON users.id = orders.user_id;",
    );
    match physical {
        PhysicalPlan::Project { input, columns } => {
            assert_eq!(columns.len(), 6);
            assert!(matches!(*input, PhysicalPlan::NestedLoopJoin { .. }));
        }
        other => panic!("expected Project over join, got {other:?}"),
    }
}

#[test]
fn grouped_aggregate_binds_group_keys_and_functions() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(
        &catalog,
        "SELECT user_id, COUNT(*), SUM(total) FROM orders GROUP BY user_id;",
    );
    match physical {
        PhysicalPlan::Aggregate { group_by, aggregates, schema, .. } => {
            assert_eq!(group_by, vec![ColumnId(1)]);
            assert_eq!(aggregates.len(), 2);
            assert_eq!(aggregates[0], (AggFunc::Count, None));
            assert_eq!(aggregates[1], (AggFunc::Sum, Some(ColumnId(2))));
            assert_eq!(
                schema,
                vec!["user_id".to_string(), "count".to_string(), "sum_total".to_string()]
            );
        }
        other => panic!("expected Aggregate, got {other:?}"),
    }
}

#[test]
fn aggregate_rejects_ungrouped_plain_column() {
    let stmt = parse_sql("SELECT user_id, total, SUM(total) FROM orders GROUP BY user_id;")
        .unwrap()
        .remove(0);
    let err = Planner::to_logical(stmt).unwrap_err();
    assert!(format!("{err}").contains("GROUP BY"));
}

#[test]
fn sort_and_limit_wrap_the_project() {
    let dir = tempdir().unwrap();
    let catalog = sample_catalog(dir.path());
    let physical = plan_sql(&catalog, "SELECT id FROM users ORDER BY id DESC LIMIT 5 OFFSET 1;");
    match physical {
        PhysicalPlan::Limit { input, limit, offset } => {
            assert_eq!(limit, Some(5));
            assert_eq!(offset, Some(1));
            assert!(matches!(*input, PhysicalPlan::Sort { .. }));
        }
        other => panic!("expected Limit, got {other:?}"),
    }
}

#[test]
fn ddl_and_transaction_control_are_rejected_by_the_planner() {
    for sql in ["CREATE TABLE t (a INT);", "BEGIN;", "COMMIT;", "ROLLBACK;"] {
        let stmt = parse_sql(sql).unwrap().remove(0);
        assert!(Planner::to_logical(stmt).is_err());
    }
}
