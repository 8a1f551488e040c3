use super::*;
use types::SqlType;

#[test]
fn parse_basic_statements() {
    let sql = r#"
        CREATE TABLE users (id INT, name CHAR(32) NOT NULL, age INT);
        INSERT INTO users VALUES (1, 'Will', 27);
        SELECT id, name FROM users WHERE age > 20;
    "#;

    let stmts = parse_sql(sql).expect("parser should succeed");
    assert_eq!(stmts.len(), 3);

    match &stmts[0] {
        Statement::CreateTable {
            name,
            columns,
            primary_key,
        } => {
            assert_eq!(name, "users");
            assert_eq!(columns.len(), 3);
            assert_eq!(columns[1].name, "name");
            assert_eq!(columns[1].ty, SqlType::Char(32));
            assert!(!columns[1].nullable);
            assert!(primary_key.is_none());
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }

    match &stmts[1] {
        Statement::Insert {
            table,
            columns,
            rows,
        } => {
            assert_eq!(table, "users");
            assert!(columns.is_none());
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].len(), 3);
        }
        other => panic!("expected Insert, got {other:?}"),
    }

    match &stmts[2] {
        Statement::Select {
            table, selection, columns, ..
        } => {
            assert_eq!(table, "users");
            assert_eq!(columns.len(), 2);
            let selection = selection.as_ref().expect("WHERE clause required");
            let display = format!("{selection:?}");
            assert!(display.contains("age"));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_multi_row_insert_with_column_list() {
    let sql = "INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b');";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Insert {
            table,
            columns,
            rows,
        } => {
            assert_eq!(table, "users");
            assert_eq!(columns.as_ref().unwrap(), &vec!["id".to_string(), "name".to_string()]);
            assert_eq!(rows.len(), 2);
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn parse_primary_key_inline() {
    let sql = "CREATE TABLE t (id INT PRIMARY KEY, v INT);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable { primary_key, .. } => {
            assert_eq!(primary_key.as_ref().unwrap(), &vec!["id".to_string()]);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_primary_key_table_level() {
    let sql = "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b));";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable { primary_key, .. } => {
            assert_eq!(
                primary_key.as_ref().unwrap(),
                &vec!["a".to_string(), "b".to_string()]
            );
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_create_index_with_kind_and_unique() {
    let sql = "CREATE UNIQUE INDEX idx_id ON users USING hash (id);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateIndex {
            name,
            table,
            column,
            unique,
            kind,
        } => {
            assert_eq!(name, "idx_id");
            assert_eq!(table, "users");
            assert_eq!(column, "id");
            assert!(unique);
            assert_eq!(*kind, IndexKind::Hash);
        }
        other => panic!("expected CreateIndex, got {other:?}"),
    }
}

#[test]
fn parse_create_index_defaults_to_btree() {
    let sql = "CREATE INDEX idx_name ON users (name);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateIndex { kind, unique, .. } => {
            assert_eq!(*kind, IndexKind::BTree);
            assert!(!unique);
        }
        other => panic!("expected CreateIndex, got {other:?}"),
    }
}

#[test]
fn parse_join_select() {
    let sql = "SELECT a.id FROM orders a JOIN users b ON a.user_id = b.id;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { join, .. } => {
            let join = join.as_ref().expect("join expected");
            assert_eq!(join.table, "users");
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_group_by() {
    let sql = "SELECT dept FROM employees GROUP BY dept;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { group_by, .. } => {
            assert_eq!(group_by, &vec!["dept".to_string()]);
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_order_by_limit_offset() {
    let sql = "SELECT id FROM users ORDER BY id DESC LIMIT 10 OFFSET 5;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select {
            order_by,
            limit,
            offset,
            ..
        } => {
            assert_eq!(order_by.len(), 1);
            assert_eq!(order_by[0].direction, SortDirection::Desc);
            assert_eq!(*limit, Some(10));
            assert_eq!(*offset, Some(5));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_update_and_delete() {
    let stmts = parse_sql("UPDATE users SET age = 30 WHERE id = 1;").unwrap();
    match &stmts[0] {
        Statement::Update {
            table,
            assignments,
            selection,
        } => {
            assert_eq!(table, "users");
            assert_eq!(assignments.len(), 1);
            assert_eq!(assignments[0].0, "age");
            assert!(selection.is_some());
        }
        other => panic!("expected Update, got {other:?}"),
    }

    let stmts = parse_sql("DELETE FROM users WHERE id = 1;").unwrap();
    match &stmts[0] {
        Statement::Delete { table, selection } => {
            assert_eq!(table, "users");
            assert!(selection.is_some());
        }
        other => panic!("expected Delete, got {other:?}"),
    }
}

#[test]
fn parse_transaction_control() {
    assert_eq!(parse_sql("BEGIN;").unwrap()[0], Statement::Begin);
    assert_eq!(parse_sql("COMMIT;").unwrap()[0], Statement::Commit);
    assert_eq!(parse_sql("ROLLBACK;").unwrap()[0], Statement::Abort);
}

#[test]
fn parse_explain() {
    let stmts = parse_sql("EXPLAIN SELECT id FROM users;").unwrap();
    match &stmts[0] {
        Statement::Explain { query, analyze } => {
            assert!(!analyze);
            assert!(matches!(**query, Statement::Select { .. }));
        }
        other => panic!("expected Explain, got {other:?}"),
    }
}

#[test]
fn parse_arithmetic_expression() {
    let stmts = parse_sql("SELECT id FROM t WHERE a + b > 10;").unwrap();
    match &stmts[0] {
        Statement::Select { selection, .. } => {
            let selection = selection.as_ref().unwrap();
            let display = format!("{selection:?}");
            assert!(display.contains("Add"));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn drop_statements_are_rejected() {
    let err = parse_sql("DROP TABLE users;").unwrap_err();
    assert!(format!("{err}").to_lowercase().contains("unsupported"));
}

#[test]
fn multi_table_from_is_rejected() {
    let err = parse_sql("SELECT * FROM a, b;").unwrap_err();
    assert!(format!("{err}").contains("comma-joined"));
}

#[test]
fn parse_grouped_aggregate() {
    let stmts = parse_sql("SELECT dept, COUNT(*), SUM(salary) FROM emp GROUP BY dept;").unwrap();
    match &stmts[0] {
        Statement::Select { columns, group_by, .. } => {
            assert_eq!(group_by, &["dept".to_string()]);
            assert_eq!(columns[0], SelectItem::Column("dept".into()));
            assert_eq!(
                columns[1],
                SelectItem::Aggregate { func: AggFunc::Count, column: None }
            );
            assert_eq!(
                columns[2],
                SelectItem::Aggregate { func: AggFunc::Sum, column: Some("salary".into()) }
            );
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn aggregate_without_column_is_rejected_unless_count() {
    let err = parse_sql("SELECT AVG(*) FROM emp;").unwrap_err();
    assert!(format!("{err}").contains("requires a column"));
}
