//! End-to-end scenarios exercising the full parse → plan → optimize →
//! execute pipeline through `testsupport`'s shared fixtures.

use testsupport::prelude::*;
use types::Value;

#[test]
fn insert_then_scan_returns_rows_in_insertion_order() {
    let mut ctx = TestContext::new().unwrap();
    ctx.run("CREATE TABLE t (id BIGINT NOT NULL, name CHAR(8) NOT NULL)").unwrap();
    ctx.run("INSERT INTO t (id, name) VALUES (1, 'a')").unwrap();
    ctx.run("INSERT INTO t (id, name) VALUES (2, 'b')").unwrap();
    ctx.commit().unwrap();

    let result = ctx.run("SELECT id, name FROM t ORDER BY id").unwrap();
    match result {
        QueryResult::Rows { schema, rows } => {
            assert_eq!(schema, vec!["id".to_string(), "name".to_string()]);
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].values[0], Value::Int64(1));
            assert_eq!(rows[1].values[0], Value::Int64(2));
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn concurrent_update_aborts_loser() {
    let mut ctx = TestContext::new().unwrap();
    ctx.run("CREATE TABLE counters (id BIGINT NOT NULL, v INT32 NOT NULL)").unwrap();
    ctx.run("INSERT INTO counters (id, v) VALUES (1, 0)").unwrap();
    ctx.commit().unwrap();

    let db = ctx.database();
    let mut t1 = db.begin();
    let mut t2 = db.begin();

    db.run(&mut t1, "UPDATE counters SET v = 1 WHERE id = 1").unwrap();
    let loser = db.run(&mut t2, "UPDATE counters SET v = 1 WHERE id = 1");
    assert!(matches!(loser, Err(common::BeeDbError::WriteWriteConflict(_))), "the second updater should lose the race");
    db.abort(&mut t2).unwrap();

    db.commit(&mut t1).unwrap();

    let result = ctx.run("SELECT v FROM counters WHERE id = 1").unwrap();
    match result {
        QueryResult::Rows { rows, .. } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].values[0], Value::Int32(1));
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn limit_and_offset_return_a_middle_slice() {
    let mut ctx = TestContext::new().unwrap();
    ctx.run("CREATE TABLE t (id BIGINT NOT NULL)").unwrap();
    for i in 1..=10 {
        ctx.run(&format!("INSERT INTO t (id) VALUES ({i})")).unwrap();
    }
    ctx.commit().unwrap();

    let result = ctx.run("SELECT id FROM t LIMIT 2 OFFSET 3").unwrap();
    match result {
        QueryResult::Rows { rows, .. } => {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].values[0], Value::Int64(4));
            assert_eq!(rows[1].values[0], Value::Int64(5));
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn unique_index_rejects_duplicate_insert() {
    let mut ctx = TestContext::new().unwrap();
    ctx.run("CREATE TABLE t (id BIGINT NOT NULL)").unwrap();
    ctx.run("CREATE UNIQUE INDEX by_id ON t(id)").unwrap();
    ctx.run("INSERT INTO t (id) VALUES (1)").unwrap();

    let err = ctx.run("INSERT INTO t (id) VALUES (1)").unwrap_err();
    assert!(matches!(err, common::BeeDbError::Constraint(_)));
}

#[test]
fn explain_renders_a_plan_without_executing() {
    let mut ctx = TestContext::new().unwrap();
    ctx.run("CREATE TABLE t (id BIGINT NOT NULL)").unwrap();

    let result = ctx.run("EXPLAIN SELECT id FROM t").unwrap();
    match result {
        QueryResult::Rows { rows, .. } => {
            let Value::Char(plan) = &rows[0].values[0] else { panic!("expected a plan string") };
            assert!(plan.contains("SeqScan") || plan.contains("scan"));
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn run_script_shares_state_across_statements() {
    let output = run_sql_script(
        r#"
        CREATE TABLE products (id BIGINT NOT NULL, name CHAR(32) NOT NULL, price INT32 NOT NULL);
        INSERT INTO products (id, name, price) VALUES (1, 'laptop', 1000);
        INSERT INTO products (id, name, price) VALUES (2, 'mouse', 25);
        SELECT id, name, price FROM products WHERE price > 100;
    "#,
    )
    .unwrap();

    assert!(output.contains("laptop"));
    assert!(!output.contains("mouse"));
}

#[test]
fn fixtures_and_assertions_compose() {
    let users = testsupport::fixtures::data::sample_users();
    assert_eq!(users.len(), 3);
    assert_row_sets_equal(&users, &users.clone());
}

// Property-based tests demonstrating the proptest generators.
#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;
    use testsupport::proptest_generators::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_row_clone_preserves_values(row in arb_row()) {
            let cloned = row.clone();
            assert_eq!(row.values, cloned.values);
        }

        #[test]
        fn prop_value_equals_self(value in arb_value()) {
            assert_eq!(value, value);
        }

        #[test]
        fn prop_row_with_len_has_correct_length(len in 1usize..20) {
            let strategy = arb_row_with_len(len);
            proptest!(|(row in strategy)| {
                prop_assert_eq!(row.values.len(), len);
            });
        }
    }
}
