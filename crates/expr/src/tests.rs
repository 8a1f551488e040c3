use super::*;
use common::Row;
use types::Value::*;

fn schema(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        name: name.to_string(),
    }
}

#[test]
fn eval_literals_and_columns() {
    let row = Row::new(vec![Int64(1), Char("Will".into()), Bool(true)]);
    let schema = schema(&["id", "name", "active"]);
    let ctx = EvalContext { schema: &schema };

    assert_eq!(ctx.eval(&Expr::Literal(Int64(42)), &row).unwrap(), Int64(42));
    assert_eq!(ctx.eval(&col("name"), &row).unwrap(), Char("Will".into()));
}

#[test]
fn eval_qualified_column() {
    let row = Row::new(vec![Int64(7)]);
    let schema = schema(&["users.id"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Column {
        table: Some("users".into()),
        name: "id".into(),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Int64(7));
}

#[test]
fn eval_comparisons() {
    let row = Row::new(vec![Int64(10), Int64(20)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let lt = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Lt,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&lt, &row).unwrap(), Bool(true));
}

#[test]
fn comparison_with_null_yields_false() {
    let row = Row::new(vec![Int64(10), Null]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let eq = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Eq,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&eq, &row).unwrap(), Bool(false));
}

#[test]
fn eval_logical_ops() {
    let row = Row::new(vec![Bool(true), Bool(false)]);
    let schema = schema(&["x", "y"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(col("x")),
        op: BinaryOp::And,
        right: Box::new(col("y")),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Bool(false));
}

#[test]
fn not_operator() {
    let row = Row::new(vec![Bool(false)]);
    let schema = schema(&["f"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Unary {
        op: UnaryOp::Not,
        expr: Box::new(col("f")),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Bool(true));
}

#[test]
fn arithmetic_adds_values() {
    let row = Row::new(vec![Int64(3), Int64(4)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Add,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&expr, &row).unwrap(), Int64(7));
}

#[test]
fn mismatched_types_fail() {
    let row = Row::new(vec![Int64(1), Char("hi".into())]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext { schema: &schema };

    let expr = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Eq,
        right: Box::new(col("b")),
    };

    let err = ctx.eval(&expr, &row).unwrap_err();
    assert!(format!("{err:?}").contains("incompatible types"));
}

#[test]
fn swapped_flips_comparison_direction() {
    assert_eq!(BinaryOp::Lt.swapped(), Some(BinaryOp::Gt));
    assert_eq!(BinaryOp::Ge.swapped(), Some(BinaryOp::Le));
    assert_eq!(BinaryOp::Eq.swapped(), Some(BinaryOp::Eq));
    assert_eq!(BinaryOp::Add.swapped(), None);
}
