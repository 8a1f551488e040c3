#[cfg(test)]
mod tests;

use common::{BeeDbError, BeeDbResult, Row};
use std::cmp::Ordering;
#[allow(unused_imports)]
use types::{ArithOp, SqlType, Value};

/// Binary comparison, logical, and arithmetic operators (spec §3 Expression
/// operation tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Comparisons flip under operand-swap (spec §4.6 rule 1 SwapOperands);
    /// `=`, `≠`, `AND`, `OR` are unchanged, arithmetic is not swappable.
    pub fn swapped(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        match self {
            Eq => Some(Eq),
            Ne => Some(Ne),
            Lt => Some(Gt),
            Le => Some(Ge),
            Gt => Some(Lt),
            Ge => Some(Le),
            And => Some(And),
            Or => Some(Or),
            Add | Sub | Mul | Div => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Unary operators (currently just logical NOT).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Expression abstract syntax tree (spec §3 tagged Nullary/Unary/Binary
/// variants).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Column reference with optional table/alias qualifier.
    ///
    /// Examples:
    /// - `Column { table: None, name: "id" }` - unqualified column
    /// - `Column { table: Some("users"), name: "id" }` - qualified column
    /// - `Column { table: Some("u"), name: "id" }` - alias-qualified column
    Column {
        /// Optional table name or alias qualifier.
        table: Option<String>,
        /// Column name.
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// The attribute this expression resolves to, if it is (or is wrapping)
    /// a single column reference — used by the optimizer to test attribute
    /// availability for push-down (spec §4.6 rule 5).
    pub fn column_ref(&self) -> Option<(Option<&str>, &str)> {
        match self {
            Expr::Column { table, name } => Some((table.as_deref(), name.as_str())),
            _ => None,
        }
    }
}

/// Evaluation context consisting of the row schema (column names in order).
pub struct EvalContext<'a> {
    pub schema: &'a [String],
}

impl<'a> EvalContext<'a> {
    /// Evaluate an expression over a given row.
    pub fn eval(&self, expr: &Expr, row: &Row) -> BeeDbResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column { table, name } => {
                let idx = self.find_column(table.as_deref(), name)?;
                Ok(row.values[idx].clone())
            }
            Expr::Unary { op, expr } => {
                let v = self.eval(expr, row)?;
                match op {
                    UnaryOp::Not => match v {
                        Value::Null => Ok(Value::Null),
                        _ => {
                            let b = v.as_bool().ok_or_else(|| {
                                BeeDbError::Executor(format!("NOT expects bool, got {v:?}"))
                            })?;
                            Ok(Value::Bool(!b))
                        }
                    },
                }
            }
            Expr::Binary { left, op, right } => {
                let lv = self.eval(left, row)?;
                let rv = self.eval(right, row)?;
                self.eval_binary(&lv, *op, &rv)
            }
        }
    }

    fn eval_binary(&self, l: &Value, op: BinaryOp, r: &Value) -> BeeDbResult<Value> {
        use BinaryOp::*;

        match op {
            And | Or => {
                let lb = l.as_bool().ok_or_else(|| {
                    BeeDbError::Executor(format!("AND/OR expects bools, got {l:?}"))
                })?;
                let rb = r.as_bool().ok_or_else(|| {
                    BeeDbError::Executor(format!("AND/OR expects bools, got {r:?}"))
                })?;
                return Ok(Value::Bool(match op {
                    And => lb && rb,
                    Or => lb || rb,
                    _ => unreachable!(),
                }));
            }
            Add | Sub | Mul | Div => {
                let arith_op = match op {
                    Add => ArithOp::Add,
                    Sub => ArithOp::Sub,
                    Mul => ArithOp::Mul,
                    Div => ArithOp::Div,
                    _ => unreachable!(),
                };
                return l
                    .checked_arith(arith_op, r)
                    .map_err(|e| BeeDbError::Executor(e.to_string()));
            }
            _ => {}
        }

        // Null semantics (spec §4.5 Selection): any comparison involving
        // null yields false, never an error.
        if l.is_null() || r.is_null() {
            return Ok(Value::Bool(false));
        }

        let ord = l.cmp_same_type(r).ok_or_else(|| {
            BeeDbError::Executor(format!("incompatible types for {op:?}: {l:?}, {r:?}"))
        })?;

        let result = match op {
            Eq => ord == Ordering::Equal,
            Ne => ord != Ordering::Equal,
            Lt => ord == Ordering::Less,
            Le => ord != Ordering::Greater,
            Gt => ord == Ordering::Greater,
            Ge => ord != Ordering::Less,
            _ => unreachable!(),
        };

        Ok(Value::Bool(result))
    }

    /// Find column index in schema, supporting qualified and unqualified references.
    ///
    /// Schema entries may be:
    /// - Simple names: `"id"`, `"name"`
    /// - Qualified names: `"users.id"`, `"orders.user_id"`
    ///
    /// Matching rules:
    /// - Qualified ref (`table.col`): Match `"table.col"` exactly
    /// - Unqualified ref (`col`): Match simple `"col"` or suffix `".col"`
    pub fn find_column(&self, table: Option<&str>, name: &str) -> BeeDbResult<usize> {
        if let Some(qualifier) = table {
            let full_name = format!("{qualifier}.{name}");
            self.schema
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&full_name))
                .ok_or_else(|| BeeDbError::Schema(format!("unknown column '{qualifier}.{name}'")))
        } else {
            self.schema
                .iter()
                .position(|c| {
                    c.eq_ignore_ascii_case(name)
                        || c.to_lowercase().ends_with(&format!(".{}", name.to_lowercase()))
                })
                .ok_or_else(|| BeeDbError::Schema(format!("unknown column '{name}'")))
        }
    }
}
