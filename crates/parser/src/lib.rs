mod ast;
#[cfg(test)]
mod tests;

pub use ast::*;

use common::{BeeDbError, BeeDbResult};
use expr::{BinaryOp, Expr, UnaryOp};
use sqlparser::ast as sqlast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;
use types::{SqlType, Value};

/// Parse SQL text into the internal AST statements.
pub fn parse_sql(sql: &str) -> BeeDbResult<Vec<Statement>> {
    let dialect = GenericDialect {};
    let stmts = SqlParser::parse_sql(&dialect, sql)
        .map_err(|e| BeeDbError::Parser(format!("SQL parse error: {e}")))?;

    stmts.into_iter().map(map_statement).collect()
}

fn map_statement(stmt: sqlast::Statement) -> BeeDbResult<Statement> {
    use sqlast::Statement as SqlStatement;

    match stmt {
        SqlStatement::CreateTable {
            name,
            columns,
            constraints,
            ..
        } => {
            let table = normalize_object_name(&name)?;
            let primary_key = resolve_primary_key(&columns, &constraints)?;

            let mapped_columns = columns
                .into_iter()
                .map(map_column_def)
                .collect::<BeeDbResult<Vec<_>>>()?;

            Ok(Statement::CreateTable {
                name: table,
                columns: mapped_columns,
                primary_key,
            })
        }
        SqlStatement::CreateIndex {
            name,
            table_name,
            columns,
            unique,
            using,
            ..
        } => {
            let index_name = name
                .ok_or_else(|| BeeDbError::Parser("index name required".into()))
                .map(|n| normalize_object_name(&n))??;
            let table = normalize_object_name(&table_name)?;
            let column = map_index_column(columns.first())?;
            let kind = match using.as_ref().map(|i| i.value.to_lowercase()) {
                Some(s) if s == "hash" => IndexKind::Hash,
                Some(s) if s == "btree" => IndexKind::BTree,
                None => IndexKind::BTree,
                Some(other) => {
                    return Err(BeeDbError::Parser(format!("unsupported index kind: {other}")))
                }
            };
            Ok(Statement::CreateIndex {
                name: index_name,
                table,
                column,
                unique,
                kind,
            })
        }
        SqlStatement::Insert {
            table_name,
            columns,
            source,
            ..
        } => {
            let table = normalize_object_name(&table_name)?;
            let source = source.ok_or_else(|| BeeDbError::Parser("INSERT source missing".into()))?;
            let rows = extract_values(*source)?;
            let columns = if columns.is_empty() {
                None
            } else {
                Some(columns.into_iter().map(normalize_ident_owned).collect())
            };
            Ok(Statement::Insert {
                table,
                columns,
                rows,
            })
        }
        SqlStatement::Query(query) => map_select(*query),
        SqlStatement::Update {
            table,
            assignments,
            selection,
            ..
        } => {
            let table = table_name_from_with_joins(&table)?;
            let assignments = assignments
                .into_iter()
                .map(|assign| {
                    let ident = assign
                        .id
                        .last()
                        .ok_or_else(|| BeeDbError::Parser("invalid assignment target".into()))?;
                    Ok((normalize_ident(ident), map_expr(assign.value)?))
                })
                .collect::<BeeDbResult<Vec<_>>>()?;
            let selection = selection.map(map_expr).transpose()?;
            Ok(Statement::Update {
                table,
                assignments,
                selection,
            })
        }
        SqlStatement::Delete {
            from, selection, ..
        } => {
            if from.is_empty() {
                return Err(BeeDbError::Parser("DELETE requires FROM source".into()));
            }
            let table = table_name_from_with_joins(&from[0])?;
            if from.len() > 1 {
                return Err(BeeDbError::Parser("multi-table DELETE not supported".into()));
            }
            let selection = selection.map(map_expr).transpose()?;
            Ok(Statement::Delete { table, selection })
        }
        SqlStatement::Explain {
            statement, analyze, ..
        } => {
            let query = Box::new(map_statement(*statement)?);
            Ok(Statement::Explain { query, analyze })
        }
        SqlStatement::StartTransaction { .. } => Ok(Statement::Begin),
        SqlStatement::Commit { .. } => Ok(Statement::Commit),
        SqlStatement::Rollback { .. } => Ok(Statement::Abort),
        _ => Err(BeeDbError::Parser("unsupported statement".into())),
    }
}

fn map_column_def(col: sqlast::ColumnDef) -> BeeDbResult<ColumnDef> {
    let ty = map_data_type(&col.data_type)?;
    let not_null = col.options.iter().any(|opt| {
        matches!(
            opt.option,
            sqlast::ColumnOption::NotNull | sqlast::ColumnOption::Unique { is_primary: true, .. }
        )
    });
    Ok(ColumnDef {
        name: normalize_ident_owned(col.name),
        ty,
        nullable: !not_null,
    })
}

fn map_data_type(ty: &sqlast::DataType) -> BeeDbResult<SqlType> {
    use sqlast::DataType as T;
    Ok(match ty {
        T::Int(_) | T::Integer(_) => SqlType::Int32,
        T::BigInt(_) => SqlType::Int64,
        T::Double | T::DoublePrecision | T::Float(_) | T::Real => SqlType::Double,
        T::Char(len) | T::Character(len) => {
            let n = len
                .as_ref()
                .and_then(|l| match l {
                    sqlast::CharacterLength::IntegerLength { length, .. } => Some(*length as u16),
                    _ => None,
                })
                .unwrap_or(1);
            SqlType::Char(n)
        }
        T::Varchar(len) | T::CharVarying(len) => {
            let n = len
                .as_ref()
                .and_then(|l| match l {
                    sqlast::CharacterLength::IntegerLength { length, .. } => Some(*length as u16),
                    _ => None,
                })
                .unwrap_or(255);
            SqlType::Char(n)
        }
        T::Text => SqlType::Char(255),
        T::Date => SqlType::Date,
        T::Boolean | T::Bool => SqlType::Bool,
        other => return Err(BeeDbError::Parser(format!("unsupported column type: {other}"))),
    })
}

fn map_select(query: sqlast::Query) -> BeeDbResult<Statement> {
    use sqlast::SetExpr;

    let select = match *query.body {
        SetExpr::Select(select) => select,
        SetExpr::Values(_) => {
            return Err(BeeDbError::Parser("standalone VALUES not supported".into()))
        }
        _ => return Err(BeeDbError::Parser("SET operations not supported".into())),
    };

    let sqlast::Select {
        projection,
        from,
        selection,
        group_by,
        ..
    } = *select;

    if from.is_empty() {
        return Err(BeeDbError::Parser("SELECT requires FROM clause".into()));
    }
    if from.len() > 1 {
        return Err(BeeDbError::Parser(
            "comma-joined FROM list not supported; use JOIN ... ON".into(),
        ));
    }
    let table = table_name_from_with_joins_no_join_check(&from[0])?;
    let join = map_join(&from[0])?;
    let columns = projection
        .into_iter()
        .map(map_select_item)
        .collect::<BeeDbResult<Vec<_>>>()?;
    let selection = selection.map(map_expr).transpose()?;

    let group_by = match group_by {
        sqlast::GroupByExpr::All => {
            return Err(BeeDbError::Parser("GROUP BY ALL not supported".into()))
        }
        sqlast::GroupByExpr::Expressions(exprs) => exprs
            .into_iter()
            .map(|e| match e {
                sqlast::Expr::Identifier(ident) => Ok(normalize_ident_owned(ident)),
                other => Err(BeeDbError::Parser(format!(
                    "unsupported GROUP BY expression: {other:?}"
                ))),
            })
            .collect::<BeeDbResult<Vec<_>>>()?,
    };

    let order_by = query
        .order_by
        .into_iter()
        .map(map_order_by_expr)
        .collect::<BeeDbResult<Vec<_>>>()?;

    let limit = query
        .limit
        .map(|expr| match expr {
            sqlast::Expr::Value(sqlast::Value::Number(n, _)) => n
                .parse::<u64>()
                .map_err(|_| BeeDbError::Parser(format!("invalid LIMIT value: {n}"))),
            _ => Err(BeeDbError::Parser(
                "LIMIT must be a non-negative integer".into(),
            )),
        })
        .transpose()?;

    let offset = query
        .offset
        .map(|offset_expr| match offset_expr.value {
            sqlast::Expr::Value(sqlast::Value::Number(n, _)) => n
                .parse::<u64>()
                .map_err(|_| BeeDbError::Parser(format!("invalid OFFSET value: {n}"))),
            _ => Err(BeeDbError::Parser(
                "OFFSET must be a non-negative integer".into(),
            )),
        })
        .transpose()?;

    Ok(Statement::Select {
        columns,
        table,
        join,
        selection,
        group_by,
        order_by,
        limit,
        offset,
    })
}

fn map_join(table: &sqlast::TableWithJoins) -> BeeDbResult<Option<Join>> {
    if table.joins.is_empty() {
        return Ok(None);
    }
    if table.joins.len() > 1 {
        return Err(BeeDbError::Parser("only a single JOIN is supported".into()));
    }
    let join = &table.joins[0];
    let right_table = match &join.relation {
        sqlast::TableFactor::Table { name, .. } => normalize_object_name(name)?,
        _ => return Err(BeeDbError::Parser("unsupported join table factor".into())),
    };
    let condition = match &join.join_operator {
        sqlast::JoinOperator::Inner(sqlast::JoinConstraint::On(expr)) => map_expr(expr.clone())?,
        other => return Err(BeeDbError::Parser(format!("unsupported join kind: {other:?}"))),
    };
    Ok(Some(Join {
        table: right_table,
        condition,
    }))
}

fn map_order_by_expr(expr: sqlast::OrderByExpr) -> BeeDbResult<ast::OrderByExpr> {
    let column = match expr.expr {
        sqlast::Expr::Identifier(ident) => normalize_ident(&ident),
        sqlast::Expr::CompoundIdentifier(parts) => {
            if parts.len() == 1 {
                normalize_ident(&parts[0])
            } else {
                return Err(BeeDbError::Parser(
                    "qualified column names not supported in ORDER BY".into(),
                ));
            }
        }
        _ => {
            return Err(BeeDbError::Parser(
                "ORDER BY supports column names only".into(),
            ))
        }
    };

    let direction = match expr.asc {
        Some(false) => ast::SortDirection::Desc,
        _ => ast::SortDirection::Asc,
    };

    Ok(ast::OrderByExpr { column, direction })
}

fn extract_values(query: sqlast::Query) -> BeeDbResult<Vec<Vec<Expr>>> {
    match *query.body {
        sqlast::SetExpr::Values(values) => values
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(map_expr).collect())
            .collect(),
        _ => Err(BeeDbError::Parser("INSERT expects VALUES list".into())),
    }
}

fn map_select_item(item: sqlast::SelectItem) -> BeeDbResult<SelectItem> {
    match item {
        sqlast::SelectItem::Wildcard(options) => {
            ensure_plain_wildcard(&options)?;
            Ok(SelectItem::Wildcard)
        }
        sqlast::SelectItem::QualifiedWildcard(_, _) => {
            Err(BeeDbError::Parser("qualified wildcard not supported".into()))
        }
        sqlast::SelectItem::UnnamedExpr(expr) => match expr {
            sqlast::Expr::Identifier(ident) => Ok(SelectItem::Column(normalize_ident_owned(ident))),
            sqlast::Expr::CompoundIdentifier(parts) => {
                let ident = parts
                    .last()
                    .ok_or_else(|| BeeDbError::Parser("invalid identifier".into()))?;
                Ok(SelectItem::Column(normalize_ident(ident)))
            }
            sqlast::Expr::Function(func) => map_aggregate(func),
            other => Err(BeeDbError::Parser(format!(
                "unsupported select item: {other:?}"
            ))),
        },
        sqlast::SelectItem::ExprWithAlias { .. } => {
            Err(BeeDbError::Parser("select aliases not supported".into()))
        }
    }
}

/// Map a `COUNT`/`SUM`/`AVG`/`MIN`/`MAX` call. No other functions are recognized.
fn map_aggregate(func: sqlast::Function) -> BeeDbResult<SelectItem> {
    let fname = func
        .name
        .0
        .first()
        .map(|i| i.value.to_uppercase())
        .ok_or_else(|| BeeDbError::Parser("invalid function name".into()))?;
    let agg = match fname.as_str() {
        "COUNT" => AggFunc::Count,
        "SUM" => AggFunc::Sum,
        "AVG" => AggFunc::Avg,
        "MIN" => AggFunc::Min,
        "MAX" => AggFunc::Max,
        other => return Err(BeeDbError::Parser(format!("unsupported function '{other}'"))),
    };
    let column = match func.args.as_slice() {
        [] => None,
        [sqlast::FunctionArg::Unnamed(sqlast::FunctionArgExpr::Wildcard)] => None,
        [sqlast::FunctionArg::Unnamed(sqlast::FunctionArgExpr::Expr(sqlast::Expr::Identifier(
            ident,
        )))] => Some(normalize_ident(ident)),
        [sqlast::FunctionArg::Unnamed(sqlast::FunctionArgExpr::Expr(
            sqlast::Expr::CompoundIdentifier(parts),
        ))] => parts.last().map(normalize_ident),
        _ => return Err(BeeDbError::Parser(format!("unsupported arguments to {fname}"))),
    };
    if agg != AggFunc::Count && column.is_none() {
        return Err(BeeDbError::Parser(format!("{fname} requires a column argument")));
    }
    Ok(SelectItem::Aggregate { func: agg, column })
}

fn map_expr(expr: sqlast::Expr) -> BeeDbResult<Expr> {
    use sqlast::Expr as SqlExpr;

    match expr {
        SqlExpr::Identifier(ident) => Ok(Expr::Column {
            table: None,
            name: normalize_ident_owned(ident),
        }),
        SqlExpr::CompoundIdentifier(mut idents) => {
            let name = idents
                .pop()
                .map(normalize_ident_owned)
                .ok_or_else(|| BeeDbError::Parser("invalid identifier".into()))?;
            let table = idents.pop().map(normalize_ident_owned);
            Ok(Expr::Column { table, name })
        }
        SqlExpr::Value(value) => Ok(Expr::Literal(map_value(value)?)),
        SqlExpr::BinaryOp { left, op, right } => Ok(Expr::Binary {
            left: Box::new(map_expr(*left)?),
            op: map_binary_op(op)?,
            right: Box::new(map_expr(*right)?),
        }),
        SqlExpr::UnaryOp { op, expr } => Ok(Expr::Unary {
            op: map_unary_op(op)?,
            expr: Box::new(map_expr(*expr)?),
        }),
        SqlExpr::Nested(expr) => map_expr(*expr),
        _ => Err(BeeDbError::Parser("unsupported expr".into())),
    }
}

fn map_value(value: sqlast::Value) -> BeeDbResult<Value> {
    use sqlast::Value as SqlValue;

    match value {
        SqlValue::Number(num, _) => {
            if let Ok(i) = num.parse::<i32>() {
                Ok(Value::Int32(i))
            } else if let Ok(i) = num.parse::<i64>() {
                Ok(Value::Int64(i))
            } else {
                num.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| BeeDbError::Parser(format!("invalid numeric literal: {num}")))
            }
        }
        SqlValue::SingleQuotedString(s) => Ok(Value::Char(s)),
        SqlValue::Boolean(b) => Ok(Value::Bool(b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(BeeDbError::Parser(format!("unsupported literal: {other:?}"))),
    }
}

fn map_binary_op(op: sqlast::BinaryOperator) -> BeeDbResult<BinaryOp> {
    use sqlast::BinaryOperator as SqlBinary;

    Ok(match op {
        SqlBinary::Eq => BinaryOp::Eq,
        SqlBinary::NotEq => BinaryOp::Ne,
        SqlBinary::Lt => BinaryOp::Lt,
        SqlBinary::LtEq => BinaryOp::Le,
        SqlBinary::Gt => BinaryOp::Gt,
        SqlBinary::GtEq => BinaryOp::Ge,
        SqlBinary::And => BinaryOp::And,
        SqlBinary::Or => BinaryOp::Or,
        SqlBinary::Plus => BinaryOp::Add,
        SqlBinary::Minus => BinaryOp::Sub,
        SqlBinary::Multiply => BinaryOp::Mul,
        SqlBinary::Divide => BinaryOp::Div,
        other => return Err(BeeDbError::Parser(format!("unsupported operator: {other:?}"))),
    })
}

fn map_unary_op(op: sqlast::UnaryOperator) -> BeeDbResult<UnaryOp> {
    use sqlast::UnaryOperator as SqlUnary;

    Ok(match op {
        SqlUnary::Not => UnaryOp::Not,
        other => {
            return Err(BeeDbError::Parser(format!(
                "unsupported unary operator: {other:?}"
            )))
        }
    })
}

fn normalize_ident(ident: &sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_ident_owned(ident: sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_object_name(name: &sqlast::ObjectName) -> BeeDbResult<String> {
    name.0
        .first()
        .map(|ident| ident.value.to_lowercase())
        .ok_or_else(|| BeeDbError::Parser("invalid object name".into()))
}

fn table_name_from_with_joins(table: &sqlast::TableWithJoins) -> BeeDbResult<String> {
    if !table.joins.is_empty() {
        return Err(BeeDbError::Parser("joins not supported here".into()));
    }
    match &table.relation {
        sqlast::TableFactor::Table { name, .. } => normalize_object_name(name),
        _ => Err(BeeDbError::Parser("unsupported table factor".into())),
    }
}

fn table_name_from_with_joins_no_join_check(table: &sqlast::TableWithJoins) -> BeeDbResult<String> {
    match &table.relation {
        sqlast::TableFactor::Table { name, .. } => normalize_object_name(name),
        _ => Err(BeeDbError::Parser("unsupported table factor".into())),
    }
}

fn map_index_column(column: Option<&sqlast::OrderByExpr>) -> BeeDbResult<String> {
    let column = column.ok_or_else(|| BeeDbError::Parser("index column required".into()))?;
    match &column.expr {
        sqlast::Expr::Identifier(ident) => Ok(normalize_ident(ident)),
        sqlast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(normalize_ident)
            .ok_or_else(|| BeeDbError::Parser("invalid identifier".into())),
        other => Err(BeeDbError::Parser(format!(
            "unsupported index column: {other:?}"
        ))),
    }
}

fn ensure_plain_wildcard(options: &sqlast::WildcardAdditionalOptions) -> BeeDbResult<()> {
    let has_options = options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_rename.is_some()
        || options.opt_replace.is_some();
    if has_options {
        Err(BeeDbError::Parser("wildcard options not supported".into()))
    } else {
        Ok(())
    }
}

/// Resolve primary key from inline column constraints and table-level constraints.
fn resolve_primary_key(
    columns: &[sqlast::ColumnDef],
    constraints: &[sqlast::TableConstraint],
) -> BeeDbResult<Option<Vec<String>>> {
    let inline_pk = extract_inline_primary_key(columns)?;
    let table_pk = extract_primary_key(constraints)?;

    match (table_pk, inline_pk) {
        (Some(_), Some(_)) => Err(BeeDbError::Parser(
            "PRIMARY KEY defined both inline and at table level".into(),
        )),
        (Some(pk), None) | (None, Some(pk)) => Ok(Some(pk)),
        (None, None) => Ok(None),
    }
}

fn extract_primary_key(constraints: &[sqlast::TableConstraint]) -> BeeDbResult<Option<Vec<String>>> {
    use sqlast::TableConstraint;

    for constraint in constraints {
        match constraint {
            TableConstraint::Unique {
                columns,
                is_primary,
                ..
            } if *is_primary => {
                let pk_columns: Vec<String> = columns.iter().map(normalize_ident).collect();

                if pk_columns.is_empty() {
                    return Err(BeeDbError::Parser(
                        "PRIMARY KEY must include at least one column".into(),
                    ));
                }

                return Ok(Some(pk_columns));
            }
            _ => continue,
        }
    }
    Ok(None)
}

fn extract_inline_primary_key(columns: &[sqlast::ColumnDef]) -> BeeDbResult<Option<Vec<String>>> {
    use sqlast::ColumnOption;

    let mut pk_columns = Vec::new();
    for column in columns {
        let has_primary_key = column.options.iter().any(|opt| {
            matches!(
                opt.option,
                ColumnOption::Unique {
                    is_primary: true,
                    ..
                }
            )
        });
        if has_primary_key {
            pk_columns.push(normalize_ident(&column.name));
        }
    }

    match pk_columns.len() {
        0 => Ok(None),
        1 => Ok(Some(pk_columns)),
        _ => Err(BeeDbError::Parser(
            "multiple PRIMARY KEY column constraints; use PRIMARY KEY (col1, col2)".into(),
        )),
    }
}
