//! Query planner: converts SQL AST to optimized physical execution plans.
//!
//! The planner bridges between the parser's abstract syntax tree and the
//! executor's runtime operators. It performs two main tasks:
//!
//! 1. **Name Binding** - Resolves column names to ordinals using catalog schemas
//! 2. **Access Method Selection** - Chooses between sequential and index scans
//!
//! Rule-based rewrites (predicate pushdown, join reordering, operator
//! substitution) live in the `optimizer` crate and run on the logical plan
//! this module produces, between `lower_to_logical` and `bind`.
//!
//! # Architecture
//!
//! ```text
//! Parser AST
//!     -> Logical Plan (table names, column names)
//!     -> optimizer crate rewrites the logical plan
//!     -> Bind (names -> IDs, access method selection)
//!     -> Physical Plan (table IDs, column ordinals)
//!     -> Executor
//! ```

#[cfg(test)]
mod tests;

use catalog::{Catalog, IndexKind, TableMeta};
use common::{BeeDbError, BeeDbResult, ColumnId, TableId};
use expr::{BinaryOp, Expr, UnaryOp};
use parser::{AggFunc, SelectItem, Statement};
use types::{SqlType, Value};

pub use parser::SortDirection;

/// Logical plan node - optimizer-friendly representation with string names.
///
/// Logical plans use table/column names and are independent of physical
/// storage details. They're the intermediate form the optimizer rewrites.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalPlan {
    TableScan {
        table: String,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    Project {
        input: Box<LogicalPlan>,
        columns: Vec<String>,
    },
    /// Per-column aggregation, optionally grouped. `aggregates` pairs each
    /// requested function with its source column (`None` only for `COUNT(*)`).
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<String>,
        aggregates: Vec<(AggFunc, Option<String>)>,
    },
    Sort {
        input: Box<LogicalPlan>,
        order_by: Vec<OrderByExpr>,
    },
    Limit {
        input: Box<LogicalPlan>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        predicate: Option<Expr>,
    },
    Delete {
        table: String,
        predicate: Option<Expr>,
    },
    /// Inner join between two table scans (the parser's grammar admits at
    /// most one `JOIN ... ON` per query).
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        condition: Expr,
        left_table: String,
        right_table: String,
    },
    /// A `Join` the optimizer has proven is a pure equi-join (`left.col =
    /// right.col`), binding to a hash join instead of a nested loop.
    HashJoin {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        condition: Expr,
        left_table: String,
        right_table: String,
    },
}

/// Logical ORDER BY expression with column name.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub direction: SortDirection,
}

/// Physical plan node - executor-ready with resolved IDs and access methods.
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicalPlan {
    SeqScan {
        table_id: TableId,
        schema: Vec<String>,
    },
    IndexScan {
        table_id: TableId,
        index_name: String,
        predicate: IndexPredicate,
        schema: Vec<String>,
    },
    Filter {
        input: Box<PhysicalPlan>,
        predicate: ResolvedExpr,
    },
    Project {
        input: Box<PhysicalPlan>,
        columns: Vec<(String, ColumnId)>,
    },
    Aggregate {
        input: Box<PhysicalPlan>,
        group_by: Vec<ColumnId>,
        aggregates: Vec<(AggFunc, Option<ColumnId>)>,
        schema: Vec<String>,
    },
    Sort {
        input: Box<PhysicalPlan>,
        order_by: Vec<ResolvedOrderByExpr>,
    },
    Limit {
        input: Box<PhysicalPlan>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Insert {
        table_id: TableId,
        rows: Vec<Vec<ResolvedExpr>>,
    },
    Update {
        table_id: TableId,
        assignments: Vec<(ColumnId, ResolvedExpr)>,
        predicate: Option<ResolvedExpr>,
    },
    Delete {
        table_id: TableId,
        predicate: Option<ResolvedExpr>,
    },
    /// Nested loop join - for each row from left, scan all right rows.
    NestedLoopJoin {
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        condition: ResolvedExpr,
        /// Combined schema: left columns first, then right. Column names
        /// are prefixed with the table name (e.g. "users.id").
        schema: Vec<String>,
    },
    /// Hash join - the optimizer's substitution for a proven equi-join.
    /// Builds an in-memory hash table over the right side's join key and
    /// probes it once per left row.
    HashJoin {
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        condition: ResolvedExpr,
        schema: Vec<String>,
    },
}

/// Physical ORDER BY expression with resolved column ID.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOrderByExpr {
    pub column_id: ColumnId,
    pub direction: SortDirection,
}

/// Index predicate for index scans.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexPredicate {
    Eq {
        col: ColumnId,
        value: ResolvedExpr,
    },
    CompositeEq {
        columns: Vec<ColumnId>,
        values: Vec<ResolvedExpr>,
    },
    /// Range predicate (B+Tree only).
    Range {
        col: ColumnId,
        low: ResolvedExpr,
        high: ResolvedExpr,
    },
}

/// Resolved expression with column references bound to ordinals.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedExpr {
    Literal(Value),
    Column(ColumnId),
    Unary {
        op: UnaryOp,
        expr: Box<ResolvedExpr>,
    },
    Binary {
        left: Box<ResolvedExpr>,
        op: BinaryOp,
        right: Box<ResolvedExpr>,
    },
}

/// Planning context - holds the catalog for schema lookups.
pub struct PlanningContext<'a> {
    pub catalog: &'a Catalog,
}

impl<'a> PlanningContext<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn table(&self, name: &str) -> BeeDbResult<&TableMeta> {
        self.catalog.table(name)
    }
}

/// Main planner entry point.
pub struct Planner;

impl Planner {
    /// Convert a parser statement into a logical plan, ready for the
    /// optimizer to rewrite before `bind` produces a physical plan.
    ///
    /// # Errors
    ///
    /// Returns `BeeDbError::Planner` if table/column names don't exist or
    /// the statement is a DDL/transaction-control statement (those are
    /// handled directly by the database layer, not planned).
    pub fn to_logical(stmt: Statement) -> BeeDbResult<LogicalPlan> {
        Self::lower_to_logical(stmt)
    }

    /// Bind a (possibly optimizer-rewritten) logical plan into a physical one.
    pub fn plan(logical: LogicalPlan, ctx: &mut PlanningContext) -> BeeDbResult<PhysicalPlan> {
        Self::bind(logical, ctx)
    }

    fn lower_to_logical(stmt: Statement) -> BeeDbResult<LogicalPlan> {
        match stmt {
            Statement::CreateTable { .. }
            | Statement::CreateIndex { .. }
            | Statement::Begin
            | Statement::Commit
            | Statement::Abort => Err(BeeDbError::Planner(
                "DDL and transaction control are handled by the database layer".into(),
            )),
            Statement::Explain { query, .. } => Self::lower_to_logical(*query),
            Statement::Insert { table, columns, rows } => {
                Ok(LogicalPlan::Insert { table, columns, rows })
            }
            Statement::Update {
                table,
                assignments,
                selection,
            } => Ok(LogicalPlan::Update {
                table,
                assignments,
                predicate: selection,
            }),
            Statement::Delete { table, selection } => Ok(LogicalPlan::Delete {
                table,
                predicate: selection,
            }),
            Statement::Select {
                columns,
                table,
                join,
                selection,
                group_by,
                order_by,
                limit,
                offset,
            } => {
                let mut plan = LogicalPlan::TableScan { table: table.clone() };
                if let Some(join) = join {
                    plan = LogicalPlan::Join {
                        left: Box::new(plan),
                        right: Box::new(LogicalPlan::TableScan { table: join.table.clone() }),
                        condition: join.condition,
                        left_table: table,
                        right_table: join.table,
                    };
                }

                let with_filter = match selection {
                    Some(pred) => LogicalPlan::Filter { input: Box::new(plan), predicate: pred },
                    None => plan,
                };

                let has_aggregates =
                    columns.iter().any(|c| matches!(c, SelectItem::Aggregate { .. }));
                let with_project = if has_aggregates || !group_by.is_empty() {
                    Self::lower_aggregate(with_filter, columns, group_by)?
                } else {
                    Self::lower_project(with_filter, columns)?
                };

                let with_sort = if order_by.is_empty() {
                    with_project
                } else {
                    LogicalPlan::Sort {
                        input: Box::new(with_project),
                        order_by: order_by
                            .into_iter()
                            .map(|o| OrderByExpr { column: o.column, direction: o.direction })
                            .collect(),
                    }
                };

                Ok(if limit.is_some() || offset.is_some() {
                    LogicalPlan::Limit { input: Box::new(with_sort), limit, offset }
                } else {
                    with_sort
                })
            }
        }
    }

    fn lower_project(input: LogicalPlan, columns: Vec<SelectItem>) -> BeeDbResult<LogicalPlan> {
        if columns.iter().any(|c| matches!(c, SelectItem::Wildcard)) {
            return Ok(LogicalPlan::Project { input: Box::new(input), columns: vec!["*".into()] });
        }
        let names = columns
            .into_iter()
            .map(|c| match c {
                SelectItem::Column(name) => Ok(name),
                SelectItem::Wildcard => unreachable!(),
                SelectItem::Aggregate { .. } => {
                    Err(BeeDbError::Planner("aggregate without GROUP BY".into()))
                }
            })
            .collect::<BeeDbResult<Vec<_>>>()?;
        Ok(LogicalPlan::Project { input: Box::new(input), columns: names })
    }

    fn lower_aggregate(
        input: LogicalPlan,
        columns: Vec<SelectItem>,
        group_by: Vec<String>,
    ) -> BeeDbResult<LogicalPlan> {
        let mut aggregates = Vec::new();
        for item in &columns {
            match item {
                SelectItem::Wildcard => {
                    return Err(BeeDbError::Planner("SELECT * not allowed with GROUP BY".into()))
                }
                SelectItem::Column(name) => {
                    if !group_by.iter().any(|g| g.eq_ignore_ascii_case(name)) {
                        return Err(BeeDbError::Planner(format!(
                            "column '{name}' must appear in GROUP BY or be aggregated"
                        )));
                    }
                }
                SelectItem::Aggregate { func, column } => aggregates.push((*func, column.clone())),
            }
        }
        Ok(LogicalPlan::Aggregate { input: Box::new(input), group_by, aggregates })
    }

    fn bind(plan: LogicalPlan, ctx: &mut PlanningContext) -> BeeDbResult<PhysicalPlan> {
        match plan {
            LogicalPlan::TableScan { table } => {
                let t = ctx.table(&table)?;
                Ok(PhysicalPlan::SeqScan { table_id: t.id, schema: t.schema.names() })
            }
            LogicalPlan::Filter { input, predicate } => {
                let input_physical = Self::bind(*input, ctx)?;
                let resolved = Self::bind_expr(&input_physical, predicate)?;

                if let PhysicalPlan::SeqScan { table_id, schema } = &input_physical {
                    if let Some((index_name, idx_pred)) =
                        Self::find_best_index(ctx, table_id, &resolved)
                    {
                        let idx_scan = PhysicalPlan::IndexScan {
                            table_id: *table_id,
                            index_name,
                            predicate: idx_pred,
                            schema: schema.clone(),
                        };
                        return Ok(PhysicalPlan::Filter {
                            input: Box::new(idx_scan),
                            predicate: resolved,
                        });
                    }
                }

                Ok(PhysicalPlan::Filter { input: Box::new(input_physical), predicate: resolved })
            }
            LogicalPlan::Project { input, columns } => {
                let input_physical = Self::bind(*input, ctx)?;
                let schema = Self::output_schema(&input_physical);

                if columns.len() == 1 && columns[0] == "*" {
                    let cols: Vec<(String, ColumnId)> = schema
                        .iter()
                        .enumerate()
                        .map(|(i, name)| (name.clone(), ColumnId(i as u16)))
                        .collect();
                    return Ok(PhysicalPlan::Project { input: Box::new(input_physical), columns: cols });
                }

                let cols = columns
                    .into_iter()
                    .map(|name| {
                        let idx = Self::find_column_in_schema(&schema, None, &name)?;
                        Ok((name, ColumnId(idx as u16)))
                    })
                    .collect::<BeeDbResult<Vec<_>>>()?;

                Ok(PhysicalPlan::Project { input: Box::new(input_physical), columns: cols })
            }
            LogicalPlan::Aggregate { input, group_by, aggregates } => {
                let input_physical = Self::bind(*input, ctx)?;
                let schema = Self::output_schema(&input_physical);

                let group_ids = group_by
                    .iter()
                    .map(|name| {
                        Self::find_column_in_schema(&schema, None, name).map(|i| ColumnId(i as u16))
                    })
                    .collect::<BeeDbResult<Vec<_>>>()?;

                let resolved_aggs = aggregates
                    .iter()
                    .map(|(func, col)| {
                        let col_id = col
                            .as_ref()
                            .map(|name| {
                                Self::find_column_in_schema(&schema, None, name)
                                    .map(|i| ColumnId(i as u16))
                            })
                            .transpose()?;
                        Ok((*func, col_id))
                    })
                    .collect::<BeeDbResult<Vec<_>>>()?;

                let mut out_schema = group_by;
                for (func, col) in &aggregates {
                    out_schema.push(aggregate_label(*func, col.as_deref()));
                }

                Ok(PhysicalPlan::Aggregate {
                    input: Box::new(input_physical),
                    group_by: group_ids,
                    aggregates: resolved_aggs,
                    schema: out_schema,
                })
            }
            LogicalPlan::Insert { table, columns, rows } => {
                let t = ctx.table(&table)?;
                let schema_len = t.schema.columns.len();
                let column_types = t.schema.column_types();
                let target_order: Vec<ColumnId> = match &columns {
                    Some(names) => names
                        .iter()
                        .map(|name| {
                            t.schema.column_index(name).ok_or_else(|| {
                                BeeDbError::Planner(format!("unknown column '{name}'"))
                            })
                        })
                        .collect::<BeeDbResult<Vec<_>>>()?,
                    None => (0..schema_len as u16).map(ColumnId).collect(),
                };

                let mut resolved_rows = Vec::with_capacity(rows.len());
                for row in rows {
                    if row.len() != target_order.len() {
                        return Err(BeeDbError::Planner(format!(
                            "INSERT expects {} values, got {}",
                            target_order.len(),
                            row.len()
                        )));
                    }
                    let mut slots: Vec<Option<ResolvedExpr>> = vec![None; schema_len];
                    for (expr, col_id) in row.into_iter().zip(&target_order) {
                        let resolved = Self::bind_expr_seq(expr)?;
                        let coerced = Self::coerce_literal_to_type(resolved, column_types[col_id.0 as usize]);
                        slots[col_id.0 as usize] = Some(coerced);
                    }
                    resolved_rows.push(
                        slots
                            .into_iter()
                            .map(|slot| slot.unwrap_or(ResolvedExpr::Literal(Value::Null)))
                            .collect(),
                    );
                }

                Ok(PhysicalPlan::Insert { table_id: t.id, rows: resolved_rows })
            }
            LogicalPlan::Update { table, assignments, predicate } => {
                let t = ctx.table(&table)?;
                let schema_names = t.schema.names();
                let assigns = assignments
                    .into_iter()
                    .map(|(name, e)| {
                        let idx = t.schema.column_index(&name).ok_or_else(|| {
                            BeeDbError::Planner(format!("unknown column '{name}'"))
                        })?;
                        let re = Self::bind_expr_with_schema(&schema_names, e)?;
                        let target = *t.schema.column_type(idx).expect("column_index already validated this ordinal");
                        Ok((idx, Self::coerce_literal_to_type(re, target)))
                    })
                    .collect::<BeeDbResult<Vec<_>>>()?;
                let pred = predicate
                    .map(|p| Self::bind_expr_with_schema(&schema_names, p))
                    .transpose()?;
                Ok(PhysicalPlan::Update { table_id: t.id, assignments: assigns, predicate: pred })
            }
            LogicalPlan::Delete { table, predicate } => {
                let t = ctx.table(&table)?;
                let schema_names = t.schema.names();
                let pred = predicate
                    .map(|p| Self::bind_expr_with_schema(&schema_names, p))
                    .transpose()?;
                Ok(PhysicalPlan::Delete { table_id: t.id, predicate: pred })
            }
            LogicalPlan::Sort { input, order_by } => {
                let input_physical = Self::bind(*input, ctx)?;
                let schema = Self::output_schema(&input_physical);
                let resolved_order_by = order_by
                    .into_iter()
                    .map(|order_expr| {
                        let col_id = Self::find_column_in_schema(&schema, None, &order_expr.column)?;
                        Ok(ResolvedOrderByExpr {
                            column_id: ColumnId(col_id as u16),
                            direction: order_expr.direction,
                        })
                    })
                    .collect::<BeeDbResult<Vec<_>>>()?;
                Ok(PhysicalPlan::Sort { input: Box::new(input_physical), order_by: resolved_order_by })
            }
            LogicalPlan::Limit { input, limit, offset } => {
                let input_physical = Self::bind(*input, ctx)?;
                Ok(PhysicalPlan::Limit { input: Box::new(input_physical), limit, offset })
            }
            LogicalPlan::Join { left, right, condition, left_table, right_table } => {
                let (left_physical, right_physical, combined_schema, resolved_condition) =
                    Self::bind_join_sides(*left, *right, condition, &left_table, &right_table, ctx)?;
                Ok(PhysicalPlan::NestedLoopJoin {
                    left: Box::new(left_physical),
                    right: Box::new(right_physical),
                    condition: resolved_condition,
                    schema: combined_schema,
                })
            }
            LogicalPlan::HashJoin { left, right, condition, left_table, right_table } => {
                let (left_physical, right_physical, combined_schema, resolved_condition) =
                    Self::bind_join_sides(*left, *right, condition, &left_table, &right_table, ctx)?;
                Ok(PhysicalPlan::HashJoin {
                    left: Box::new(left_physical),
                    right: Box::new(right_physical),
                    condition: resolved_condition,
                    schema: combined_schema,
                })
            }
        }
    }

    /// Shared binding for `Join`/`HashJoin`: binds both sides, qualifies and
    /// concatenates their schemas (left columns first), and resolves the
    /// join condition against the combined schema.
    fn bind_join_sides(
        left: LogicalPlan,
        right: LogicalPlan,
        condition: Expr,
        left_table: &str,
        right_table: &str,
        ctx: &mut PlanningContext,
    ) -> BeeDbResult<(PhysicalPlan, PhysicalPlan, Vec<String>, ResolvedExpr)> {
        let left_physical = Self::bind(left, ctx)?;
        let right_physical = Self::bind(right, ctx)?;

        let left_schema = Self::output_schema(&left_physical);
        let right_schema = Self::output_schema(&right_physical);

        let combined_schema: Vec<String> = left_schema
            .iter()
            .map(|col| qualify(col, left_table))
            .chain(right_schema.iter().map(|col| qualify(col, right_table)))
            .collect();

        let resolved_condition = Self::bind_expr_with_schema(&combined_schema, condition)?;

        Ok((left_physical, right_physical, combined_schema, resolved_condition))
    }

    fn output_schema(plan: &PhysicalPlan) -> Vec<String> {
        match plan {
            PhysicalPlan::SeqScan { schema, .. }
            | PhysicalPlan::IndexScan { schema, .. }
            | PhysicalPlan::NestedLoopJoin { schema, .. }
            | PhysicalPlan::HashJoin { schema, .. }
            | PhysicalPlan::Aggregate { schema, .. } => schema.clone(),
            PhysicalPlan::Filter { input, .. }
            | PhysicalPlan::Project { input, .. }
            | PhysicalPlan::Sort { input, .. }
            | PhysicalPlan::Limit { input, .. } => Self::output_schema(input),
            PhysicalPlan::Insert { .. } | PhysicalPlan::Update { .. } | PhysicalPlan::Delete { .. } => {
                vec![]
            }
        }
    }

    fn bind_expr(input: &PhysicalPlan, e: Expr) -> BeeDbResult<ResolvedExpr> {
        Self::bind_expr_with_schema(&Self::output_schema(input), e)
    }

    /// Widen an integer literal to match its target column's declared type.
    ///
    /// `map_value` always parses a numeric literal as the narrowest type
    /// that holds it, so `1` becomes `Value::Int32(1)` even when assigned
    /// into a `BIGINT`/`DOUBLE` column. Only literals need this: computed
    /// expressions and column references already carry the storage type of
    /// whatever produced them.
    fn coerce_literal_to_type(expr: ResolvedExpr, target: SqlType) -> ResolvedExpr {
        match expr {
            ResolvedExpr::Literal(Value::Int32(v)) => match target {
                SqlType::Int64 => ResolvedExpr::Literal(Value::Int64(v as i64)),
                SqlType::Double => ResolvedExpr::Literal(Value::Double(v as f64)),
                _ => ResolvedExpr::Literal(Value::Int32(v)),
            },
            ResolvedExpr::Literal(Value::Int64(v)) if target == SqlType::Double => {
                ResolvedExpr::Literal(Value::Double(v as f64))
            }
            other => other,
        }
    }

    fn bind_expr_seq(e: Expr) -> BeeDbResult<ResolvedExpr> {
        Self::bind_expr_with_schema(&[], e)
    }

    fn bind_expr_with_schema(schema: &[String], e: Expr) -> BeeDbResult<ResolvedExpr> {
        match e {
            Expr::Literal(v) => Ok(ResolvedExpr::Literal(v)),
            Expr::Column { table, name } => {
                let idx = Self::find_column_in_schema(schema, table.as_deref(), &name)?;
                Ok(ResolvedExpr::Column(ColumnId(idx as u16)))
            }
            Expr::Unary { op, expr } => Ok(ResolvedExpr::Unary {
                op,
                expr: Box::new(Self::bind_expr_with_schema(schema, *expr)?),
            }),
            Expr::Binary { left, op, right } => Ok(ResolvedExpr::Binary {
                left: Box::new(Self::bind_expr_with_schema(schema, *left)?),
                op,
                right: Box::new(Self::bind_expr_with_schema(schema, *right)?),
            }),
        }
    }

    /// Find column in schema, supporting both qualified and unqualified references.
    ///
    /// Schema entries may be simple ("id") or qualified ("users.id").
    fn find_column_in_schema(
        schema: &[String],
        table: Option<&str>,
        name: &str,
    ) -> BeeDbResult<usize> {
        if let Some(qualifier) = table {
            let full_name = format!("{qualifier}.{name}");
            schema
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&full_name))
                .ok_or_else(|| BeeDbError::Planner(format!("unknown column '{qualifier}.{name}'")))
        } else {
            if let Some(idx) = schema.iter().position(|c| c.eq_ignore_ascii_case(name)) {
                return Ok(idx);
            }
            let suffix = format!(".{}", name.to_lowercase());
            let matches: Vec<usize> = schema
                .iter()
                .enumerate()
                .filter(|(_, c)| c.to_lowercase().ends_with(&suffix))
                .map(|(i, _)| i)
                .collect();
            match matches.len() {
                0 => Err(BeeDbError::Planner(format!("unknown column '{name}'"))),
                1 => Ok(matches[0]),
                _ => Err(BeeDbError::Planner(format!(
                    "ambiguous column '{name}' (exists in multiple tables)"
                ))),
            }
        }
    }

    /// Try to extract a simple index predicate from an expression (single-column).
    fn try_extract_index_predicate(pred: &ResolvedExpr) -> Option<(ColumnId, IndexPredicate)> {
        if let ResolvedExpr::Binary { left, op, right } = pred {
            if let (ResolvedExpr::Column(col), ResolvedExpr::Literal(val)) = (&**left, &**right) {
                return Some(match op {
                    BinaryOp::Eq => (
                        *col,
                        IndexPredicate::Eq { col: *col, value: ResolvedExpr::Literal(val.clone()) },
                    ),
                    BinaryOp::Lt | BinaryOp::Le => (
                        *col,
                        IndexPredicate::Range {
                            col: *col,
                            low: ResolvedExpr::Literal(Value::Int64(i64::MIN)),
                            high: ResolvedExpr::Literal(val.clone()),
                        },
                    ),
                    BinaryOp::Gt | BinaryOp::Ge => (
                        *col,
                        IndexPredicate::Range {
                            col: *col,
                            low: ResolvedExpr::Literal(val.clone()),
                            high: ResolvedExpr::Literal(Value::Int64(i64::MAX)),
                        },
                    ),
                    _ => return None,
                });
            }
        }
        None
    }

    /// Extract all equality predicates from a conjunction (AND tree).
    fn extract_equality_predicates(pred: &ResolvedExpr) -> Vec<(ColumnId, ResolvedExpr)> {
        let mut result = Vec::new();
        Self::collect_equality_predicates(pred, &mut result);
        result
    }

    fn collect_equality_predicates(pred: &ResolvedExpr, out: &mut Vec<(ColumnId, ResolvedExpr)>) {
        match pred {
            ResolvedExpr::Binary { left, op: BinaryOp::And, right } => {
                Self::collect_equality_predicates(left, out);
                Self::collect_equality_predicates(right, out);
            }
            ResolvedExpr::Binary { left, op: BinaryOp::Eq, right } => {
                if let (ResolvedExpr::Column(col), ResolvedExpr::Literal(_)) = (&**left, &**right) {
                    out.push((*col, (**right).clone()));
                } else if let (ResolvedExpr::Literal(_), ResolvedExpr::Column(col)) =
                    (&**left, &**right)
                {
                    out.push((*col, (**left).clone()));
                }
            }
            _ => {}
        }
    }

    fn is_pure_equality_predicate(pred: &ResolvedExpr) -> bool {
        match pred {
            ResolvedExpr::Binary { op: BinaryOp::Eq, .. } => true,
            ResolvedExpr::Binary { op: BinaryOp::And, left, right } => {
                Self::is_pure_equality_predicate(left) && Self::is_pure_equality_predicate(right)
            }
            _ => false,
        }
    }

    /// Find the best index for a predicate, supporting composite keys.
    ///
    /// Ranking: full match > prefix match; range predicates require BTree.
    fn find_best_index(
        ctx: &PlanningContext,
        table_id: &TableId,
        pred: &ResolvedExpr,
    ) -> Option<(String, IndexPredicate)> {
        let table_meta = ctx.catalog.table_by_id(*table_id).ok()?;
        let indexes = table_meta.indexes();
        if indexes.is_empty() {
            return None;
        }

        let is_equality_only = Self::is_pure_equality_predicate(pred);
        let eq_preds = Self::extract_equality_predicates(pred);

        if eq_preds.is_empty() {
            if let Some((col, range_pred)) = Self::try_extract_index_predicate(pred) {
                for idx in indexes {
                    if idx.columns.len() == 1
                        && idx.columns[0] == col
                        && matches!(idx.kind, IndexKind::BTree)
                    {
                        return Some((idx.name.clone(), range_pred));
                    }
                }
            }
            return None;
        }

        let pred_map: std::collections::HashMap<ColumnId, ResolvedExpr> = eq_preds.into_iter().collect();

        let mut best_match: Option<(&catalog::IndexMeta, usize)> = None;
        for idx in indexes {
            if !is_equality_only && !matches!(idx.kind, IndexKind::BTree) {
                continue; // Range requires BTree
            }
            let mut matched_count = 0;
            for &col in &idx.columns {
                if pred_map.contains_key(&col) {
                    matched_count += 1;
                } else {
                    break; // prefix match broken
                }
            }
            if matched_count > 0 {
                let is_better = match best_match {
                    None => true,
                    Some((_, best_count)) => matched_count > best_count,
                };
                if is_better {
                    best_match = Some((idx, matched_count));
                }
            }
        }

        let (best_idx, matched_count) = best_match?;
        let columns: Vec<ColumnId> = best_idx.columns[..matched_count].to_vec();
        let values: Vec<ResolvedExpr> =
            columns.iter().map(|col| pred_map.get(col).cloned().unwrap()).collect();

        let predicate = if matched_count == 1 {
            IndexPredicate::Eq { col: columns[0], value: values.into_iter().next().unwrap() }
        } else {
            IndexPredicate::CompositeEq { columns, values }
        };

        Some((best_idx.name.clone(), predicate))
    }
}

fn qualify(col: &str, table: &str) -> String {
    if col.contains('.') {
        col.to_string()
    } else {
        format!("{table}.{col}")
    }
}

fn aggregate_label(func: AggFunc, column: Option<&str>) -> String {
    let fname = match func {
        AggFunc::Count => "count",
        AggFunc::Sum => "sum",
        AggFunc::Avg => "avg",
        AggFunc::Min => "min",
        AggFunc::Max => "max",
    };
    match column {
        Some(c) => format!("{fname}_{c}"),
        None => fname.to_string(),
    }
}

/// Pretty-print a logical plan for debugging.
pub fn explain_logical(p: &LogicalPlan) -> String {
    match p {
        LogicalPlan::TableScan { table } => format!("TableScan table={table}"),
        LogicalPlan::Filter { input, predicate } => {
            format!("Filter [{predicate:?}]\n  {}", indent(&explain_logical(input)))
        }
        LogicalPlan::Project { input, columns } => {
            format!("Project cols={columns:?}\n  {}", indent(&explain_logical(input)))
        }
        LogicalPlan::Aggregate { input, group_by, aggregates } => format!(
            "Aggregate group_by={group_by:?} aggs={aggregates:?}\n  {}",
            indent(&explain_logical(input))
        ),
        LogicalPlan::Insert { table, rows, .. } => {
            format!("Insert table={table} rows={}", rows.len())
        }
        LogicalPlan::Update { table, assignments, predicate } => {
            format!("Update table={table} assigns={assignments:?} pred={predicate:?}")
        }
        LogicalPlan::Delete { table, predicate } => format!("Delete table={table} pred={predicate:?}"),
        LogicalPlan::Sort { input, order_by } => {
            format!("Sort {order_by:?}\n  {}", indent(&explain_logical(input)))
        }
        LogicalPlan::Limit { input, limit, offset } => format!(
            "Limit limit={limit:?} offset={offset:?}\n  {}",
            indent(&explain_logical(input))
        ),
        LogicalPlan::Join { left, right, condition, left_table, right_table } => format!(
            "Join on={condition:?} ({left_table} x {right_table})\n  left: {}\n  right: {}",
            indent(&explain_logical(left)),
            indent(&explain_logical(right))
        ),
        LogicalPlan::HashJoin { left, right, condition, left_table, right_table } => format!(
            "HashJoin on={condition:?} ({left_table} x {right_table})\n  left: {}\n  right: {}",
            indent(&explain_logical(left)),
            indent(&explain_logical(right))
        ),
    }
}

/// Pretty-print a physical plan for debugging.
pub fn explain_physical(p: &PhysicalPlan) -> String {
    match p {
        PhysicalPlan::SeqScan { table_id, .. } => format!("SeqScan table_id={}", table_id.0),
        PhysicalPlan::IndexScan { table_id, index_name, predicate, .. } => format!(
            "IndexScan table_id={} index={index_name} pred={predicate:?}",
            table_id.0
        ),
        PhysicalPlan::Filter { input, predicate } => {
            format!("Filter [{predicate:?}]\n  {}", indent(&explain_physical(input)))
        }
        PhysicalPlan::Project { input, columns } => {
            format!("Project {columns:?}\n  {}", indent(&explain_physical(input)))
        }
        PhysicalPlan::Aggregate { input, group_by, aggregates, .. } => format!(
            "Aggregate group_by={group_by:?} aggs={aggregates:?}\n  {}",
            indent(&explain_physical(input))
        ),
        PhysicalPlan::Insert { table_id, rows } => {
            format!("Insert table_id={} rows={}", table_id.0, rows.len())
        }
        PhysicalPlan::Update { table_id, assignments, predicate } => {
            format!("Update table_id={} assigns={assignments:?} pred={predicate:?}", table_id.0)
        }
        PhysicalPlan::Delete { table_id, predicate } => {
            format!("Delete table_id={} pred={predicate:?}", table_id.0)
        }
        PhysicalPlan::Sort { input, order_by } => {
            format!("Sort {order_by:?}\n  {}", indent(&explain_physical(input)))
        }
        PhysicalPlan::Limit { input, limit, offset } => format!(
            "Limit limit={limit:?} offset={offset:?}\n  {}",
            indent(&explain_physical(input))
        ),
        PhysicalPlan::NestedLoopJoin { left, right, condition, schema } => format!(
            "NestedLoopJoin on={condition:?} schema={schema:?}\n  left: {}\n  right: {}",
            indent(&explain_physical(left)),
            indent(&explain_physical(right))
        ),
        PhysicalPlan::HashJoin { left, right, condition, schema } => format!(
            "HashJoin on={condition:?} schema={schema:?}\n  left: {}\n  right: {}",
            indent(&explain_physical(left)),
            indent(&explain_physical(right))
        ),
    }
}

fn indent(s: &str) -> String {
    s.lines().map(|l| format!("  {l}")).collect::<Vec<_>>().join("\n")
}
