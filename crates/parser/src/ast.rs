use expr::Expr;
use types::SqlType;

/// The internal AST the planner lowers from. Scoped to the query surface
/// named in spec §6: SELECT/INSERT/UPDATE/DELETE, CREATE TABLE, CREATE
/// [UNIQUE] INDEX, and BEGIN/COMMIT/ABORT — no DROP statements, no SQL
/// standard coverage beyond this.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: Option<Vec<String>>,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
        unique: bool,
        kind: IndexKind,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        /// One inner `Vec<Expr>` per row; `VALUES (1,'a'),(2,'b')` produces two.
        rows: Vec<Vec<Expr>>,
    },
    Select {
        columns: Vec<SelectItem>,
        table: String,
        join: Option<Join>,
        selection: Option<Expr>,
        group_by: Vec<String>,
        order_by: Vec<OrderByExpr>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        selection: Option<Expr>,
    },
    Delete {
        table: String,
        selection: Option<Expr>,
    },
    Explain {
        query: Box<Statement>,
        analyze: bool,
    },
    Begin,
    Commit,
    Abort,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub table: String,
    pub condition: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    Hash,
    BTree,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column(String),
    /// `column: None` is only valid for `Count` (i.e. `COUNT(*)`).
    Aggregate { func: AggFunc, column: Option<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub direction: SortDirection,
}
