//! Rule-based logical plan optimizer.
//!
//! Runs between `Planner::to_logical` and `Planner::plan`: takes the
//! name-based [`LogicalPlan`] the planner produces, rewrites it with a fixed
//! set of local rules run to a per-rule fixpoint, and hands back a
//! `LogicalPlan` of the same shape for the planner's bind phase to resolve
//! into a physical plan.
//!
//! The rewrites operate over [`PlanView`], an arena of plan nodes plus
//! parent/child index tables — the Rust analogue of a tagged-tree plan
//! representation without virtual dispatch. Rules mutate `PlanView`
//! structurally; `optimize` reconstitutes a `LogicalPlan` from the view once
//! every rule has quiesced.


use catalog::{Catalog, IndexKind};
use common::{BeeDbResult, OptimizationConfig};
use expr::{BinaryOp, Expr};
use parser::AggFunc;
use planner::{LogicalPlan, OrderByExpr};
use types::Value;

pub type NodeId = usize;

/// A plan node inside a [`PlanView`]. Mirrors [`LogicalPlan`]'s variants plus
/// three that only ever exist transiently during optimization: `CrossProduct`
/// (the un-joined product a future multi-table FROM would produce),
/// `IndexScan` (a `TableScan` a Selection's predicate has been matched
/// against an index), and `HashJoin` (a `Join` whose predicate is pure
/// equality between the two sides).
#[derive(Clone, Debug, PartialEq)]
pub enum PlanNode {
    TableScan { table: String },
    IndexScan { table: String, predicate: Expr },
    Filter { predicate: Expr },
    Project { columns: Vec<String> },
    Aggregate { group_by: Vec<String>, aggregates: Vec<(AggFunc, Option<String>)> },
    Sort { order_by: Vec<OrderByExpr> },
    Limit { limit: Option<u64>, offset: Option<u64> },
    Insert { table: String, columns: Option<Vec<String>>, rows: Vec<Vec<Expr>> },
    Update { table: String, assignments: Vec<(String, Expr)>, predicate: Option<Expr> },
    Delete { table: String, predicate: Option<Expr> },
    Join { condition: Expr, left_table: String, right_table: String },
    HashJoin { condition: Expr, left_table: String, right_table: String },
    CrossProduct { left_table: String, right_table: String },
}

/// Arena of plan nodes with parent/child index tables (spec §4.6's
/// `PlanView`: "two maps: node -> parent, and node -> [left, right]").
#[derive(Clone, Debug)]
pub struct PlanView {
    nodes: Vec<PlanNode>,
    parent: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    root: NodeId,
}

impl PlanView {
    pub fn from_logical(plan: &LogicalPlan) -> Self {
        let mut view = PlanView { nodes: Vec::new(), parent: Vec::new(), children: Vec::new(), root: 0 };
        view.root = view.build(plan);
        view
    }

    pub fn into_logical(&self) -> LogicalPlan {
        self.rebuild(self.root)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut PlanNode {
        &mut self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a fresh, parentless node with the given children (their parent
    /// pointers are wired to the new node).
    pub fn push(&mut self, node: PlanNode, children: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.parent.push(None);
        for &c in &children {
            self.parent[c] = Some(id);
        }
        self.children.push(children);
        id
    }

    fn build(&mut self, plan: &LogicalPlan) -> NodeId {
        match plan {
            LogicalPlan::TableScan { table } => self.push(PlanNode::TableScan { table: table.clone() }, vec![]),
            LogicalPlan::Filter { input, predicate } => {
                let c = self.build(input);
                self.push(PlanNode::Filter { predicate: predicate.clone() }, vec![c])
            }
            LogicalPlan::Project { input, columns } => {
                let c = self.build(input);
                self.push(PlanNode::Project { columns: columns.clone() }, vec![c])
            }
            LogicalPlan::Aggregate { input, group_by, aggregates } => {
                let c = self.build(input);
                self.push(
                    PlanNode::Aggregate { group_by: group_by.clone(), aggregates: aggregates.clone() },
                    vec![c],
                )
            }
            LogicalPlan::Sort { input, order_by } => {
                let c = self.build(input);
                self.push(PlanNode::Sort { order_by: order_by.clone() }, vec![c])
            }
            LogicalPlan::Limit { input, limit, offset } => {
                let c = self.build(input);
                self.push(PlanNode::Limit { limit: *limit, offset: *offset }, vec![c])
            }
            LogicalPlan::Insert { table, columns, rows } => self.push(
                PlanNode::Insert { table: table.clone(), columns: columns.clone(), rows: rows.clone() },
                vec![],
            ),
            LogicalPlan::Update { table, assignments, predicate } => self.push(
                PlanNode::Update {
                    table: table.clone(),
                    assignments: assignments.clone(),
                    predicate: predicate.clone(),
                },
                vec![],
            ),
            LogicalPlan::Delete { table, predicate } => {
                self.push(PlanNode::Delete { table: table.clone(), predicate: predicate.clone() }, vec![])
            }
            LogicalPlan::Join { left, right, condition, left_table, right_table } => {
                let l = self.build(left);
                let r = self.build(right);
                self.push(
                    PlanNode::Join {
                        condition: condition.clone(),
                        left_table: left_table.clone(),
                        right_table: right_table.clone(),
                    },
                    vec![l, r],
                )
            }
            // Never produced by the planner (it only lowers parsed joins to
            // plain `Join`), but kept for symmetry with `rebuild`.
            LogicalPlan::HashJoin { left, right, condition, left_table, right_table } => {
                let l = self.build(left);
                let r = self.build(right);
                self.push(
                    PlanNode::HashJoin {
                        condition: condition.clone(),
                        left_table: left_table.clone(),
                        right_table: right_table.clone(),
                    },
                    vec![l, r],
                )
            }
        }
    }

    fn rebuild(&self, id: NodeId) -> LogicalPlan {
        match &self.nodes[id] {
            PlanNode::TableScan { table } => LogicalPlan::TableScan { table: table.clone() },
            // Bind already performs access-method selection against the
            // catalog (see planner::Planner::bind / find_best_index); an
            // IndexScan surviving here degrades back to a plain Filter over
            // a TableScan and bind re-derives the same index choice.
            PlanNode::IndexScan { table, predicate } => LogicalPlan::Filter {
                input: Box::new(LogicalPlan::TableScan { table: table.clone() }),
                predicate: predicate.clone(),
            },
            PlanNode::Filter { predicate } => {
                LogicalPlan::Filter { input: Box::new(self.rebuild(self.children[id][0])), predicate: predicate.clone() }
            }
            PlanNode::Project { columns } => {
                LogicalPlan::Project { input: Box::new(self.rebuild(self.children[id][0])), columns: columns.clone() }
            }
            PlanNode::Aggregate { group_by, aggregates } => LogicalPlan::Aggregate {
                input: Box::new(self.rebuild(self.children[id][0])),
                group_by: group_by.clone(),
                aggregates: aggregates.clone(),
            },
            PlanNode::Sort { order_by } => {
                LogicalPlan::Sort { input: Box::new(self.rebuild(self.children[id][0])), order_by: order_by.clone() }
            }
            PlanNode::Limit { limit, offset } => LogicalPlan::Limit {
                input: Box::new(self.rebuild(self.children[id][0])),
                limit: *limit,
                offset: *offset,
            },
            PlanNode::Insert { table, columns, rows } => {
                LogicalPlan::Insert { table: table.clone(), columns: columns.clone(), rows: rows.clone() }
            }
            PlanNode::Update { table, assignments, predicate } => LogicalPlan::Update {
                table: table.clone(),
                assignments: assignments.clone(),
                predicate: predicate.clone(),
            },
            PlanNode::Delete { table, predicate } => {
                LogicalPlan::Delete { table: table.clone(), predicate: predicate.clone() }
            }
            PlanNode::Join { condition, left_table, right_table } => {
                let kids = &self.children[id];
                LogicalPlan::Join {
                    left: Box::new(self.rebuild(kids[0])),
                    right: Box::new(self.rebuild(kids[1])),
                    condition: condition.clone(),
                    left_table: left_table.clone(),
                    right_table: right_table.clone(),
                }
            }
            PlanNode::HashJoin { condition, left_table, right_table } => {
                let kids = &self.children[id];
                LogicalPlan::HashJoin {
                    left: Box::new(self.rebuild(kids[0])),
                    right: Box::new(self.rebuild(kids[1])),
                    condition: condition.clone(),
                    left_table: left_table.clone(),
                    right_table: right_table.clone(),
                }
            }
            // Never produced by the planner today (its grammar has no
            // comma-joined FROM), but round-trips to a degenerate always-true
            // join so the rewrite stays total.
            PlanNode::CrossProduct { left_table, right_table } => {
                let kids = &self.children[id];
                LogicalPlan::Join {
                    left: Box::new(self.rebuild(kids[0])),
                    right: Box::new(self.rebuild(kids[1])),
                    condition: Expr::Literal(Value::Bool(true)),
                    left_table: left_table.clone(),
                    right_table: right_table.clone(),
                }
            }
        }
    }

    fn replace_in_place(&mut self, id: NodeId, node: PlanNode) {
        self.nodes[id] = node;
    }

    /// Repoint whatever references `old` (its parent's child slot, or the
    /// root) to `new` instead. `old` is left in the arena, unreferenced.
    fn replace_subtree(&mut self, old: NodeId, new: NodeId) {
        match self.parent[old] {
            Some(p) => {
                for slot in self.children[p].iter_mut() {
                    if *slot == old {
                        *slot = new;
                    }
                }
                self.parent[new] = Some(p);
            }
            None => {
                self.root = new;
                self.parent[new] = None;
            }
        }
    }

    /// Splice a unary node out of the tree, connecting its parent directly
    /// to its child.
    fn remove_unary(&mut self, id: NodeId) {
        let child = self.children[id][0];
        let parent = self.parent[id];
        self.parent[child] = parent;
        match parent {
            Some(p) => {
                for slot in self.children[p].iter_mut() {
                    if *slot == id {
                        *slot = child;
                    }
                }
            }
            None => self.root = child,
        }
    }

    /// Insert a detached unary node `new_node` between `child` and whatever
    /// `child`'s parent currently is.
    fn insert_unary_between(&mut self, child: NodeId, new_node: NodeId) {
        let parent = self.parent[child];
        self.children[new_node] = vec![child];
        self.parent[child] = Some(new_node);
        match parent {
            Some(p) => {
                for slot in self.children[p].iter_mut() {
                    if *slot == child {
                        *slot = new_node;
                    }
                }
                self.parent[new_node] = Some(p);
            }
            None => {
                self.root = new_node;
                self.parent[new_node] = None;
            }
        }
    }

    fn set_child(&mut self, id: NodeId, idx: usize, new_child: NodeId) {
        self.children[id][idx] = new_child;
        self.parent[new_child] = Some(id);
    }
}

/// Rewrite a logical plan to a fixpoint with the seven rules, in order.
/// Rules 1 (SwapOperands), 2 (CrossProductToJoin), 6 (MergeSelection) and 7
/// (RemoveProjection) always run; 3, 4 and 5 are gated by `config`.
pub fn optimize(plan: LogicalPlan, catalog: &Catalog, config: &OptimizationConfig) -> BeeDbResult<LogicalPlan> {
    if config.disable {
        return Ok(plan);
    }

    let mut view = PlanView::from_logical(&plan);

    run_to_fixpoint(&mut view, catalog, swap_operands);
    run_to_fixpoint(&mut view, catalog, cross_product_to_join);
    if config.index_scan {
        run_to_fixpoint(&mut view, catalog, index_scan_substitution);
    }
    if config.hash_join {
        run_to_fixpoint(&mut view, catalog, hash_join_substitution);
    }
    if config.predicate_push_down {
        run_to_fixpoint(&mut view, catalog, predicate_push_down);
    }
    run_to_fixpoint(&mut view, catalog, merge_selection);
    run_to_fixpoint(&mut view, catalog, remove_projection);

    Ok(view.into_logical())
}

fn run_to_fixpoint(view: &mut PlanView, catalog: &Catalog, rule: fn(&mut PlanView, &Catalog) -> bool) {
    while rule(view, catalog) {}
}

// --- Rule 1: SwapOperands -------------------------------------------------

fn swap_operands(view: &mut PlanView, _catalog: &Catalog) -> bool {
    let mut changed = false;
    for id in 0..view.len() {
        let rewritten = match view.node(id).clone() {
            PlanNode::Filter { predicate } => {
                let (p, c) = canonicalize_expr(&predicate);
                changed |= c;
                Some(PlanNode::Filter { predicate: p })
            }
            PlanNode::IndexScan { table, predicate } => {
                let (p, c) = canonicalize_expr(&predicate);
                changed |= c;
                Some(PlanNode::IndexScan { table, predicate: p })
            }
            PlanNode::Join { condition, left_table, right_table } => {
                let (p, c) = canonicalize_expr(&condition);
                changed |= c;
                Some(PlanNode::Join { condition: p, left_table, right_table })
            }
            PlanNode::HashJoin { condition, left_table, right_table } => {
                let (p, c) = canonicalize_expr(&condition);
                changed |= c;
                Some(PlanNode::HashJoin { condition: p, left_table, right_table })
            }
            _ => None,
        };
        if let Some(n) = rewritten {
            view.replace_in_place(id, n);
        }
    }
    changed
}

/// Canonicalize so attributes sit on the left and literals on the right,
/// flipping the comparison operator when a swap happens. Recurses into both
/// operands so it reaches every leaf of an AND/OR tree.
fn canonicalize_expr(expr: &Expr) -> (Expr, bool) {
    match expr {
        Expr::Binary { left, op, right } => {
            let (l, lc) = canonicalize_expr(left);
            let (r, rc) = canonicalize_expr(right);
            if matches!(l, Expr::Literal(_)) && matches!(r, Expr::Column { .. }) {
                if let Some(swapped) = op.swapped() {
                    return (Expr::Binary { left: Box::new(r), op: swapped, right: Box::new(l) }, true);
                }
            }
            (Expr::Binary { left: Box::new(l), op: *op, right: Box::new(r) }, lc || rc)
        }
        Expr::Unary { op, expr: inner } => {
            let (e, c) = canonicalize_expr(inner);
            (Expr::Unary { op: *op, expr: Box::new(e) }, c)
        }
        other => (other.clone(), false),
    }
}

// --- Rule 2: CrossProductToJoin --------------------------------------------

fn cross_product_to_join(view: &mut PlanView, catalog: &Catalog) -> bool {
    let cross_products: Vec<NodeId> = (0..view.len())
        .filter(|&id| matches!(view.node(id), PlanNode::CrossProduct { .. }))
        .collect();
    let selections: Vec<NodeId> = (0..view.len())
        .filter(|&id| matches!(view.node(id), PlanNode::Filter { predicate } if is_attribute_comparison(predicate)))
        .collect();

    for cp in cross_products {
        let (left_table, right_table) = match view.node(cp).clone() {
            PlanNode::CrossProduct { left_table, right_table } => (left_table, right_table),
            _ => unreachable!(),
        };
        let kids = view.children(cp).to_vec();
        let left_schema = match schema_of(view, kids[0], catalog) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let right_schema = match schema_of(view, kids[1], catalog) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for &sel in &selections {
            let predicate = match view.node(sel) {
                PlanNode::Filter { predicate } => predicate.clone(),
                _ => continue,
            };
            let (l, r) = match &predicate {
                Expr::Binary { left, right, .. } => (left.column_ref(), right.column_ref()),
                _ => continue,
            };
            let (Some(l), Some(r)) = (l, r) else { continue };
            let l_name = qualify_ref(l);
            let r_name = qualify_ref(r);
            let straddles = (schema_contains(&left_schema, &l_name) && schema_contains(&right_schema, &r_name))
                || (schema_contains(&right_schema, &l_name) && schema_contains(&left_schema, &r_name));
            if straddles {
                let join = view.push(
                    PlanNode::Join { condition: predicate, left_table, right_table },
                    kids.clone(),
                );
                view.replace_subtree(cp, join);
                view.remove_unary(sel);
                return true;
            }
        }
    }

    false
}

fn is_attribute_comparison(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary { left, op, right }
        if op.is_comparison() && left.column_ref().is_some() && right.column_ref().is_some())
}

fn qualify_ref((table, name): (Option<&str>, &str)) -> String {
    match table {
        Some(t) => format!("{t}.{name}"),
        None => name.to_string(),
    }
}

fn schema_contains(schema: &[String], name: &str) -> bool {
    if let Some((table, col)) = name.split_once('.') {
        let full = format!("{table}.{col}").to_lowercase();
        schema.iter().any(|c| c.to_lowercase() == full)
    } else {
        let needle = name.to_lowercase();
        schema.iter().any(|c| {
            let cl = c.to_lowercase();
            cl == needle || cl.ends_with(&format!(".{needle}"))
        })
    }
}

// --- Rule 3: IndexScanSubstitution ------------------------------------------

fn index_scan_substitution(view: &mut PlanView, catalog: &Catalog) -> bool {
    for id in 0..view.len() {
        let table = match view.node(id) {
            PlanNode::TableScan { table } => table.clone(),
            _ => continue,
        };
        let parent = match view.parent(id) {
            Some(p) => p,
            None => continue,
        };
        let predicate = match view.node(parent) {
            PlanNode::Filter { predicate } => predicate.clone(),
            _ => continue,
        };

        let (fragment, residual) = split_index_fragment(&table, &predicate, catalog);
        if let Some(fragment) = fragment {
            view.replace_in_place(id, PlanNode::IndexScan { table, predicate: fragment });
            match residual {
                Some(r) => view.replace_in_place(parent, PlanNode::Filter { predicate: r }),
                None => view.replace_subtree(parent, id),
            }
            return true;
        }
    }
    false
}

/// Split a (possibly conjunctive) predicate into the part that matches an
/// index on `table` and the residual that does not.
fn split_index_fragment(table: &str, pred: &Expr, catalog: &Catalog) -> (Option<Expr>, Option<Expr>) {
    if let Expr::Binary { left, op: BinaryOp::And, right } = pred {
        let (lf, lr) = split_index_fragment(table, left, catalog);
        let (rf, rr) = split_index_fragment(table, right, catalog);
        let fragment = and_of(lf, rf);
        let residual = and_of(lr, rr);
        return (fragment, residual);
    }

    if is_index_usable(table, pred, catalog) {
        (Some(pred.clone()), None)
    } else {
        (None, Some(pred.clone()))
    }
}

fn and_of(a: Option<Expr>, b: Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Expr::Binary { left: Box::new(a), op: BinaryOp::And, right: Box::new(b) }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn is_index_usable(table: &str, pred: &Expr, catalog: &Catalog) -> bool {
    let Expr::Binary { left, op, right } = pred else { return false };
    if !op.is_comparison() || matches!(op, BinaryOp::Ne) {
        return false;
    }
    let Expr::Column { name, .. } = &**left else { return false };
    if !matches!(**right, Expr::Literal(_)) {
        return false;
    }
    let Ok(meta) = catalog.table(table) else { return false };
    let Some(col_id) = meta.schema.column_index(name) else { return false };
    let is_range = matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge);
    meta.indexes().iter().any(|idx| {
        idx.columns.len() == 1
            && idx.columns[0] == col_id
            && (!is_range || matches!(idx.kind, IndexKind::BTree))
    })
}

// --- Rule 4: HashJoinSubstitution -------------------------------------------

fn hash_join_substitution(view: &mut PlanView, catalog: &Catalog) -> bool {
    for id in 0..view.len() {
        let (condition, left_table, right_table) = match view.node(id) {
            PlanNode::Join { condition, left_table, right_table } => {
                (condition.clone(), left_table.clone(), right_table.clone())
            }
            _ => continue,
        };
        let kids = view.children(id).to_vec();
        if kids.len() != 2 {
            continue;
        }
        if is_cross_side_equality(view, kids[0], kids[1], &condition, catalog) {
            view.replace_in_place(id, PlanNode::HashJoin { condition, left_table, right_table });
            return true;
        }
    }
    false
}

fn is_cross_side_equality(view: &PlanView, left: NodeId, right: NodeId, pred: &Expr, catalog: &Catalog) -> bool {
    let Expr::Binary { left: l, op: BinaryOp::Eq, right: r } = pred else { return false };
    let (Some(l_ref), Some(r_ref)) = (l.column_ref(), r.column_ref()) else { return false };
    let (Ok(left_schema), Ok(right_schema)) = (schema_of(view, left, catalog), schema_of(view, right, catalog)) else {
        return false;
    };
    let l_name = qualify_ref(l_ref);
    let r_name = qualify_ref(r_ref);
    (schema_contains(&left_schema, &l_name) && schema_contains(&right_schema, &r_name))
        || (schema_contains(&right_schema, &l_name) && schema_contains(&left_schema, &r_name))
}

// --- Rule 5: PredicatePushDown ----------------------------------------------

fn predicate_push_down(view: &mut PlanView, catalog: &Catalog) -> bool {
    for id in 0..view.len() {
        let predicate = match view.node(id) {
            PlanNode::Filter { predicate } => predicate.clone(),
            _ => continue,
        };
        let kids = view.children(id).to_vec();
        if kids.len() != 1 {
            continue;
        }
        let start = kids[0];
        let attrs = needed_attrs(&predicate);
        let Ok(start_schema) = schema_of(view, start, catalog) else { continue };
        if !provides_all(&start_schema, &attrs) {
            continue;
        }
        let Ok(target) = descend(view, start, &attrs, catalog) else { continue };
        if target != start {
            view.remove_unary(id);
            view.insert_unary_between(target, id);
            return true;
        }
    }
    false
}

fn descend(view: &PlanView, t: NodeId, attrs: &[(Option<String>, String)], catalog: &Catalog) -> BeeDbResult<NodeId> {
    let kids = view.children(t).to_vec();
    match kids.len() {
        0 => Ok(t),
        1 => {
            let child_schema = schema_of(view, kids[0], catalog)?;
            if provides_all(&child_schema, attrs) {
                descend(view, kids[0], attrs, catalog)
            } else {
                Ok(t)
            }
        }
        2 => {
            let left_schema = schema_of(view, kids[0], catalog)?;
            if provides_all(&left_schema, attrs) {
                return descend(view, kids[0], attrs, catalog);
            }
            let right_schema = schema_of(view, kids[1], catalog)?;
            if provides_all(&right_schema, attrs) {
                return descend(view, kids[1], attrs, catalog);
            }
            Ok(t)
        }
        _ => Ok(t),
    }
}

fn needed_attrs(expr: &Expr) -> Vec<(Option<String>, String)> {
    let mut out = Vec::new();
    collect_attrs(expr, &mut out);
    out
}

fn collect_attrs(expr: &Expr, out: &mut Vec<(Option<String>, String)>) {
    match expr {
        Expr::Column { table, name } => out.push((table.clone(), name.clone())),
        Expr::Unary { expr, .. } => collect_attrs(expr, out),
        Expr::Binary { left, right, .. } => {
            collect_attrs(left, out);
            collect_attrs(right, out);
        }
        Expr::Literal(_) => {}
    }
}

fn provides_all(schema: &[String], attrs: &[(Option<String>, String)]) -> bool {
    attrs.iter().all(|(table, name)| {
        let qualified = qualify_ref((table.as_deref(), name));
        schema_contains(schema, &qualified)
    })
}

// --- Rule 6: MergeSelection --------------------------------------------------

fn merge_selection(view: &mut PlanView, _catalog: &Catalog) -> bool {
    for id in 0..view.len() {
        let outer = match view.node(id) {
            PlanNode::Filter { predicate } => predicate.clone(),
            _ => continue,
        };
        let kids = view.children(id).to_vec();
        if kids.len() != 1 {
            continue;
        }
        let inner = match view.node(kids[0]) {
            PlanNode::Filter { predicate } => predicate.clone(),
            _ => continue,
        };
        let merged = Expr::Binary { left: Box::new(outer), op: BinaryOp::And, right: Box::new(inner) };
        view.replace_in_place(id, PlanNode::Filter { predicate: merged });
        let grandchild = view.children(kids[0])[0];
        view.set_child(id, 0, grandchild);
        return true;
    }
    false
}

// --- Rule 7: RemoveProjection ------------------------------------------------

fn remove_projection(view: &mut PlanView, catalog: &Catalog) -> bool {
    let root = view.root();
    let columns = match view.node(root) {
        PlanNode::Project { columns } => columns.clone(),
        _ => return false,
    };
    let kids = view.children(root).to_vec();
    let Ok(child_schema) = schema_of(view, kids[0], catalog) else { return false };
    if columns == child_schema {
        view.root = kids[0];
        view.parent[kids[0]] = None;
        true
    } else {
        false
    }
}

// --- Schema computation ------------------------------------------------------

/// Output schema (qualified column names, left-to-right) of the subtree
/// rooted at `id`. Mirrors `planner::Planner::output_schema` but operates on
/// table/column *names* rather than resolved ids, since the optimizer runs
/// before binding.
fn schema_of(view: &PlanView, id: NodeId, catalog: &Catalog) -> BeeDbResult<Vec<String>> {
    match view.node(id) {
        PlanNode::TableScan { table } | PlanNode::IndexScan { table, .. } => {
            let meta = catalog.table(table)?;
            Ok(meta.schema.names().into_iter().map(|c| qualify(&c, table)).collect())
        }
        PlanNode::Join { .. } | PlanNode::HashJoin { .. } | PlanNode::CrossProduct { .. } => {
            let kids = view.children(id);
            let mut left = schema_of(view, kids[0], catalog)?;
            let right = schema_of(view, kids[1], catalog)?;
            left.extend(right);
            Ok(left)
        }
        PlanNode::Project { columns } => Ok(columns.clone()),
        PlanNode::Aggregate { group_by, aggregates } => {
            let mut out = group_by.clone();
            out.extend(aggregates.iter().map(|(f, c)| aggregate_label(*f, c.as_deref())));
            Ok(out)
        }
        PlanNode::Filter { .. } | PlanNode::Sort { .. } | PlanNode::Limit { .. } => {
            schema_of(view, view.children(id)[0], catalog)
        }
        PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. } => Ok(Vec::new()),
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
