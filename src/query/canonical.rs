//! Query canonicalization.
//!
//! [`canonicalize`] maps every member of an equivalence class of
//! semantically identical query trees onto one representative: clause
//! classes appear in a fixed order, commutative operand pairs are sorted,
//! same-operator chains are flattened and right-folded, double negation is
//! eliminated, and label/property lists are sorted. The pass is pure,
//! total over well-formed queries, and idempotent.
//!
//! The total order used for commutative sorting is lexical comparison of
//! the canonical string encoding produced by the `*_sort_key` functions
//! below; the fingerprint module hashes the same encoding, so comparison
//! order and digest input can never drift apart.

use smallvec::SmallVec;

use crate::query::ast::{
    Assignment, BinaryOp, Clause, Expr, NodePattern, OrderItem, Pattern, PatternElement, Query,
    RelPattern, ReturnExpr, SortDirection, UnaryOp,
};
use crate::query::value::Value;

/// Returns the canonical representative of `query`.
///
/// The result shares no structure with the input. Clauses of the same class
/// keep their relative input order (the sort is stable); everything else is
/// reordered per the equivalence algebra.
pub fn canonicalize(query: &Query) -> Query {
    let mut clauses: Vec<Clause> = query.clauses.iter().map(canonical_clause).collect();
    clauses.sort_by_key(clause_rank);
    Query {
        clauses,
        parameters: query.parameters.clone(),
    }
}

/// Canonical position class for each clause tag.
fn clause_rank(clause: &Clause) -> u8 {
    match clause {
        Clause::Match { .. } => 1,
        Clause::Where(_) => 2,
        Clause::Create(_) => 3,
        Clause::Delete { .. } => 4,
        Clause::Set(_) => 5,
        Clause::With(_) => 6,
        Clause::Return(_) => 7,
        Clause::OrderBy(_) => 8,
        Clause::Skip(_) => 9,
        Clause::Limit(_) => 10,
    }
}

fn canonical_clause(clause: &Clause) -> Clause {
    match clause {
        Clause::Match { pattern, optional } => Clause::Match {
            pattern: canonical_pattern(pattern),
            optional: *optional,
        },
        Clause::Where(expr) => Clause::Where(canonical_expr(expr)),
        Clause::Create(pattern) => Clause::Create(canonical_pattern(pattern)),
        Clause::Delete { variables, detach } => Clause::Delete {
            variables: variables.clone(),
            detach: *detach,
        },
        Clause::Set(assignments) => {
            let mut assignments: Vec<Assignment> = assignments
                .iter()
                .map(|a| Assignment {
                    var: a.var.clone(),
                    key: a.key.clone(),
                    value: canonical_expr(&a.value),
                })
                .collect();
            assignments.sort_by(|a, b| {
                (a.var.as_str(), a.key.as_str()).cmp(&(b.var.as_str(), b.key.as_str()))
            });
            Clause::Set(assignments)
        }
        // Projection and sort lists keep their authored order: column order
        // is meaningful output structure, not equivalence noise.
        Clause::With(items) => Clause::With(items.iter().map(canonical_return_expr).collect()),
        Clause::Return(items) => Clause::Return(items.iter().map(canonical_return_expr).collect()),
        Clause::OrderBy(items) => Clause::OrderBy(
            items
                .iter()
                .map(|item| OrderItem {
                    expr: canonical_expr(&item.expr),
                    direction: item.direction,
                })
                .collect(),
        ),
        Clause::Skip(count) => Clause::Skip(*count),
        Clause::Limit(count) => Clause::Limit(*count),
    }
}

fn canonical_return_expr(item: &ReturnExpr) -> ReturnExpr {
    match item {
        ReturnExpr::Variable { name, alias } => ReturnExpr::Variable {
            name: name.clone(),
            alias: alias.clone(),
        },
        ReturnExpr::Expression { expr, alias } => ReturnExpr::Expression {
            expr: canonical_expr(expr),
            alias: alias.clone(),
        },
    }
}

fn canonical_pattern(pattern: &Pattern) -> Pattern {
    match pattern {
        Pattern::Node(node) => Pattern::Node(canonical_node(node)),
        Pattern::Relationship(rel) => Pattern::Relationship(canonical_rel(rel)),
        // Sequence order is structurally meaningful; elements normalize in
        // place.
        Pattern::Path(elements) => Pattern::Path(
            elements
                .iter()
                .map(|element| match element {
                    PatternElement::Node(node) => PatternElement::Node(canonical_node(node)),
                    PatternElement::Relationship(rel) => {
                        PatternElement::Relationship(canonical_rel(rel))
                    }
                })
                .collect(),
        ),
    }
}

fn canonical_node(node: &NodePattern) -> NodePattern {
    let mut labels = node.labels.clone();
    labels.sort();
    NodePattern {
        var: node.var.clone(),
        labels,
        properties: canonical_properties(&node.properties),
    }
}

fn canonical_rel(rel: &RelPattern) -> RelPattern {
    RelPattern {
        var: rel.var.clone(),
        rel_type: rel.rel_type.clone(),
        direction: rel.direction,
        properties: canonical_properties(&rel.properties),
    }
}

fn canonical_properties(properties: &[(String, Expr)]) -> Vec<(String, Expr)> {
    let mut properties: Vec<(String, Expr)> = properties
        .iter()
        .map(|(key, value)| (key.clone(), canonical_expr(value)))
        .collect();
    properties.sort_by(|a, b| a.0.cmp(&b.0));
    properties
}

/// Normalizes an expression tree bottom-up.
fn canonical_expr(expr: &Expr) -> Expr {
    match expr {
        Expr::Literal(_) | Expr::Property { .. } | Expr::Parameter(_) => expr.clone(),
        Expr::Unary {
            op: UnaryOp::Not,
            expr: inner,
        } => match canonical_expr(inner) {
            // The child is already canonical, so one unwrapping level is
            // exhaustive: a canonical subtree never starts with NOT NOT.
            Expr::Unary {
                op: UnaryOp::Not,
                expr: grand,
            } => *grand,
            other => Expr::unary(UnaryOp::Not, other),
        },
        Expr::Unary { op, expr: inner } => Expr::unary(*op, canonical_expr(inner)),
        Expr::Binary { op, left, right } if op.is_commutative() => {
            canonical_connective(*op, canonical_expr(left), canonical_expr(right))
        }
        // Operand order carries meaning for every other operator.
        Expr::Binary { op, left, right } => {
            Expr::binary(*op, canonical_expr(left), canonical_expr(right))
        }
        Expr::Function { name, args } => Expr::Function {
            name: name.clone(),
            args: args.iter().map(canonical_expr).collect(),
        },
    }
}

/// Canonicalizes one `AND`/`OR` node whose children are already canonical.
///
/// Chains of the same connective flatten into a sorted right fold; an exact
/// pair is swapped in place when out of order. Collection stops at any
/// differently-tagged node, so nested `OR` under `AND` (and vice versa) is
/// sorted independently at its own level.
fn canonical_connective(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let mut operands: SmallVec<[Expr; 4]> = SmallVec::new();
    collect_operands(op, left, &mut operands);
    collect_operands(op, right, &mut operands);
    if operands.len() > 2 {
        let mut keyed: Vec<(String, Expr)> = operands
            .into_iter()
            .map(|operand| (expr_sort_key(&operand), operand))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let mut rest = keyed.into_iter().map(|(_, operand)| operand).rev();
        let mut folded = rest.next().unwrap();
        for operand in rest {
            folded = Expr::binary(op, operand, folded);
        }
        folded
    } else {
        let mut pair = operands.into_iter();
        match (pair.next(), pair.next()) {
            (Some(a), Some(b)) => {
                if expr_sort_key(&a) <= expr_sort_key(&b) {
                    Expr::binary(op, a, b)
                } else {
                    Expr::binary(op, b, a)
                }
            }
            _ => unreachable!("a binary connective always yields at least two operands"),
        }
    }
}

fn collect_operands(op: BinaryOp, expr: Expr, out: &mut SmallVec<[Expr; 4]>) {
    match expr {
        Expr::Binary {
            op: child_op,
            left,
            right,
        } if child_op == op => {
            collect_operands(op, *left, out);
            collect_operands(op, *right, out);
        }
        other => out.push(other),
    }
}

// ---------------------------------------------------------------------------
// Canonical string encoding.
//
// One encoding serves two consumers: it is the total order for commutative
// sorting (lexical comparison) and the input to the AST fingerprint. Ties
// are broken by the full encoded form, never by identity or insertion
// order.
// ---------------------------------------------------------------------------

pub(crate) fn value_sort_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("bool:{b}"),
        Value::Int(i) => format!("int:{i}"),
        Value::Float(f) => format!("float:{f:?}"),
        Value::String(s) => format!("str:{s:?}"),
        Value::List(values) => {
            let inner: Vec<String> = values.iter().map(value_sort_key).collect();
            format!("list:[{}]", inner.join(","))
        }
        Value::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{key}={}", value_sort_key(value)))
                .collect();
            format!("map:{{{}}}", inner.join(","))
        }
    }
}

pub(crate) fn expr_sort_key(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => format!("lit:{}", value_sort_key(value)),
        Expr::Property { var, key } => format!("prop:{var}.{key}"),
        Expr::Parameter(name) => format!("param:{name}"),
        Expr::Binary { op, left, right } => {
            format!(
                "bin:{op:?}:{}|{}",
                expr_sort_key(left),
                expr_sort_key(right)
            )
        }
        Expr::Unary { op, expr } => format!("un:{op:?}:{}", expr_sort_key(expr)),
        Expr::Function { name, args } => {
            let inner: Vec<String> = args.iter().map(expr_sort_key).collect();
            format!("fn:{name}:{}", inner.join("|"))
        }
    }
}

fn properties_sort_key(properties: &[(String, Expr)]) -> String {
    let inner: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{key}={}", expr_sort_key(value)))
        .collect();
    format!("{{{}}}", inner.join(","))
}

fn node_sort_key(node: &NodePattern) -> String {
    format!(
        "node:{}:[{}]:{}",
        node.var,
        node.labels.join(","),
        properties_sort_key(&node.properties)
    )
}

fn rel_sort_key(rel: &RelPattern) -> String {
    format!(
        "rel:{}:{}:{:?}:{}",
        rel.var.as_deref().unwrap_or(""),
        rel.rel_type.as_deref().unwrap_or(""),
        rel.direction,
        properties_sort_key(&rel.properties)
    )
}

pub(crate) fn pattern_sort_key(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Node(node) => node_sort_key(node),
        Pattern::Relationship(rel) => rel_sort_key(rel),
        Pattern::Path(elements) => {
            let inner: Vec<String> = elements
                .iter()
                .map(|element| match element {
                    PatternElement::Node(node) => node_sort_key(node),
                    PatternElement::Relationship(rel) => rel_sort_key(rel),
                })
                .collect();
            format!("path:[{}]", inner.join(","))
        }
    }
}

fn return_expr_sort_key(item: &ReturnExpr) -> String {
    match item {
        ReturnExpr::Variable { name, alias } => {
            format!("var:{name}:{}", alias.as_deref().unwrap_or(""))
        }
        ReturnExpr::Expression { expr, alias } => {
            format!(
                "expr:{}:{}",
                expr_sort_key(expr),
                alias.as_deref().unwrap_or("")
            )
        }
    }
}

pub(crate) fn clause_sort_key(clause: &Clause) -> String {
    match clause {
        Clause::Match { pattern, optional } => {
            format!("match:{optional}:{}", pattern_sort_key(pattern))
        }
        Clause::Where(expr) => format!("where:{}", expr_sort_key(expr)),
        Clause::Create(pattern) => format!("create:{}", pattern_sort_key(pattern)),
        Clause::Delete { variables, detach } => {
            format!("delete:{detach}:[{}]", variables.join(","))
        }
        Clause::Set(assignments) => {
            let inner: Vec<String> = assignments
                .iter()
                .map(|a| format!("{}.{}={}", a.var, a.key, expr_sort_key(&a.value)))
                .collect();
            format!("set:[{}]", inner.join(","))
        }
        Clause::With(items) => {
            let inner: Vec<String> = items.iter().map(return_expr_sort_key).collect();
            format!("with:[{}]", inner.join(","))
        }
        Clause::Return(items) => {
            let inner: Vec<String> = items.iter().map(return_expr_sort_key).collect();
            format!("return:[{}]", inner.join(","))
        }
        Clause::OrderBy(items) => {
            let inner: Vec<String> = items
                .iter()
                .map(|item| {
                    let direction = match item.direction {
                        SortDirection::Ascending => "asc",
                        SortDirection::Descending => "desc",
                    };
                    format!("{}:{direction}", expr_sort_key(&item.expr))
                })
                .collect();
            format!("orderby:[{}]", inner.join(","))
        }
        Clause::Skip(count) => format!("skip:{count}"),
        Clause::Limit(count) => format!("limit:{count}"),
    }
}

/// Full canonical encoding of a query; the fingerprint hashes this string.
pub(crate) fn query_sort_key(query: &Query) -> String {
    let clauses: Vec<String> = query.clauses.iter().map(clause_sort_key).collect();
    let parameters: Vec<String> = query
        .parameters
        .iter()
        .map(|(name, value)| format!("{name}={}", value_sort_key(value)))
        .collect();
    format!(
        "query:[{}]:params:{{{}}}",
        clauses.join(";"),
        parameters.join(",")
    )
}
