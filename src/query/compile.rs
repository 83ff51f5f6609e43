//! Deterministic rendering of query trees to Cypher text.
//!
//! [`compile`] is a mechanical renderer: each clause tag maps to one fixed
//! template, clauses join with single spaces, and nothing is re-sorted or
//! restructured. Callers that want the canonical representative must run
//! [`crate::query::canonicalize`] first; compiling twice (or a thousand
//! times) yields byte-identical output for the same input.

use std::collections::BTreeMap;

use crate::query::ast::{
    Clause, Direction, Expr, NodePattern, Pattern, PatternElement, Query, RelPattern, ReturnExpr,
    SortDirection, UnaryOp,
};
use crate::query::value::Value;

/// Rendered statement: query text plus its parameter map, passed through
/// unchanged from the input query.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    /// Cypher text.
    pub text: String,
    /// Named parameters to submit alongside the text.
    pub parameters: BTreeMap<String, Value>,
}

/// Renders `query` to text and parameters.
pub fn compile(query: &Query) -> CompiledQuery {
    let clauses: Vec<String> = query.clauses.iter().map(render_clause).collect();
    CompiledQuery {
        text: clauses.join(" "),
        parameters: query.parameters.clone(),
    }
}

fn render_clause(clause: &Clause) -> String {
    match clause {
        Clause::Match { pattern, optional } => {
            let keyword = if *optional { "OPTIONAL MATCH" } else { "MATCH" };
            format!("{keyword} {}", render_pattern(pattern))
        }
        Clause::Where(expr) => format!("WHERE {}", render_expr(expr)),
        Clause::Create(pattern) => format!("CREATE {}", render_pattern(pattern)),
        Clause::Delete { variables, detach } => {
            let keyword = if *detach { "DETACH DELETE" } else { "DELETE" };
            format!("{keyword} {}", variables.join(", "))
        }
        Clause::Set(assignments) => {
            let items: Vec<String> = assignments
                .iter()
                .map(|a| format!("{}.{} = {}", a.var, a.key, render_expr(&a.value)))
                .collect();
            format!("SET {}", items.join(", "))
        }
        Clause::With(items) => format!("WITH {}", render_projection(items)),
        Clause::Return(items) => format!("RETURN {}", render_projection(items)),
        Clause::OrderBy(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match item.direction {
                    SortDirection::Ascending => render_expr(&item.expr),
                    SortDirection::Descending => format!("{} DESC", render_expr(&item.expr)),
                })
                .collect();
            format!("ORDER BY {}", rendered.join(", "))
        }
        Clause::Skip(count) => format!("SKIP {count}"),
        Clause::Limit(count) => format!("LIMIT {count}"),
    }
}

fn render_projection(items: &[ReturnExpr]) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            ReturnExpr::Variable { name, alias } => match alias {
                Some(alias) => format!("{name} AS {alias}"),
                None => name.clone(),
            },
            ReturnExpr::Expression { expr, alias } => match alias {
                Some(alias) => format!("{} AS {alias}", render_expr(expr)),
                None => render_expr(expr),
            },
        })
        .collect();
    rendered.join(", ")
}

/// Renders an expression.
///
/// A binary operand that is itself a binary expression is parenthesized so
/// the emitted text re-parses to the same tree shape; everything else
/// renders bare.
pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(value) => render_value(value),
        Expr::Property { var, key } => format!("{var}.{key}"),
        Expr::Parameter(name) => format!("${name}"),
        Expr::Binary { op, left, right } => format!(
            "{} {} {}",
            render_operand(left),
            op.token(),
            render_operand(right)
        ),
        Expr::Unary { op, expr } => {
            if op.is_postfix() {
                format!("{} {}", render_operand(expr), op.token())
            } else if matches!(op, UnaryOp::Minus) {
                format!("-{}", render_operand(expr))
            } else {
                format!("{} {}", op.token(), render_operand(expr))
            }
        }
        Expr::Function { name, args } => {
            let rendered: Vec<String> = args.iter().map(render_expr).collect();
            format!("{name}({})", rendered.join(", "))
        }
    }
}

fn render_operand(expr: &Expr) -> String {
    if matches!(expr, Expr::Binary { .. }) {
        format!("({})", render_expr(expr))
    } else {
        render_expr(expr)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::String(s) => render_string(s),
        Value::List(values) => {
            let rendered: Vec<String> = values.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Map(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{key}: {}", render_value(value)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

fn render_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn render_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Node(node) => render_node(node),
        Pattern::Relationship(rel) => render_rel(rel),
        Pattern::Path(elements) => elements
            .iter()
            .map(|element| match element {
                PatternElement::Node(node) => render_node(node),
                PatternElement::Relationship(rel) => render_rel(rel),
            })
            .collect(),
    }
}

fn render_node(node: &NodePattern) -> String {
    let mut out = String::from("(");
    out.push_str(&node.var);
    for label in &node.labels {
        out.push(':');
        out.push_str(label);
    }
    if !node.properties.is_empty() {
        out.push(' ');
        out.push_str(&render_property_map(&node.properties));
    }
    out.push(')');
    out
}

fn render_rel(rel: &RelPattern) -> String {
    let mut body = String::from("[");
    if let Some(var) = &rel.var {
        body.push_str(var);
    }
    if let Some(rel_type) = &rel.rel_type {
        body.push(':');
        body.push_str(rel_type);
    }
    if !rel.properties.is_empty() {
        body.push(' ');
        body.push_str(&render_property_map(&rel.properties));
    }
    body.push(']');
    match rel.direction {
        Direction::Out => format!("-{body}->"),
        Direction::In => format!("<-{body}-"),
        Direction::Both => format!("-{body}-"),
    }
}

fn render_property_map(properties: &[(String, Expr)]) -> String {
    let rendered: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{key}: {}", render_expr(value)))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}
