//! Fluent construction of [`Query`] values.
//!
//! The builder is a thin, infallible layer over the AST constructors: it
//! appends clauses in the order methods are called and leaves
//! canonicalization to [`crate::query::canonicalize`]. Domain helpers for
//! the most common statement shapes (find by label, find by id, create)
//! live here too.

use crate::query::ast::{
    Assignment, Clause, Expr, NodePattern, OrderItem, Pattern, Query, ReturnExpr, SortDirection,
};
use crate::query::value::Value;

/// Fluent builder producing a [`Query`].
///
/// Successive `where_expr` calls fold into a single conjunction, matching
/// how callers think about incremental filtering.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    query: Query,
    predicate: Option<Expr>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry-point alias for fluent chains.
    pub fn start() -> Self {
        Self::new()
    }

    /// Adds a `MATCH` clause for a labeled node.
    pub fn match_node(self, var: impl Into<String>, label: impl Into<String>) -> Self {
        self.match_pattern(Pattern::node(var, label))
    }

    /// Adds a `MATCH` clause for an arbitrary pattern.
    pub fn match_pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.query.clauses.push(Clause::Match {
            pattern: pattern.into(),
            optional: false,
        });
        self
    }

    /// Adds an `OPTIONAL MATCH` clause.
    pub fn optional_match(mut self, pattern: impl Into<Pattern>) -> Self {
        self.query.clauses.push(Clause::Match {
            pattern: pattern.into(),
            optional: true,
        });
        self
    }

    /// Adds a predicate; consecutive calls are joined with `AND`.
    pub fn where_expr(mut self, expr: Expr) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Adds a `CREATE` clause.
    pub fn create(mut self, pattern: impl Into<Pattern>) -> Self {
        self.query.clauses.push(Clause::Create(pattern.into()));
        self
    }

    /// Adds a `DELETE` (or `DETACH DELETE`) clause.
    pub fn delete<I, S>(mut self, variables: I, detach: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.clauses.push(Clause::Delete {
            variables: variables.into_iter().map(Into::into).collect(),
            detach,
        });
        self
    }

    /// Adds one `SET` assignment; consecutive calls accumulate into the
    /// same clause.
    pub fn set(
        mut self,
        var: impl Into<String>,
        key: impl Into<String>,
        value: Expr,
    ) -> Self {
        let assignment = Assignment {
            var: var.into(),
            key: key.into(),
            value,
        };
        match self
            .query
            .clauses
            .iter()
            .position(|clause| matches!(clause, Clause::Set(_)))
        {
            Some(idx) => {
                if let Clause::Set(assignments) = &mut self.query.clauses[idx] {
                    assignments.push(assignment);
                }
            }
            None => self.query.clauses.push(Clause::Set(vec![assignment])),
        }
        self
    }

    /// Adds a `WITH` projection.
    pub fn with_items(mut self, items: Vec<ReturnExpr>) -> Self {
        self.query.clauses.push(Clause::With(items));
        self
    }

    /// Adds a `RETURN` clause projecting the given variables in order.
    pub fn return_vars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = names
            .into_iter()
            .map(|name| ReturnExpr::variable(name))
            .collect();
        self.query.clauses.push(Clause::Return(items));
        self
    }

    /// Adds a `RETURN` clause with explicit projection items.
    pub fn return_items(mut self, items: Vec<ReturnExpr>) -> Self {
        self.query.clauses.push(Clause::Return(items));
        self
    }

    /// Adds an `ORDER BY` item; consecutive calls accumulate.
    pub fn order_by(mut self, expr: Expr, direction: SortDirection) -> Self {
        let item = OrderItem { expr, direction };
        match self
            .query
            .clauses
            .iter()
            .position(|clause| matches!(clause, Clause::OrderBy(_)))
        {
            Some(idx) => {
                if let Clause::OrderBy(items) = &mut self.query.clauses[idx] {
                    items.push(item);
                }
            }
            None => self.query.clauses.push(Clause::OrderBy(vec![item])),
        }
        self
    }

    /// Adds a `SKIP` clause.
    pub fn skip(mut self, count: u64) -> Self {
        self.query.clauses.push(Clause::Skip(count));
        self
    }

    /// Adds a `LIMIT` clause.
    pub fn limit(mut self, count: u64) -> Self {
        self.query.clauses.push(Clause::Limit(count));
        self
    }

    /// Binds a named parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.parameters.insert(name.into(), value.into());
        self
    }

    /// Finishes the builder, folding any accumulated predicate into a
    /// single `WHERE` clause.
    pub fn build(mut self) -> Query {
        if let Some(predicate) = self.predicate.take() {
            self.query.clauses.push(Clause::Where(predicate));
        }
        self.query
    }
}

/// `MATCH (var:Label) RETURN var` — every node carrying a label.
pub fn find_by_label(var: impl Into<String>, label: impl Into<String>) -> Query {
    let var = var.into();
    QueryBuilder::start()
        .match_node(var.clone(), label)
        .return_vars([var])
        .build()
}

/// `MATCH (var:Label) WHERE var.id = $id RETURN var` with `$id` bound.
pub fn find_by_id(
    var: impl Into<String>,
    label: impl Into<String>,
    id: impl Into<Value>,
) -> Query {
    let var = var.into();
    QueryBuilder::start()
        .match_node(var.clone(), label)
        .where_expr(Expr::property(var.clone(), "id").eq(Expr::parameter("id")))
        .return_vars([var])
        .parameter("id", id)
        .build()
}

/// `CREATE (var:Label {key: $key, ...}) RETURN var` with one parameter per
/// property.
pub fn create_node<I, S>(
    var: impl Into<String>,
    label: impl Into<String>,
    properties: I,
) -> Query
where
    I: IntoIterator<Item = (S, Value)>,
    S: Into<String>,
{
    let var = var.into();
    let mut node = NodePattern::new(var.clone()).label(label);
    let mut builder = QueryBuilder::start();
    for (key, value) in properties {
        let key = key.into();
        node = node.property(key.clone(), Expr::parameter(key.clone()));
        builder = builder.parameter(key, value);
    }
    builder
        .create(node)
        .return_vars([var])
        .build()
}
