//! Abstract syntax tree for Cypher statements.
//!
//! The structures defined here are pure data: closed tagged unions plus
//! infallible constructor helpers. Referential consistency (a property
//! access naming a variable bound by an earlier `MATCH`, a path alternating
//! nodes and relationships) is the caller's responsibility; nothing here
//! performs validation beyond structural typing.

use std::collections::BTreeMap;

use crate::query::value::Value;

/// Binary operators drawn from a fixed closed set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    /// Equality (`=`).
    Eq,
    /// Inequality (`<>`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Logical conjunction (`AND`).
    And,
    /// Logical disjunction (`OR`).
    Or,
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Modulo (`%`).
    Mod,
    /// String prefix predicate (`STARTS WITH`).
    StartsWith,
    /// String suffix predicate (`ENDS WITH`).
    EndsWith,
    /// Substring predicate (`CONTAINS`).
    Contains,
}

impl BinaryOp {
    /// Literal token emitted between the rendered operands.
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::StartsWith => "STARTS WITH",
            BinaryOp::EndsWith => "ENDS WITH",
            BinaryOp::Contains => "CONTAINS",
        }
    }

    /// Whether operand order is semantically irrelevant.
    ///
    /// Only the boolean connectives qualify; arithmetic addition is left
    /// alone because `+` doubles as string concatenation.
    pub fn is_commutative(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Unary operators drawn from a fixed closed set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// Logical negation (`NOT expr`).
    Not,
    /// Arithmetic negation (`-expr`).
    Minus,
    /// Null check (`expr IS NULL`).
    IsNull,
    /// Inverted null check (`expr IS NOT NULL`).
    IsNotNull,
}

impl UnaryOp {
    /// Whether the operator renders after its operand.
    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::IsNull | UnaryOp::IsNotNull)
    }

    /// Literal token for the operator.
    pub fn token(self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Minus => "-",
            UnaryOp::IsNull => "IS NULL",
            UnaryOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal value.
    Literal(Value),
    /// Property access `var.key`.
    Property {
        /// Variable the property is read from.
        var: String,
        /// Property name.
        key: String,
    },
    /// Named parameter `$name`.
    Parameter(String),
    /// Binary operation `left OP right`.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Expr>,
    },
    /// Function invocation `name(args...)`.
    Function {
        /// Function name as written.
        name: String,
        /// Positional arguments.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Literal expression from anything convertible to a [`Value`].
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Property access expression.
    pub fn property(var: impl Into<String>, key: impl Into<String>) -> Self {
        Expr::Property {
            var: var.into(),
            key: key.into(),
        }
    }

    /// Named parameter expression.
    pub fn parameter(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    /// Arbitrary binary operation.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Arbitrary unary operation.
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Function invocation.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// Conjunction of two expressions.
    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::And, self, other)
    }

    /// Disjunction of two expressions.
    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Or, self, other)
    }

    /// Logical negation.
    pub fn not(self) -> Self {
        Expr::unary(UnaryOp::Not, self)
    }

    /// Equality comparison.
    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    /// Inequality comparison.
    pub fn ne(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Ne, self, other)
    }

    /// Less-than comparison.
    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    /// Less-than-or-equal comparison.
    pub fn lte(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Lte, self, other)
    }

    /// Greater-than comparison.
    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    /// Greater-than-or-equal comparison.
    pub fn gte(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Gte, self, other)
    }

    /// Null check.
    pub fn is_null(self) -> Self {
        Expr::unary(UnaryOp::IsNull, self)
    }

    /// Inverted null check.
    pub fn is_not_null(self) -> Self {
        Expr::unary(UnaryOp::IsNotNull, self)
    }
}

/// Direction selector for relationship traversals.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    /// Left-to-right (`-[..]->`).
    #[default]
    Out,
    /// Right-to-left (`<-[..]-`).
    In,
    /// Undirected (`-[..]-`).
    Both,
}

/// Node pattern `(var:Label {key: expr})`.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePattern {
    /// Variable bound to matched nodes.
    pub var: String,
    /// Label filters, rendered in list order.
    pub labels: Vec<String>,
    /// Property constraints, rendered in list order.
    pub properties: Vec<(String, Expr)>,
}

impl NodePattern {
    /// Bare node pattern with no labels or properties.
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            labels: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Adds a label filter.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Adds a property constraint.
    pub fn property(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// Relationship pattern `-[var:TYPE {key: expr}]->`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelPattern {
    /// Optional variable bound to matched relationships.
    pub var: Option<String>,
    /// Optional relationship type filter.
    pub rel_type: Option<String>,
    /// Traversal direction.
    pub direction: Direction,
    /// Property constraints, rendered in list order.
    pub properties: Vec<(String, Expr)>,
}

impl RelPattern {
    /// Typed relationship pattern in the default outgoing direction.
    pub fn typed(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: Some(rel_type.into()),
            ..Self::default()
        }
    }

    /// Binds the relationship to a variable.
    pub fn var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    /// Sets the traversal direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Adds a property constraint.
    pub fn property(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// Single element of a path pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternElement {
    /// Node element.
    Node(NodePattern),
    /// Relationship element.
    Relationship(RelPattern),
}

/// Graph pattern attached to `MATCH`/`CREATE` clauses.
///
/// A [`Pattern::Path`] must alternate nodes and relationships for the
/// compiled output to be valid Cypher; that adjacency is not enforced at the
/// type level.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// Single node.
    Node(NodePattern),
    /// Single relationship segment.
    Relationship(RelPattern),
    /// Ordered sequence of nodes and relationships.
    Path(Vec<PatternElement>),
}

impl Pattern {
    /// Node pattern with one label, the common case.
    pub fn node(var: impl Into<String>, label: impl Into<String>) -> Self {
        Pattern::Node(NodePattern::new(var).label(label))
    }

    /// Path pattern from its elements.
    pub fn path(elements: Vec<PatternElement>) -> Self {
        Pattern::Path(elements)
    }
}

impl From<NodePattern> for Pattern {
    fn from(node: NodePattern) -> Self {
        Pattern::Node(node)
    }
}

impl From<RelPattern> for Pattern {
    fn from(rel: RelPattern) -> Self {
        Pattern::Relationship(rel)
    }
}

/// Property assignment carried by a `SET` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// Variable whose property is written.
    pub var: String,
    /// Property name.
    pub key: String,
    /// Assigned expression.
    pub value: Expr,
}

/// Sort direction for `ORDER BY` items.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortDirection {
    /// Ascending order (the Cypher default, rendered bare).
    #[default]
    Ascending,
    /// Descending order (rendered with an explicit `DESC`).
    Descending,
}

/// Single `ORDER BY` item.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    /// Sort key expression.
    pub expr: Expr,
    /// Sort direction.
    pub direction: SortDirection,
}

/// Projection item carried by `RETURN` and `WITH` clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnExpr {
    /// Bare variable projection.
    Variable {
        /// Variable name.
        name: String,
        /// Optional output alias.
        alias: Option<String>,
    },
    /// Computed expression projection.
    Expression {
        /// Projected expression.
        expr: Expr,
        /// Optional output alias.
        alias: Option<String>,
    },
}

impl ReturnExpr {
    /// Bare variable projection without an alias.
    pub fn variable(name: impl Into<String>) -> Self {
        ReturnExpr::Variable {
            name: name.into(),
            alias: None,
        }
    }

    /// Expression projection without an alias.
    pub fn expression(expr: Expr) -> Self {
        ReturnExpr::Expression { expr, alias: None }
    }

    /// Attaches an output alias.
    pub fn aliased(self, alias: impl Into<String>) -> Self {
        match self {
            ReturnExpr::Variable { name, .. } => ReturnExpr::Variable {
                name,
                alias: Some(alias.into()),
            },
            ReturnExpr::Expression { expr, .. } => ReturnExpr::Expression {
                expr,
                alias: Some(alias.into()),
            },
        }
    }
}

/// Top-level clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    /// `MATCH` / `OPTIONAL MATCH`.
    Match {
        /// Pattern to match.
        pattern: Pattern,
        /// Whether the match is optional.
        optional: bool,
    },
    /// `WHERE` predicate.
    Where(Expr),
    /// `CREATE`.
    Create(Pattern),
    /// `DELETE` / `DETACH DELETE`.
    Delete {
        /// Variables naming the entities to delete.
        variables: Vec<String>,
        /// Whether relationships are removed alongside nodes.
        detach: bool,
    },
    /// `SET` property assignments.
    Set(Vec<Assignment>),
    /// `WITH` projection.
    With(Vec<ReturnExpr>),
    /// `RETURN` projection.
    Return(Vec<ReturnExpr>),
    /// `ORDER BY`.
    OrderBy(Vec<OrderItem>),
    /// `SKIP`.
    Skip(u64),
    /// `LIMIT`.
    Limit(u64),
}

/// A complete statement: an ordered clause list plus its parameter map.
///
/// Before canonicalization callers may list clauses in any order; the
/// parameter map is a [`BTreeMap`], so its keys are in ascending lexical
/// order by construction regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Clauses in authored (or, after canonicalization, canonical) order.
    pub clauses: Vec<Clause>,
    /// Named parameters referenced by `$name` expressions.
    pub parameters: BTreeMap<String, Value>,
}

impl Query {
    /// Empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause.
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Binds a named parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}
