#![forbid(unsafe_code)]

//! Query representation and compilation pipeline.
//!
//! This module provides the pure core of the crate: an AST for Cypher
//! statements, a canonicalization pass mapping equivalent trees to one
//! representative, a deterministic renderer to query text, and a short
//! digest over the canonical form. None of it performs I/O or carries
//! state; the execution shell lives in [`crate::client`].

/// Abstract syntax tree for Cypher statements.
///
/// Defines closed expression, pattern, and clause unions plus infallible
/// constructors.
pub mod ast;

/// Fluent query construction and domain helper statements.
pub mod builder;

/// Bounded cache of compiled statements keyed by AST digest.
pub mod cache;

/// Canonicalization: the equivalence algebra and its total expression
/// order.
pub mod canonical;

/// Deterministic rendering from query trees to Cypher text.
pub mod compile;

/// Short stable digests of canonical query forms.
pub mod fingerprint;

/// Scalar and collection values for literals and parameters.
pub mod value;

pub use ast::{
    Assignment, BinaryOp, Clause, Direction, Expr, NodePattern, OrderItem, Pattern,
    PatternElement, Query, RelPattern, ReturnExpr, SortDirection, UnaryOp,
};
pub use builder::{create_node, find_by_id, find_by_label, QueryBuilder};
pub use cache::PlanCache;
pub use canonical::canonicalize;
pub use compile::{compile, CompiledQuery};
pub use fingerprint::{digest, fingerprint};
pub use value::Value;
