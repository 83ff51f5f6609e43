//! Property tests for the canonicalization algebra.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use penumbra::query::{
    canonicalize, compile, fingerprint, BinaryOp, Clause, Expr, NodePattern, OrderItem, Pattern,
    Query, ReturnExpr, SortDirection, UnaryOp, Value,
};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{1,8}".prop_map(Value::String),
    ]
}

fn arb_binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Eq),
        Just(BinaryOp::Ne),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Lte),
        Just(BinaryOp::Gt),
        Just(BinaryOp::Gte),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Contains),
    ]
}

fn arb_unary_op() -> impl Strategy<Value = UnaryOp> {
    prop_oneof![
        Just(UnaryOp::Not),
        Just(UnaryOp::Minus),
        Just(UnaryOp::IsNull),
        Just(UnaryOp::IsNotNull),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        arb_value().prop_map(Expr::Literal),
        ("[a-z]{1,3}", "[a-z]{1,6}").prop_map(|(var, key)| Expr::property(var, key)),
        "[a-z]{1,6}".prop_map(Expr::parameter),
    ]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(4, 48, 3, |inner| {
        prop_oneof![
            (arb_binary_op(), inner.clone(), inner.clone())
                .prop_map(|(op, left, right)| Expr::binary(op, left, right)),
            (arb_unary_op(), inner.clone()).prop_map(|(op, expr)| Expr::unary(op, expr)),
            ("[a-z]{1,6}", prop::collection::vec(inner, 0..3))
                .prop_map(|(name, args)| Expr::function(name, args)),
        ]
    })
}

fn arb_node() -> impl Strategy<Value = NodePattern> {
    (
        "[a-z]{1,3}",
        prop::collection::vec("[A-Z][a-z]{1,6}", 0..3),
        prop::collection::vec(("[a-z]{1,5}", arb_leaf()), 0..3),
    )
        .prop_map(|(var, labels, properties)| {
            let mut node = NodePattern::new(var);
            for label in labels {
                node = node.label(label);
            }
            for (key, value) in properties {
                node = node.property(key, value);
            }
            node
        })
}

fn arb_query() -> impl Strategy<Value = Query> {
    let clause = prop_oneof![
        (arb_node(), any::<bool>()).prop_map(|(node, optional)| Clause::Match {
            pattern: Pattern::Node(node),
            optional,
        }),
        arb_expr().prop_map(Clause::Where),
        prop::collection::vec("[a-z]{1,4}", 1..3).prop_map(|names| {
            Clause::Return(names.into_iter().map(ReturnExpr::variable).collect())
        }),
        (arb_expr(), any::<bool>()).prop_map(|(expr, desc)| {
            Clause::OrderBy(vec![OrderItem {
                expr,
                direction: if desc {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                },
            }])
        }),
        (0u64..100).prop_map(Clause::Skip),
        (1u64..100).prop_map(Clause::Limit),
    ];
    (
        prop::collection::vec(clause, 0..6),
        prop::collection::btree_map("[a-z]{1,6}", arb_value(), 0..4),
    )
        .prop_map(|(clauses, parameters)| Query {
            clauses,
            parameters,
        })
}

fn rank(clause: &Clause) -> u8 {
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

proptest! {
    #[test]
    fn prop_canonicalize_is_idempotent(query in arb_query()) {
        let once = canonicalize(&query);
        let twice = canonicalize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_and_is_commutative(a in arb_expr(), b in arb_expr()) {
        let left = Query::new().clause(Clause::Where(a.clone().and(b.clone())));
        let right = Query::new().clause(Clause::Where(b.and(a)));
        prop_assert_eq!(canonicalize(&left), canonicalize(&right));
    }

    #[test]
    fn prop_or_is_commutative(a in arb_expr(), b in arb_expr()) {
        let left = Query::new().clause(Clause::Where(a.clone().or(b.clone())));
        let right = Query::new().clause(Clause::Where(b.or(a)));
        prop_assert_eq!(canonicalize(&left), canonicalize(&right));
    }

    #[test]
    fn prop_double_negation_is_eliminated(expr in arb_expr()) {
        let negated = Query::new().clause(Clause::Where(expr.clone().not().not()));
        let plain = Query::new().clause(Clause::Where(expr));
        prop_assert_eq!(canonicalize(&negated), canonicalize(&plain));
    }

    #[test]
    fn prop_connectives_commute_independently_per_level(
        a in arb_expr(),
        b in arb_expr(),
        c in arb_expr(),
    ) {
        // OR nested under AND keeps its own commutativity; no flattening
        // may cross the operator boundary.
        let left = Query::new().clause(Clause::Where(a.clone().or(b.clone()).and(c.clone())));
        let right = Query::new().clause(Clause::Where(c.and(b.or(a))));
        prop_assert_eq!(canonicalize(&left), canonicalize(&right));
    }

    #[test]
    fn prop_clauses_sort_into_class_order(query in arb_query()) {
        let canonical = canonicalize(&query);
        let ranks: Vec<u8> = canonical.clauses.iter().map(rank).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        prop_assert_eq!(ranks, sorted);
    }

    #[test]
    fn prop_parameter_insertion_order_is_irrelevant(
        entries in prop::collection::btree_map("[a-z]{1,6}", arb_value(), 1..6),
    ) {
        let forward = {
            let mut query = Query::new();
            for (name, value) in entries.iter() {
                query = query.parameter(name.clone(), value.clone());
            }
            query
        };
        let reverse = {
            let mut query = Query::new();
            for (name, value) in entries.iter().rev() {
                query = query.parameter(name.clone(), value.clone());
            }
            query
        };
        let forward = canonicalize(&forward);
        let reverse = canonicalize(&reverse);
        prop_assert_eq!(&forward, &reverse);
        let keys: Vec<&String> = forward.parameters.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
        prop_assert_eq!(fingerprint(&forward), fingerprint(&reverse));
    }

    #[test]
    fn prop_equivalent_trees_share_a_fingerprint(a in arb_expr(), b in arb_expr()) {
        let straight = Query::new().clause(Clause::Where(a.clone().and(b.clone())));
        let commuted = Query::new().clause(Clause::Where(b.clone().and(a.clone())));
        let negated = Query::new().clause(Clause::Where(a.and(b).not().not()));
        let expected = fingerprint(&straight);
        prop_assert_eq!(&fingerprint(&commuted), &expected);
        prop_assert_eq!(&fingerprint(&negated), &expected);
    }

    #[test]
    fn prop_fingerprint_is_fixed_format(query in arb_query()) {
        let digest = fingerprint(&query);
        prop_assert_eq!(digest.len(), 8);
        prop_assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn prop_compile_is_deterministic(query in arb_query()) {
        let canonical = canonicalize(&query);
        let first = compile(&canonical);
        for _ in 0..4 {
            let again = compile(&canonical);
            prop_assert_eq!(&again.text, &first.text);
            prop_assert_eq!(&again.parameters, &first.parameters);
        }
    }

    #[test]
    fn prop_canonicalize_never_aliases_its_input(query in arb_query()) {
        let canonical = canonicalize(&query);
        let before: BTreeMap<String, Value> = query.parameters.clone();
        drop(query);
        // The canonical value survives its input; parameters deep-copied.
        prop_assert_eq!(canonical.parameters, before);
    }
}
