//! A small query language for searching nodes in a syntax tree.
//!
//! A query is either an NQL string (a CSS-selector-like syntax) or a plain
//! JSON rules object. Both compile once into an immutable predicate tree
//! that can be run against any tree whose nodes implement [`AstNode`].
//!
//! ```
//! use node_ql::{NodeQuery, QueryOptions};
//! use node_ql::tests::create_test_tree;
//!
//! let tree = create_test_tree();
//! let query = NodeQuery::new(".ClassDeclaration .PropertyDeclaration").unwrap();
//! let nodes = query.query_nodes(&tree.node(0), QueryOptions::default());
//! assert_eq!(nodes.len(), 3);
//! ```

pub use node_ql_core::{
    AstNode, Attribute, AttributeValue, BasicSelector, Expression, ExpressionList, NodeRules,
    NodeValue, Operator, Position, Pseudo, PseudoKind, QueryError, QueryOptions, Relationship,
    Selector, Value, parse,
};

// Re-export test utilities for integration testing in downstream crates
pub use node_ql_core::tests;

/// A compiled query, ready to run against any adapter-backed tree.
pub struct NodeQuery {
    source: QuerySource,
}

enum QuerySource {
    Nql(ExpressionList),
    Rules(NodeRules),
}

impl NodeQuery {
    /// Compiles an NQL query string.
    pub fn new(nql: &str) -> Result<Self, QueryError> {
        let expression_list = parse(nql)?;
        log::debug!("compiled query: {}", expression_list);
        Ok(Self {
            source: QuerySource::Nql(expression_list),
        })
    }

    /// Compiles a JSON rules object.
    pub fn from_rules(rules: serde_json::Value) -> Result<Self, QueryError> {
        Ok(Self {
            source: QuerySource::Rules(NodeRules::new(rules)?),
        })
    }

    /// Collects every node under (and optionally including) the root that
    /// satisfies the query, in depth-first pre-order.
    pub fn query_nodes<N: AstNode>(&self, node: &N, options: QueryOptions) -> Vec<N> {
        match &self.source {
            QuerySource::Nql(expression_list) => expression_list.query_nodes(node, options),
            QuerySource::Rules(rules) => rules.query_nodes(node, options),
        }
    }

    /// True iff the node itself (or a direct child) satisfies the query.
    pub fn match_node<N: AstNode>(&self, node: &N) -> bool {
        let options = QueryOptions {
            including_self: true,
            stop_at_first_match: true,
            recursive: false,
        };
        !self.query_nodes(node, options).is_empty()
    }
}
