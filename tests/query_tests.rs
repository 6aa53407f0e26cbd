//! End-to-end tests running compiled queries through the public facade.

use node_ql::tests::{MockNode, create_test_tree};
use node_ql::{NodeQuery, QueryError, QueryOptions};
use serde_json::json;

fn ids(nodes: &[MockNode<'_>]) -> Vec<usize> {
    nodes.iter().map(|node| node.id).collect()
}

#[test]
fn test_descendant_query() {
    let tree = create_test_tree();
    let query = NodeQuery::new(".ClassDeclaration .PropertyDeclaration").unwrap();
    let nodes = query.query_nodes(&tree.node(0), QueryOptions::default());
    assert_eq!(ids(&nodes), vec![5, 8, 11]);
}

#[test]
fn test_attribute_queries() {
    let tree = create_test_tree();
    let query = NodeQuery::new(".NewExpression[arguments.0=\"Murphy\"][arguments.1=1]").unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![25]
    );

    let query = NodeQuery::new(".ClassDeclaration[name NOT IN (User Account)]").unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![3]
    );
}

#[test]
fn test_sibling_query() {
    let tree = create_test_tree();
    let query = NodeQuery::new(".MethodDefinition[key=constructor] + .MethodDefinition").unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![16]
    );
}

#[test]
fn test_pseudo_and_position_query() {
    let tree = create_test_tree();
    let query = NodeQuery::new(
        ".ClassDeclaration:has(.MethodDefinition[key=constructor]) .PropertyDeclaration:first-child",
    )
    .unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![5]
    );
}

#[test]
fn test_rules_query() {
    let tree = create_test_tree();
    let query = NodeQuery::from_rules(json!({
        "nodeType": "NewExpression",
        "arguments": { "length": { "gt": 2 } },
    }))
    .unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![25]
    );
}

#[test]
fn test_match_node() {
    let tree = create_test_tree();
    let query = NodeQuery::new(".ClassDeclaration[name=UserAccount]").unwrap();
    assert!(query.match_node(&tree.node(3)));
    assert!(!query.match_node(&tree.node(1)));

    let query = NodeQuery::from_rules(json!({ "nodeType": "ClassDeclaration" })).unwrap();
    assert!(query.match_node(&tree.node(3)));
    assert!(!query.match_node(&tree.node(25)));
}

#[test]
fn test_union_query() {
    let tree = create_test_tree();
    let query = NodeQuery::new(".InterfaceDeclaration, .ClassDeclaration").unwrap();
    assert_eq!(
        ids(&query.query_nodes(&tree.node(0), QueryOptions::default())),
        vec![1, 3]
    );
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        NodeQuery::new(".ClassDeclaration ."),
        Err(QueryError::Syntax(_))
    ));
    assert!(matches!(
        NodeQuery::from_rules(json!("ClassDeclaration")),
        Err(QueryError::Rules(_))
    ));
}
