//! Key-path resolution and canonical string forms, shared by the traversal
//! engine and the declarative rules matcher.
//!
//! Resolution never fails hard: missing fields, bad indices and navigation
//! into primitives all produce the null sentinel, because absence of a match
//! is a valid outcome of a query.

use crate::adapter::{AstNode, NodeValue};
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid"));

/// Resolves a dotted key path against a resolved value.
///
/// Segment semantics, in order:
/// - `*` against an array maps the remaining path over every element;
/// - a (possibly negative) integer against an array indexes it;
/// - `length` against an array yields the element count;
/// - against a node, the adapter's field lookup wins, then the synthetic
///   `nodeType` accessor;
/// - anything else resolves to `Null`.
pub fn resolve_path<N: AstNode>(target: &NodeValue<N>, path: &str) -> NodeValue<N> {
    let segments: Vec<&str> = path.split('.').collect();
    resolve_segments(target, &segments)
}

fn resolve_segments<N: AstNode>(target: &NodeValue<N>, segments: &[&str]) -> NodeValue<N> {
    let Some((first, rest)) = segments.split_first() else {
        return target.clone();
    };
    let resolved = match target {
        NodeValue::Array(items) => {
            if *first == "*" {
                // Map the remaining path over every element, producing an
                // array of sub-results for array-wide checks.
                return NodeValue::Array(
                    items.iter().map(|item| resolve_segments(item, rest)).collect(),
                );
            }
            if let Ok(index) = first.parse::<i64>() {
                index_array(items, index)
            } else if *first == "length" {
                NodeValue::Number(items.len() as f64)
            } else {
                NodeValue::Null
            }
        }
        NodeValue::Node(node) => match node.field(first) {
            Some(value) => value,
            None if *first == "nodeType" => NodeValue::String(node.node_type()),
            None => {
                log::debug!("{} {} not found", node.node_type(), first);
                NodeValue::Null
            }
        },
        _ => NodeValue::Null,
    };
    resolve_segments(&resolved, rest)
}

fn index_array<N: Clone>(items: &[NodeValue<N>], index: i64) -> NodeValue<N> {
    let position = if index < 0 {
        let Some(position) = (items.len() as i64).checked_add(index) else {
            return NodeValue::Null;
        };
        position
    } else {
        index
    };
    if position < 0 {
        return NodeValue::Null;
    }
    items.get(position as usize).cloned().unwrap_or(NodeValue::Null)
}

/// Reduces a resolved value to its canonical string form: nodes to their
/// trimmed source text, arrays to `(a, b)`, primitives to their display form.
pub fn to_canonical_string<N: AstNode>(value: &NodeValue<N>) -> String {
    match value {
        NodeValue::Node(node) => node.source().trim().to_string(),
        NodeValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(to_canonical_string).collect();
            format!("({})", rendered.join(", "))
        }
        NodeValue::String(s) => s.clone(),
        NodeValue::Number(n) => n.to_string(),
        NodeValue::Bool(b) => b.to_string(),
        NodeValue::Null => "null".to_string(),
        NodeValue::Undefined => "undefined".to_string(),
    }
}

/// Substitutes every `{{path}}` placeholder in `template` with the canonical
/// form of the path resolved against `base`.
pub fn evaluate_placeholders<N: AstNode>(base: &N, template: &str) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |captures: &regex::Captures| {
            let resolved = resolve_path(&NodeValue::Node(base.clone()), &captures[1]);
            to_canonical_string(&resolved)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::create_test_tree;

    #[test]
    fn test_resolve_nested_field() {
        let tree = create_test_tree();
        let new_expr = NodeValue::Node(tree.node(25));
        match resolve_path(&new_expr, "expression.text") {
            NodeValue::String(s) => assert_eq!(s, "UserAccount"),
            other => panic!("Expected a string, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_array_index() {
        let tree = create_test_tree();
        let new_expr = NodeValue::Node(tree.node(25));
        match resolve_path(&new_expr, "arguments.0") {
            NodeValue::Node(node) => assert_eq!(node.source(), "\"Murphy\""),
            other => panic!("Expected a node, got {:?}", other),
        }
        match resolve_path(&new_expr, "arguments.-1") {
            NodeValue::Node(node) => assert_eq!(node.source(), "true"),
            other => panic!("Expected a node, got {:?}", other),
        }
        assert_eq!(resolve_path(&new_expr, "arguments.5"), NodeValue::Null);
    }

    #[test]
    fn test_resolve_array_length() {
        let tree = create_test_tree();
        let new_expr = NodeValue::Node(tree.node(25));
        assert_eq!(
            resolve_path(&new_expr, "arguments.length"),
            NodeValue::Number(3.0)
        );
    }

    #[test]
    fn test_resolve_wildcard() {
        let tree = create_test_tree();
        let new_expr = NodeValue::Node(tree.node(25));
        match resolve_path(&new_expr, "arguments.*.nodeType") {
            NodeValue::Array(items) => {
                assert_eq!(
                    items,
                    vec![
                        NodeValue::String("StringLiteral".to_string()),
                        NodeValue::String("NumericLiteral".to_string()),
                        NodeValue::String("TrueKeyword".to_string()),
                    ]
                );
            }
            other => panic!("Expected an array, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_node_type_accessor() {
        let tree = create_test_tree();
        let class = NodeValue::Node(tree.node(3));
        assert_eq!(
            resolve_path(&class, "nodeType"),
            NodeValue::String("ClassDeclaration".to_string())
        );
        // A real field named nodeType would win over the synthetic accessor;
        // the mock has none, and a miss on anything else is the sentinel.
        assert_eq!(resolve_path(&class, "missing.deeper"), NodeValue::Null);
    }

    #[test]
    fn test_canonical_strings() {
        let tree = create_test_tree();
        let args = resolve_path(&NodeValue::Node(tree.node(25)), "arguments");
        assert_eq!(to_canonical_string(&args), "(\"Murphy\", 1, true)");
        assert_eq!(
            to_canonical_string::<crate::adapter::tests::MockNode>(&NodeValue::Number(1.5)),
            "1.5"
        );
        assert_eq!(
            to_canonical_string::<crate::adapter::tests::MockNode>(&NodeValue::Null),
            "null"
        );
    }

    #[test]
    fn test_evaluate_placeholders() {
        let tree = create_test_tree();
        let new_expr = tree.node(25);
        assert_eq!(
            evaluate_placeholders(&new_expr, "{{expression.text}}"),
            "UserAccount"
        );
        assert_eq!(
            evaluate_placeholders(&new_expr, "new {{expression.text}}(...)"),
            "new UserAccount(...)"
        );
        assert_eq!(evaluate_placeholders(&new_expr, "no placeholder"), "no placeholder");
    }
}
