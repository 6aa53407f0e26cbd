//! The traversal and matching engine for executing a compiled query
//! against a generic `AstNode` tree.

use crate::adapter::{AstNode, NodeValue};
use crate::ast::{
    Attribute, AttributeValue, BasicSelector, Expression, ExpressionList, Operator, Position,
    PseudoKind, Relationship, Selector,
};
use crate::resolve::resolve_path;
use crate::values;

/// Options controlling a single `query_nodes` call.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Consider the root node itself as a candidate.
    pub including_self: bool,
    /// Terminate a branch's descent after its first hit.
    pub stop_at_first_match: bool,
    /// Descend beyond immediate children.
    pub recursive: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            including_self: true,
            stop_at_first_match: false,
            recursive: true,
        }
    }
}

/// The control-flow signal of the recursive walk, so that early exit
/// composes cleanly with recursion.
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Depth-first pre-order traversal over adapter children.
pub(crate) fn walk<N: AstNode>(node: &N, visit: &mut impl FnMut(&N) -> Flow) -> Flow {
    for child in node.children() {
        if let Flow::Stop = visit(&child) {
            return Flow::Stop;
        }
        if let Flow::Stop = walk(&child, visit) {
            return Flow::Stop;
        }
    }
    Flow::Continue
}

impl ExpressionList {
    /// Concatenates each alternative's results in declaration order.
    /// Duplicates are kept if a node satisfies multiple alternatives.
    pub fn query_nodes<N: AstNode>(&self, node: &N, options: QueryOptions) -> Vec<N> {
        self.expressions
            .iter()
            .flat_map(|expression| expression.query_nodes(node, options))
            .collect()
    }

    /// True iff the node (or a direct child) matches any alternative.
    pub fn match_node<N: AstNode>(&self, node: &N) -> bool {
        let options = QueryOptions {
            including_self: true,
            stop_at_first_match: true,
            recursive: false,
        };
        !self.query_nodes(node, options).is_empty()
    }
}

impl Expression {
    pub fn query_nodes<N: AstNode>(&self, node: &N, options: QueryOptions) -> Vec<N> {
        self.query_value(&NodeValue::Node(node.clone()), options)
    }

    /// Runs the selector stage, then re-runs the continuation within the
    /// reachable subtree of each stage match.
    pub(crate) fn query_value<N: AstNode>(
        &self,
        target: &NodeValue<N>,
        options: QueryOptions,
    ) -> Vec<N> {
        let matching_nodes = self.selector.query_value(target, options);
        let Some(rest) = &self.rest else {
            return matching_nodes;
        };
        matching_nodes
            .into_iter()
            .flat_map(|matching_node| rest.query_value(&NodeValue::Node(matching_node), options))
            .collect()
    }
}

impl Selector {
    /// Checks if the node matches this selector stage.
    pub fn matches<N: AstNode>(&self, node: &N, base: &N) -> bool {
        self.match_value(&NodeValue::Node(node.clone()), base, Operator::Equal)
    }

    /// The guard against primitives matters when a nested-selector attribute
    /// value is evaluated against a scalar resolution result.
    pub(crate) fn match_value<N: AstNode>(
        &self,
        target: &NodeValue<N>,
        base: &N,
        operator: Operator,
    ) -> bool {
        let NodeValue::Node(node) = target else {
            return false;
        };
        let basic_matched = match &self.basic_selector {
            None => true,
            Some(basic_selector) => {
                let matched = basic_selector.matches(node, base);
                if operator == Operator::NotEqual { !matched } else { matched }
            }
        };
        basic_matched && self.match_pseudo(node)
    }

    fn match_pseudo<N: AstNode>(&self, node: &N) -> bool {
        let Some(pseudo) = &self.pseudo else {
            return true;
        };
        let found = !pseudo
            .selector
            .query_nodes(node, QueryOptions::default())
            .is_empty();
        match pseudo.kind {
            PseudoKind::Has => found,
            PseudoKind::NotHas => !found,
        }
    }

    pub fn query_nodes<N: AstNode>(&self, node: &N, options: QueryOptions) -> Vec<N> {
        self.query_value(&NodeValue::Node(node.clone()), options)
    }

    pub(crate) fn query_value<N: AstNode>(
        &self,
        target: &NodeValue<N>,
        options: QueryOptions,
    ) -> Vec<N> {
        if self.relationship.is_some() {
            if let NodeValue::Node(node) = target {
                return self.find_nodes_by_relationship(node);
            }
        }

        // Wildcard key expansion and scoped collections fan out here.
        if let NodeValue::Array(items) = target {
            return items
                .iter()
                .flat_map(|item| self.query_value(item, options))
                .collect();
        }

        if let Some(scope) = &self.goto_scope {
            // The jump replaces ordinary descent at this step.
            if matches!(target, NodeValue::Node(_)) {
                let scoped = resolve_path(target, scope);
                if let Some(rest) = &self.rest {
                    if scoped.is_node() {
                        return rest.query_value(&scoped, options);
                    }
                }
            }
            return vec![];
        }

        let mut nodes: Vec<N> = Vec::new();
        if let NodeValue::Node(node) = target {
            if options.including_self && self.matches(node, node) {
                nodes.push(node.clone());
                if options.stop_at_first_match {
                    return self.filter_by_position(nodes);
                }
            }
            if self.basic_selector.is_some() {
                if options.recursive {
                    walk(node, &mut |child| {
                        if self.matches(child, child) {
                            nodes.push(child.clone());
                            if options.stop_at_first_match {
                                return Flow::Stop;
                            }
                        }
                        Flow::Continue
                    });
                } else {
                    for child in node.children() {
                        if self.matches(&child, &child) {
                            nodes.push(child);
                            if options.stop_at_first_match {
                                break;
                            }
                        }
                    }
                }
            }
        }
        self.filter_by_position(nodes)
    }

    fn find_nodes_by_relationship<N: AstNode>(&self, node: &N) -> Vec<N> {
        let Some(rest) = &self.rest else {
            return vec![];
        };
        let mut nodes: Vec<N> = Vec::new();
        match self.relationship {
            Some(Relationship::Child) => {
                for child in node.children() {
                    if rest.matches(&child, &child) {
                        nodes.push(child);
                    }
                }
            }
            Some(Relationship::NextSibling) => {
                if let Some(sibling) = node.siblings().into_iter().next() {
                    if rest.matches(&sibling, &sibling) {
                        nodes.push(sibling);
                    }
                }
            }
            Some(Relationship::SubsequentSibling) => {
                for sibling in node.siblings() {
                    if rest.matches(&sibling, &sibling) {
                        nodes.push(sibling);
                    }
                }
            }
            None => {}
        }
        // The relationship operator defers its predicate to the continuation,
        // including the continuation's position filter.
        rest.filter_by_position(nodes)
    }

    fn filter_by_position<N>(&self, nodes: Vec<N>) -> Vec<N> {
        match self.position {
            None => nodes,
            Some(Position::FirstChild) => nodes.into_iter().take(1).collect(),
            Some(Position::LastChild) => {
                let skip = nodes.len().saturating_sub(1);
                nodes.into_iter().skip(skip).collect()
            }
        }
    }
}

impl BasicSelector {
    /// Exact, case-sensitive node-type equality plus attribute conjunction.
    pub fn matches<N: AstNode>(&self, node: &N, base: &N) -> bool {
        node.node_type() == self.node_type
            && self
                .attributes
                .iter()
                .all(|attribute| attribute.matches(node, base))
    }
}

impl Attribute {
    pub fn matches<N: AstNode>(&self, node: &N, base: &N) -> bool {
        let actual = resolve_path(&NodeValue::Node(node.clone()), &self.key);
        log::debug!("{} {} {}", self.key, self.operator, self.value);
        match &self.value {
            AttributeValue::Literal(value) => value.matches(&actual, base, self.operator),
            AttributeValue::Array(values) => {
                values::match_array(values, &actual, base, self.operator)
            }
            AttributeValue::Selector(selector) => self.match_selector(selector, &actual, base),
        }
    }

    fn match_selector<N: AstNode>(
        &self,
        selector: &Selector,
        actual: &NodeValue<N>,
        base: &N,
    ) -> bool {
        match self.operator {
            Operator::Includes => match actual {
                NodeValue::Array(items) => items
                    .iter()
                    .any(|item| selector.match_value(item, base, Operator::Equal)),
                _ => selector.match_value(actual, base, Operator::Equal),
            },
            Operator::NotIncludes => match actual {
                NodeValue::Array(items) => !items
                    .iter()
                    .any(|item| selector.match_value(item, base, Operator::Equal)),
                _ => !selector.match_value(actual, base, Operator::Equal),
            },
            operator => selector.match_value(actual, base, operator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::{MockNode, create_test_tree};
    use crate::parser::parse;

    fn query<'a>(nql: &str, node: MockNode<'a>) -> Vec<MockNode<'a>> {
        parse(nql).unwrap().query_nodes(&node, QueryOptions::default())
    }

    fn ids(nodes: &[MockNode<'_>]) -> Vec<usize> {
        nodes.iter().map(|node| node.id).collect()
    }

    #[test]
    fn test_descendant_chain() {
        let tree = create_test_tree();
        // Three property members, constructor and methods excluded.
        let results = query(".ClassDeclaration .PropertyDeclaration", tree.node(0));
        assert_eq!(ids(&results), vec![5, 8, 11]);
    }

    #[test]
    fn test_attribute_conjunction() {
        let tree = create_test_tree();
        let results = query(
            ".NewExpression[arguments.0=\"Murphy\"][arguments.1=1][arguments.2=true]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![25]);
    }

    #[test]
    fn test_not_in_set() {
        let tree = create_test_tree();
        // UserAccount is not in the set, so the class matches.
        let results = query(".ClassDeclaration[name NOT IN (User Account)]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
        let results = query(
            ".ClassDeclaration[name IN (User UserAccount)]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![3]);
    }

    #[test]
    fn test_next_sibling_relationship() {
        let tree = create_test_tree();
        // Only the method immediately following the constructor.
        let results = query(
            ".MethodDefinition[key=constructor] + .MethodDefinition",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![16]);
    }

    #[test]
    fn test_subsequent_sibling_relationship() {
        let tree = create_test_tree();
        let results = query(
            ".MethodDefinition[key=constructor] ~ .MethodDefinition",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![16, 18]);
    }

    #[test]
    fn test_child_relationship() {
        let tree = create_test_tree();
        let results = query(".ClassDeclaration > .PropertyDeclaration", tree.node(0));
        assert_eq!(ids(&results), vec![5, 8, 11]);
        // Deeper descendants are not direct children of the source file.
        let results = query(".SourceFile > .PropertyDeclaration", tree.node(0));
        assert!(results.is_empty());
    }

    #[test]
    fn test_pseudo_classes() {
        let tree = create_test_tree();
        let results = query(
            ".ClassDeclaration:has(.MethodDefinition[key=constructor])",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![3]);
        let results = query(
            ".ClassDeclaration:not_has(.MethodDefinition[key=constructor])",
            tree.node(0),
        );
        assert!(results.is_empty());
        let results = query(
            ".InterfaceDeclaration:not_has(.MethodDefinition)",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![1]);
    }

    #[test]
    fn test_position_filters() {
        let tree = create_test_tree();
        let results = query(".PropertyDeclaration:first-child", tree.node(0));
        assert_eq!(ids(&results), vec![5]);
        let results = query(".PropertyDeclaration:last-child", tree.node(0));
        assert_eq!(ids(&results), vec![11]);
        // Empty candidate set stays empty.
        let results = query(".EnumDeclaration:first-child", tree.node(0));
        assert!(results.is_empty());
    }

    #[test]
    fn test_position_after_relationship() {
        let tree = create_test_tree();
        let results = query(
            ".MethodDefinition[key=constructor] ~ .MethodDefinition:last-child",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![18]);
    }

    #[test]
    fn test_goto_scope() {
        let tree = create_test_tree();
        let results = query(".ClassDeclaration members .MethodDefinition", tree.node(0));
        assert_eq!(ids(&results), vec![14, 16, 18]);
        // A scope that resolves to nothing yields nothing.
        let results = query(".ClassDeclaration missing .MethodDefinition", tree.node(0));
        assert!(results.is_empty());
    }

    #[test]
    fn test_union_keeps_duplicates() {
        let tree = create_test_tree();
        let results = query(
            ".ClassDeclaration, .ClassDeclaration[name=UserAccount]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![3, 3]);
    }

    #[test]
    fn test_including_self_option() {
        let tree = create_test_tree();
        let expression = parse(".ClassDeclaration").unwrap();
        let class = tree.node(3);
        let with_self = expression.query_nodes(&class, QueryOptions::default());
        assert_eq!(ids(&with_self), vec![3]);
        let without_self = expression.query_nodes(
            &class,
            QueryOptions {
                including_self: false,
                ..Default::default()
            },
        );
        assert!(without_self.is_empty());
        // Descendants still qualify without the root.
        let expression = parse(".PropertyDeclaration").unwrap();
        let without_self = expression.query_nodes(
            &class,
            QueryOptions {
                including_self: false,
                ..Default::default()
            },
        );
        assert_eq!(ids(&without_self), vec![5, 8, 11]);
    }

    #[test]
    fn test_stop_at_first_match_option() {
        let tree = create_test_tree();
        let expression = parse(".PropertyDeclaration").unwrap();
        let all = expression.query_nodes(&tree.node(0), QueryOptions::default());
        let first = expression.query_nodes(
            &tree.node(0),
            QueryOptions {
                stop_at_first_match: true,
                ..Default::default()
            },
        );
        assert_eq!(ids(&first), vec![5]);
        assert!(first.len() <= all.len());
        assert_eq!(ids(&all)[..1], ids(&first)[..]);
    }

    #[test]
    fn test_recursive_option() {
        let tree = create_test_tree();
        let expression = parse(".PropertyDeclaration").unwrap();
        let direct_only = expression.query_nodes(
            &tree.node(0),
            QueryOptions {
                recursive: false,
                ..Default::default()
            },
        );
        // Property declarations are grandchildren of the source file.
        assert!(direct_only.is_empty());
        let direct_only = expression.query_nodes(
            &tree.node(3),
            QueryOptions {
                recursive: false,
                ..Default::default()
            },
        );
        assert_eq!(ids(&direct_only), vec![5, 8, 11]);
    }

    #[test]
    fn test_match_node_equals_restricted_query() {
        let tree = create_test_tree();
        let expression = parse(".ClassDeclaration[name=UserAccount]").unwrap();
        assert!(expression.match_node(&tree.node(3)));
        assert!(!expression.match_node(&tree.node(1)));
        let options = QueryOptions {
            including_self: true,
            stop_at_first_match: false,
            recursive: false,
        };
        for id in [0, 1, 3, 25] {
            let node = tree.node(id);
            assert_eq!(
                expression.match_node(&node),
                !expression.query_nodes(&node, options).is_empty()
            );
        }
    }

    #[test]
    fn test_wildcard_key() {
        let tree = create_test_tree();
        let results = query(
            ".NewExpression[arguments.*.nodeType=(StringLiteral NumericLiteral TrueKeyword)]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![25]);
    }

    #[test]
    fn test_nested_selector_value() {
        let tree = create_test_tree();
        let results = query(
            ".VariableDeclaration[initializer=.NewExpression[expression=UserAccount]]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![21]);
        let results = query(
            ".VariableDeclaration[initializer!=.CallExpression]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![21]);
    }

    #[test]
    fn test_includes_with_selector_value() {
        let tree = create_test_tree();
        let results = query(
            ".NewExpression[arguments INCLUDES .StringLiteral[text=Murphy]]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![25]);
        let results = query(
            ".NewExpression[arguments NOT INCLUDES .RegularExpressionLiteral]",
            tree.node(0),
        );
        assert_eq!(ids(&results), vec![25]);
    }

    #[test]
    fn test_evaluated_value() {
        let tree = create_test_tree();
        let results = query(".NewExpression[expression={{expression}}]", tree.node(0));
        assert_eq!(ids(&results), vec![25]);
    }

    #[test]
    fn test_regex_operators() {
        let tree = create_test_tree();
        let results = query(".ClassDeclaration[name=~/^User/]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
        let results = query(".ClassDeclaration[name!~/^Account/]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
    }

    #[test]
    fn test_comparison_operators() {
        let tree = create_test_tree();
        let results = query(".NewExpression[arguments.length>2]", tree.node(0));
        assert_eq!(ids(&results), vec![25]);
        let results = query(".NewExpression[arguments.length>=3]", tree.node(0));
        assert_eq!(ids(&results), vec![25]);
        let results = query(".NewExpression[arguments.length<3]", tree.node(0));
        assert!(results.is_empty());
        let results = query(".ClassDeclaration[name^=User]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
        let results = query(".ClassDeclaration[name$=Account]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
        let results = query(".ClassDeclaration[name*=erAcc]", tree.node(0));
        assert_eq!(ids(&results), vec![3]);
    }
}
