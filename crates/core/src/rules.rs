//! The rules front end: a JSON object of key paths and expected values as
//! an alternative spelling for simple queries.

use crate::adapter::{AstNode, NodeValue};
use crate::ast::Operator;
use crate::engine::{Flow, QueryOptions, walk};
use crate::error::QueryError;
use crate::resolve::{resolve_path, to_canonical_string};
use crate::values::ordering;
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static EVALUATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{(.*)\}\}$").unwrap());

/// The trailing key segments recognized as operators.
const KEYWORDS: [(&str, Operator); 9] = [
    ("not", Operator::NotEqual),
    ("in", Operator::In),
    ("notIn", Operator::NotIn),
    ("gt", Operator::GreaterThan),
    ("gte", Operator::GreaterThanOrEqual),
    ("lt", Operator::LessThan),
    ("lte", Operator::LessThanOrEqual),
    ("includes", Operator::Includes),
    ("notIncludes", Operator::NotIncludes),
];

/// A compiled rules object: the nested JSON flattened into dot-joined key
/// paths, each with its operator and expected value.
#[derive(Debug, Clone)]
pub struct NodeRules {
    entries: Vec<RuleEntry>,
}

#[derive(Debug, Clone)]
struct RuleEntry {
    key: String,
    operator: Operator,
    expected: Json,
}

impl NodeRules {
    pub fn new(rules: Json) -> Result<Self, QueryError> {
        let map = match rules {
            Json::Object(map) => map,
            other => {
                return Err(QueryError::Rules(format!(
                    "expected an object, got {}",
                    other
                )));
            }
        };
        let mut entries = Vec::new();
        for (key, value) in map {
            flatten(&key, value, &mut entries);
        }
        Ok(Self { entries })
    }

    pub fn query_nodes<N: AstNode>(&self, node: &N, options: QueryOptions) -> Vec<N> {
        let mut nodes: Vec<N> = Vec::new();
        if options.including_self && self.match_node(node) {
            nodes.push(node.clone());
            if options.stop_at_first_match {
                return nodes;
            }
        }
        if options.recursive {
            walk(node, &mut |child| {
                if self.match_node(child) {
                    nodes.push(child.clone());
                    if options.stop_at_first_match {
                        return Flow::Stop;
                    }
                }
                Flow::Continue
            });
        } else {
            for child in node.children() {
                if self.match_node(&child) {
                    nodes.push(child);
                    if options.stop_at_first_match {
                        break;
                    }
                }
            }
        }
        nodes
    }

    /// True iff the node satisfies every rule entry.
    pub fn match_node<N: AstNode>(&self, node: &N) -> bool {
        self.entries.iter().all(|entry| entry.matches(node))
    }
}

/// Nested objects become dot-joined keys; arrays stay whole as expected
/// values. A trailing keyword segment becomes the entry's operator.
fn flatten(prefix: &str, value: Json, entries: &mut Vec<RuleEntry>) {
    match value {
        Json::Object(map) => {
            for (key, value) in map {
                flatten(&format!("{}.{}", prefix, key), value, entries);
            }
        }
        expected => {
            let (key, operator) = split_key_operator(prefix);
            entries.push(RuleEntry {
                key,
                operator,
                expected,
            });
        }
    }
}

fn split_key_operator(multi_key: &str) -> (String, Operator) {
    if let Some((key, last)) = multi_key.rsplit_once('.') {
        for (keyword, operator) in KEYWORDS {
            if last == keyword {
                return (key.to_string(), operator);
            }
        }
    }
    (multi_key.to_string(), Operator::Equal)
}

impl RuleEntry {
    fn matches<N: AstNode>(&self, node: &N) -> bool {
        let actual = resolve_path(&NodeValue::Node(node.clone()), &self.key);
        log::debug!("{} {} {}", self.key, self.operator, self.expected);
        match self.operator {
            Operator::NotEqual => !match_value(&actual, &self.expected, node),
            Operator::In => match &self.expected {
                Json::Array(items) => items.iter().any(|item| match_value(&actual, item, node)),
                expected => match_value(&actual, expected, node),
            },
            Operator::NotIn => match &self.expected {
                Json::Array(items) => items.iter().all(|item| !match_value(&actual, item, node)),
                expected => !match_value(&actual, expected, node),
            },
            Operator::GreaterThan => self.compare(&actual, node) == Ordering::Greater,
            Operator::GreaterThanOrEqual => self.compare(&actual, node) != Ordering::Less,
            Operator::LessThan => self.compare(&actual, node) == Ordering::Less,
            Operator::LessThanOrEqual => self.compare(&actual, node) != Ordering::Greater,
            Operator::Includes => match &actual {
                NodeValue::Array(items) => {
                    items.iter().any(|item| match_value(item, &self.expected, node))
                }
                actual => match_value(actual, &self.expected, node),
            },
            Operator::NotIncludes => match &actual {
                NodeValue::Array(items) => {
                    !items.iter().any(|item| match_value(item, &self.expected, node))
                }
                actual => !match_value(actual, &self.expected, node),
            },
            _ => match_value(&actual, &self.expected, node),
        }
    }

    fn compare<N: AstNode>(&self, actual: &NodeValue<N>, base: &N) -> Ordering {
        ordering(
            &to_canonical_string(actual),
            &expected_string(&self.expected, base),
        )
    }
}

fn match_value<N: AstNode>(actual: &NodeValue<N>, expected: &Json, base: &N) -> bool {
    if let Json::Array(items) = expected {
        let NodeValue::Array(actual_items) = actual else {
            return false;
        };
        return actual_items.len() == items.len()
            && actual_items
                .iter()
                .zip(items)
                .all(|(item, expected)| match_value(item, expected, base));
    }
    let expected_string = expected_string(expected, base);
    let actual_string = to_canonical_string(actual);
    // A quoted source matches the bare expected spelling.
    actual_string == expected_string
        || actual_string == format!("\"{}\"", expected_string)
        || actual_string == format!("'{}'", expected_string)
}

/// A string expected value that is exactly one `{{path}}` template is
/// resolved against the node under test.
fn expected_string<N: AstNode>(expected: &Json, base: &N) -> String {
    match expected {
        Json::String(s) => match EVALUATED_RE.captures(s) {
            Some(captures) => {
                let resolved = resolve_path(&NodeValue::Node(base.clone()), captures[1].trim());
                to_canonical_string(&resolved)
            }
            None => s.clone(),
        },
        Json::Null => "null".to_string(),
        other => other.to_string(),
    }
}
