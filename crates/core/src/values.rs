//! Comparison semantics for literal values and explicit sets.
//!
//! Every variant reduces the resolved target to a canonical "actual value"
//! string and compares it against its own expected value under the
//! attribute's operator.

use crate::adapter::{AstNode, NodeValue};
use crate::ast::{Operator, Value};
use crate::resolve::{evaluate_placeholders, resolve_path, to_canonical_string};
use std::cmp::Ordering;

impl Value {
    /// Checks the resolved target against this value under `operator`.
    /// `base` is the node the selector stage is currently matching, used by
    /// evaluated values and `{{path}}` placeholders.
    pub fn matches<N: AstNode>(
        &self,
        actual: &NodeValue<N>,
        base: &N,
        operator: Operator,
    ) -> bool {
        if let Value::Regexp { re, .. } = self {
            let actual = self.actual_value(actual);
            return match operator {
                Operator::NotMatch => !re.is_match(&actual),
                _ => re.is_match(&actual),
            };
        }

        let expected = self.expected_value(base);
        match operator {
            Operator::Includes => self.match_includes(actual, base, &expected),
            Operator::NotIncludes => !self.match_includes(actual, base, &expected),
            _ => {
                let actual = self.actual_value(actual);
                log::debug!("\"{}\" {} \"{}\"", actual, operator, expected);
                compare_strings(&actual, &expected, operator)
            }
        }
    }

    /// The expected value, computed against the base node.
    pub fn expected_value<N: AstNode>(&self, base: &N) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Identifier(name) => name.clone(),
            Value::Null => "null".to_string(),
            Value::Number(n) => n.to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::String(s) => evaluate_placeholders(base, s),
            Value::Regexp { pattern, .. } => pattern.clone(),
            Value::Evaluated(path) => {
                let resolved = resolve_path(&NodeValue::Node(base.clone()), path);
                to_canonical_string(&resolved)
            }
        }
    }

    /// The canonical form of the target; the string variant strips exactly
    /// one layer of surrounding quote characters (`"Murphy"` => `Murphy`).
    fn actual_value<N: AstNode>(&self, actual: &NodeValue<N>) -> String {
        let canonical = to_canonical_string(actual);
        match self {
            Value::String(_) => strip_quotes(&canonical),
            _ => canonical,
        }
    }

    fn match_includes<N: AstNode>(
        &self,
        actual: &NodeValue<N>,
        base: &N,
        expected: &str,
    ) -> bool {
        match actual {
            NodeValue::Array(items) => items
                .iter()
                .any(|item| self.matches(item, base, Operator::Equal)),
            _ => self.actual_value(actual) == expected,
        }
    }
}

/// Ordered-set and membership matching for an explicit array of values.
pub fn match_array<N: AstNode>(
    values: &[Value],
    actual: &NodeValue<N>,
    base: &N,
    operator: Operator,
) -> bool {
    match operator {
        Operator::In => match actual {
            NodeValue::Array(items) => items.iter().all(|item| {
                values
                    .iter()
                    .any(|value| value.matches(item, base, Operator::Equal))
            }),
            _ => values
                .iter()
                .any(|value| value.matches(actual, base, Operator::Equal)),
        },
        Operator::NotIn => match actual {
            NodeValue::Array(items) => items.iter().all(|item| {
                values
                    .iter()
                    .all(|value| value.matches(item, base, Operator::NotEqual))
            }),
            _ => values
                .iter()
                .all(|value| value.matches(actual, base, Operator::NotEqual)),
        },
        Operator::NotEqual => match actual {
            NodeValue::Array(items) => !elements_equal(values, items, base),
            _ => false,
        },
        // Ordered, length-checked, element-by-element equality.
        _ => match actual {
            NodeValue::Array(items) => elements_equal(values, items, base),
            _ => false,
        },
    }
}

fn elements_equal<N: AstNode>(values: &[Value], items: &[NodeValue<N>], base: &N) -> bool {
    values.len() == items.len()
        && values
            .iter()
            .zip(items)
            .all(|(value, item)| value.matches(item, base, Operator::Equal))
}

fn compare_strings(actual: &str, expected: &str, operator: Operator) -> bool {
    match operator {
        Operator::NotEqual => actual != expected,
        Operator::StartsWith => actual.starts_with(expected),
        Operator::EndsWith => actual.ends_with(expected),
        Operator::Contains => actual.contains(expected),
        Operator::GreaterThan => ordering(actual, expected) == Ordering::Greater,
        Operator::GreaterThanOrEqual => ordering(actual, expected) != Ordering::Less,
        Operator::LessThan => ordering(actual, expected) == Ordering::Less,
        Operator::LessThanOrEqual => ordering(actual, expected) != Ordering::Greater,
        _ => actual == expected,
    }
}

/// Numeric comparison when both canonical forms are numbers, lexicographic
/// otherwise.
pub fn ordering(actual: &str, expected: &str) -> Ordering {
    if let (Ok(a), Ok(e)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        a.partial_cmp(&e).unwrap_or(Ordering::Equal)
    } else {
        actual.cmp(expected)
    }
}

/// Strips one layer of surrounding quote characters, if present.
pub fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
