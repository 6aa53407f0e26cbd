//! Defines the compiled predicate tree a query string is parsed into.
//!
//! The tree is immutable after construction and safe to share across
//! threads for concurrent read-only matching. Its `Display` form is the
//! canonical textual spelling of the query: parsing that form back and
//! re-serializing yields the same string.

use regex::Regex;
use std::fmt;

/// An ordered list of alternative expressions (comma syntax).
///
/// Matching unions results across alternatives in declaration order;
/// duplicates are kept if a node satisfies multiple alternatives.
#[derive(Debug, Clone)]
pub struct ExpressionList {
    pub expressions: Vec<Expression>,
}

/// A selector stage plus an optional continuation searched within the
/// reachable subtree of each stage match (whitespace descendant chaining).
#[derive(Debug, Clone)]
pub struct Expression {
    pub selector: Selector,
    pub rest: Option<Box<Expression>>,
}

/// One stage of matching logic.
///
/// A relationship or goto-scope prefix wraps the selector that follows it
/// as `rest`; a plain stage carries the basic selector, pseudo-class and
/// position filter directly.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    pub goto_scope: Option<String>,
    pub relationship: Option<Relationship>,
    pub rest: Option<Box<Selector>>,
    pub basic_selector: Option<BasicSelector>,
    pub pseudo: Option<Pseudo>,
    pub position: Option<Position>,
}

/// Node-type equality combined with a conjunction of attribute predicates.
#[derive(Debug, Clone)]
pub struct BasicSelector {
    pub node_type: String,
    pub attributes: Vec<Attribute>,
}

/// A single `[key operator value]` predicate.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub key: String,
    pub operator: Operator,
    pub value: AttributeValue,
}

/// The value side of an attribute predicate.
///
/// A literal, an explicit set, or a nested selector compared structurally;
/// keeping these as one sum type avoids a shared base between fundamentally
/// different comparison strategies.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Literal(Value),
    Array(Vec<Value>),
    Selector(Box<Selector>),
}

/// An atom value in a query: the closed set of literal variants.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Identifier(String),
    Null,
    Number(f64),
    Undefined,
    String(String),
    Regexp { pattern: String, re: Regex },
    /// A string containing `{{path}}` placeholders resolved at match time
    /// against the base node.
    Evaluated(String),
}

/// The operator of an attribute predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Match,
    NotMatch,
    In,
    NotIn,
    Includes,
    NotIncludes,
}

/// The relationship between a node and the selector that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// `>`: direct children only.
    Child,
    /// `+`: the immediately following sibling only.
    NextSibling,
    /// `~`: every following sibling.
    SubsequentSibling,
}

/// A position filter applied after all other filtering of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    FirstChild,
    LastChild,
}

/// A pseudo-class with its nested selector.
#[derive(Debug, Clone)]
pub struct Pseudo {
    pub kind: PseudoKind,
    pub selector: Box<Selector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoKind {
    /// `:has(S)`: true iff `S` matches somewhere at or below the candidate.
    Has,
    /// `:not_has(S)`: the exact negation of `:has(S)`.
    NotHas,
}

impl Value {
    /// Builds a `Regexp` value, compiling the pattern once.
    pub fn regexp(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Value::Regexp {
            pattern: pattern.to_string(),
            re: Regex::new(pattern)?,
        })
    }
}

// --- Canonical serialization ---

impl fmt::Display for ExpressionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.expressions.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(rest) = &self.rest {
            write!(f, " {}", rest)?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.goto_scope {
            write!(f, "{} ", scope)?;
        }
        if let Some(relationship) = &self.relationship {
            write!(f, "{} ", relationship)?;
        }
        if let Some(rest) = &self.rest {
            write!(f, "{}", rest)?;
        }
        if let Some(basic_selector) = &self.basic_selector {
            write!(f, "{}", basic_selector)?;
        }
        if let Some(pseudo) = &self.pseudo {
            write!(f, "{}", pseudo)?;
        }
        if let Some(position) = &self.position {
            write!(f, ":{}", position)?;
        }
        Ok(())
    }
}

impl fmt::Display for BasicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.node_type)?;
        for attribute in &self.attributes {
            write!(f, "[{}]", attribute)?;
        }
        Ok(())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::In => write!(f, "{} IN ({})", self.key, self.value),
            Operator::NotIn => write!(f, "{} NOT IN ({})", self.key, self.value),
            Operator::Includes => write!(f, "{} INCLUDES {}", self.key, self.value),
            Operator::NotIncludes => write!(f, "{} NOT INCLUDES {}", self.key, self.value),
            // An explicit array under a symbolic operator keeps its parens.
            _ if matches!(self.value, AttributeValue::Array(_)) => {
                write!(f, "{}{}({})", self.key, self.operator, self.value)
            }
            _ => write!(f, "{}{}{}", self.key, self.operator, self.value),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Literal(value) => write!(f, "{}", value),
            AttributeValue::Array(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", rendered.join(" "))
            }
            AttributeValue::Selector(selector) => write!(f, "{}", selector),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Identifier(name) => write!(f, "{}", name),
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Undefined => write!(f, "undefined"),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Regexp { pattern, .. } => write!(f, "/{}/", pattern),
            Value::Evaluated(template) => write!(f, "{{{{{}}}}}", template),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::Contains => "*=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Match => "=~",
            Operator::NotMatch => "!~",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Includes => "INCLUDES",
            Operator::NotIncludes => "NOT INCLUDES",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Relationship::Child => ">",
            Relationship::NextSibling => "+",
            Relationship::SubsequentSibling => "~",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::FirstChild => write!(f, "first-child"),
            Position::LastChild => write!(f, "last-child"),
        }
    }
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PseudoKind::Has => "has",
            PseudoKind::NotHas => "not_has",
        };
        write!(f, ":{}({})", kind, self.selector)
    }
}
