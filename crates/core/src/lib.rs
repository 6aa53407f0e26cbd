pub mod adapter;
pub mod ast;
pub mod engine;
pub mod error;
pub mod parser;
pub mod resolve;
pub mod rules;
pub mod values;

pub use adapter::{AstNode, NodeValue};
pub use ast::{
    Attribute, AttributeValue, BasicSelector, Expression, ExpressionList, Operator, Position,
    Pseudo, PseudoKind, Relationship, Selector, Value,
};
pub use engine::QueryOptions;
pub use error::QueryError;
pub use parser::parse;
pub use rules::NodeRules;

// Re-export test utilities for integration testing in downstream crates
pub use adapter::tests;
