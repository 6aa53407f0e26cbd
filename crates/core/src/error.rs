use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// The query string is lexically or grammatically malformed. Carries
    /// the first few diagnostic lines of the underlying parser failure.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// The declarative rule mapping is not usable (e.g. not a JSON object).
    #[error("Invalid rules: {0}")]
    Rules(String),
}
