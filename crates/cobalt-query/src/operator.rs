use serde::{Deserialize, Serialize};

/// Comparison applied by a [`Condition`](crate::Condition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Exact,
    IExact,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    /// Right-hand side is a boolean literal.
    IsNull,
    /// Right-hand side is an array literal.
    In,
    /// Right-hand side is a two-element array literal, bounds inclusive.
    Range,
    Regex,
    IRegex,
}
