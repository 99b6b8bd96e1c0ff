use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::sort::OrderBy;

/// A column of a collection, addressed as `table.column` in rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// `COUNT(1)` when `arg` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub arg: Option<Box<Expr>>,
    pub distinct: bool,
}

/// A windowed expression (`func OVER (PARTITION BY .. ORDER BY ..)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub func: Box<Expr>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl ArithmeticOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::Concat => "||",
        }
    }
}

/// An expression node of a query plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    /// A literal, always bound as a query parameter.
    Value(Bson),
    Aggregate(Aggregate),
    Window(Window),
    Binary {
        lhs: Box<Expr>,
        op: ArithmeticOp,
        rhs: Box<Expr>,
    },
    /// A scalar function call such as `LOWER(x)`.
    Func { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn col(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(table, column))
    }

    pub fn value(value: impl Into<Bson>) -> Self {
        Expr::Value(value.into())
    }

    pub fn count_all() -> Self {
        Expr::Aggregate(Aggregate {
            func: AggregateFunc::Count,
            arg: None,
            distinct: false,
        })
    }

    pub fn aggregate(func: AggregateFunc, arg: Expr) -> Self {
        Expr::Aggregate(Aggregate {
            func,
            arg: Some(Box::new(arg)),
            distinct: false,
        })
    }

    pub fn binary(lhs: Expr, op: ArithmeticOp, rhs: Expr) -> Self {
        Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate(_) => true,
            Expr::Column(_) | Expr::Value(_) => false,
            // The aggregate inside a window is scoped to the window.
            Expr::Window(_) => false,
            Expr::Binary { lhs, rhs, .. } => lhs.contains_aggregate() || rhs.contains_aggregate(),
            Expr::Func { args, .. } => args.iter().any(Expr::contains_aggregate),
        }
    }

    pub fn contains_over_clause(&self) -> bool {
        match self {
            Expr::Window(_) => true,
            Expr::Column(_) | Expr::Value(_) => false,
            Expr::Aggregate(agg) => agg.arg.as_deref().is_some_and(Expr::contains_over_clause),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.contains_over_clause() || rhs.contains_over_clause()
            }
            Expr::Func { args, .. } => args.iter().any(Expr::contains_over_clause),
        }
    }
}

impl From<ColumnRef> for Expr {
    fn from(c: ColumnRef) -> Self {
        Expr::Column(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_detection_walks_binary_nodes() {
        let expr = Expr::binary(
            Expr::col("book", "pages"),
            ArithmeticOp::Add,
            Expr::aggregate(AggregateFunc::Sum, Expr::col("book", "pages")),
        );
        assert!(expr.contains_aggregate());
        assert!(!expr.contains_over_clause());
    }

    #[test]
    fn window_is_an_over_clause_not_an_aggregate() {
        let expr = Expr::Window(Window {
            func: Box::new(Expr::count_all()),
            partition_by: vec![Expr::col("book", "author_id")],
            order_by: vec![],
        });
        assert!(expr.contains_over_clause());
        assert!(!expr.contains_aggregate());
    }
}
