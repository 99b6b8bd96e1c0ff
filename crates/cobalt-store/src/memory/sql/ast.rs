use bson::Bson;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectStmt {
    pub distinct: bool,
    pub projection: Projection,
    pub from: FromClause,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<(Expr, bool)>,
    pub offset_limit: Option<(Expr, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    Star,
    Items(Vec<SelectItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Source {
    Container(String),
    Subquery(Box<SelectStmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FromClause {
    pub source: Source,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JoinClause {
    /// `JOIN binding IN path`: one output row per array element.
    In { binding: String, path: Expr },
    /// Parenthesized restriction applied to the joined rows.
    Filter(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathSegment {
    Field(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Bson),
    Undefined,
    Param(String),
    Path {
        root: String,
        segments: Vec<PathSegment>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Call {
        /// Upper-cased function name.
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
}

pub(crate) const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

impl Expr {
    pub(crate) fn is_aggregate_call(&self) -> bool {
        matches!(self, Expr::Call { name, .. } if AGGREGATES.contains(&name.as_str()))
    }

    pub(crate) fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Call { args, .. } => {
                self.is_aggregate_call() || args.iter().any(Expr::contains_aggregate)
            }
            Expr::Unary(_, e) => e.contains_aggregate(),
            Expr::Binary(_, l, r) => l.contains_aggregate() || r.contains_aggregate(),
            Expr::In { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate)
            }
            Expr::Literal(_) | Expr::Undefined | Expr::Param(_) | Expr::Path { .. } => false,
        }
    }

    /// Property name the store gives an un-aliased projection of this expression.
    pub(crate) fn implicit_name(&self) -> Option<&str> {
        match self {
            Expr::Path { root, segments } => match segments.last() {
                Some(PathSegment::Field(name)) => Some(name),
                Some(PathSegment::Index(_)) => None,
                None => Some(root),
            },
            _ => None,
        }
    }
}
