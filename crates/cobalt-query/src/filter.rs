use crate::expr::Expr;
use crate::operator::Lookup;

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Expr,
    pub lookup: Lookup,
    pub rhs: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// A predicate tree.
///
/// `Nothing` and `Everything` are constant nodes produced upstream when a
/// lookup is provably unsatisfiable (`pk IN ()`) or always true.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    Condition(Condition),
    Group(WhereGroup),
    Nothing,
    Everything,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereGroup {
    pub logical: LogicalOp,
    pub negated: bool,
    pub children: Vec<WhereNode>,
}

impl WhereNode {
    pub fn cond(lhs: Expr, lookup: Lookup, rhs: Expr) -> Self {
        WhereNode::Condition(Condition { lhs, lookup, rhs })
    }

    pub fn and(children: Vec<WhereNode>) -> Self {
        WhereNode::Group(WhereGroup {
            logical: LogicalOp::And,
            negated: false,
            children,
        })
    }

    pub fn or(children: Vec<WhereNode>) -> Self {
        WhereNode::Group(WhereGroup {
            logical: LogicalOp::Or,
            negated: false,
            children,
        })
    }

    /// Wrap `node` in a negated single-child group.
    pub fn not(node: WhereNode) -> Self {
        WhereNode::Group(WhereGroup {
            logical: LogicalOp::And,
            negated: true,
            children: vec![node],
        })
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            WhereNode::Condition(c) => c.lhs.contains_aggregate() || c.rhs.contains_aggregate(),
            WhereNode::Group(g) => g.children.iter().any(WhereNode::contains_aggregate),
            WhereNode::Nothing | WhereNode::Everything => false,
        }
    }

    /// Split into `(where, having)` parts.
    ///
    /// Children of a plain AND group are partitioned individually. An OR group
    /// or a negated group that references an aggregate anywhere moves to the
    /// HAVING side whole, since its branches cannot be evaluated apart.
    pub fn split_having(self) -> (Option<WhereNode>, Option<WhereNode>) {
        match self {
            WhereNode::Group(group) if group.logical == LogicalOp::And && !group.negated => {
                let mut where_part = Vec::new();
                let mut having_part = Vec::new();
                for child in group.children {
                    let (w, h) = child.split_having();
                    where_part.extend(w);
                    having_part.extend(h);
                }
                (collapse(where_part), collapse(having_part))
            }
            node if node.contains_aggregate() => (None, Some(node)),
            node => (Some(node), None),
        }
    }

    /// Visit every condition in the tree mutably.
    pub fn for_each_condition_mut(&mut self, f: &mut impl FnMut(&mut Condition)) {
        match self {
            WhereNode::Condition(c) => f(c),
            WhereNode::Group(g) => {
                for child in &mut g.children {
                    child.for_each_condition_mut(f);
                }
            }
            WhereNode::Nothing | WhereNode::Everything => {}
        }
    }
}

fn collapse(mut nodes: Vec<WhereNode>) -> Option<WhereNode> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(WhereNode::and(nodes)),
    }
}
