use bson::Bson;
use cobalt_query::{Condition, Expr, Lookup, WhereNode};

use super::{Fragment, Render, stringify_partition_key};
use crate::error::DbError;

/// A compiled predicate, with the constant cases kept apart so callers can
/// skip the store entirely.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Clause {
    Sql(Fragment),
    /// Matches no rows.
    Never,
    /// Matches every row; no WHERE clause is needed.
    Always,
}

impl Clause {
    /// The clause as a boolean expression, constants included.
    pub(crate) fn into_fragment(self) -> Fragment {
        match self {
            Clause::Sql(fragment) => fragment,
            Clause::Never => Fragment::new("false"),
            Clause::Always => Fragment::new("true"),
        }
    }
}

/// Compile a mutation filter: partition-key literals stringified, a missing
/// filter matching everything.
pub(crate) fn compile_filter(
    filter: Option<&WhereNode>,
    table: &str,
    partition_key: &str,
) -> Result<Clause, DbError> {
    match filter {
        Some(filter) => {
            let mut filter = filter.clone();
            stringify_partition_key(&mut filter, table, partition_key);
            compile_where(&filter)
        }
        None => Ok(Clause::Always),
    }
}

pub(crate) fn compile_where(node: &WhereNode) -> Result<Clause, DbError> {
    match node {
        WhereNode::Nothing => Ok(Clause::Never),
        WhereNode::Everything => Ok(Clause::Always),
        WhereNode::Condition(condition) => render_clause(condition),
        WhereNode::Group(group) => {
            let and = group.logical == cobalt_query::LogicalOp::And;
            let mut parts = Vec::new();
            for child in &group.children {
                match compile_where(child)? {
                    Clause::Sql(fragment) => parts.push(fragment),
                    Clause::Never if and => return Ok(negate(Clause::Never, group.negated)),
                    Clause::Always if !and => return Ok(negate(Clause::Always, group.negated)),
                    // Neutral for this connective.
                    Clause::Never | Clause::Always => {}
                }
            }

            let clause = match parts.len() {
                // An empty AND is true; an OR whose branches all dropped out never matches.
                0 if and => Clause::Always,
                0 => Clause::Never,
                1 => Clause::Sql(parts.remove(0)),
                _ => Clause::Sql(
                    Fragment::join(parts, &format!(" {} ", group.logical.as_str()))
                        .parenthesized(),
                ),
            };
            Ok(negate(clause, group.negated))
        }
    }
}

fn negate(clause: Clause, negated: bool) -> Clause {
    if !negated {
        return clause;
    }
    match clause {
        Clause::Never => Clause::Always,
        Clause::Always => Clause::Never,
        Clause::Sql(fragment) => {
            let mut out = Fragment::new("NOT ");
            out.append(fragment.parenthesized());
            Clause::Sql(out)
        }
    }
}

/// `IN ()` can never match; everything else renders to text.
fn render_clause(condition: &Condition) -> Result<Clause, DbError> {
    if condition.lookup == Lookup::In {
        if let Expr::Value(Bson::Array(items)) = &condition.rhs {
            if items.is_empty() {
                return Ok(Clause::Never);
            }
        }
    }
    Ok(Clause::Sql(render_condition(condition)?))
}

pub(crate) fn render_condition(condition: &Condition) -> Result<Fragment, DbError> {
    let lhs = condition.lhs.render()?;

    let binary = |op: &str| -> Result<Fragment, DbError> {
        let mut out = lhs.clone();
        out.push_str(&format!(" {op} "));
        out.append(condition.rhs.render()?);
        Ok(out)
    };

    let call = |name: &str, trailing: Option<&str>| -> Result<Fragment, DbError> {
        let mut out = Fragment::new(format!("{name}("));
        out.append(lhs.clone());
        out.push_str(", ");
        out.append(condition.rhs.render()?);
        if let Some(extra) = trailing {
            out.push_str(&format!(", {extra}"));
        }
        out.push_str(")");
        Ok(out)
    };

    match condition.lookup {
        Lookup::Exact => binary("="),
        Lookup::Gt => binary(">"),
        Lookup::Gte => binary(">="),
        Lookup::Lt => binary("<"),
        Lookup::Lte => binary("<="),
        Lookup::IExact => {
            let mut out = Fragment::new("LOWER(");
            out.append(lhs.clone());
            out.push_str(") = LOWER(");
            out.append(condition.rhs.render()?);
            out.push_str(")");
            Ok(out)
        }
        Lookup::Contains => call("CONTAINS", None),
        Lookup::IContains => call("CONTAINS", Some("true")),
        Lookup::StartsWith => call("STARTSWITH", None),
        Lookup::IStartsWith => call("STARTSWITH", Some("true")),
        Lookup::EndsWith => call("ENDSWITH", None),
        Lookup::IEndsWith => call("ENDSWITH", Some("true")),
        Lookup::Regex => call("RegexMatch", None),
        Lookup::IRegex => call("RegexMatch", Some("\"i\"")),
        Lookup::IsNull => {
            let is_null = match &condition.rhs {
                Expr::Value(Bson::Boolean(b)) => *b,
                other => {
                    return Err(DbError::Programming(format!(
                        "isnull expects a boolean, got {other:?}"
                    )));
                }
            };
            let template = if is_null {
                "(NOT IS_DEFINED({0}) OR IS_NULL({0}))"
            } else {
                "(IS_DEFINED({0}) AND NOT IS_NULL({0}))"
            };
            // The column appears twice; it renders without parameters.
            if !lhs.params.is_empty() {
                return Err(DbError::Unsupported(
                    "isnull on a parameterized expression".into(),
                ));
            }
            Ok(Fragment::new(template.replace("{0}", &lhs.sql)))
        }
        Lookup::In => {
            let Expr::Value(Bson::Array(items)) = &condition.rhs else {
                return Err(DbError::Programming(format!(
                    "in expects an array literal, got {:?}",
                    condition.rhs
                )));
            };
            let mut out = lhs.clone();
            out.push_str(" IN (");
            out.append(Fragment::join(
                items.iter().cloned().map(Fragment::param),
                ", ",
            ));
            out.push_str(")");
            Ok(out)
        }
        Lookup::Range => {
            let (low, high) = match &condition.rhs {
                Expr::Value(Bson::Array(bounds)) if bounds.len() == 2 => {
                    (bounds[0].clone(), bounds[1].clone())
                }
                other => {
                    return Err(DbError::Programming(format!(
                        "range expects a two-element array, got {other:?}"
                    )));
                }
            };
            let mut out = Fragment::new("(");
            out.append(lhs.clone());
            out.push_str(" >= ");
            out.append(Fragment::param(low));
            out.push_str(" AND ");
            out.append(lhs.clone());
            out.push_str(" <= ");
            out.append(Fragment::param(high));
            out.push_str(")");
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::bson;

    use super::*;

    fn title(lookup: Lookup, rhs: impl Into<Bson>) -> WhereNode {
        WhereNode::cond(Expr::col("book", "title"), lookup, Expr::value(rhs))
    }

    fn sql(node: &WhereNode) -> Fragment {
        match compile_where(node).unwrap() {
            Clause::Sql(f) => f,
            other => panic!("expected sql, got {other:?}"),
        }
    }

    #[test]
    fn lookups_render_to_store_functions() {
        assert_eq!(sql(&title(Lookup::Exact, "Dune")).sql, "book.title = %s");
        assert_eq!(
            sql(&title(Lookup::IExact, "dune")).sql,
            "LOWER(book.title) = LOWER(%s)"
        );
        assert_eq!(
            sql(&title(Lookup::IContains, "un")).sql,
            "CONTAINS(book.title, %s, true)"
        );
        assert_eq!(
            sql(&title(Lookup::StartsWith, "D")).sql,
            "STARTSWITH(book.title, %s)"
        );
        assert_eq!(
            sql(&title(Lookup::IRegex, "^d")).sql,
            "RegexMatch(book.title, %s, \"i\")"
        );
        assert_eq!(
            sql(&title(Lookup::IsNull, true)).sql,
            "(NOT IS_DEFINED(book.title) OR IS_NULL(book.title))"
        );
    }

    #[test]
    fn in_and_range_bind_each_value() {
        let f = sql(&title(Lookup::In, bson!(["a", "b"])));
        assert_eq!(f.sql, "book.title IN (%s, %s)");
        assert_eq!(f.params.len(), 2);

        let f = sql(&title(Lookup::Range, bson!([1, 5])));
        assert_eq!(f.sql, "(book.title >= %s AND book.title <= %s)");
        assert_eq!(f.params, vec![Bson::Int32(1), Bson::Int32(5)]);
    }

    #[test]
    fn groups_join_and_negate() {
        let node = WhereNode::not(WhereNode::or(vec![
            title(Lookup::Exact, "a"),
            title(Lookup::Exact, "b"),
        ]));
        assert_eq!(
            sql(&node).sql,
            "NOT ((book.title = %s OR book.title = %s))"
        );
    }

    #[test]
    fn empty_in_makes_and_never_match() {
        let node = WhereNode::and(vec![
            title(Lookup::Exact, "a"),
            title(Lookup::In, bson!([])),
        ]);
        assert_eq!(compile_where(&node).unwrap(), Clause::Never);
    }

    #[test]
    fn never_branch_drops_out_of_or() {
        let node = WhereNode::or(vec![WhereNode::Nothing, title(Lookup::Exact, "a")]);
        assert_eq!(sql(&node).sql, "book.title = %s");
    }

    #[test]
    fn negated_nothing_matches_everything() {
        assert_eq!(
            compile_where(&WhereNode::not(WhereNode::Nothing)).unwrap(),
            Clause::Always
        );
    }
}
