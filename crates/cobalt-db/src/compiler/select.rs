use bson::Bson;
use cobalt_query::{Join, JoinKind, SelectQuery};
use cobalt_store::Store;
use tracing::warn;

use super::r#where::{Clause, compile_where};
use super::{
    CompiledQuery, Fragment, QueryResult, Render, ResultType, execute_compiled, output_names,
    stringify_partition_key,
};
use crate::database::Connection;
use crate::error::DbError;

pub struct SelectCompiler<'a, S: Store> {
    query: &'a SelectQuery,
    connection: &'a Connection<S>,
}

impl<'a, S: Store> SelectCompiler<'a, S> {
    pub fn new(query: &'a SelectQuery, connection: &'a Connection<S>) -> Self {
        Self { query, connection }
    }

    /// Render the query. `None` when the filter provably matches nothing.
    pub fn as_sql(&self) -> Result<Option<CompiledQuery>, DbError> {
        let query = self.query;
        let partition_key = self.connection.partition_key();

        let (where_part, having) = match query.filter.clone() {
            Some(mut filter) => {
                stringify_partition_key(&mut filter, &query.table, partition_key);
                filter.split_having()
            }
            None => (None, None),
        };
        if having.is_some() {
            return Err(DbError::Unsupported("HAVING".into()));
        }
        let where_clause = match &where_part {
            Some(node) => compile_where(node)?,
            None => Clause::Always,
        };
        if where_clause == Clause::Never {
            return Ok(None);
        }

        let mut out = Fragment::new("SELECT ");
        if query.distinct {
            out.push_str("DISTINCT ");
        }

        let names = output_names(&query.columns);
        if query.columns.is_empty() {
            out.push_str("*");
        } else {
            let mut columns = Vec::with_capacity(query.columns.len());
            for (column, (name, spelled)) in query.columns.iter().zip(&names) {
                let mut rendered = column.expr.render()?;
                if *spelled {
                    rendered.push_str(&format!(" AS {name}"));
                }
                columns.push(rendered);
            }
            out.append(Fragment::join(columns, ", "));
        }

        out.push_str(&format!(" FROM {}", query.table));

        if !query.joins.is_empty() {
            out.push_str(" ");
            out.append(render_joins(&query.joins, &query.table, partition_key)?);
        }

        if let Clause::Sql(filter) = where_clause {
            out.push_str(" WHERE ");
            out.append(filter);
        }

        if !query.group_by.is_empty() {
            let group_by = query
                .group_by
                .iter()
                .map(Render::render)
                .collect::<Result<Vec<_>, _>>()?;
            out.push_str(" GROUP BY ");
            out.append(Fragment::join(group_by, ", "));
        }

        if !query.order_by.is_empty() {
            let order_by = query
                .order_by
                .iter()
                .map(Render::render)
                .collect::<Result<Vec<_>, _>>()?;
            out.push_str(" ORDER BY ");
            out.append(Fragment::join(order_by, ", "));
        }

        let mut skip = 0;
        match query.limit {
            Some(limit) => {
                out.push_str(" OFFSET ");
                out.append(Fragment::param(Bson::Int64(query.offset as i64)));
                out.push_str(" LIMIT ");
                out.append(Fragment::param(Bson::Int64(limit as i64)));
            }
            None if query.offset > 0 => {
                warn!(
                    table = %query.table,
                    offset = query.offset,
                    "offset without limit; skipping rows client-side"
                );
                skip = query.offset;
            }
            None => {}
        }

        Ok(Some(CompiledQuery {
            fragment: out,
            columns: names.into_iter().map(|(name, _)| name).collect(),
            skip,
        }))
    }

    pub fn execute_sql(
        &self,
        result_type: ResultType,
    ) -> Result<QueryResult<S::Database>, DbError> {
        let Some(compiled) = self.as_sql()? else {
            return Ok(QueryResult::nothing(result_type));
        };
        let cursor = self.connection.named_cursor(&self.query.table);
        execute_compiled(cursor, compiled, result_type, self.connection.features())
    }
}

/// Render inner joins as `JOIN .. IN` scans, one per column pair, with any
/// extra restriction appended as a parenthesized filter.
pub(crate) fn render_joins(
    joins: &[Join],
    table: &str,
    partition_key: &str,
) -> Result<Fragment, DbError> {
    let mut parts = Vec::new();
    for join in joins {
        if join.kind != JoinKind::Inner {
            return Err(DbError::Unsupported(format!("{} JOIN", join.kind.as_str())));
        }

        let head = match &join.alias {
            Some(alias) => format!("JOIN {} {alias}", join.table),
            None => format!("JOIN {}", join.table),
        };
        let before = parts.len();
        for (parent_column, _) in &join.columns {
            parts.push(Fragment::new(format!(
                "{head} IN {}.{parent_column}",
                join.parent
            )));
        }
        if let Some(restriction) = &join.restriction {
            let mut restriction = restriction.clone();
            stringify_partition_key(&mut restriction, table, partition_key);
            parts.push(compile_where(&restriction)?.into_fragment().parenthesized());
        }
        if parts.len() == before {
            return Err(DbError::Structural(format!(
                "join of {} onto {} has no condition",
                join.table, join.parent
            )));
        }
    }
    Ok(Fragment::join(parts, ", "))
}

#[cfg(test)]
mod tests {
    use cobalt_query::{Expr, Lookup, WhereNode};

    use super::*;

    #[test]
    fn outer_join_is_unsupported_by_name() {
        let mut join = Join::inner("author", "book").on("author_id", "id");
        join.kind = JoinKind::LeftOuter;
        let err = render_joins(&[join], "book", "id").unwrap_err();
        assert!(matches!(&err, DbError::Unsupported(what) if what.contains("LEFT OUTER")));
    }

    #[test]
    fn join_renders_one_in_clause_per_pair() {
        let join = Join::inner("tag", "book")
            .on("tags", "id")
            .on("extra_tags", "id")
            .alias("t");
        let f = render_joins(&[join], "book", "id").unwrap();
        assert_eq!(
            f.sql,
            "JOIN tag t IN book.tags, JOIN tag t IN book.extra_tags"
        );
    }

    #[test]
    fn join_restriction_is_parenthesized() {
        let mut join = Join::inner("tag", "book").on("tags", "id");
        join.restriction = Some(WhereNode::cond(
            Expr::col("tag", "name"),
            Lookup::Exact,
            Expr::value("scifi"),
        ));
        let f = render_joins(&[join], "book", "id").unwrap();
        assert_eq!(f.sql, "JOIN tag IN book.tags, (tag.name = %s)");
        assert_eq!(f.params, vec![Bson::String("scifi".into())]);
    }

    #[test]
    fn join_without_condition_is_structural_error() {
        let join = Join::inner("tag", "book");
        assert!(matches!(
            render_joins(&[join], "book", "id"),
            Err(DbError::Structural(_))
        ));
    }
}
