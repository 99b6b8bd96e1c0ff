use bson::Bson;
use cobalt_query::{AggregateFunc, AggregateQuery, Expr, SelectColumn, SelectQuery};
use cobalt_store::Store;

use super::select::SelectCompiler;
use super::{
    CompiledQuery, Fragment, QueryResult, Render, ResultType, Row, execute_compiled, output_names,
};
use crate::database::Connection;
use crate::error::DbError;

const SUBQUERY: &str = "subquery";

/// Aggregates over a select: `count()`, `aggregate(Sum(..))` and friends.
///
/// A plain inner query is aggregated in place. A sliced, distinct or grouped
/// one becomes a `FROM (<inner>) subquery` source so the aggregates see the
/// rows it would return.
pub struct AggregateCompiler<'a, S: Store> {
    query: &'a AggregateQuery,
    connection: &'a Connection<S>,
}

impl<'a, S: Store> AggregateCompiler<'a, S> {
    pub fn new(query: &'a AggregateQuery, connection: &'a Connection<S>) -> Self {
        Self { query, connection }
    }

    fn needs_subquery(&self) -> bool {
        let inner = &self.query.inner;
        inner.is_sliced() || inner.distinct || !inner.group_by.is_empty()
    }

    pub fn as_sql(&self) -> Result<Option<CompiledQuery>, DbError> {
        if !self.needs_subquery() {
            let flat = SelectQuery {
                columns: self.query.aggregates.clone(),
                order_by: Vec::new(),
                ..self.query.inner.clone()
            };
            return SelectCompiler::new(&flat, self.connection).as_sql();
        }

        let Some(inner) = SelectCompiler::new(&self.query.inner, self.connection).as_sql()? else {
            return Ok(None);
        };
        if inner.skip > 0 {
            return Err(DbError::Unsupported(
                "OFFSET without LIMIT inside an aggregate subquery".into(),
            ));
        }

        let aggregates: Vec<SelectColumn> = self
            .query
            .aggregates
            .iter()
            .map(|column| SelectColumn {
                expr: rebind(&column.expr),
                alias: column.alias.clone(),
            })
            .collect();
        let names = output_names(&aggregates);

        let mut columns = Vec::with_capacity(aggregates.len());
        for (column, (name, spelled)) in aggregates.iter().zip(&names) {
            let mut rendered = column.expr.render()?;
            if *spelled {
                rendered.push_str(&format!(" AS {name}"));
            }
            columns.push(rendered);
        }

        let mut out = Fragment::new("SELECT ");
        out.append(Fragment::join(columns, ", "));
        out.push_str(" FROM (");
        out.append(inner.fragment);
        out.push_str(&format!(") {SUBQUERY}"));

        Ok(Some(CompiledQuery {
            fragment: out,
            columns: names.into_iter().map(|(name, _)| name).collect(),
            skip: 0,
        }))
    }

    /// The single row of aggregate values. With a provably empty inner
    /// query, counts are zero and everything else is null.
    pub fn execute_sql(&self) -> Result<Row, DbError> {
        let Some(compiled) = self.as_sql()? else {
            return Ok(self.empty_row());
        };
        let width = compiled.columns.len();
        let cursor = self.connection.named_cursor(&self.query.inner.table);
        let features = self.connection.features();
        match execute_compiled(cursor, compiled, ResultType::Single, features)? {
            QueryResult::Row(Some(row)) => Ok(row),
            _ => Ok(vec![Bson::Null; width]),
        }
    }

    fn empty_row(&self) -> Row {
        self.query
            .aggregates
            .iter()
            .map(|column| match &column.expr {
                Expr::Aggregate(agg) if agg.func == AggregateFunc::Count => {
                    Bson::Int64(0)
                }
                _ => Bson::Null,
            })
            .collect()
    }
}

/// Point column references at the subquery's output instead of the inner table.
fn rebind(expr: &Expr) -> Expr {
    match expr {
        Expr::Column(column) => Expr::col(SUBQUERY, column.column.clone()),
        Expr::Value(_) => expr.clone(),
        Expr::Aggregate(agg) => {
            let mut agg = agg.clone();
            agg.arg = agg.arg.as_deref().map(|arg| Box::new(rebind(arg)));
            Expr::Aggregate(agg)
        }
        Expr::Window(_) => expr.clone(),
        Expr::Binary { lhs, op, rhs } => Expr::binary(rebind(lhs), *op, rebind(rhs)),
        Expr::Func { name, args } => Expr::Func {
            name: name.clone(),
            args: args.iter().map(rebind).collect(),
        },
    }
}
