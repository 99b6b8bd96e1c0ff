use bson::Bson;
use cobalt_query::{Assignment, Expr, UpdateQuery, UpdateValue};
use cobalt_store::Store;
use tracing::warn;

use super::r#where::{Clause, compile_filter};
use super::Render;
use crate::database::Connection;
use crate::error::DbError;

/// UPDATE as read-modify-upsert: find the matching items, set the new values
/// in memory, write each item back.
///
/// No concurrency check is made between the read and the upsert; a
/// concurrent writer to the same item loses its change.
pub struct UpdateCompiler<'a, S: Store> {
    query: &'a UpdateQuery,
    connection: &'a Connection<S>,
}

impl<'a, S: Store> UpdateCompiler<'a, S> {
    pub fn new(query: &'a UpdateQuery, connection: &'a Connection<S>) -> Self {
        Self { query, connection }
    }

    /// Rows matched by the primary update, or by the first related update
    /// that matched any.
    pub fn execute_sql(&self) -> Result<usize, DbError> {
        let mut matched = self.update_items()?;
        for related in &self.query.related_updates {
            let count = UpdateCompiler::new(related, self.connection).execute_sql()?;
            if matched == 0 {
                matched = count;
            }
        }
        Ok(matched)
    }

    fn update_items(&self) -> Result<usize, DbError> {
        for assignment in &self.query.values {
            check_assignment(assignment)?;
        }

        let clause = compile_filter(
            self.query.filter.as_ref(),
            &self.query.table,
            self.connection.partition_key(),
        )?;
        let filter = match clause {
            Clause::Never => return Ok(0),
            Clause::Always => None,
            Clause::Sql(fragment) => Some(fragment),
        };

        let mut cursor = self.connection.cursor();
        let items = cursor.get_items(&self.query.table, filter)?;
        let matched = items.len();
        for mut item in items {
            for assignment in &self.query.values {
                item.insert(assignment.column.clone(), resolve(assignment)?);
            }
            cursor.upsert_item(item)?;
        }
        Ok(matched)
    }
}

fn check_assignment(assignment: &Assignment) -> Result<(), DbError> {
    if let UpdateValue::Expr(expr) = &assignment.value {
        if expr.contains_aggregate() {
            return Err(DbError::Field(format!(
                "aggregate functions are not allowed in this query ({}={expr:?})",
                assignment.column
            )));
        }
        if expr.contains_over_clause() {
            return Err(DbError::Field(format!(
                "window expressions are not allowed in this query ({}={expr:?})",
                assignment.column
            )));
        }
    }
    Ok(())
}

fn resolve(assignment: &Assignment) -> Result<Bson, DbError> {
    Ok(match &assignment.value {
        UpdateValue::Literal(value) => value.clone(),
        UpdateValue::Default(default) => default.call(),
        UpdateValue::Expr(Expr::Value(value)) => value.clone(),
        UpdateValue::Expr(expr) => {
            let text = expr.render()?.inline();
            warn!(
                column = %assignment.column,
                expression = %text,
                "expression update stored as text; the store cannot evaluate it"
            );
            Bson::String(text)
        }
    })
}

#[cfg(test)]
mod tests {
    use cobalt_query::{AggregateFunc, ArithmeticOp};

    use super::*;

    #[test]
    fn aggregate_assignment_is_field_error() {
        let assignment = Assignment::expr(
            "pages",
            Expr::aggregate(AggregateFunc::Max, Expr::col("book", "pages")),
        );
        assert!(matches!(check_assignment(&assignment), Err(DbError::Field(_))));
    }

    #[test]
    fn expression_resolves_to_its_text() {
        let assignment = Assignment::expr(
            "pages",
            Expr::binary(Expr::col("book", "pages"), ArithmeticOp::Add, Expr::value(1)),
        );
        assert_eq!(
            resolve(&assignment).unwrap(),
            Bson::String("(book.pages + 1)".into())
        );
    }
}
