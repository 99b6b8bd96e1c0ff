use bson::{Bson, Document};
use cobalt_query::InsertQuery;
use cobalt_store::Store;

use super::Row;
use crate::database::Connection;
use crate::error::DbError;

/// Inserts rows item by item; there is no INSERT statement to render.
pub struct InsertCompiler<'a, S: Store> {
    query: &'a InsertQuery,
    connection: &'a Connection<S>,
}

impl<'a, S: Store> InsertCompiler<'a, S> {
    pub fn new(query: &'a InsertQuery, connection: &'a Connection<S>) -> Self {
        Self { query, connection }
    }

    fn documents(&self) -> Result<Vec<Document>, DbError> {
        let fields = &self.query.fields;
        self.query
            .rows
            .iter()
            .map(|values| {
                if values.len() != fields.len() {
                    return Err(DbError::Programming(format!(
                        "insert into {} has {} fields but a row of {} values",
                        self.query.table,
                        fields.len(),
                        values.len()
                    )));
                }
                Ok(fields.iter().cloned().zip(values.iter().cloned()).collect())
            })
            .collect()
    }

    /// Insert every row. With `returning`, the result holds the generated
    /// primary key of the (single) inserted row.
    pub fn execute_sql(&self, returning: bool) -> Result<Vec<Row>, DbError> {
        let features = self.connection.features();
        if returning && self.query.rows.len() > 1 && !features.can_return_rows_from_bulk_insert {
            return Err(DbError::Programming(format!(
                "cannot return generated keys from a {}-row insert into {}",
                self.query.rows.len(),
                self.query.table
            )));
        }

        let rows = self.documents()?;
        let mut cursor = self.connection.cursor();
        cursor.insert_batch(&self.query.table, &self.query.primary_key, rows)?;

        if !returning {
            return Ok(Vec::new());
        }
        Ok(cursor
            .last_inserted_id()
            .map(|id| vec![vec![Bson::String(id.to_string())]])
            .unwrap_or_default())
    }
}
