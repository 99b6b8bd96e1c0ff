use cobalt_query::DeleteQuery;
use cobalt_store::Store;

use super::r#where::{Clause, compile_filter};
use crate::database::Connection;
use crate::error::DbError;

/// DELETE as read-delete: project the keys of matching items, then delete
/// them one by one. Items deleted before a failure stay deleted.
pub struct DeleteCompiler<'a, S: Store> {
    query: &'a DeleteQuery,
    connection: &'a Connection<S>,
}

impl<'a, S: Store> DeleteCompiler<'a, S> {
    pub fn new(query: &'a DeleteQuery, connection: &'a Connection<S>) -> Self {
        Self { query, connection }
    }

    pub fn execute_sql(&self) -> Result<usize, DbError> {
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
        let keys = cursor.item_keys(&self.query.table, filter)?;
        for (id, partition_value) in &keys {
            cursor.delete_by_key(id, partition_value)?;
        }
        Ok(keys.len())
    }
}
