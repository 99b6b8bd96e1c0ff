use cobalt_query::ModelMeta;
use cobalt_store::Store;
use tracing::debug;

use crate::database::Connection;
use crate::error::DbError;

/// Collection-level DDL. Documents carry no schema, so column changes are
/// accepted and ignored; existing items are not migrated.
pub struct SchemaEditor<'a, S: Store> {
    connection: &'a Connection<S>,
}

impl<'a, S: Store> SchemaEditor<'a, S> {
    pub(crate) fn new(connection: &'a Connection<S>) -> Self {
        Self { connection }
    }

    /// Create the model's collection, then the generated many-to-many
    /// collections it declares.
    pub fn create_model(&self, model: &ModelMeta) -> Result<(), DbError> {
        self.connection.create_collection_if_absent(&model.db_table)?;
        for m2m in &model.many_to_many {
            if m2m.auto_created {
                self.create_model(&m2m.through)?;
            }
        }
        Ok(())
    }

    pub fn delete_model(&self, model: &ModelMeta) -> Result<(), DbError> {
        self.connection.drop_collection(&model.db_table)
    }

    pub fn add_field(&self, model: &ModelMeta, field: &str) -> Result<(), DbError> {
        debug!(table = %model.db_table, field, "add_field: nothing to do");
        Ok(())
    }

    pub fn remove_field(&self, model: &ModelMeta, field: &str) -> Result<(), DbError> {
        debug!(table = %model.db_table, field, "remove_field: nothing to do");
        Ok(())
    }

    pub fn alter_field(&self, model: &ModelMeta, old: &str, new: &str) -> Result<(), DbError> {
        debug!(table = %model.db_table, old, new, "alter_field: nothing to do");
        Ok(())
    }

    pub fn alter_unique_together(
        &self,
        model: &ModelMeta,
        _old: &[Vec<String>],
        _new: &[Vec<String>],
    ) -> Result<(), DbError> {
        debug!(table = %model.db_table, "alter_unique_together: nothing to do");
        Ok(())
    }

    pub fn alter_index_together(
        &self,
        model: &ModelMeta,
        _old: &[Vec<String>],
        _new: &[Vec<String>],
    ) -> Result<(), DbError> {
        debug!(table = %model.db_table, "alter_index_together: nothing to do");
        Ok(())
    }
}
