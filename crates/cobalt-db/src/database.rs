use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cobalt_store::{Connector, Database, PartitionKey, Store};
use tracing::info;

use crate::cursor::Cursor;
use crate::error::DbError;
use crate::features::Features;
use crate::schema::SchemaEditor;
use crate::settings::DatabaseSettings;

/// Source of surrogate row ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Upper 64 bits of a random v4 UUID, in decimal.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        ((uuid::Uuid::new_v4().as_u128() >> 64) as u64).to_string()
    }
}

/// Deterministic ids counting up from a starting value.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// One authenticated store handle plus the resolved logical database.
pub struct Connection<S: Store> {
    store: S,
    database: S::Database,
    settings: DatabaseSettings,
    features: Features,
    ids: Arc<dyn IdGenerator>,
}

impl<S: Store> Connection<S> {
    pub fn connect<C>(connector: &C, settings: DatabaseSettings) -> Result<Self, DbError>
    where
        C: Connector<Store = S>,
    {
        settings.validate()?;
        let proxy = settings.proxy_config();
        let store = connector.connect(&settings.url, &settings.key, proxy.as_ref())?;
        let database = store
            .create_database_if_not_exists(&settings.name)
            .map_err(|e| DbError::Internal(format!("resolving database {}: {e}", settings.name)))?;

        info!(endpoint = %settings.url, database = %settings.name, "connected to document store");

        Ok(Self {
            store,
            database,
            settings,
            features: Features::new(),
            ids: Arc::new(UuidGenerator),
        })
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Replace the capability table, e.g. to turn chunked reads off.
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn database(&self) -> &S::Database {
        &self.database
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn partition_key(&self) -> &str {
        &self.settings.partition_key
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    // ── Collections ─────────────────────────────────────────────

    pub fn create_collection_if_absent(
        &self,
        name: &str,
    ) -> Result<<S::Database as Database>::Container, DbError> {
        let partition_key = PartitionKey::hash(self.partition_key());
        Ok(self
            .database
            .create_container_if_not_exists(name, &partition_key)?)
    }

    /// Drops `name`; dropping a collection that does not exist is not an error.
    pub fn drop_collection(&self, name: &str) -> Result<(), DbError> {
        match self.database.delete_container(name) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of the collections that exist in the database.
    pub fn table_list(&self) -> Result<Vec<String>, DbError> {
        Ok(self
            .database
            .list_containers()?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    pub fn next_surrogate_id(&self) -> String {
        self.ids.next_id()
    }

    // ── Cursors ─────────────────────────────────────────────────

    pub fn cursor(&self) -> Cursor<S::Database> {
        Cursor::new(
            self.database.clone(),
            self.settings.partition_key.clone(),
            self.ids.clone(),
        )
    }

    pub fn named_cursor(&self, collection: &str) -> Cursor<S::Database> {
        let mut cursor = self.cursor();
        cursor.target_collection(collection);
        cursor
    }

    /// Cursor bound to the `CONTAINER` setting.
    pub fn default_cursor(&self) -> Cursor<S::Database> {
        self.named_cursor(&self.settings.container)
    }

    /// Results already stream lazily, so this is a plain cursor.
    pub fn chunked_cursor(&self) -> Cursor<S::Database> {
        self.cursor()
    }

    pub fn schema_editor(&self) -> SchemaEditor<'_, S> {
        SchemaEditor::new(self)
    }

    // ── Transactions ────────────────────────────────────────────
    //
    // The store has none; every write is committed when it returns.

    pub fn commit(&self) -> Result<(), DbError> {
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), DbError> {
        Ok(())
    }

    pub fn check_constraints(&self, _tables: Option<&[&str]>) -> Result<(), DbError> {
        Ok(())
    }

    /// True while the store still answers.
    pub fn is_usable(&self) -> bool {
        self.database.list_containers().is_ok()
    }
}
