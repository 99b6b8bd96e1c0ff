use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use arc_swap::ArcSwap;
use bson::{Bson, Document};
use imbl::OrdMap;

use crate::error::StoreError;
use crate::store::{
    Connector, Container, ContainerProperties, Database, ItemIter, PartitionKey, ProxyConfig,
    QueryOptions, QuerySpec, Store,
};

use super::sql;

/// Items of one container keyed by `id`.
type Items = OrdMap<String, Document>;

struct ContainerState {
    partition_key: PartitionKey,
    items: ArcSwap<Items>,
}

#[derive(Default)]
struct DatabaseState {
    containers: RwLock<HashMap<String, Arc<ContainerState>>>,
}

#[derive(Default)]
struct Inner {
    databases: RwLock<HashMap<String, Arc<DatabaseState>>>,
    write_lock: Mutex<()>,
    key: Option<String>,
    queries: AtomicU64,
}

impl Inner {
    fn write_guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }
}

/// In-process item store. Reads run against copy-on-write snapshots; writes
/// are serialized by a store-wide lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects connections presenting any other credential.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                key: Some(key.into()),
                ..Inner::default()
            }),
        }
    }

    /// Number of queries run against any container of this store.
    pub fn query_count(&self) -> u64 {
        self.inner.queries.load(Ordering::Relaxed)
    }
}

impl Connector for MemoryStore {
    type Store = MemoryStore;

    fn connect(
        &self,
        endpoint: &str,
        credential: &str,
        proxy: Option<&ProxyConfig>,
    ) -> Result<MemoryStore, StoreError> {
        if let Some(key) = &self.inner.key {
            if key != credential {
                return Err(StoreError::Unauthorized(format!(
                    "credential rejected by {endpoint}"
                )));
            }
        }
        tracing::debug!(endpoint, proxied = proxy.is_some(), "memory store connected");
        Ok(self.clone())
    }
}

impl Store for MemoryStore {
    type Database = MemoryDatabase;

    fn create_database_if_not_exists(&self, name: &str) -> Result<MemoryDatabase, StoreError> {
        let mut databases = self
            .inner
            .databases
            .write()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        let state = databases.entry(name.to_string()).or_default().clone();
        Ok(MemoryDatabase {
            name: name.to_string(),
            store: self.inner.clone(),
            state,
        })
    }
}

#[derive(Clone)]
pub struct MemoryDatabase {
    name: String,
    store: Arc<Inner>,
    state: Arc<DatabaseState>,
}

impl MemoryDatabase {
    fn lookup(&self, name: &str) -> Result<Option<Arc<ContainerState>>, StoreError> {
        let containers = self
            .state
            .containers
            .read()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        Ok(containers.get(name).cloned())
    }
}

impl Database for MemoryDatabase {
    type Container = MemoryContainer;

    fn id(&self) -> &str {
        &self.name
    }

    fn container(&self, name: &str) -> MemoryContainer {
        MemoryContainer {
            name: name.to_string(),
            store: self.store.clone(),
            database: self.state.clone(),
        }
    }

    fn create_container_if_not_exists(
        &self,
        name: &str,
        partition_key: &PartitionKey,
    ) -> Result<MemoryContainer, StoreError> {
        let mut containers = self
            .state
            .containers
            .write()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        containers.entry(name.to_string()).or_insert_with(|| {
            Arc::new(ContainerState {
                partition_key: partition_key.clone(),
                items: ArcSwap::from_pointee(OrdMap::new()),
            })
        });
        drop(containers);
        Ok(self.container(name))
    }

    fn delete_container(&self, name: &str) -> Result<(), StoreError> {
        let mut containers = self
            .state
            .containers
            .write()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        match containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("container {name}"))),
        }
    }

    fn list_containers(&self) -> Result<Vec<ContainerProperties>, StoreError> {
        let containers = self
            .state
            .containers
            .read()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        let mut listed: Vec<ContainerProperties> = containers
            .iter()
            .map(|(id, state)| ContainerProperties {
                id: id.clone(),
                partition_key: state.partition_key.clone(),
            })
            .collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }
}

/// Handle to a container. Resolved on every call, so a handle taken before
/// the container exists starts working once it is created.
#[derive(Clone)]
pub struct MemoryContainer {
    name: String,
    store: Arc<Inner>,
    database: Arc<DatabaseState>,
}

impl MemoryContainer {
    fn state(&self) -> Result<Arc<ContainerState>, StoreError> {
        let containers = self
            .database
            .containers
            .read()
            .map_err(|e| StoreError::Storage(format!("lock poisoned: {e}")))?;
        containers
            .get(&self.name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("container {}", self.name)))
    }

    /// The `id` of `body`, which must be a string.
    fn item_id(body: &Document) -> Result<String, StoreError> {
        match body.get("id") {
            Some(Bson::String(id)) => Ok(id.clone()),
            Some(other) => Err(StoreError::BadRequest(format!(
                "item id must be a string, got {other}"
            ))),
            None => Err(StoreError::BadRequest("item has no id".into())),
        }
    }
}

/// Partition value of an item; a missing property partitions as null.
fn partition_value<'a>(state: &ContainerState, item: &'a Document) -> &'a Bson {
    item.get(state.partition_key.property()).unwrap_or(&Bson::Null)
}

impl Container for MemoryContainer {
    fn id(&self) -> &str {
        &self.name
    }

    fn query_items(&self, query: QuerySpec, options: &QueryOptions) -> Result<ItemIter, StoreError> {
        if !options.enable_cross_partition_query && options.partition_key.is_none() {
            return Err(StoreError::BadRequest(
                "cross partition query is required but disabled".into(),
            ));
        }
        let state = self.state()?;
        self.store.queries.fetch_add(1, Ordering::Relaxed);

        let snapshot = state.items.load_full();
        let items: Vec<Document> = snapshot
            .values()
            .filter(|item| match &options.partition_key {
                Some(pk) => partition_value(&state, item) == pk,
                None => true,
            })
            .cloned()
            .collect();

        tracing::trace!(container = %self.name, query = %query.query, "memory query");
        let rows = sql::run(&query.query, &items, &query.parameters)?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn create_item(&self, mut body: Document) -> Result<Document, StoreError> {
        let state = self.state()?;
        if !body.contains_key("id") {
            body.insert("id", uuid::Uuid::new_v4().to_string());
        }
        let id = Self::item_id(&body)?;

        let _guard = self.store.write_guard()?;
        let mut items = (**state.items.load()).clone();
        if items.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "item {id} already exists in {}",
                self.name
            )));
        }
        items.insert(id, body.clone());
        state.items.store(Arc::new(items));
        Ok(body)
    }

    fn upsert_item(&self, body: Document) -> Result<Document, StoreError> {
        let state = self.state()?;
        let id = Self::item_id(&body)?;

        let _guard = self.store.write_guard()?;
        let mut items = (**state.items.load()).clone();
        items.insert(id, body.clone());
        state.items.store(Arc::new(items));
        Ok(body)
    }

    fn read_item(&self, id: &str, partition_key: &Bson) -> Result<Document, StoreError> {
        let state = self.state()?;
        let items = state.items.load();
        match items.get(id) {
            Some(item) if partition_value(&state, item) == partition_key => Ok(item.clone()),
            _ => Err(StoreError::NotFound(format!("item {id} in {}", self.name))),
        }
    }

    fn delete_item(&self, id: &str, partition_key: &Bson) -> Result<(), StoreError> {
        let state = self.state()?;

        let _guard = self.store.write_guard()?;
        let mut items = (**state.items.load()).clone();
        match items.get(id) {
            Some(item) if partition_value(&state, item) == partition_key => {
                items.remove(id);
                state.items.store(Arc::new(items));
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("item {id} in {}", self.name))),
        }
    }
}
