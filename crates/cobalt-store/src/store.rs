use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Lazily-produced query results.
pub type ItemIter = Box<dyn Iterator<Item = Result<Document, StoreError>> + Send>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionKind {
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKey {
    /// Document path such as `/id`.
    pub path: String,
    pub kind: PartitionKind,
}

impl PartitionKey {
    /// Hash partitioning on the top-level property `column`.
    pub fn hash(column: &str) -> Self {
        Self {
            path: format!("/{column}"),
            kind: PartitionKind::Hash,
        }
    }

    /// The top-level property the path points at.
    pub fn property(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub id: String,
    pub partition_key: PartitionKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Bson,
}

/// Query text with `@name` references and their bindings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub query: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub enable_cross_partition_query: bool,
    pub populate_query_metrics: bool,
    /// Restricts the query to one partition.
    pub partition_key: Option<Bson>,
}

/// Produces an authenticated store handle.
pub trait Connector {
    type Store: Store;

    fn connect(
        &self,
        endpoint: &str,
        credential: &str,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self::Store, StoreError>;
}

pub trait Store: Send + Sync {
    type Database: Database;

    fn create_database_if_not_exists(&self, name: &str) -> Result<Self::Database, StoreError>;
}

pub trait Database: Clone + Send + Sync {
    type Container: Container;

    fn id(&self) -> &str;

    /// Handle to a container by name. No round trip: a missing container
    /// surfaces as `NotFound` on first use.
    fn container(&self, name: &str) -> Self::Container;

    fn create_container_if_not_exists(
        &self,
        name: &str,
        partition_key: &PartitionKey,
    ) -> Result<Self::Container, StoreError>;

    /// Fails with `NotFound` when the container does not exist.
    fn delete_container(&self, name: &str) -> Result<(), StoreError>;

    fn list_containers(&self) -> Result<Vec<ContainerProperties>, StoreError>;
}

pub trait Container: Clone + Send + Sync {
    fn id(&self) -> &str;

    fn query_items(&self, query: QuerySpec, options: &QueryOptions)
    -> Result<ItemIter, StoreError>;

    /// Creates a new item, generating `id` when the body has none.
    fn create_item(&self, body: Document) -> Result<Document, StoreError>;

    fn upsert_item(&self, body: Document) -> Result<Document, StoreError>;

    fn read_item(&self, id: &str, partition_key: &Bson) -> Result<Document, StoreError>;

    fn delete_item(&self, id: &str, partition_key: &Bson) -> Result<(), StoreError>;
}
