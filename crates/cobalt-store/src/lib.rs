mod error;
mod store;

pub use error::StoreError;
pub use store::{
    Connector, Container, ContainerProperties, Database, ItemIter, Parameter, PartitionKey,
    PartitionKind, ProxyConfig, QueryOptions, QuerySpec, Store,
};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryContainer, MemoryDatabase, MemoryStore};
