mod sql;
mod store;

pub use store::{MemoryContainer, MemoryDatabase, MemoryStore};
