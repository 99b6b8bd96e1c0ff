pub mod compiler;
mod cursor;
mod database;
mod error;
mod features;
mod schema;
mod settings;

pub use compiler::{
    AggregateCompiler, Chunks, CompiledQuery, DeleteCompiler, Fragment, InsertCompiler,
    QueryResult, Render, ResultType, Row, SelectCompiler, UpdateCompiler,
};
pub use cursor::{Cursor, bind_placeholders};
pub use database::{Connection, IdGenerator, SequentialIds, UuidGenerator};
pub use error::DbError;
pub use features::Features;
pub use schema::SchemaEditor;
pub use settings::DatabaseSettings;
