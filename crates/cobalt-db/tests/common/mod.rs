#![allow(dead_code)]

use bson::Bson;
use cobalt_db::{Connection, DatabaseSettings, InsertCompiler, SequentialIds};
use cobalt_query::InsertQuery;
use cobalt_store::MemoryStore;

pub const BOOKS: &str = "library_book";

pub fn settings() -> DatabaseSettings {
    DatabaseSettings::new("https://localhost:8081", "dev-key")
}

/// A connection over a fresh memory store, handing out ids 1, 2, 3, ...
pub fn connect() -> (Connection<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let conn = Connection::connect(&store, settings())
        .unwrap()
        .with_id_generator(SequentialIds::starting_at(1));
    (conn, store)
}

pub fn insert(conn: &Connection<MemoryStore>, table: &str, fields: &[&str], rows: Vec<Vec<Bson>>) {
    let query = InsertQuery {
        table: table.to_string(),
        primary_key: "id".to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        rows,
    };
    InsertCompiler::new(&query, conn).execute_sql(false).unwrap();
}

/// Books with ids "1" to "4".
pub fn seed_books(conn: &Connection<MemoryStore>) {
    insert(
        conn,
        BOOKS,
        &["title", "pages", "genre"],
        vec![
            vec!["Dune".into(), 412.into(), "scifi".into()],
            vec!["Emma".into(), 320.into(), "classic".into()],
            vec!["Ubik".into(), 202.into(), "scifi".into()],
            vec!["Ulysses".into(), 730.into(), "classic".into()],
        ],
    );
}
