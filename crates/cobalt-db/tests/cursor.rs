mod common;
use common::*;

use bson::Bson;
use cobalt_db::DbError;

// ── Execution ───────────────────────────────────────────────────

#[test]
fn execute_without_target_fails() {
    let (conn, _store) = connect();
    let mut cursor = conn.cursor();
    assert!(matches!(
        cursor.execute("SELECT * FROM library_book", vec![]),
        Err(DbError::NoTarget)
    ));
}

#[test]
fn placeholders_bind_in_order_against_the_store() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor
        .execute(
            "SELECT library_book.title FROM library_book \
             WHERE library_book.pages > %s AND library_book.genre = %s",
            vec![Bson::Int32(300), Bson::String("scifi".into())],
        )
        .unwrap();

    let spec = cursor.last_query().unwrap();
    assert!(spec.query.ends_with("library_book.pages > @arg0 AND library_book.genre = @arg1"));
    assert_eq!(spec.parameters[0].value, Bson::Int32(300));
    assert_eq!(spec.parameters[1].value, Bson::String("scifi".into()));

    assert_eq!(
        cursor.fetch_all().unwrap(),
        vec![vec![Bson::String("Dune".into())]]
    );
}

#[test]
fn mismatched_parameters_never_reach_the_store() {
    let (conn, store) = connect();
    seed_books(&conn);
    let mut cursor = conn.named_cursor(BOOKS);
    let result = cursor.execute(
        "SELECT * FROM library_book WHERE library_book.pages > %s",
        vec![],
    );
    assert!(matches!(result, Err(DbError::Programming(_))));
    assert_eq!(store.query_count(), 0);
}

#[test]
fn store_rejections_surface_as_store_errors() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let mut cursor = conn.named_cursor(BOOKS);
    assert!(matches!(
        cursor.execute("SELECT FROM", vec![]),
        Err(DbError::Store(_))
    ));
}

// ── Fetching ────────────────────────────────────────────────────

#[test]
fn fetch_one_many_and_exhaustion() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor
        .execute(
            "SELECT library_book.id FROM library_book ORDER BY library_book.id",
            vec![],
        )
        .unwrap();

    assert_eq!(
        cursor.fetch_one().unwrap(),
        Some(vec![Bson::String("1".into())])
    );
    assert_eq!(cursor.fetch_many(2).unwrap().len(), 2);
    assert_eq!(cursor.fetch_many(5).unwrap().len(), 1);
    assert_eq!(cursor.fetch_one().unwrap(), None);
    assert!(cursor.fetch_many(3).unwrap().is_empty());
}

#[test]
fn fetch_many_accepts_any_count() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor.execute("SELECT * FROM library_book", vec![]).unwrap();
    assert_eq!(cursor.fetch_many(usize::MAX).unwrap().len(), 4);
    assert!(cursor.fetch_many(usize::MAX).unwrap().is_empty());
}

#[test]
fn row_count_includes_consumed_and_pending_rows() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor
        .execute("SELECT library_book.id FROM library_book", vec![])
        .unwrap();
    cursor.fetch_one().unwrap();
    assert_eq!(cursor.row_count().unwrap(), 4);
    // Counting does not lose rows.
    assert_eq!(cursor.fetch_all().unwrap().len(), 3);
}

#[test]
fn projection_aligns_rows_and_fills_nulls() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor
        .execute(
            "SELECT * FROM library_book WHERE library_book.id = %s",
            vec![Bson::String("2".into())],
        )
        .unwrap();
    cursor.set_projection(vec!["genre".into(), "missing".into(), "title".into()]);
    assert_eq!(
        cursor.fetch_one().unwrap(),
        Some(vec![
            Bson::String("classic".into()),
            Bson::Null,
            Bson::String("Emma".into()),
        ])
    );
}

#[test]
fn close_releases_results() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.named_cursor(BOOKS);
    cursor
        .execute("SELECT * FROM library_book", vec![])
        .unwrap();
    cursor.close();
    assert_eq!(cursor.fetch_one().unwrap(), None);
    assert_eq!(cursor.row_count().unwrap(), 0);
}

// ── Items ───────────────────────────────────────────────────────

#[test]
fn get_items_reads_full_items() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.cursor();
    let items = cursor.get_items(BOOKS, None).unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|item| item.contains_key("title")));
}

#[test]
fn delete_item_removes_it() {
    let (conn, _store) = connect();
    seed_books(&conn);

    let mut cursor = conn.cursor();
    let items = cursor.get_items(BOOKS, None).unwrap();
    cursor.delete_item(&items[0]).unwrap();
    assert_eq!(cursor.get_items(BOOKS, None).unwrap().len(), 3);
}
