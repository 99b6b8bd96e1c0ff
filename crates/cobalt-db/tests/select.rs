mod common;
use common::*;

use bson::{Bson, bson};
use cobalt_db::{DbError, Features, QueryResult, ResultType, SelectCompiler};
use cobalt_query::{
    AggregateFunc, Expr, Join, JoinKind, Lookup, OrderBy, SelectColumn, SelectQuery, WhereNode,
};

fn books() -> SelectQuery {
    SelectQuery::new(BOOKS).columns(&["id", "title"])
}

fn field(column: &str, lookup: Lookup, value: impl Into<Bson>) -> WhereNode {
    WhereNode::cond(Expr::col(BOOKS, column), lookup, Expr::value(value))
}

fn titles(rows: Vec<Vec<Bson>>) -> Vec<String> {
    rows.into_iter()
        .map(|row| row[1].as_str().unwrap().to_string())
        .collect()
}

// ── Rendering ───────────────────────────────────────────────────

#[test]
fn renders_full_statement() {
    let (conn, _store) = connect();
    let query = books()
        .filter(field("pages", Lookup::Gt, 300))
        .order_by(OrderBy::desc(Expr::col(BOOKS, "pages")))
        .slice(1, Some(2));
    let compiled = SelectCompiler::new(&query, &conn).as_sql().unwrap().unwrap();
    assert_eq!(
        compiled.fragment.sql,
        "SELECT library_book.id, library_book.title FROM library_book \
         WHERE library_book.pages > %s ORDER BY library_book.pages DESC OFFSET %s LIMIT %s"
    );
    assert_eq!(
        compiled.fragment.params,
        vec![Bson::Int32(300), Bson::Int64(1), Bson::Int64(2)]
    );
    assert_eq!(compiled.columns, vec!["id", "title"]);
}

#[test]
fn partition_key_literals_are_compared_as_strings() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let query = books().filter(field("id", Lookup::Exact, 2));
    let compiled = SelectCompiler::new(&query, &conn).as_sql().unwrap().unwrap();
    assert_eq!(compiled.fragment.params, vec![Bson::String("2".into())]);

    let rows = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(titles(rows), vec!["Emma"]);
}

#[test]
fn having_is_unsupported() {
    let (conn, _store) = connect();
    let query = books().filter(WhereNode::cond(
        Expr::aggregate(AggregateFunc::Count, Expr::col(BOOKS, "id")),
        Lookup::Gt,
        Expr::value(1),
    ));
    let err = SelectCompiler::new(&query, &conn).as_sql().unwrap_err();
    assert!(matches!(&err, DbError::Unsupported(what) if what == "HAVING"));
}

#[test]
fn window_column_is_unsupported() {
    let (conn, _store) = connect();
    let query = SelectQuery::new(BOOKS).select(SelectColumn::new(Expr::Window(
        cobalt_query::Window {
            func: Box::new(Expr::count_all()),
            partition_by: vec![],
            order_by: vec![],
        },
    )));
    assert!(matches!(
        SelectCompiler::new(&query, &conn).as_sql(),
        Err(DbError::Unsupported(_))
    ));
}

// ── Joins ───────────────────────────────────────────────────────

#[test]
fn left_outer_join_names_the_kind() {
    let (conn, _store) = connect();
    let mut join = Join::inner("library_author", BOOKS).on("author_id", "id");
    join.kind = JoinKind::LeftOuter;
    let err = SelectCompiler::new(&books().join(join), &conn)
        .as_sql()
        .unwrap_err();
    assert!(matches!(&err, DbError::Unsupported(what) if what.contains("LEFT OUTER")));
}

#[test]
fn inner_join_scans_embedded_arrays() {
    let (conn, _store) = connect();
    insert(
        &conn,
        BOOKS,
        &["title", "tags"],
        vec![
            vec!["Dune".into(), bson!(["scifi", "desert"])],
            vec!["Emma".into(), bson!(["classic"])],
            vec!["Ubik".into(), bson!(["scifi"])],
        ],
    );

    let query = books().join(Join::inner("tag", BOOKS).on("tags", "name"));
    let compiled = SelectCompiler::new(&query, &conn).as_sql().unwrap().unwrap();
    assert!(compiled.fragment.sql.contains("FROM library_book JOIN tag IN library_book.tags"));

    // One row per array element, as an inner join would give.
    let rows = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(titles(rows), vec!["Dune", "Dune", "Emma", "Ubik"]);
}

#[test]
fn join_restriction_filters_joined_rows() {
    let (conn, _store) = connect();
    insert(
        &conn,
        BOOKS,
        &["title", "editions"],
        vec![
            vec!["Dune".into(), bson!([{ "year": 1965 }, { "year": 2005 }])],
            vec!["Emma".into(), bson!([{ "year": 1815 }])],
        ],
    );

    let mut join = Join::inner("edition", BOOKS).on("editions", "id");
    join.restriction = Some(WhereNode::cond(
        Expr::col("edition", "year"),
        Lookup::Gt,
        Expr::value(2000),
    ));
    let rows = SelectCompiler::new(&books().join(join), &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(titles(rows), vec!["Dune"]);
}

#[test]
fn joined_id_literals_keep_their_type() {
    let (conn, _store) = connect();
    insert(
        &conn,
        BOOKS,
        &["title", "editions"],
        vec![
            vec!["Dune".into(), bson!([{ "id": 1 }, { "id": 2 }])],
            vec!["Emma".into(), bson!([{ "id": 1 }])],
        ],
    );

    let mut join = Join::inner("edition", BOOKS).on("editions", "id");
    join.restriction = Some(WhereNode::cond(
        Expr::col("edition", "id"),
        Lookup::Exact,
        Expr::value(2),
    ));
    let query = books().join(join);

    let compiled = SelectCompiler::new(&query, &conn).as_sql().unwrap().unwrap();
    assert_eq!(compiled.fragment.params, vec![Bson::Int32(2)]);

    let rows = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(titles(rows), vec!["Dune"]);
}

#[test]
fn join_without_condition_is_structural() {
    let (conn, _store) = connect();
    let query = books().join(Join::inner("library_author", BOOKS));
    assert!(matches!(
        SelectCompiler::new(&query, &conn).as_sql(),
        Err(DbError::Structural(_))
    ));
}

// ── Execution ───────────────────────────────────────────────────

#[test]
fn provably_empty_filter_skips_the_store() {
    let (conn, store) = connect();
    seed_books(&conn);
    let query = books().filter(field("id", Lookup::In, bson!([])));

    let compiler = SelectCompiler::new(&query, &conn);
    assert!(compiler.as_sql().unwrap().is_none());
    assert!(matches!(
        compiler.execute_sql(ResultType::Multi).unwrap(),
        QueryResult::Rows(rows) if rows.is_empty()
    ));
    assert!(matches!(
        compiler.execute_sql(ResultType::Single).unwrap(),
        QueryResult::Row(None)
    ));
    assert!(matches!(
        compiler.execute_sql(ResultType::Cursor).unwrap(),
        QueryResult::Empty
    ));
    assert_eq!(store.query_count(), 0);
}

#[test]
fn single_returns_first_row() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let query = books().order_by(OrderBy::asc(Expr::col(BOOKS, "pages")));
    let result = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Single)
        .unwrap();
    let QueryResult::Row(Some(row)) = result else {
        panic!("expected a row");
    };
    assert_eq!(row, vec![Bson::String("3".into()), Bson::String("Ubik".into())]);
}

#[test]
fn chunked_reads_stream_in_chunks() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let QueryResult::Chunks(chunks) = SelectCompiler::new(&books(), &conn)
        .execute_sql(ResultType::Chunked)
        .unwrap()
    else {
        panic!("expected chunks");
    };
    let chunks = chunks.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 4);
}

#[test]
fn chunked_request_without_chunked_reads_materializes() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let conn = conn.with_features(Features {
        can_use_chunked_reads: false,
        ..Features::new()
    });
    let QueryResult::Rows(rows) = SelectCompiler::new(&books(), &conn)
        .execute_sql(ResultType::Chunked)
        .unwrap()
    else {
        panic!("expected materialized rows");
    };
    assert_eq!(titles(rows), vec!["Dune", "Emma", "Ubik", "Ulysses"]);
}

#[test]
fn cursor_result_hands_back_the_open_cursor() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let QueryResult::Cursor(mut cursor) = SelectCompiler::new(&books(), &conn)
        .execute_sql(ResultType::Cursor)
        .unwrap()
    else {
        panic!("expected cursor");
    };
    assert_eq!(cursor.row_count().unwrap(), 4);
}

#[test]
fn missing_properties_are_padded_with_null() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let query = SelectQuery::new(BOOKS)
        .columns(&["title", "subtitle"])
        .filter(field("title", Lookup::Exact, "Dune"));
    let rows = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(rows, vec![vec![Bson::String("Dune".into()), Bson::Null]]);
}

#[test]
fn offset_without_limit_skips_client_side() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let query = books()
        .order_by(OrderBy::asc(Expr::col(BOOKS, "pages")))
        .slice(2, None);
    let compiled = SelectCompiler::new(&query, &conn).as_sql().unwrap().unwrap();
    assert!(!compiled.fragment.sql.contains("OFFSET"));
    assert_eq!(compiled.skip, 2);

    let rows = SelectCompiler::new(&query, &conn)
        .execute_sql(ResultType::Multi)
        .unwrap()
        .into_rows()
        .unwrap();
    assert_eq!(titles(rows), vec!["Dune", "Ulysses"]);
}

#[test]
fn lookups_filter_against_the_store() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let run = |node: WhereNode| {
        let rows = SelectCompiler::new(&books().filter(node), &conn)
            .execute_sql(ResultType::Multi)
            .unwrap()
            .into_rows()
            .unwrap();
        titles(rows)
    };

    assert_eq!(run(field("title", Lookup::IExact, "emma")), vec!["Emma"]);
    assert_eq!(run(field("title", Lookup::IStartsWith, "u")), vec!["Ubik", "Ulysses"]);
    assert_eq!(run(field("title", Lookup::EndsWith, "ne")), vec!["Dune"]);
    assert_eq!(run(field("pages", Lookup::Range, bson!([300, 420]))), vec!["Dune", "Emma"]);
    assert_eq!(run(field("title", Lookup::IRegex, "^e")), vec!["Emma"]);
    assert_eq!(run(field("subtitle", Lookup::IsNull, true)).len(), 4);
    assert_eq!(
        run(WhereNode::not(field("genre", Lookup::Exact, "scifi"))),
        vec!["Emma", "Ulysses"]
    );
    assert_eq!(
        run(field("id", Lookup::In, bson!([1, 3]))),
        vec!["Dune", "Ubik"]
    );
}
