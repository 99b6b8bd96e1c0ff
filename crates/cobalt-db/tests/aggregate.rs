mod common;
use common::*;

use bson::{Bson, bson};
use cobalt_db::AggregateCompiler;
use cobalt_query::{
    AggregateFunc, AggregateQuery, Expr, Lookup, SelectColumn, SelectQuery, WhereNode,
};

fn aggregate(inner: SelectQuery, aggregates: Vec<SelectColumn>) -> AggregateQuery {
    AggregateQuery { inner, aggregates }
}

#[test]
fn count_over_a_plain_query_renders_flat() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let query = aggregate(
        SelectQuery::new(BOOKS).filter(WhereNode::cond(
            Expr::col(BOOKS, "genre"),
            Lookup::Exact,
            Expr::value("scifi"),
        )),
        vec![SelectColumn::aliased(Expr::count_all(), "n")],
    );
    let compiler = AggregateCompiler::new(&query, &conn);
    let compiled = compiler.as_sql().unwrap().unwrap();
    assert_eq!(
        compiled.fragment.sql,
        "SELECT COUNT(1) AS n FROM library_book WHERE library_book.genre = %s"
    );
    assert_eq!(compiler.execute_sql().unwrap(), vec![Bson::Int64(2)]);
}

#[test]
fn sliced_inner_query_becomes_a_subquery() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let inner = SelectQuery::new(BOOKS)
        .columns(&["pages"])
        .slice(0, Some(3));
    let query = aggregate(
        inner,
        vec![
            SelectColumn::new(Expr::count_all()),
            SelectColumn::aliased(
                Expr::aggregate(AggregateFunc::Sum, Expr::col(BOOKS, "pages")),
                "total",
            ),
        ],
    );
    let compiler = AggregateCompiler::new(&query, &conn);
    let compiled = compiler.as_sql().unwrap().unwrap();
    assert!(compiled.fragment.sql.starts_with(
        "SELECT COUNT(1), SUM(subquery.pages) AS total FROM (SELECT library_book.pages FROM library_book"
    ));
    assert!(compiled.fragment.sql.ends_with(") subquery"));
    // Dune, Emma, Ubik in id order.
    assert_eq!(
        compiler.execute_sql().unwrap(),
        vec![Bson::Int64(3), Bson::Int64(412 + 320 + 202)]
    );
}

#[test]
fn empty_inner_query_counts_zero_without_a_query() {
    let (conn, store) = connect();
    seed_books(&conn);
    let query = aggregate(
        SelectQuery::new(BOOKS).filter(WhereNode::cond(
            Expr::col(BOOKS, "id"),
            Lookup::In,
            Expr::value(bson!([])),
        )),
        vec![
            SelectColumn::new(Expr::count_all()),
            SelectColumn::new(Expr::aggregate(AggregateFunc::Max, Expr::col(BOOKS, "pages"))),
        ],
    );
    assert_eq!(
        AggregateCompiler::new(&query, &conn).execute_sql().unwrap(),
        vec![Bson::Int64(0), Bson::Null]
    );
    assert_eq!(store.query_count(), 0);
}

#[test]
fn aggregates_over_an_empty_collection() {
    let (conn, _store) = connect();
    conn.create_collection_if_absent(BOOKS).unwrap();
    let query = aggregate(
        SelectQuery::new(BOOKS),
        vec![
            SelectColumn::new(Expr::count_all()),
            SelectColumn::new(Expr::aggregate(AggregateFunc::Avg, Expr::col(BOOKS, "pages"))),
        ],
    );
    assert_eq!(
        AggregateCompiler::new(&query, &conn).execute_sql().unwrap(),
        vec![Bson::Int64(0), Bson::Null]
    );
}

#[test]
fn distinct_count_via_subquery() {
    let (conn, _store) = connect();
    seed_books(&conn);
    let mut inner = SelectQuery::new(BOOKS).columns(&["genre"]);
    inner.distinct = true;
    let query = aggregate(inner, vec![SelectColumn::new(Expr::count_all())]);
    assert_eq!(
        AggregateCompiler::new(&query, &conn).execute_sql().unwrap(),
        vec![Bson::Int64(2)]
    );
}
