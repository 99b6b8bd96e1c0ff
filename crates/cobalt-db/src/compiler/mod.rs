//! Renders query plans into the store's query text and runs them through a
//! [`Cursor`], emulating the statements the store has no primitive for.

mod aggregate;
mod delete;
mod insert;
mod select;
mod update;
mod r#where;

use bson::Bson;
use cobalt_query::{
    Aggregate, ColumnRef, Condition, Expr, Lookup, OrderBy, SelectColumn, WhereNode,
};
use cobalt_store::Database;

use crate::cursor::Cursor;
use crate::error::DbError;
use crate::features::Features;

pub use aggregate::AggregateCompiler;
pub use delete::DeleteCompiler;
pub use insert::InsertCompiler;
pub use select::SelectCompiler;
pub use update::UpdateCompiler;

/// One result row, in projection order.
pub type Row = Vec<Bson>;

/// Query text with positional `%s` markers and the values they bind to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Bson>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn param(value: Bson) -> Self {
        Self {
            sql: "%s".to_string(),
            params: vec![value],
        }
    }

    pub fn push_str(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub fn append(&mut self, other: Fragment) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    pub fn join(parts: impl IntoIterator<Item = Fragment>, separator: &str) -> Fragment {
        let mut out = Fragment::default();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.append(part);
        }
        out
    }

    pub fn parenthesized(self) -> Fragment {
        Fragment {
            sql: format!("({})", self.sql),
            params: self.params,
        }
    }

    /// The text with every marker replaced by its value, for display only.
    pub fn inline(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        let mut pieces = self.sql.split("%s");
        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for piece in pieces {
            match params.next() {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str("%s"),
            }
            out.push_str(piece);
        }
        out
    }
}

/// A plan node that has a textual form in the store's query language.
pub trait Render {
    fn render(&self) -> Result<Fragment, DbError>;
}

impl Render for ColumnRef {
    fn render(&self) -> Result<Fragment, DbError> {
        Ok(Fragment::new(format!("{}.{}", self.table, self.column)))
    }
}

impl Render for Aggregate {
    fn render(&self) -> Result<Fragment, DbError> {
        let mut out = Fragment::new(format!("{}(", self.func.as_str()));
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        match &self.arg {
            Some(arg) => out.append(arg.render()?),
            None => out.push_str("1"),
        }
        out.push_str(")");
        Ok(out)
    }
}

impl Render for Expr {
    fn render(&self) -> Result<Fragment, DbError> {
        match self {
            Expr::Column(column) => column.render(),
            Expr::Value(value) => Ok(Fragment::param(value.clone())),
            Expr::Aggregate(aggregate) => aggregate.render(),
            Expr::Window(_) => Err(DbError::Unsupported(
                "window expressions (OVER clause)".into(),
            )),
            Expr::Binary { lhs, op, rhs } => {
                let mut out = Fragment::new("(");
                out.append(lhs.render()?);
                out.push_str(&format!(" {} ", op.as_str()));
                out.append(rhs.render()?);
                out.push_str(")");
                Ok(out)
            }
            Expr::Func { name, args } => {
                let args = args
                    .iter()
                    .map(Render::render)
                    .collect::<Result<Vec<_>, _>>()?;
                let mut out = Fragment::new(format!("{name}("));
                out.append(Fragment::join(args, ", "));
                out.push_str(")");
                Ok(out)
            }
        }
    }
}

impl Render for OrderBy {
    fn render(&self) -> Result<Fragment, DbError> {
        let mut out = self.expr.render()?;
        out.push_str(&format!(" {}", self.direction.as_str()));
        Ok(out)
    }
}

impl Render for Condition {
    fn render(&self) -> Result<Fragment, DbError> {
        r#where::render_condition(self)
    }
}

// ── Compiled statements ─────────────────────────────────────────

/// A rendered SELECT together with how to read its rows back.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub fragment: Fragment,
    /// Output property names, in projection order. Empty for `SELECT *`.
    pub columns: Vec<String>,
    /// Rows to discard client-side (an offset with no limit).
    pub skip: usize,
}

/// What the caller expects back from a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Every row, materialized.
    Multi,
    /// A lazy iterator of row chunks.
    Chunked,
    /// The first row only.
    Single,
    /// The open cursor.
    Cursor,
    /// Nothing; the statement runs for its effect.
    NoResults,
}

pub enum QueryResult<D: Database> {
    Rows(Vec<Row>),
    Chunks(Chunks<D>),
    Row(Option<Row>),
    Cursor(Cursor<D>),
    Empty,
}

impl<D: Database> QueryResult<D> {
    /// Result of a query that provably matches nothing.
    pub(crate) fn nothing(result_type: ResultType) -> Self {
        match result_type {
            ResultType::Multi => QueryResult::Rows(Vec::new()),
            ResultType::Chunked => QueryResult::Chunks(Chunks::empty()),
            ResultType::Single => QueryResult::Row(None),
            ResultType::Cursor | ResultType::NoResults => QueryResult::Empty,
        }
    }

    /// Every row this result holds or can still produce.
    pub fn into_rows(self) -> Result<Vec<Row>, DbError> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            QueryResult::Chunks(chunks) => {
                let mut rows = Vec::new();
                for chunk in chunks {
                    rows.extend(chunk?);
                }
                Ok(rows)
            }
            QueryResult::Row(row) => Ok(row.into_iter().collect()),
            QueryResult::Cursor(mut cursor) => cursor.fetch_all(),
            QueryResult::Empty => Ok(Vec::new()),
        }
    }
}

/// Rows of a chunked read, `size` at a time. Closes the cursor at the end.
pub struct Chunks<D: Database> {
    cursor: Option<Cursor<D>>,
    size: usize,
    width: usize,
}

impl<D: Database> Chunks<D> {
    fn new(cursor: Cursor<D>, size: usize, width: usize) -> Self {
        Self {
            cursor: Some(cursor),
            size: size.max(1),
            width,
        }
    }

    fn empty() -> Self {
        Self {
            cursor: None,
            size: 1,
            width: 0,
        }
    }
}

impl<D: Database> Iterator for Chunks<D> {
    type Item = Result<Vec<Row>, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.fetch_many(self.size) {
            Ok(rows) if rows.is_empty() => {
                self.cursor = None;
                None
            }
            Ok(rows) => Some(Ok(rows
                .into_iter()
                .map(|row| fit_row(row, self.width))
                .collect())),
            Err(e) => {
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}

/// Truncate or null-pad `row` to `width` columns. A width of zero leaves the
/// row as the store returned it.
pub(crate) fn fit_row(mut row: Row, width: usize) -> Row {
    if width > 0 {
        row.resize(width, Bson::Null);
    }
    row
}

/// Run a compiled SELECT on `cursor` and shape the rows as requested.
pub(crate) fn execute_compiled<D: Database>(
    mut cursor: Cursor<D>,
    compiled: CompiledQuery,
    result_type: ResultType,
    features: &Features,
) -> Result<QueryResult<D>, DbError> {
    let CompiledQuery {
        fragment,
        columns,
        skip,
    } = compiled;
    cursor.execute(&fragment.sql, fragment.params)?;
    let width = columns.len();
    if width > 0 {
        cursor.set_projection(columns);
    }
    cursor.skip(skip)?;

    // Without chunked reads a chunked request is served fully materialized.
    let result_type = match result_type {
        ResultType::Chunked if !features.can_use_chunked_reads => ResultType::Multi,
        other => other,
    };

    Ok(match result_type {
        ResultType::Multi => {
            let rows = cursor.fetch_all()?;
            cursor.close();
            QueryResult::Rows(rows.into_iter().map(|row| fit_row(row, width)).collect())
        }
        ResultType::Single => {
            let row = cursor.fetch_one()?;
            cursor.close();
            QueryResult::Row(row.map(|row| fit_row(row, width)))
        }
        ResultType::Chunked => {
            QueryResult::Chunks(Chunks::new(cursor, features.chunk_size, width))
        }
        ResultType::Cursor => QueryResult::Cursor(cursor),
        ResultType::NoResults => {
            cursor.close();
            QueryResult::Empty
        }
    })
}

/// Output property names of `columns`, and whether each must be spelled out
/// with `AS`: an explicit alias, or a rename that keeps names unique.
pub(crate) fn output_names(columns: &[SelectColumn]) -> Vec<(String, bool)> {
    let mut names: Vec<(String, bool)> = Vec::with_capacity(columns.len());
    let mut unnamed = 0;
    for column in columns {
        let (base, explicit) = match (&column.alias, column.expr.as_column()) {
            (Some(alias), _) => (alias.clone(), true),
            (None, Some(col)) => (col.column.clone(), false),
            (None, None) => {
                unnamed += 1;
                names.push((format!("${unnamed}"), false));
                continue;
            }
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.iter().any(|(taken, _)| *taken == name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        let renamed = name != base;
        names.push((name, explicit || renamed));
    }
    names
}

/// Partition-key values are always strings in the store; coerce literals
/// compared against `table`'s partition-key column. Columns of joined
/// bindings are embedded values, not items, and keep their own types.
pub(crate) fn stringify_partition_key(node: &mut WhereNode, table: &str, partition_key: &str) {
    node.for_each_condition_mut(&mut |condition: &mut Condition| {
        let is_key = condition
            .lhs
            .as_column()
            .is_some_and(|c| c.table == table && c.column == partition_key);
        if !is_key || condition.lookup == Lookup::IsNull {
            return;
        }
        if let Expr::Value(value) = &mut condition.rhs {
            *value = key_string(value);
        }
    });
}

fn key_string(value: &Bson) -> Bson {
    match value {
        Bson::Int32(n) => Bson::String(n.to_string()),
        Bson::Int64(n) => Bson::String(n.to_string()),
        Bson::Double(f) if f.fract() == 0.0 => Bson::String(format!("{f:.0}")),
        Bson::Double(f) => Bson::String(f.to_string()),
        Bson::Array(items) => Bson::Array(items.iter().map(key_string).collect()),
        other => other.clone(),
    }
}
