use std::collections::VecDeque;
use std::sync::Arc;

use bson::{Bson, Document};
use cobalt_store::{
    Container, Database, ItemIter, Parameter, PartitionKey, QueryOptions, QuerySpec,
};
use tracing::{debug, trace};

use crate::compiler::{Fragment, Row};
use crate::database::IdGenerator;
use crate::error::DbError;

const PLACEHOLDER: &str = "%s";

/// Rewrite positional `%s` markers into `@arg0`, `@arg1`, ... and pair each
/// with the value at the same position.
pub fn bind_placeholders(sql: &str, params: Vec<Bson>) -> Result<QuerySpec, DbError> {
    let markers = sql.matches(PLACEHOLDER).count();
    if markers != params.len() {
        return Err(DbError::Programming(format!(
            "query has {markers} placeholders but {} parameters were supplied",
            params.len()
        )));
    }

    let mut query = String::with_capacity(sql.len() + markers * 4);
    let mut pieces = sql.split(PLACEHOLDER);
    if let Some(first) = pieces.next() {
        query.push_str(first);
    }
    for (i, piece) in pieces.enumerate() {
        query.push_str(&format!("@arg{i}"));
        query.push_str(piece);
    }

    let parameters = params
        .into_iter()
        .enumerate()
        .map(|(i, value)| Parameter {
            name: format!("@arg{i}"),
            value,
        })
        .collect();

    Ok(QuerySpec { query, parameters })
}

/// Per-statement execution state over one collection.
///
/// A cursor runs one statement at a time; `execute` replaces whatever result
/// the previous statement left behind.
pub struct Cursor<D: Database> {
    database: D,
    partition_key: String,
    ids: Arc<dyn IdGenerator>,
    container: Option<D::Container>,
    results: Option<ItemIter>,
    /// Rows pulled from `results` but not yet handed out.
    buffer: VecDeque<Document>,
    consumed: usize,
    projection: Option<Vec<String>>,
    last_id: Option<String>,
    last_query: Option<QuerySpec>,
}

impl<D: Database> Cursor<D> {
    pub(crate) fn new(database: D, partition_key: String, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            database,
            partition_key,
            ids,
            container: None,
            results: None,
            buffer: VecDeque::new(),
            consumed: 0,
            projection: None,
            last_id: None,
            last_query: None,
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Point the cursor at `collection` for the following statements.
    pub fn target_collection(&mut self, collection: &str) {
        self.container = Some(self.database.container(collection));
    }

    fn container(&self) -> Result<&D::Container, DbError> {
        self.container.as_ref().ok_or(DbError::NoTarget)
    }

    // ── Execution ───────────────────────────────────────────────

    pub fn execute(&mut self, sql: &str, params: Vec<Bson>) -> Result<(), DbError> {
        self.close();
        let spec = bind_placeholders(sql, params)?;
        let container = self.container()?;

        debug!(collection = container.id(), query = %spec.query, params = spec.parameters.len(), "execute");
        let options = QueryOptions {
            enable_cross_partition_query: true,
            ..Default::default()
        };
        let results = container.query_items(spec.clone(), &options)?;

        self.results = Some(results);
        self.last_query = Some(spec);
        Ok(())
    }

    /// Align rows to these output names; missing properties read as null.
    pub fn set_projection(&mut self, names: Vec<String>) {
        self.projection = Some(names);
    }

    pub fn last_query(&self) -> Option<&QuerySpec> {
        self.last_query.as_ref()
    }

    fn next_document(&mut self) -> Result<Option<Document>, DbError> {
        let next = match self.buffer.pop_front() {
            Some(doc) => Some(doc),
            None => match self.results.as_mut().and_then(Iterator::next) {
                Some(item) => Some(item?),
                None => None,
            },
        };
        if next.is_some() {
            self.consumed += 1;
        }
        Ok(next)
    }

    fn to_row(&self, doc: Document) -> Row {
        match &self.projection {
            Some(names) => names
                .iter()
                .map(|name| doc.get(name).cloned().unwrap_or(Bson::Null))
                .collect(),
            None => doc.into_iter().map(|(_, value)| value).collect(),
        }
    }

    pub fn fetch_one(&mut self) -> Result<Option<Row>, DbError> {
        Ok(self.next_document()?.map(|doc| self.to_row(doc)))
    }

    pub fn fetch_many(&mut self, count: usize) -> Result<Vec<Row>, DbError> {
        let mut rows = Vec::with_capacity(count.min(self.buffer.len()));
        while rows.len() < count {
            match self.fetch_one()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    pub fn fetch_all(&mut self) -> Result<Vec<Row>, DbError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_one()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Discard the next `count` rows.
    pub(crate) fn skip(&mut self, count: usize) -> Result<(), DbError> {
        for _ in 0..count {
            if self.next_document()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Rows in the current result, handed out or not. Pulls the rest of a
    /// lazy result into memory to count it; later fetches read from there.
    pub fn row_count(&mut self) -> Result<usize, DbError> {
        if let Some(results) = self.results.as_mut() {
            for item in results {
                self.buffer.push_back(item?);
            }
        }
        Ok(self.consumed + self.buffer.len())
    }

    pub fn close(&mut self) {
        if self.results.take().is_some() {
            trace!(consumed = self.consumed, "cursor closed");
        }
        self.buffer.clear();
        self.consumed = 0;
        self.projection = None;
    }

    // ── Item operations ─────────────────────────────────────────

    /// Insert `rows` into `collection`, one item at a time.
    ///
    /// Every row gets a fresh surrogate id under the partition key, copied to
    /// `pk_column` when the row leaves it unset. Rows written before a
    /// failing row stay written.
    pub fn insert_batch(
        &mut self,
        collection: &str,
        pk_column: &str,
        rows: Vec<Document>,
    ) -> Result<(), DbError> {
        let mut container: Option<D::Container> = None;
        for mut row in rows {
            let unset_primary_key =
                self.partition_key == pk_column && row.get(pk_column) == Some(&Bson::Null);
            if row.contains_key(&self.partition_key) && !unset_primary_key {
                return Err(DbError::Integrity(format!(
                    "{collection} row defines the reserved partition key column {}",
                    self.partition_key
                )));
            }

            let id = self.ids.next_id();
            row.insert(self.partition_key.clone(), id.clone());
            if matches!(row.get(pk_column), None | Some(Bson::Null)) {
                row.insert(pk_column, id.clone());
            }
            // The collection is created once the first row passes the checks.
            let target = match container.take() {
                Some(target) => target,
                None => self.database.create_container_if_not_exists(
                    collection,
                    &PartitionKey::hash(&self.partition_key),
                )?,
            };
            target.create_item(row)?;
            container = Some(target);
            self.last_id = Some(id);
        }

        if container.is_some() {
            self.container = container;
        }
        Ok(())
    }

    pub fn last_inserted_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// `(item id, partition value)` of every item in `collection` matching
    /// `filter` (all items when `None`).
    pub fn item_keys(
        &mut self,
        collection: &str,
        filter: Option<Fragment>,
    ) -> Result<Vec<(String, Bson)>, DbError> {
        self.target_collection(collection);

        let pk = self.partition_key.clone();
        let mut sql = format!("SELECT {collection}.{pk}");
        if pk != "id" {
            sql.push_str(&format!(", {collection}.id"));
        }
        sql.push_str(&format!(" FROM {collection}"));
        let params = match filter {
            Some(filter) => {
                sql.push_str(" WHERE ");
                sql.push_str(&filter.sql);
                filter.params
            }
            None => Vec::new(),
        };

        self.execute(&sql, params)?;
        let mut keys = Vec::new();
        while let Some(doc) = self.next_document()? {
            let id = match doc.get("id") {
                Some(Bson::String(id)) => id.clone(),
                other => {
                    return Err(DbError::Internal(format!(
                        "item in {collection} has no string id: {other:?}"
                    )));
                }
            };
            let partition_value = doc.get(&pk).cloned().unwrap_or(Bson::Null);
            keys.push((id, partition_value));
        }
        self.close();
        Ok(keys)
    }

    /// Full items of `collection` matching `filter`: a key projection, then
    /// one point read per match.
    pub fn get_items(
        &mut self,
        collection: &str,
        filter: Option<Fragment>,
    ) -> Result<Vec<Document>, DbError> {
        let keys = self.item_keys(collection, filter)?;
        let container = self.container()?;
        let mut items = Vec::with_capacity(keys.len());
        for (id, partition_value) in keys {
            items.push(container.read_item(&id, &partition_value)?);
        }
        Ok(items)
    }

    pub fn upsert_item(&self, item: Document) -> Result<Document, DbError> {
        Ok(self.container()?.upsert_item(item)?)
    }

    pub fn delete_item(&self, item: &Document) -> Result<(), DbError> {
        let id = item
            .get_str("id")
            .map_err(|_| DbError::Programming("item to delete has no string id".into()))?;
        let partition_value = item.get(&self.partition_key).unwrap_or(&Bson::Null);
        Ok(self.container()?.delete_item(id, partition_value)?)
    }

    pub(crate) fn delete_by_key(&self, id: &str, partition_value: &Bson) -> Result<(), DbError> {
        Ok(self.container()?.delete_item(id, partition_value)?)
    }
}

impl<D: Database> Drop for Cursor<D> {
    fn drop(&mut self) {
        self.close();
    }
}
