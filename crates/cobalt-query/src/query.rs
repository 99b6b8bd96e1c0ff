use std::fmt;
use std::sync::Arc;

use bson::Bson;

use crate::expr::Expr;
use crate::filter::WhereNode;
use crate::join::Join;
use crate::sort::OrderBy;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// A read over one collection. An empty `columns` list selects whole items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<SelectColumn>,
    pub filter: Option<WhereNode>,
    pub joins: Vec<Join>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
    pub distinct: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Select `table.column` for each name, in order.
    pub fn columns(mut self, names: &[&str]) -> Self {
        for name in names {
            self.columns
                .push(SelectColumn::new(Expr::col(self.table.clone(), *name)));
        }
        self
    }

    pub fn select(mut self, column: SelectColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn filter(mut self, node: WhereNode) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => WhereNode::and(vec![existing, node]),
            None => node,
        });
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn slice(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn is_sliced(&self) -> bool {
        self.offset > 0 || self.limit.is_some()
    }
}

/// Rows to create in one collection. Each row lines up with `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub table: String,
    pub primary_key: String,
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Bson>>,
}

/// A field default evaluated once per updated item.
#[derive(Clone)]
pub struct FieldDefault(Arc<dyn Fn() -> Bson + Send + Sync>);

impl FieldDefault {
    pub fn new(f: impl Fn() -> Bson + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Bson {
        (self.0)()
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldDefault(..)")
    }
}

impl PartialEq for FieldDefault {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Literal(Bson),
    Default(FieldDefault),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Store name of the column.
    pub column: String,
    pub value: UpdateValue,
}

impl Assignment {
    pub fn literal(column: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self {
            column: column.into(),
            value: UpdateValue::Literal(value.into()),
        }
    }

    pub fn expr(column: impl Into<String>, expr: Expr) -> Self {
        Self {
            column: column.into(),
            value: UpdateValue::Expr(expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub table: String,
    pub filter: Option<WhereNode>,
    pub values: Vec<Assignment>,
    /// Cascading updates against other collections, applied after this one.
    pub related_updates: Vec<UpdateQuery>,
}

impl UpdateQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            values: Vec::new(),
            related_updates: Vec::new(),
        }
    }

    pub fn filter(mut self, node: WhereNode) -> Self {
        self.filter = Some(node);
        self
    }

    pub fn set(mut self, assignment: Assignment) -> Self {
        self.values.push(assignment);
        self
    }

    pub fn related(mut self, update: UpdateQuery) -> Self {
        self.related_updates.push(update);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub table: String,
    pub filter: Option<WhereNode>,
}

/// Aggregates computed over the rows of `inner`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub inner: SelectQuery,
    pub aggregates: Vec<SelectColumn>,
}
