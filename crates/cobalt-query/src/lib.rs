mod expr;
mod filter;
mod join;
mod model;
mod operator;
mod query;
mod sort;

pub use expr::{Aggregate, AggregateFunc, ArithmeticOp, ColumnRef, Expr, Window};
pub use filter::{Condition, LogicalOp, WhereGroup, WhereNode};
pub use join::{Join, JoinKind};
pub use model::{ManyToMany, ModelMeta};
pub use operator::Lookup;
pub use query::{
    AggregateQuery, Assignment, DeleteQuery, FieldDefault, InsertQuery, SelectColumn, SelectQuery,
    UpdateQuery, UpdateValue,
};
pub use sort::{OrderBy, SortDirection};
