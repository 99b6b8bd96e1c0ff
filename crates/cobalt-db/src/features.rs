use serde::{Deserialize, Serialize};

/// What the document store can and cannot do, as seen by a relational caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub supports_transactions: bool,
    pub uses_savepoints: bool,
    pub supports_outer_joins: bool,
    pub supports_having: bool,
    pub supports_over_clause: bool,
    pub supports_foreign_keys: bool,
    pub has_select_for_update: bool,
    pub can_return_rows_from_bulk_insert: bool,
    pub can_return_columns_from_insert: bool,
    pub can_use_chunked_reads: bool,
    /// Inner joins are rewritten to `JOIN .. IN` scans over embedded arrays.
    pub emulates_inner_joins: bool,
    pub supports_subqueries_in_from: bool,
    /// Expression updates (`pages = pages + 1`) are stored as text, not evaluated.
    pub evaluates_expression_updates: bool,
    pub empty_fetchmany_value_is_list: bool,
    /// Rows per chunk for chunked reads.
    pub chunk_size: usize,
}

impl Features {
    pub const fn new() -> Self {
        Self {
            supports_transactions: false,
            uses_savepoints: false,
            supports_outer_joins: false,
            supports_having: false,
            supports_over_clause: false,
            supports_foreign_keys: false,
            has_select_for_update: false,
            can_return_rows_from_bulk_insert: false,
            can_return_columns_from_insert: false,
            can_use_chunked_reads: true,
            emulates_inner_joins: true,
            supports_subqueries_in_from: true,
            evaluates_expression_updates: false,
            empty_fetchmany_value_is_list: true,
            chunk_size: 100,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::new()
    }
}
